//! The single-writer coordinator owning the dataset table and the
//! subscription index, plus the producer-facing cache facade.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::request::{DatasetReply, DatasetRequest, DictRequest, EvictionSink, RequestKind};
use super::sweeper::ExpirationSweeper;
use super::{CacheError, CacheOptions, CacheResult, Dataset};
use crate::store::AggregatorSlot;

/// Owner of `datasets` and `subscribers`.
///
/// Runs as one long-lived task consuming [`DatasetRequest`] messages in
/// order; nothing else may read or write the two maps, so every mutation is
/// linearized. Replies and downstream evictions are dispatched through
/// channels that never block, so a slow or vanished consumer cannot stall
/// request processing.
pub struct DatasetCoordinator {
    datasets: HashMap<String, Dataset>,
    subscribers: HashMap<String, Vec<String>>,
    aggregators: AggregatorSlot,
    evictions: EvictionSink,
    expiry: Duration,
}

impl DatasetCoordinator {
    pub fn new(aggregators: AggregatorSlot, evictions: EvictionSink, expiry: Duration) -> Self {
        Self {
            datasets: HashMap::new(),
            subscribers: HashMap::new(),
            aggregators,
            evictions,
            expiry,
        }
    }

    /// Consume requests until every producer handle is gone.
    pub async fn run(mut self, mut input: mpsc::Receiver<DatasetRequest>) {
        while let Some(request) = input.recv().await {
            match request.kind {
                RequestKind::Get => self.handle_get(request).await,
                RequestKind::Update => self.handle_update(request).await,
                RequestKind::Remove => self.handle_sweep(),
            }
        }
        debug!("dataset coordinator input closed, stopping");
    }

    async fn handle_get(&mut self, request: DatasetRequest) {
        let dataset = if let Some(entry) = self.datasets.get_mut(&request.id) {
            entry.last_used = Instant::now();
            Some(entry.clone())
        } else {
            match self.hydrate(&request.id).await {
                Some(mut fresh) => {
                    fresh.last_used = Instant::now();
                    self.datasets.insert(request.id.clone(), fresh.clone());
                    Some(fresh)
                }
                None => None,
            }
        };

        // A failed hydration must leave the subscription index untouched.
        if dataset.is_some() {
            self.subscribe(&request.id, &request.subscribe_id);
        }
        send_reply(request.reply, dataset);
    }

    async fn handle_update(&mut self, request: DatasetRequest) {
        // Always a full refetch: drop first so a hydration failure cannot
        // leave a stale entry behind.
        self.datasets.remove(&request.id);

        let dataset = match self.hydrate(&request.id).await {
            Some(mut fresh) => {
                fresh.last_used = Instant::now();
                self.datasets.insert(request.id.clone(), fresh.clone());
                Some(fresh)
            }
            None => None,
        };

        // Evictions go out before the reply, so by the time the updater
        // hears back, every affected dictionary invalidation is enqueued.
        if let Some(subscribed) = self.subscribers.get(&request.id) {
            for subscriber in subscribed {
                let _ = self.evictions.send(DictRequest::remove(subscriber.clone()));
            }
        }
        send_reply(request.reply, dataset);
    }

    fn handle_sweep(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .datasets
            .iter()
            .filter(|(_, entry)| entry.last_used + self.expiry <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.datasets.remove(&id);
            self.subscribers.remove(&id);
            debug!(dataset = %id, "evicted idle dataset");
        }
    }

    /// Fetch a dataset through the configured aggregator. Any failure,
    /// including no aggregator being configured, reads as a miss: the cache
    /// stores no negative results.
    async fn hydrate(&self, id: &str) -> Option<Dataset> {
        // The slot guard covers only the handle clone, never the fetch.
        let Some(aggregator) = self.aggregators.get() else {
            warn!(dataset = %id, "no dataset aggregator configured");
            return None;
        };
        match aggregator.fetch_dataset(id).await {
            Ok(dataset) => Some(dataset),
            Err(error) => {
                warn!(dataset = %id, %error, "dataset hydration failed");
                None
            }
        }
    }

    fn subscribe(&mut self, id: &str, subscribe_id: &str) {
        if subscribe_id.is_empty() {
            return;
        }
        let subscribed = self.subscribers.entry(id.to_string()).or_default();
        if !subscribed.iter().any(|s| s == subscribe_id) {
            subscribed.push(subscribe_id.to_string());
        }
    }
}

fn send_reply(reply: Option<oneshot::Sender<DatasetReply>>, dataset: Option<Dataset>) {
    if let Some(tx) = reply {
        // A caller that gave up dropped its receiver; nothing to do.
        let _ = tx.send(DatasetReply { dataset });
    }
}

/// A running dataset cache: the coordinator task, its sweeper, and the
/// producer-facing request API.
///
/// Requests are answered within `request_timeout`; on expiry the caller
/// treats the dataset as unavailable and the coordinator's eventual reply
/// lands on a dropped channel.
pub struct DatasetCache {
    input: mpsc::Sender<DatasetRequest>,
    timeout: Duration,
    sweeper_stop: oneshot::Sender<()>,
    coordinator: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl DatasetCache {
    /// Spawn the coordinator and sweeper tasks.
    pub fn spawn(
        options: CacheOptions,
        aggregators: AggregatorSlot,
        evictions: EvictionSink,
    ) -> Self {
        let (input, requests) = mpsc::channel(1);

        let coordinator =
            DatasetCoordinator::new(aggregators, evictions, options.dataset_expiry);
        let coordinator = tokio::spawn(coordinator.run(requests));

        let (sweeper_stop, stop) = oneshot::channel();
        let sweeper = ExpirationSweeper::new(options.sweep_interval, input.clone());
        let sweeper = tokio::spawn(sweeper.run(stop));

        Self {
            input,
            timeout: options.request_timeout,
            sweeper_stop,
            coordinator,
            sweeper,
        }
    }

    /// A sender for producers that speak the raw request protocol.
    pub fn input(&self) -> mpsc::Sender<DatasetRequest> {
        self.input.clone()
    }

    /// Get a dataset, hydrating it on a miss, and subscribe `subscribe_id`
    /// to its invalidations. `Ok(None)` means the dataset is unavailable.
    pub async fn get(&self, id: &str, subscribe_id: &str) -> CacheResult<Option<Dataset>> {
        let (tx, rx) = oneshot::channel();
        self.request(DatasetRequest::get(id, subscribe_id, tx), rx)
            .await
    }

    /// Drop and rehydrate a dataset, fanning out evictions to every
    /// subscriber's downstream dictionary.
    pub async fn update(&self, id: &str, subscribe_id: &str) -> CacheResult<Option<Dataset>> {
        let (tx, rx) = oneshot::channel();
        self.request(DatasetRequest::update(id, subscribe_id, tx), rx)
            .await
    }

    /// Post a sweep request, evicting every idle dataset. Fire and forget.
    pub async fn sweep(&self) -> CacheResult<()> {
        self.input
            .send(DatasetRequest::sweep())
            .await
            .map_err(|_| CacheError::Closed)
    }

    async fn request(
        &self,
        request: DatasetRequest,
        reply: oneshot::Receiver<DatasetReply>,
    ) -> CacheResult<Option<Dataset>> {
        self.input
            .send(request)
            .await
            .map_err(|_| CacheError::Closed)?;

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(answer)) => Ok(answer.dataset),
            Ok(Err(_)) => Err(CacheError::Closed),
            Err(_) => Err(CacheError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Stop the sweeper and drain the coordinator.
    pub async fn shutdown(self) {
        let Self {
            input,
            sweeper_stop,
            coordinator,
            sweeper,
            ..
        } = self;

        let _ = sweeper_stop.send(());
        let _ = sweeper.await;
        drop(input);
        let _ = coordinator.await;
    }
}
