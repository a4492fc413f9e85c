//! The fixed system vocabulary available to every user.

use crate::model::{Dictionary, Operation, OperatorNode, Token, TokenNode};

fn operator(word: &str, uid: &str, symbol: &str, operation: Operation) -> Token {
    Token {
        word: word.to_string(),
        nodes: vec![TokenNode::Operator(OperatorNode {
            uid: uid.to_string(),
            word: symbol.to_string(),
            operation,
        })],
    }
}

/// The system dictionary: comparator words every dictionary carries
/// regardless of the user's datasets.
///
/// On overlay, these tokens concatenate with user-level tokens rather than
/// override them, broadening ambiguity.
pub fn system_dictionary() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.merge_token(operator("is", "equal-is", "is", Operation::Equal));
    dict.merge_token(operator("not", "not-equal", "not", Operation::NotEqual));
    dict.merge_token(operator("<", "less-than", "<", Operation::Less));
    dict.merge_token(operator(">", "greater-than", ">", Operation::Greater));
    dict.merge_token(operator("less than", "less-than", "<", Operation::Less));
    dict.merge_token(operator(
        "greater than",
        "greater-than",
        ">",
        Operation::Greater,
    ));
    dict
}
