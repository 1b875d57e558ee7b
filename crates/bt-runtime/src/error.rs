use thiserror::Error;

use crate::bt::BtStatus;

/// Errors raised while assembling or ticking a tree.
///
/// Every variant is a programming error in tree assembly, configuration, or a host callback;
/// nothing here is retried by the engine.
#[derive(Debug, Error)]
pub enum BtError {
    #[error("{node} was ticked without a child")]
    MissingChild { node: &'static str },

    #[error("{node} was ticked without any children")]
    EmptyComposite { node: &'static str },

    #[error("conditional {node} returned {status:?}; conditionals may only succeed or fail")]
    ConditionalContract { node: &'static str, status: BtStatus },

    #[error("{node} must be nested under an open composite or decorator")]
    NoOpenParent { node: &'static str },

    #[error("attempted to end a composite but the top node is the decorator {node}")]
    EndCompositeOnDecorator { node: &'static str },

    #[error("attempted to end a composite but no composite is open")]
    NoOpenComposite,

    #[error("the tree already has a root; {node} cannot start a second one")]
    MultipleRoots { node: &'static str },

    #[error("{open} node(s) are still open; end every composite before building")]
    UnclosedNodes { open: usize },

    #[error("cannot build a behavior tree with zero nodes")]
    EmptyTree,

    #[error("invalid repeat count {0}: expected a positive count, or -1 to repeat forever")]
    InvalidRepeatCount(i64),

    #[error("invalid {what} {value}: {reason}")]
    InvalidConfig {
        what: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("action callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, BtError>;

pub(crate) fn check_duration(what: &'static str, seconds: f32) -> Result<f32> {
    if !seconds.is_finite() {
        return Err(BtError::InvalidConfig {
            what,
            value: f64::from(seconds),
            reason: "must be finite",
        });
    }
    if seconds < 0.0 {
        return Err(BtError::InvalidConfig {
            what,
            value: f64::from(seconds),
            reason: "must not be negative",
        });
    }
    Ok(seconds)
}

pub(crate) fn check_probability(what: &'static str, p: f32) -> Result<f32> {
    if !(0.0..=1.0).contains(&p) {
        return Err(BtError::InvalidConfig {
            what,
            value: f64::from(p),
            reason: "must be within [0, 1]",
        });
    }
    Ok(p)
}
