use crate::node_id::NodeId;

/// Errors produced by the dispatch core.
///
/// Two outcomes from the conceptual taxonomy this type is drawn from are
/// deliberately absent: an unhandled event is not an error (it resolves to
/// `Value::Unit` and is logged at debug), and a cancelled `Future` yields
/// `Ok(None)` rather than an error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("node {0} has no context")]
    MissingContext(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("handler failed: {message}")]
    HandlerFailed {
        message: String,
        detail: Option<String>,
    },
}

impl RelayError {
    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        match self {
            Self::HandlerFailed { message, .. } => Self::HandlerFailed {
                message,
                detail: Some(detail.into()),
            },
            other => other,
        }
    }
}
