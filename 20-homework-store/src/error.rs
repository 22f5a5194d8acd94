use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;

/// Failures reported by the store and the dispatcher.
///
/// None of these are fatal; each one ends up in a `success: false` response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("index {index} out of range for store of length {len}")]
    OutOfRange { index: i64, len: usize },

    #[error("entry {index} is deleted; cannot {action}")]
    AlreadyDeleted { index: usize, action: Action },

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}

/// The mutation that ran into a tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Edit => f.write_str("edit"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

impl StoreError {
    /// The message placed in `errMessage` on the wire.
    pub fn wire_message(&self) -> &'static str {
        match self {
            StoreError::OutOfRange { .. } => "Index out of range",
            StoreError::AlreadyDeleted {
                action: Action::Edit,
                ..
            } => "Specified entry is deleted. Cannot edit.",
            StoreError::AlreadyDeleted {
                action: Action::Delete,
                ..
            } => "Specified entry is already deleted. Cannot delete again.",
            StoreError::UnknownOperation(_) => "Unknown operation",
        }
    }
}

/// Outcomes a caller of the backend has to tell apart.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to backend at {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while talking to backend")]
    Io(#[from] io::Error),

    #[error("backend sent an undecodable response")]
    Decode(#[source] io::Error),

    #[error("backend closed the connection without responding")]
    NoResponse,

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("backend rejected the request: {message}")]
    Rejected { message: String },
}
