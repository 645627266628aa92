//! Error types for flow graph construction and lifecycle.

use thiserror::Error;

use crate::block::BlockId;
use crate::controller::FlowState;
use crate::path::NodeId;

/// Errors reported by signal paths, the controller and the engine.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The engine rejected a connection (port range, occupied input, unknown block...)
    #[error("connect {edge} failed: {reason}")]
    ConnectFailure { edge: String, reason: String },

    /// A signal path has no enabled node and no upstream fallback
    #[error("signal path '{0}' has no endpoint")]
    NoEndpoint(String),

    /// Signal paths reference each other in a loop (or nest too deeply)
    #[error("signal path '{0}' is part of a reference cycle")]
    PathCycle(String),

    /// A transform stage was connected without anything feeding it
    #[error("node '{0}' requires an input but none was resolved")]
    MissingInput(String),

    #[error("cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: FlowState,
    },

    #[error("signal path '{path}' has no node {node:?}")]
    UnknownNode { path: String, node: NodeId },

    #[error("unknown block {0:?}")]
    UnknownBlock(BlockId),

    /// `build` called twice without an intervening `destroy`
    #[error("node '{0}' is already built")]
    AlreadyBuilt(String),

    /// A topology change arrived while the controller was mid-operation
    #[error("rebuild requested while the controller is busy")]
    ReentrantRebuild,

    #[error("scheduler thread panicked")]
    SchedulerPanicked,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub(crate) fn connect_failure(edge: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::ConnectFailure {
            edge: edge.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(operation: &'static str, state: FlowState) -> Self {
        GraphError::InvalidStateTransition { operation, state }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
