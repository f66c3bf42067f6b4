// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for coordination operations.
//!
//! Every fallible path in the engine and dispatch layers returns one of
//! these kinds. The dispatch layer renders the `Display` message to clients
//! with an `isError` flag; messages are stable.

use thiserror::Error;

use crate::key::KeyError;

/// Errors surfaced by coordination operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    // -- backend lifecycle --
    #[error("backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("backend does not support {0}")]
    BackendNotSupported(String),

    // -- storage addressing --
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    // -- room lifecycle --
    #[error("room is not initialized")]
    NotInitialized,

    #[error("room is already initialized")]
    AlreadyInitialized,

    // -- agents --
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent already joined: {0}")]
    AgentAlreadyJoined(String),

    #[error("invalid agent name: {0}")]
    InvalidAgentName(String),

    // -- tasks --
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task {id} already claimed by {by}")]
    TaskAlreadyClaimed { id: String, by: String },

    #[error("task {0} is not claimed")]
    TaskNotClaimed(String),

    #[error("task {id} in invalid state: {msg}")]
    TaskInvalidState { id: String, msg: String },

    #[error("version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    // -- portals --
    #[error("no open portal from {from} to {target}")]
    PortalNotOpen { from: String, target: String },

    #[error("portal already open from {agent} to {target}")]
    PortalAlreadyOpen { agent: String, target: String },

    #[error("portal from {from} to {target} is closed")]
    PortalClosed { from: String, target: String },

    // -- auth --
    #[error("unauthorized")]
    Unauthorized,

    #[error("agent {agent} is not permitted to {action}")]
    Forbidden { agent: String, action: String },

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    // -- rate limiting --
    #[error("rate limit exceeded for {category}: {current}/{limit}, retry in {wait_seconds}s")]
    RateLimitExceeded {
        limit: u32,
        current: u32,
        wait_seconds: u64,
        category: String,
    },

    // -- programming-error catch-all --
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<KeyError> for CoordError {
    fn from(e: KeyError) -> Self {
        CoordError::InvalidKey(e.to_string())
    }
}

impl CoordError {
    /// True for faults worth one internal retry (CAS miss, lock contention).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordError::VersionConflict { .. } | CoordError::OperationFailed(_)
        )
    }
}
