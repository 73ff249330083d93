//! Protocol Messages
//!
//! JSON wire format between custody clients and the key server.

use serde::{Deserialize, Serialize};

use crate::core::{Address, PublicKey};
use crate::ledger::{Query, QueryResponse};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate as an attendee.
    Auth {
        /// JWT whose subject is the attendee's ticket id.
        token: String,
        /// Client version for compatibility check.
        #[serde(default)]
        client_version: String,
    },

    /// Request custody of the authenticated attendee's account.
    Key {
        /// Public key generated on the attendee's device.
        public_key: PublicKey,
    },

    /// Read ledger state. Allowed without authentication.
    Query {
        /// The read request.
        query: Query,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult {
        /// Whether authentication succeeded.
        success: bool,
        /// Attendee address on success.
        address: Option<Address>,
        /// Server version.
        server_version: String,
        /// Failure reason.
        error: Option<String>,
    },

    /// Custody granted; the secret goes out of band.
    Keyed {
        /// Keyed attendee address.
        address: Address,
    },

    /// Query answer.
    QueryResult {
        /// Result payload.
        result: QueryResponse,
    },

    /// Pong response.
    Pong {
        /// Client timestamp from the ping.
        timestamp: u64,
        /// Server time in Unix milliseconds.
        server_time: u64,
    },

    /// Request failed.
    Error {
        /// Error category.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },

    /// Server is going away.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Operation needs authentication first.
    NotAuthenticated,
    /// Message could not be parsed or had invalid fields.
    InvalidMessage,
    /// No such attendee.
    AttendeeNotFound,
    /// Attendee already has a key.
    AlreadyKeyed,
    /// Ledger committed a rejection.
    LedgerRejected,
    /// Ledger unreachable; safe to retry.
    LedgerUnavailable,
    /// Custody queue busy; nothing was submitted.
    Busy,
    /// Anything else.
    InternalError,
}

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Shorthand for an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}
