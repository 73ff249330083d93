//! Network Layer
//!
//! Custody front door: the key service, its WebSocket server, the JSON
//! wire protocol, and attendee token validation.
//! Nothing here touches ledger state directly; all writes go through the
//! master-key relay.

pub mod auth;
pub mod protocol;
pub mod server;
pub mod service;

pub use auth::{validate_token, AttendeeClaims, AuthConfig, AuthError};
pub use protocol::{ClientMessage, ErrorCode, ServerMessage};
pub use server::{KeyServer, ServerConfig, ServerError};
pub use service::{claim_url, DeliveryError, KeyService, LogDelivery, SecretDelivery, ServiceError};
