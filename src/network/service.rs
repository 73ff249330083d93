//! Key Service
//!
//! Turns a custody request into a keyed ledger account:
//!
//! 1. Resolve the attendee and refuse if already keyed
//! 2. Generate a secret and its commitment
//! 3. Submit through the master-key relay
//! 4. Hand the claim link to a [`SecretDelivery`]
//!
//! The secret never touches the ledger or the logs in clear.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::core::{Address, Commitment, PublicKey};
use crate::ledger::msgs::validate_qr;
use crate::ledger::{Attendee, LedgerError, Query, QueryResponse};
use crate::relay::{ClientError, LedgerClient, MasterKey, RelayError};

/// Secret delivery failures.
#[derive(Debug, Error)]
#[error("secret delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Out-of-band channel for claim links.
#[async_trait]
pub trait SecretDelivery: Send + Sync {
    /// Send `claim_url` to the attendee.
    async fn deliver(&self, attendee: &Attendee, claim_url: &str) -> Result<(), DeliveryError>;
}

/// Delivery that only logs that a link was issued.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl SecretDelivery for LogDelivery {
    async fn deliver(&self, attendee: &Attendee, _claim_url: &str) -> Result<(), DeliveryError> {
        info!(
            attendee = %attendee.address,
            id = %attendee.id,
            "claim link issued"
        );
        Ok(())
    }
}

/// Errors surfaced to custody requesters.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Ticket id malformed.
    #[error("invalid attendee id: {0}")]
    InvalidAttendeeId(String),
    /// No attendee with that ticket id.
    #[error("attendee not found")]
    NotFound,
    /// Attendee already keyed.
    #[error("attendee already key'ed")]
    AlreadyKeyed,
    /// Relay failed to key the account.
    #[error(transparent)]
    Relay(RelayError),
    /// Ledger query failed.
    #[error(transparent)]
    Client(ClientError),
    /// Account keyed but the claim link didn't go out.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// Ledger answered with an unexpected response type.
    #[error("unexpected ledger response")]
    UnexpectedResponse,
}

impl From<RelayError> for ServiceError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::AlreadyKeyed => ServiceError::AlreadyKeyed,
            other => ServiceError::Relay(other),
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Query(LedgerError::AttendeeNotFound) => ServiceError::NotFound,
            other => ServiceError::Client(other),
        }
    }
}

/// Build the claim link for an attendee.
pub fn claim_url(base: &str, attendee: &Attendee, secret: &str) -> String {
    format!(
        "{}?id={}&address={}&secret={}",
        base.trim_end_matches('/'),
        attendee.id,
        attendee.address,
        secret
    )
}

/// Custody front door.
pub struct KeyService<C, D> {
    relay: Arc<MasterKey<C>>,
    delivery: D,
    claim_base_url: String,
}

impl<C: LedgerClient, D: SecretDelivery> KeyService<C, D> {
    /// Create a service.
    pub fn new(relay: Arc<MasterKey<C>>, delivery: D, claim_base_url: impl Into<String>) -> Self {
        Self {
            relay,
            delivery,
            claim_base_url: claim_base_url.into(),
        }
    }

    /// The relay in use.
    pub fn relay(&self) -> &Arc<MasterKey<C>> {
        &self.relay
    }

    /// Key the attendee with ticket `attendee_id` to `public_key`.
    #[instrument(skip(self, public_key))]
    pub async fn key_attendee(
        &self,
        attendee_id: &str,
        public_key: PublicKey,
    ) -> Result<Address, ServiceError> {
        validate_qr(attendee_id).map_err(|_| ServiceError::InvalidAttendeeId(attendee_id.into()))?;

        let attendee = self.attendee(attendee_id).await?;
        if attendee.is_keyed() {
            return Err(ServiceError::AlreadyKeyed);
        }

        let (secret, commitment) = Commitment::create();
        self.relay
            .submit_key_custody(attendee.address, public_key, commitment)
            .await?;

        let url = claim_url(&self.claim_base_url, &attendee, &secret);
        if let Err(e) = self.delivery.deliver(&attendee, &url).await {
            warn!(attendee = %attendee.address, error = %e, "keyed but claim link not delivered");
            return Err(e.into());
        }

        Ok(attendee.address)
    }

    /// Run a read-only ledger query.
    pub async fn query(&self, query: &Query) -> Result<QueryResponse, ServiceError> {
        Ok(self.relay.client().query(query).await?)
    }

    async fn attendee(&self, id: &str) -> Result<Attendee, ServiceError> {
        match self.query(&Query::AttendeeById { id: id.into() }).await? {
            QueryResponse::Attendee(attendee) => Ok(attendee),
            _ => Err(ServiceError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{GenesisState, LedgerApp};
    use crate::relay::LocalLedger;
    use ed25519_dalek::SigningKey;
    use std::sync::Mutex;

    /// Captures claim links instead of sending them.
    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Address, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SecretDelivery for Arc<Outbox> {
        async fn deliver(&self, attendee: &Attendee, claim_url: &str) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError("smtp down".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((attendee.address, claim_url.to_string()));
            Ok(())
        }
    }

    async fn service(outbox: Arc<Outbox>) -> KeyService<LocalLedger, Arc<Outbox>> {
        let master = SigningKey::from_bytes(&[1; 32]);
        let redeem = PublicKey::from(&SigningKey::from_bytes(&[2; 32]).verifying_key());
        let genesis = GenesisState::new(PublicKey::from(&master.verifying_key()), redeem)
            .with_attendee("1", "GA");
        let ledger = LocalLedger::new(LedgerApp::new("svc", &genesis).unwrap());
        let relay = MasterKey::connect(master, "svc", ledger).await.unwrap();
        KeyService::new(Arc::new(relay), outbox, "https://linkedup.example/claim/")
    }

    fn device_key() -> PublicKey {
        PublicKey::from(&SigningKey::from_bytes(&[3; 32]).verifying_key())
    }

    #[tokio::test]
    async fn test_key_attendee_delivers_matching_secret() {
        let outbox = Arc::new(Outbox::default());
        let service = service(Arc::clone(&outbox)).await;

        let address = service.key_attendee("1", device_key()).await.unwrap();
        assert_eq!(address, Address::from_external_id("1"));

        let sent = outbox.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let url = &sent[0].1;
        assert!(url.starts_with("https://linkedup.example/claim?id=1&address="));
        let secret = url.rsplit("secret=").next().unwrap();

        let attendee = match service
            .query(&Query::AttendeeById { id: "1".into() })
            .await
            .unwrap()
        {
            QueryResponse::Attendee(a) => a,
            other => panic!("unexpected response: {:?}", other),
        };
        assert!(attendee.commitment.unwrap().verify_reveal(secret.as_bytes()));
    }

    #[tokio::test]
    async fn test_key_attendee_errors() {
        let outbox = Arc::new(Outbox::default());
        let service = service(Arc::clone(&outbox)).await;

        assert!(matches!(
            service.key_attendee("abc", device_key()).await,
            Err(ServiceError::InvalidAttendeeId(_))
        ));
        assert!(matches!(
            service.key_attendee("2", device_key()).await,
            Err(ServiceError::NotFound)
        ));

        service.key_attendee("1", device_key()).await.unwrap();
        assert!(matches!(
            service.key_attendee("1", device_key()).await,
            Err(ServiceError::AlreadyKeyed)
        ));
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_surfaces() {
        let outbox = Arc::new(Outbox {
            fail: true,
            ..Default::default()
        });
        let service = service(outbox).await;

        assert!(matches!(
            service.key_attendee("1", device_key()).await,
            Err(ServiceError::Delivery(_))
        ));
    }
}
