//! LinkedUp Key Service
//!
//! Runs the custody front door over an in-process devnet ledger.
//! `linkedup demo` walks through keying, claiming, scanning and
//! redeeming instead of serving.

use std::sync::Arc;

use anyhow::{bail, Context as _};
use ed25519_dalek::SigningKey;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkedup::{
    core::{Address, Commitment, PublicKey},
    ledger::{
        GenesisState, LedgerApp, MsgClaimKey, MsgRedeem, MsgScanQr, Operation, Query,
        QueryResponse, SignedTx, TxResponse,
    },
    network::{AuthConfig, KeyServer, KeyService, LogDelivery, ServerConfig},
    relay::{LedgerClient, LocalLedger, MasterKey, RelayConfig},
    VERSION,
};

/// Ticket ids seeded into the devnet genesis.
const DEVNET_ATTENDEES: [&str; 4] = ["1", "2", "3", "4"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("LinkedUp v{}", VERSION);

    let config = RelayConfig::from_env();
    let master_key = match config.signing_key() {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "using an ephemeral master key");
            random_key()
        }
    };
    let redeem_key = random_key();

    let genesis = DEVNET_ATTENDEES.iter().fold(
        GenesisState::new(
            PublicKey::from(&master_key.verifying_key()),
            PublicKey::from(&redeem_key.verifying_key()),
        ),
        |genesis, id| genesis.with_attendee(*id, "GA"),
    );
    let ledger = LocalLedger::new(LedgerApp::new(config.chain_id.clone(), &genesis)?);

    let relay = MasterKey::connect(master_key, config.chain_id.clone(), ledger.clone())
        .await?
        .with_lock_timeout(config.lock_timeout);
    let relay = Arc::new(relay);

    if std::env::args().nth(1).as_deref() == Some("demo") {
        return demo(&relay, &ledger, &redeem_key).await;
    }

    let auth = AuthConfig::from_env();
    if !auth.is_configured() {
        warn!("no AUTH_SECRET or AUTH_PUBLIC_KEY_PEM set, every auth attempt will fail");
    }

    let service = KeyService::new(Arc::clone(&relay), LogDelivery, config.claim_url.clone());
    let server = KeyServer::new(ServerConfig::from_env(), auth, Arc::new(service));

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received");
            server.shutdown();
        }
    }

    Ok(())
}

fn random_key() -> SigningKey {
    SigningKey::from_bytes(&rand::random::<[u8; 32]>())
}

/// Sign `op` as `key` at its current ledger position and commit it.
async fn submit(ledger: &LocalLedger, key: &SigningKey, op: Operation) -> anyhow::Result<TxResponse> {
    let address = PublicKey::from(&key.verifying_key()).address();
    let signer = op.signer();
    let account = ledger.account(&signer).await?;
    let chain_id = ledger.app().lock().await.chain_id().to_string();

    let tx = SignedTx::sign(op, &chain_id, account.account_number, account.sequence, key)?;
    let response = ledger.broadcast_commit(&tx).await?;
    if !response.is_ok() {
        bail!(
            "{} rejected for {} (key {}): [{}] {}",
            tx.op.type_name(),
            signer,
            address,
            response.code,
            response.log
        );
    }
    Ok(response)
}

/// Walk attendees through the whole lifecycle on the devnet.
async fn demo(
    relay: &MasterKey<LocalLedger>,
    ledger: &LocalLedger,
    redeem_key: &SigningKey,
) -> anyhow::Result<()> {
    info!("=== Starting Demo ===");

    let mut devices = Vec::new();
    for id in DEVNET_ATTENDEES {
        let address = Address::from_external_id(id);
        let device = random_key();
        let (secret, commitment) = Commitment::create();

        relay
            .submit_key_custody(address, PublicKey::from(&device.verifying_key()), commitment)
            .await
            .with_context(|| format!("keying attendee {}", id))?;

        let claim = Operation::ClaimKey(MsgClaimKey {
            attendee_address: address,
            name: format!("Attendee {}", id),
            secret,
            rsa_public_key: format!("rsa-demo-{}", id),
            encrypted_info: format!("profile of {}", id).into_bytes(),
        });
        submit(ledger, &device, claim).await?;
        info!("Attendee {} keyed and claimed at {}", id, address);

        devices.push((id, address, device));
    }

    // everyone scans everyone after them; even-numbered scanners share info
    for (i, (_, sender, device)) in devices.iter().enumerate() {
        for (scanned_id, _, _) in &devices[i + 1..] {
            let data = if i % 2 == 0 {
                b"hello from the hallway".to_vec()
            } else {
                Vec::new()
            };
            let scan = Operation::ScanQr(MsgScanQr {
                sender: *sender,
                scanned_qr: scanned_id.to_string(),
                data,
            });
            submit(ledger, device, scan).await?;
        }
    }

    let (first_id, first_address, _) = &devices[0];
    submit(
        ledger,
        redeem_key,
        Operation::Redeem(MsgRedeem {
            sender: PublicKey::from(&redeem_key.verifying_key()).address(),
            scanned_qr: first_id.to_string(),
        }),
    )
    .await?;
    info!("Attendee {} redeemed at the booth", first_id);

    if let QueryResponse::Redeemable(wins) = ledger
        .query(&Query::Redeemable { address: *first_address })
        .await?
    {
        info!("Attendee {} has {} unclaimed wins left", first_id, wins.len());
    }

    info!("=== Leaderboard ===");
    if let QueryResponse::Leaderboard(entries) = ledger.query(&Query::Leaderboard { limit: 10 }).await? {
        for (rank, entry) in entries.iter().enumerate() {
            info!(
                "#{} {} ({}) rep={} tier={}",
                rank + 1,
                entry.name,
                entry.address,
                entry.rep,
                entry.tier
            );
        }
    }

    let app = ledger.app();
    let app = app.lock().await;
    info!(
        "Final height {} state hash {}",
        app.height(),
        hex::encode(app.state_hash())
    );

    Ok(())
}
