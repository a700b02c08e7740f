//! Consensus Node Binary
//!
//! Orders newline-delimited transactions read from stdin into ledger blocks.
//!
//! The block pipeline runs against in-process handlers by default. With
//! `engine.remote_addr` it drives an ABCI server instead, and with
//! `engine.listen_addr` the node's own handlers are served to an external
//! engine.

use consensus::{
    server, AbciService, ChainHandle, Config, Consenter, Envelope, Error, Result, ShutdownSignal,
};
use ledger_core::{crypto::KeyPair, Ledger};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn signing_key(seed_hex: &str) -> Result<KeyPair> {
    let bytes = hex::decode(seed_hex)
        .map_err(|e| Error::Config(format!("Invalid signing seed: {}", e)))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Config("Signing seed must be 32 bytes".to_string()))?;
    Ok(KeyPair::from_seed(&seed))
}

fn log_metrics(consenter: &Consenter) {
    match consenter.metrics().export() {
        Ok(text) => info!("Final metrics:\n{}", text),
        Err(e) => warn!("Failed to export metrics: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting consensus node");

    // Load configuration
    let config = if let Ok(config_path) = std::env::var("CONSENSUS_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)?.with_env_overrides()?
    } else {
        info!("Loading config from environment variables");
        Config::from_env()?
    };

    // Open ledger
    let ledger_config = config.ledger_core_config();
    info!("Opening ledger at: {:?}", ledger_config.data_dir);
    let mut ledger = Ledger::open(ledger_config)?;
    if let Some(seed_hex) = config.ledger.signing_seed_hex.as_deref() {
        ledger = ledger.with_keypair(signing_key(seed_hex)?);
        info!("Block signing enabled");
    }
    let ledger = Arc::new(ledger);

    let consenter = Consenter::new(config.clone())?;

    // Serve the handlers to an external engine
    let serving = match config.engine.listen_addr.as_deref() {
        Some(addr) => {
            let shutdown = ShutdownSignal::new();
            let app = consenter.chain_app(ledger.clone(), &config.chain_id, &shutdown);
            let server = server::bind(addr, AbciService::new(app))?;
            info!("Starting ABCI server on {}", server.local_addr());

            // Blocks in accept until the process exits
            std::thread::spawn(move || {
                if let Err(e) = server.listen() {
                    error!("ABCI server error: {}", e);
                }
            });
            Some(shutdown)
        }
        None => None,
    };

    // Build and start the chain
    let chain: Option<(ChainHandle, JoinHandle<Result<()>>)> =
        match (config.engine.remote_addr.as_deref(), &serving) {
            (Some(addr), _) => {
                info!("Driving ABCI server at {}", addr);
                let mut chain =
                    consenter.handle_remote_chain(ledger.as_ref(), &config.chain_id, addr)?;
                let worker = chain.start()?;
                Some((chain.handle(), worker))
            }
            // The external engine owns block production
            (None, Some(_)) => None,
            (None, None) => {
                let mut chain = consenter.handle_chain(ledger.clone(), &config.chain_id)?;
                let worker = chain.start()?;
                Some((chain.handle(), worker))
            }
        };

    let Some((chain, worker)) = chain else {
        info!(chain = %config.chain_id, "Serving handlers only");
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        if let Some(shutdown) = serving {
            shutdown.close();
        }
        log_metrics(&consenter);
        info!("Consensus node stopped");
        return Ok(());
    };
    let mut errored = chain.errored();

    info!(chain = %config.chain_id, "Consensus node running");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut submitted: u64 = 0;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.is_empty() => {}
                Ok(Some(line)) => {
                    let tx_id = format!("stdin-{}", submitted);
                    let envelope = Envelope::for_channel(&config.chain_id, &tx_id, line.into_bytes());
                    if !chain.enqueue(envelope).await {
                        warn!(tx_id = %tx_id, "Envelope not accepted");
                        break;
                    }
                    submitted += 1;
                }
                Ok(None) => {
                    info!(submitted, "Input closed");
                    stdin_open = false;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    stdin_open = false;
                }
            },
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }
                break;
            }
            _ = errored.closed() => break,
        }
    }

    // Graceful shutdown
    info!("Shutting down consensus node...");
    chain.halt();
    if let Some(shutdown) = serving {
        shutdown.close();
    }

    let result = worker.await;
    log_metrics(&consenter);

    match result {
        Ok(Ok(())) => {
            info!("Consensus node stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Chain failed: {}", e);
            Err(e)
        }
        Err(e) => Err(Error::Other(format!("Chain worker panicked: {}", e))),
    }
}
