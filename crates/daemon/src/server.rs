// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server assembly and connection loops.
//!
//! Connections are independent: each one is served on its own task with
//! its own sniffed framing, so one slow client never blocks another. All
//! shared state lives behind the `ServerCtx`.

use masc_core::{Clock, CoordError, SystemClock};
use masc_engine::{Engine, EngineConfig, MitosisConfig, MitosisController};
use masc_storage::{EncryptedStorage, EncryptionKey, FsBackend, MemoryBackend, SqlBackend, Storage};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::AuthService;
use crate::dispatch::ServerCtx;
use crate::env::{BackendKind, Config};
use crate::rate_limit::RateLimiter;
use crate::rpc;
use crate::rpc::framing::{read_frame, write_frame, Framing, ProtocolError};
use crate::session::SessionRegistry;

/// Deadline for one request, comfortably above the longest legal
/// `wait_for_message` block.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(330);

/// Pub/sub rows older than this are deleted by the janitor.
const PUBSUB_RETAIN_DAYS: u32 = 7;

/// Cadence of the SQL pub/sub janitor.
const PUBSUB_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Build the storage stack the configuration asks for.
pub async fn build_storage(config: &Config) -> Result<Arc<dyn Storage>, CoordError> {
    let base: Arc<dyn Storage> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Filesystem => Arc::new(
            FsBackend::new(&config.base_dir).map_err(CoordError::from)?,
        ),
        BackendKind::Sql => {
            let url = config
                .postgres_url
                .as_deref()
                .ok_or_else(|| CoordError::ConnectionFailed("missing postgres url".into()))?;
            let backend = SqlBackend::connect(url, &config.cluster_name).await?;
            spawn_pubsub_janitor(backend.clone(), config.pubsub_max_messages);
            Arc::new(backend)
        }
    };

    match &config.encryption_key {
        Some(material) => {
            let key = EncryptionKey::resolve(material)?;
            Ok(Arc::new(EncryptedStorage::new(base, &key)?))
        }
        None => Ok(base),
    }
}

/// Retention janitor for the SQL backend's pubsub table.
fn spawn_pubsub_janitor(backend: SqlBackend, per_channel: u32) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PUBSUB_CLEANUP_INTERVAL);
        loop {
            tick.tick().await;
            if let Err(e) = backend.cleanup_pubsub_older_than(PUBSUB_RETAIN_DAYS).await {
                warn!(error = %e, "pubsub age cleanup failed");
            }
            if let Err(e) = backend.cleanup_pubsub_excess(per_channel).await {
                warn!(error = %e, "pubsub excess cleanup failed");
            }
        }
    });
}

/// Assemble the full server context over a storage backend.
pub fn build_ctx<C: Clock>(
    store: Arc<dyn Storage>,
    clock: C,
    config: &Config,
) -> Arc<ServerCtx<C>> {
    let engine_config = EngineConfig {
        zombie_threshold_secs: config.zombie_threshold_secs,
    };
    let engine = Arc::new(Engine::with_clock(
        Arc::clone(&store),
        clock.clone(),
        engine_config,
    ));

    let sessions = Arc::new(SessionRegistry::new(Arc::clone(&store), clock.clone()));
    // Bridge broadcasts into listening sessions' pending queues.
    let fan_out = Arc::clone(&sessions);
    engine.subscribe_messages(Box::new(move |message| fan_out.fan_out(message)));

    let mitosis = MitosisController::new(
        Arc::clone(&engine),
        config.cluster_name.clone(),
        MitosisConfig::default(),
    );

    Arc::new(ServerCtx {
        auth: AuthService::new(Arc::clone(&store), clock.clone(), config.auth_required),
        limiter: RateLimiter::with_clock(clock.clone()),
        sessions,
        mitosis,
        engine,
        // External collaborators watch handover records; spawning the
        // successor process is their job, not the core's.
        spawn_fn: Box::new(|_| Ok(())),
        start_time: Instant::now(),
    })
}

/// Serve one connection: read frames, answer requests, skip notifications.
///
/// Each request runs on its own task so a blocking call (a long
/// `wait_for_message`, say) never starves the other requests on the same
/// connection. A writer task serializes the responses; arrival order may
/// differ from request order, which JSON-RPC ids are for.
pub async fn serve_connection<C, R, W>(
    ctx: Arc<ServerCtx<C>>,
    reader: R,
    mut writer: W,
) -> Result<(), ProtocolError>
where
    C: Clock,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut mode = None;

    let (tx, mut rx) = tokio::sync::mpsc::channel::<(Option<Framing>, String)>(32);
    let writer_task = tokio::spawn(async move {
        while let Some((mode, payload)) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, mode, &payload).await {
                error!(error = %e, "response write failed");
                break;
            }
        }
    });

    while let Some(frame) = read_frame(&mut reader, &mut mode).await? {
        let ctx = Arc::clone(&ctx);
        let tx = tx.clone();
        let frame_mode = mode;
        tokio::spawn(async move {
            match tokio::time::timeout(REQUEST_TIMEOUT, rpc::handle_message(&ctx, &frame)).await
            {
                Ok(Some(response)) => {
                    let _ = tx.send((frame_mode, response)).await;
                }
                Ok(None) => {}
                Err(_) => {
                    // Partial state is allowed on timeout; periodic
                    // self-repair (zombie sweep, counter-authoritative
                    // reads) reclaims it.
                    if let Some(response) = rpc::timeout_response(&frame) {
                        let _ = tx.send((frame_mode, response)).await;
                    }
                }
            }
        });
    }

    drop(tx);
    let _ = writer_task.await;
    debug!("connection closed");
    Ok(())
}

/// Serve JSON-RPC over stdio until EOF.
pub async fn serve_stdio<C: Clock>(ctx: Arc<ServerCtx<C>>) -> Result<(), ProtocolError> {
    serve_connection(ctx, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Accept TCP connections on the configured port, one task each.
pub async fn serve_tcp<C: Clock>(ctx: Arc<ServerCtx<C>>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "tcp listener up");
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "tcp connection");
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let (reader, writer) = stream.into_split();
                    if let Err(e) = serve_connection(ctx, reader, writer).await {
                        error!(error = %e, "tcp connection error");
                    }
                });
            }
            Err(e) => error!(error = %e, "tcp accept error"),
        }
    }
}

/// Convenience for tests and embedding: a ready context over a memory
/// backend with the room initialized.
pub async fn memory_ctx() -> Result<Arc<ServerCtx<SystemClock>>, CoordError> {
    let config = Config {
        backend: BackendKind::Memory,
        ..Config::default()
    };
    let store = build_storage(&config).await?;
    let ctx = build_ctx(store, SystemClock, &config);
    ctx.engine.ensure_room().await?;
    Ok(ctx)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
