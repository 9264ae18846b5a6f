// src/websocket.rs
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{error, info};
use scylla::Session;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use warp::ws::{Message, WebSocket};
use warp::{Rejection, Reply};

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::AuthError;
use crate::models::Snapshot;
use crate::sync::SnapshotHub;

/// Browsers cannot set headers on websocket upgrades, so the token rides in
/// the query string.
#[derive(Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn ws_handler(
    query: WsQuery,
    ws: warp::ws::Ws,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let user_id = auth::verify_token(&query.token, &config).map_err(|e| {
        warp::reject::custom(AuthError {
            message: format!("Invalid token: {}", e),
        })
    })?;
    Ok(ws.on_upgrade(move |socket| client_connection(socket, user_id, session, hub)))
}

/// One live-sync connection: full snapshots of all four collections first,
/// then every published snapshot for this user until the peer goes away.
async fn client_connection(
    socket: WebSocket,
    user_id: String,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) {
    let (mut tx, mut rx) = socket.split();
    // Subscribe before the initial reads so no mutation falls in the gap.
    let mut updates = hub.subscribe(&user_id);

    match initial_snapshots(&session, &user_id).await {
        Ok(snapshots) => {
            for snapshot in &snapshots {
                if send_snapshot(&mut tx, snapshot).await.is_err() {
                    return;
                }
            }
        }
        Err(e) => {
            error!("Failed to load initial snapshots for {}: {}", user_id, e);
            return;
        }
    }
    info!("Live sync started for user {}", user_id);

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if send_snapshot(&mut tx, &snapshot).await.is_err() {
                        break;
                    }
                }
                // Snapshots are full replacements; whatever was missed is
                // superseded by the next one.
                Err(RecvError::Lagged(skipped)) => {
                    info!("Live sync for {} lagged, skipped {} snapshots", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = rx.next() => match incoming {
                // The protocol is push-only; client frames are ignored.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Live sync stream error for {}: {}", user_id, e);
                    break;
                }
                None => break,
            },
        }
    }
    info!("Live sync ended for user {}", user_id);
}

async fn initial_snapshots(session: &Session, user_id: &str) -> Result<Vec<Snapshot>, db::DbError> {
    Ok(vec![
        Snapshot::Members(db::list_members(session, user_id).await?),
        Snapshot::Symbols(db::list_symbols(session, user_id).await?),
        Snapshot::Transactions(db::list_transactions(session, user_id).await?),
        Snapshot::Dividends(db::list_dividends(session, user_id).await?),
    ])
}

async fn send_snapshot(
    tx: &mut SplitSink<WebSocket, Message>,
    snapshot: &Snapshot,
) -> Result<(), warp::Error> {
    match serde_json::to_string(snapshot) {
        Ok(payload) => tx.send(Message::text(payload)).await,
        Err(e) => {
            error!("Failed to encode snapshot: {}", e);
            Ok(())
        }
    }
}
