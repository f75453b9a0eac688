//! WebSocket upgrade handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use tally_core::config::CounterMode;
use tally_core::error::AppError;
use tally_core::types::Classification;
use tally_realtime::CounterActor;
use tally_realtime::counter::Connection;

use crate::error::ApiError;
use crate::extractors::{ClientClassification, CounterInstance};

/// Time the forwarder gets to send its close frame after the client leaves.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// GET /connect — WebSocket upgrade
///
/// A hierarchical counter needs a classification up front; a request
/// without one is rejected before the upgrade. The upgrade also waits for
/// the counter to finish hydrating.
pub async fn connect(
    CounterInstance(actor): CounterInstance,
    ClientClassification(classification): ClientClassification,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    if actor.mode() == CounterMode::Hierarchical && classification.is_none() {
        return Err(AppError::validation("Missing region or client address").into());
    }
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    actor.start().await?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(actor, classification, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(
    actor: Arc<CounterActor>,
    classification: Option<Classification>,
    socket: WebSocket,
) {
    let Connection {
        handle,
        mut outbound,
    } = match actor.on_connect(classification).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "Could not register WebSocket connection");
            return;
        }
    };
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    info!(conn_id = %conn_id, "WebSocket connection established");

    // Forward queued frames until the queue ends or the connection is removed
    let forward_handle = handle.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = forward_handle.closed() => break,
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Every inbound text frame is one increment
    loop {
        tokio::select! {
            result = ws_rx.next() => match result {
                Some(Ok(Message::Text(_))) => {
                    if let Err(e) = actor.on_message(&conn_id).await {
                        debug!(conn_id = %conn_id, error = %e, "Inbound increment rejected");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = handle.closed() => break,
        }
    }

    // Cleanup
    actor.disconnect(&conn_id);
    if tokio::time::timeout(CLOSE_GRACE, outbound_task).await.is_err() {
        debug!(conn_id = %conn_id, "Outbound forwarder did not stop in time");
    }

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
