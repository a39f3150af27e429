//! Streamed-event transport: `GET /sse` opens a session stream, `POST
//! /message?session_id=…` feeds it envelopes whose replies arrive as events.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jsonrpc::{handle_message, Reply};
use super::AppState;

const SESSION_BUFFER: usize = 32;
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Open SSE sessions, keyed by the id handed out in the `endpoint` event.
#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<Uuid, mpsc::Sender<Event>>>,
}

impl Sessions {
    fn insert(&self, id: Uuid, tx: mpsc::Sender<Event>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
    }

    fn get(&self, id: &Uuid) -> Option<mpsc::Sender<Event>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drops the session entry once the client's stream goes away.
struct SessionGuard {
    id: Uuid,
    state: Arc<AppState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.sessions.remove(&self.id);
        debug!(session = %self.id, "sse session closed");
    }
}

/// `GET /sse`
pub async fn open(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    state.sessions.insert(id, tx);
    info!(session = %id, "sse session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?session_id={id}"));
    let shutdown = state.shutdown.clone();
    let guard = SessionGuard { id, state };

    let events = stream::once(async move { endpoint })
        .chain(ReceiverStream::new(rx))
        .take_until(shutdown.cancelled_owned())
        .map(move |ev| {
            let _session = &guard;
            Ok(ev)
        });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub session_id: Uuid,
}

/// `POST /message`. Replies go out on the session stream, not in this response.
pub async fn message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(tx) = state.sessions.get(&query.session_id) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let dispatcher = state.dispatcher.clone();
    let session = query.session_id;
    tokio::spawn(async move {
        let Reply::Response(resp) = handle_message(&dispatcher, &body).await else {
            return;
        };
        let event = match Event::default().event("message").json_data(&resp) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(session = %session, error = %e, "failed to encode sse reply");
                return;
            }
        };
        if tx.send(event).await.is_err() {
            debug!(session = %session, "sse client went away before reply");
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
