use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use axum::{
    debug_handler,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    chat::{ChatChannel, ChoiceSet, InboundEvent, Input},
    models::UserId,
    router::SessionRouter,
};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Frame<'a> {
    Text {
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        choices: Option<&'static [&'static str]>,
    },
    Image {
        image: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        choices: Option<&'static [&'static str]>,
    },
}

/// `None` tells the client to keep its current quick replies.
fn labels(choices: ChoiceSet) -> Option<&'static [&'static str]> {
    match choices {
        ChoiceSet::Keep => None,
        choices => Some(choices.labels()),
    }
}

struct Connection {
    id: Uuid,
    outbox: mpsc::UnboundedSender<String>,
}

/// Outbound side of the WebSocket transport: one socket per user, newest wins.
#[derive(Clone, Default)]
pub struct WsChannel {
    connections: Arc<Mutex<HashMap<UserId, Connection>>>,
}

impl WsChannel {
    fn connections(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Routes replies for `user_id` to a new socket, replacing any older one.
    pub fn register(&self, user_id: UserId, id: Uuid) -> mpsc::UnboundedReceiver<String> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        if self.connections().insert(user_id, Connection { id, outbox }).is_some() {
            info!(user_id, "replacing older connection");
        }
        inbox
    }

    /// Returns false when a newer connection has already taken over.
    pub fn unregister(&self, user_id: UserId, id: Uuid) -> bool {
        let mut connections = self.connections();
        match connections.get(&user_id) {
            Some(connection) if connection.id == id => {
                connections.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    fn deliver(&self, user_id: UserId, frame: &Frame<'_>) -> AppResult<()> {
        let encoded = serde_json::to_string(frame).map_err(|err| AppError::Channel(err.to_string()))?;
        let connections = self.connections();
        let connection = connections
            .get(&user_id)
            .ok_or_else(|| AppError::Channel(format!("user {user_id} is not connected")))?;
        connection
            .outbox
            .send(encoded)
            .map_err(|_| AppError::Channel(format!("connection of user {user_id} is closing")))
    }
}

#[async_trait]
impl ChatChannel for WsChannel {
    async fn send_text(&self, session: UserId, text: &str, choices: ChoiceSet) -> AppResult<()> {
        self.deliver(session, &Frame::Text { text, choices: labels(choices) })
    }

    async fn send_image(&self, session: UserId, image_ref: &str, choices: ChoiceSet) -> AppResult<()> {
        self.deliver(session, &Frame::Image { image: image_ref, choices: labels(choices) })
    }
}

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    Path(user_id): Path<UserId>,
    State(router): State<SessionRouter>,
    State(channel): State<WsChannel>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let id = Uuid::now_v7();
    let span = info_span!("ws", user_id, connection = %id);
    ws.on_upgrade(move |socket| serve(socket, user_id, id, router, channel).instrument(span))
}

async fn serve(socket: WebSocket, user_id: UserId, id: Uuid, router: SessionRouter, channel: WsChannel) {
    info!("connected");
    let mut inbox = channel.register(user_id, id);
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = inbox.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let input = match msg {
            Message::Text(text) => serde_json::from_str::<Input>(text.as_str()),
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(input) = input else {
            debug!("unreadable frame dropped");
            continue;
        };

        if let Err(err) = router.dispatch(InboundEvent { session: user_id, input }).await {
            warn!(error = %err, "message not handled");
        }
    }

    if channel.unregister(user_id, id) {
        router.end_session(user_id);
    }
    send_task.abort();
    info!("disconnected");
}
