use crate::extract::CurrentIdentity;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use ballot_app::domain::LiveEvent;
use ballot_app::infrastructure::live::Room;
use ballot_app::AppContext;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// What a client may send after connecting: the room it wants to watch from.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    AdminConnect,
    UserConnect,
}

#[derive(Debug, Clone, Copy)]
struct Peer {
    connection: Uuid,
    user_id: Option<i32>,
    is_admin: bool,
}

pub async fn live_socket(
    State(ctx): State<AppContext>,
    CurrentIdentity { identity, .. }: CurrentIdentity,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = identity.user_id();
    let is_admin = identity.is_admin();
    ws.on_upgrade(move |socket| serve_socket(socket, ctx, user_id, is_admin))
}

async fn serve_socket(socket: WebSocket, ctx: AppContext, user_id: Option<i32>, is_admin: bool) {
    let peer = Peer {
        connection: ctx.presence.register(user_id),
        user_id,
        is_admin,
    };
    let mut events = ctx.notifier.subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("Live connection {} opened", peer.connection);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to encode {} event: {}", event.name(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                    if ends_connection(&event, peer.user_id) {
                        tracing::info!("Closing live connection {} after forced logout", peer.connection);
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live connection {} skipped {} events", peer.connection, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_client_message(&ctx, peer, text.as_str()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    ctx.presence.unregister(peer.connection);
    tracing::debug!("Live connection {} closed", peer.connection);
}

fn handle_client_message(ctx: &AppContext, peer: Peer, text: &str) {
    let room = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::AdminConnect) if peer.is_admin => Room::Admin,
        Ok(ClientMessage::AdminConnect) => {
            tracing::warn!("Non-admin connection {} asked for the admin room", peer.connection);
            return;
        }
        Ok(ClientMessage::UserConnect) => Room::Users,
        Err(_) => {
            tracing::debug!("Ignoring unknown live message on {}", peer.connection);
            return;
        }
    };
    ctx.presence.join(peer.connection, room);
}

fn ends_connection(event: &LiveEvent, user_id: Option<i32>) -> bool {
    match (event, user_id) {
        (LiveEvent::ForceLogout { user_id: target, .. }, Some(user_id)) => *target == user_id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"admin_connect"}"#).unwrap(),
            ClientMessage::AdminConnect
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"user_connect"}"#).unwrap(),
            ClientMessage::UserConnect
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shout"}"#).is_err());
    }

    #[test]
    fn test_force_logout_closes_only_its_target() {
        let event = LiveEvent::ForceLogout {
            user_id: 4,
            username: "dave".into(),
        };
        assert!(ends_connection(&event, Some(4)));
        assert!(!ends_connection(&event, Some(5)));
        assert!(!ends_connection(&event, None));
        assert!(!ends_connection(&LiveEvent::PollEnded {}, Some(4)));
    }
}
