use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
};
use futures_util::StreamExt;
use log::{debug, warn};
use matinee_collab::{ConnectionHandle, HubError, RoomCode, RoomEvent, RoomStore};
use serde::Deserialize;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{transition_from, ClientMessage},
    Router,
};

#[derive(Debug, Deserialize)]
pub struct GatewayParams {
    token: String,
}

/// Authenticates the credential from the query string, then upgrades to a
/// socket bound to the resulting connection. A bad credential is refused
/// before the upgrade ever happens.
async fn gateway<S: RoomStore>(
    State(context): State<ServerContext<S>>,
    Query(params): Query<GatewayParams>,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    let handle = context.hub.connect(&params.token).await?;

    Ok(ws.on_upgrade(move |socket| drive_connection(socket, handle)))
}

/// Pumps events out and operations in until either side hangs up. Dropping
/// the handle at the end is what removes the user from the live index.
async fn drive_connection<S: RoomStore>(mut socket: WebSocket, mut handle: ConnectionHandle<S>) {
    loop {
        tokio::select! {
            event = handle.next() => {
                let Some(event) = event else { break };

                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if handle_message(&handle, &mut socket, &text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!("Socket for user {} errored: {}", handle.user_id(), error);
                        break;
                    }
                }
            }
        }
    }
}

/// Runs one inbound operation. Rejections go back to this socket only, as an
/// error event, so one client's mistake is invisible to the rest of the room.
async fn handle_message<S: RoomStore>(
    handle: &ConnectionHandle<S>,
    socket: &mut WebSocket,
    text: &str,
) -> Result<(), axum::Error> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(error) => {
            let rejection = HubError::InvalidArgument(error.to_string());
            return send_event(socket, &RoomEvent::from_error(&rejection)).await;
        }
    };

    match dispatch(handle, message).await {
        Ok(Some(event)) => send_event(socket, &event).await,
        Ok(None) => Ok(()),
        Err(error) => {
            warn!("Operation by user {} rejected: {}", handle.user_id(), error);
            send_event(socket, &RoomEvent::from_error(&error)).await
        }
    }
}

async fn dispatch<S: RoomStore>(
    handle: &ConnectionHandle<S>,
    message: ClientMessage,
) -> Result<Option<RoomEvent>, HubError> {
    match message {
        ClientMessage::JoinRoom { room_code } => {
            let code = RoomCode::new(&room_code)
                .map_err(|error| HubError::InvalidArgument(error.to_string()))?;

            let snapshot = handle.join(&code).await?;

            Ok(Some(RoomEvent::RoomState {
                room: snapshot.room,
                live_user_ids: snapshot.live_user_ids,
            }))
        }
        ClientMessage::LeaveRoom => {
            handle.leave();
            Ok(None)
        }
        ClientMessage::MediaSync {
            action,
            current_time,
            media,
        } => {
            let transition = transition_from(action, current_time, media)?;
            handle.media_sync(transition).await?;
            Ok(None)
        }
        ClientMessage::ChatMessage { text, reply_to } => {
            handle.chat(text, reply_to).await?;
            Ok(None)
        }
        ClientMessage::ControlRequest => {
            handle.request_control().await?;
            Ok(None)
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &RoomEvent) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).map_err(axum::Error::new)?;

    socket.send(Message::Text(payload)).await
}

pub fn router<S: RoomStore>() -> Router<S> {
    Router::new().route("/gateway", get(gateway::<S>))
}
