use matinee_collab::{HubError, MediaData, SyncAction, Transition};
use serde::Deserialize;

/// Messages a client may send over the gateway socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        room_code: String,
    },
    LeaveRoom,
    MediaSync {
        action: SyncAction,
        current_time: Option<f64>,
        media: Option<MediaData>,
    },
    ChatMessage {
        text: String,
        reply_to: Option<String>,
    },
    ControlRequest,
}

/// Shapes the loose wire fields of a media-sync message into a transition,
/// rejecting combinations that make no sense.
pub fn transition_from(
    action: SyncAction,
    current_time: Option<f64>,
    media: Option<MediaData>,
) -> Result<Transition, HubError> {
    let transition = match action {
        SyncAction::Load => Transition::Load(
            media.ok_or_else(|| HubError::InvalidArgument("load requires media".to_string()))?,
        ),
        SyncAction::Play => Transition::Play { current_time },
        SyncAction::Pause => Transition::Pause { current_time },
        SyncAction::Seek => Transition::Seek {
            current_time: current_time
                .ok_or_else(|| HubError::InvalidArgument("seek requires a position".to_string()))?,
        },
        SyncAction::Ended => Transition::Ended,
    };

    Ok(transition)
}
