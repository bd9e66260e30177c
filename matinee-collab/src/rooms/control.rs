use crate::RoomData;

/// Decides whether a user may currently mutate a room's playback state.
///
/// The rules apply in order, and the order matters:
/// 1. The owner always controls, regardless of any other flag.
/// 2. If participant control is off, nobody else does.
/// 3. With the gate open and a non-empty allow-list, only listed users control.
/// 4. With the gate open and no allow-list, every participant controls.
pub fn can_control(room: &RoomData, user_id: &str) -> bool {
    if user_id == room.owner_id {
        return true;
    }

    if !room.permissions.allow_participant_control {
        return false;
    }

    let allowed = &room.permissions.allowed_controllers;

    if !allowed.is_empty() {
        return allowed.iter().any(|c| c == user_id);
    }

    room.participant_ids.iter().any(|p| p == user_id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{PermissionsData, PlaybackStateData, RoomCode, RoomData};

    fn room(allow_control: bool, allowed: &[&str]) -> RoomData {
        RoomData {
            code: RoomCode::new("ABC123").unwrap(),
            name: "movie night".to_string(),
            owner_id: "owner".to_string(),
            participant_ids: vec!["owner".into(), "guest".into(), "other".into()],
            permissions: PermissionsData {
                allow_participant_control: allow_control,
                allowed_controllers: allowed.iter().map(|s| s.to_string()).collect(),
            },
            current_media: None,
            playback_state: PlaybackStateData::default(),
            is_active: true,
        }
    }

    #[test]
    fn owner_always_controls() {
        assert!(can_control(&room(false, &[]), "owner"));
        assert!(can_control(&room(true, &["guest"]), "owner"));
    }

    #[test]
    fn closed_gate_blocks_everyone_else() {
        let locked = room(false, &["guest"]);

        assert!(!can_control(&locked, "guest"));
        assert!(!can_control(&locked, "other"));
        assert!(!can_control(&locked, "stranger"));
    }

    #[test]
    fn allow_list_is_consulted_when_present() {
        let listed = room(true, &["guest"]);

        assert!(can_control(&listed, "guest"));
        assert!(!can_control(&listed, "other"));
    }

    #[test]
    fn empty_allow_list_means_all_participants() {
        let open = room(true, &[]);

        assert!(can_control(&open, "guest"));
        assert!(can_control(&open, "other"));
        assert!(!can_control(&open, "stranger"));
    }
}
