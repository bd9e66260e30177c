use std::collections::{HashMap, HashSet};

use log::warn;
use parking_lot::Mutex;

use super::ConnectionId;
use crate::{EventSender, RoomCode, RoomEvent, UserId};

/// The process-local membership index: who is connected, and which room each
/// connection currently occupies.
///
/// Both directions of the mapping live behind one lock, so the index can
/// never be observed with a user in a room's live set whose connection points
/// elsewhere. This is derived, ephemeral state; the durable participant lists
/// stay in the store and the index is rebuilt by clients re-joining after a
/// restart.
#[derive(Debug, Default)]
pub struct Presence {
    state: Mutex<PresenceState>,
}

#[derive(Debug, Default)]
struct PresenceState {
    /// At most one live connection per user id, last-connect-wins
    users: HashMap<UserId, PresenceEntry>,
    /// Which user ids are currently joined to each room
    rooms: HashMap<RoomCode, HashSet<UserId>>,
}

#[derive(Debug)]
struct PresenceEntry {
    connection_id: ConnectionId,
    room: Option<RoomCode>,
    sender: EventSender,
}

/// A room a connection stopped occupying, with the live set it left behind.
#[derive(Debug)]
pub struct Departure {
    pub room_code: RoomCode,
    pub live_user_ids: Vec<UserId>,
}

/// The result of atomically moving a connection into a room.
#[derive(Debug)]
pub struct JoinShift {
    /// The room that was abandoned, if the connection occupied one
    pub departed: Option<Departure>,
    /// The new room's live set, including the joining user
    pub live_user_ids: Vec<UserId>,
}

impl Presence {
    /// Registers a connection for a user. A previous connection for the same
    /// user id is superseded: its room membership is dissolved here, and its
    /// later disconnect becomes a no-op.
    pub fn register(
        &self,
        user_id: &str,
        connection_id: ConnectionId,
        sender: EventSender,
    ) -> Option<Departure> {
        let mut state = self.state.lock();

        let superseded = state.users.insert(
            user_id.to_string(),
            PresenceEntry {
                connection_id,
                room: None,
                sender,
            },
        );

        superseded
            .and_then(|entry| entry.room)
            .map(|room| state.remove_from_room(user_id, room))
    }

    /// Moves a connection into a room, leaving its previous room in the same
    /// locked operation. Returns None if the connection was superseded.
    pub fn join(
        &self,
        user_id: &str,
        connection_id: ConnectionId,
        room_code: &RoomCode,
    ) -> Option<JoinShift> {
        let mut state = self.state.lock();

        let entry = state.entry_of(user_id, connection_id)?;
        let departed_room = entry.room.replace(room_code.clone());

        let departed = departed_room
            .filter(|room| room != room_code)
            .map(|room| state.remove_from_room(user_id, room));

        state
            .rooms
            .entry(room_code.clone())
            .or_default()
            .insert(user_id.to_string());

        Some(JoinShift {
            departed,
            live_user_ids: state.live_user_ids(room_code),
        })
    }

    /// Removes a connection from whatever room it occupies. Idempotent.
    pub fn leave(&self, user_id: &str, connection_id: ConnectionId) -> Option<Departure> {
        let mut state = self.state.lock();

        let entry = state.entry_of(user_id, connection_id)?;
        let room = entry.room.take()?;

        Some(state.remove_from_room(user_id, room))
    }

    /// Drops a connection from the index entirely. Idempotent: a connection
    /// already removed, or superseded by a newer one, is left alone.
    pub fn disconnect(&self, user_id: &str, connection_id: ConnectionId) -> Option<Departure> {
        let mut state = self.state.lock();

        if state.entry_of(user_id, connection_id).is_none() {
            return None;
        }

        let entry = state.users.remove(user_id)?;

        entry
            .room
            .map(|room| state.remove_from_room(user_id, room))
    }

    /// The room a connection currently occupies, if it is still tracked.
    pub fn room_of(&self, user_id: &str, connection_id: ConnectionId) -> Option<RoomCode> {
        let mut state = self.state.lock();
        state.entry_of(user_id, connection_id)?.room.clone()
    }

    /// Who is currently connected and joined to a room.
    pub fn live_user_ids(&self, room_code: &RoomCode) -> Vec<UserId> {
        self.state.lock().live_user_ids(room_code)
    }

    /// Fans an event out to every connection in a room, minus the excluded
    /// one. Senders are collected under the lock but sends happen outside it,
    /// and a full or closed channel drops that single delivery.
    ///
    /// Delivery order between two racing broadcasts on the same room is not
    /// pinned to mutation order. Each membership event carries the live set
    /// captured at its own mutation, so a peer can transiently hold a stale
    /// list until the next event or `room-state` snapshot. Accepted under
    /// best-effort delivery; playback events are already ordered by the
    /// per-room gate upstream.
    pub fn broadcast(&self, room_code: &RoomCode, event: RoomEvent, exclude: Option<ConnectionId>) {
        let senders: Vec<_> = {
            let state = self.state.lock();

            state
                .rooms
                .get(room_code)
                .into_iter()
                .flatten()
                .filter_map(|user_id| state.users.get(user_id))
                .filter(|entry| Some(entry.connection_id) != exclude)
                .map(|entry| entry.sender.clone())
                .collect()
        };

        for sender in senders {
            if sender.try_send(event.clone()).is_err() {
                warn!("Dropped delivery to a slow or closed connection in {room_code}");
            }
        }
    }

    /// Pushes an event to a single user's connection, if they are online.
    pub fn send_to(&self, user_id: &str, event: RoomEvent) {
        let sender = {
            let state = self.state.lock();
            state.users.get(user_id).map(|entry| entry.sender.clone())
        };

        if let Some(sender) = sender {
            if sender.try_send(event).is_err() {
                warn!("Dropped delivery to user {user_id}");
            }
        }
    }
}

impl PresenceState {
    /// The entry for a user, but only if it still belongs to this connection
    fn entry_of(&mut self, user_id: &str, connection_id: ConnectionId) -> Option<&mut PresenceEntry> {
        self.users
            .get_mut(user_id)
            .filter(|entry| entry.connection_id == connection_id)
    }

    fn remove_from_room(&mut self, user_id: &str, room_code: RoomCode) -> Departure {
        if let Some(live) = self.rooms.get_mut(&room_code) {
            live.remove(user_id);

            if live.is_empty() {
                self.rooms.remove(&room_code);
            }
        }

        Departure {
            live_user_ids: self.live_user_ids(&room_code),
            room_code,
        }
    }

    fn live_user_ids(&self, room_code: &RoomCode) -> Vec<UserId> {
        self.rooms
            .get(room_code)
            .map(|live| live.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::sync::mpsc::channel;

    fn code(raw: &str) -> RoomCode {
        RoomCode::new(raw).unwrap()
    }

    fn sender() -> EventSender {
        channel(crate::EVENT_BUFFER).0
    }

    #[test]
    fn join_switches_rooms_atomically() {
        let presence = Presence::default();
        presence.register("u1", 1, sender());

        presence.join("u1", 1, &code("ABC123")).unwrap();
        let shift = presence.join("u1", 1, &code("XYZ999")).unwrap();

        let departed = shift.departed.unwrap();
        assert_eq!(departed.room_code, code("ABC123"));
        assert!(presence.live_user_ids(&code("ABC123")).is_empty());
        assert_eq!(presence.live_user_ids(&code("XYZ999")), vec!["u1"]);
        assert_eq!(presence.room_of("u1", 1), Some(code("XYZ999")));
    }

    #[test]
    fn rejoining_the_same_room_departs_nowhere() {
        let presence = Presence::default();
        presence.register("u1", 1, sender());

        presence.join("u1", 1, &code("ABC123")).unwrap();
        let shift = presence.join("u1", 1, &code("ABC123")).unwrap();

        assert!(shift.departed.is_none());
        assert_eq!(presence.live_user_ids(&code("ABC123")), vec!["u1"]);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let presence = Presence::default();
        presence.register("u1", 1, sender());
        presence.join("u1", 1, &code("ABC123")).unwrap();

        assert!(presence.disconnect("u1", 1).is_some());
        assert!(presence.disconnect("u1", 1).is_none());
        assert!(presence.leave("u1", 1).is_none());
    }

    #[test]
    fn superseded_connection_cannot_mutate() {
        let presence = Presence::default();
        presence.register("u1", 1, sender());
        presence.join("u1", 1, &code("ABC123")).unwrap();

        // A second connection for the same user takes over
        let departure = presence.register("u1", 2, sender()).unwrap();
        assert_eq!(departure.room_code, code("ABC123"));

        // The stale connection's operations are no-ops now
        assert!(presence.join("u1", 1, &code("XYZ999")).is_none());
        assert!(presence.disconnect("u1", 1).is_none());

        presence.join("u1", 2, &code("XYZ999")).unwrap();
        assert_eq!(presence.live_user_ids(&code("XYZ999")), vec!["u1"]);
    }

    #[test]
    fn live_sets_match_entries() {
        let presence = Presence::default();

        presence.register("u1", 1, sender());
        presence.register("u2", 2, sender());
        presence.register("u3", 3, sender());

        presence.join("u1", 1, &code("ABC123")).unwrap();
        presence.join("u2", 2, &code("ABC123")).unwrap();
        presence.join("u3", 3, &code("XYZ999")).unwrap();
        presence.leave("u2", 2);

        assert_eq!(presence.live_user_ids(&code("ABC123")), vec!["u1"]);
        assert_eq!(presence.live_user_ids(&code("XYZ999")), vec!["u3"]);
        assert_eq!(presence.room_of("u2", 2), None);
    }
}
