mod auth;
mod events;
mod rooms;
mod store;
mod util;

use std::sync::Arc;

use dashmap::DashMap;

pub use auth::*;
pub use events::*;
pub use rooms::*;
pub use store::*;

/// The matinee sync hub, facilitating presence, playback sync, and chat for
/// shared watch rooms.
///
/// One instance per process. Everything it tracks in memory is derived state;
/// the [RoomStore] stays the single source of truth for durable fields, and
/// clients re-join after a restart.
pub struct Hub<S> {
    context: HubContext<S>,
    pub auth: Auth<S>,
}

/// A type passed to the components of the hub, to reach the store, the
/// membership index, and the per-room serialization handles.
pub struct HubContext<S> {
    pub store: Arc<S>,
    pub presence: Arc<Presence>,

    rooms: Arc<DashMap<RoomCode, Arc<Room<S>>>>,
}

impl<S> Hub<S>
where
    S: RoomStore,
{
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);

        let context = HubContext {
            store: store.clone(),
            presence: Default::default(),
            rooms: Default::default(),
        };

        Self {
            auth: Auth::new(&store),
            context,
        }
    }

    /// Authenticates a credential and registers a connection with the hub.
    ///
    /// Verification happens first: a refused connection never enters the
    /// membership index.
    pub async fn connect(&self, credential: &str) -> Result<ConnectionHandle<S>, HubError> {
        let user_id = self.auth.verify(credential).await?;

        Ok(ConnectionHandle::register(&self.context, user_id))
    }

    /// Who is currently connected and joined to a room.
    pub fn live_user_ids(&self, room_code: &RoomCode) -> Vec<UserId> {
        self.context.presence.live_user_ids(room_code)
    }
}

impl<S> HubContext<S>
where
    S: RoomStore,
{
    /// Returns the in-process handle for a room, creating it on first touch.
    pub(crate) fn room(&self, code: &RoomCode) -> Arc<Room<S>> {
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| Arc::new(Room::new(self, code.clone())))
            .clone()
    }

    /// Drops the handle for a room the store no longer knows.
    pub(crate) fn evict_room(&self, code: &RoomCode) {
        self.rooms.remove(code);
    }
}

impl<S> Clone for HubContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            presence: self.presence.clone(),
            rooms: self.rooms.clone(),
        }
    }
}
