use std::sync::Arc;

use matinee_collab::{Hub, RoomStore};

pub struct ServerContext<S: RoomStore> {
    pub hub: Arc<Hub<S>>,
}

impl<S: RoomStore> Clone for ServerContext<S> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
        }
    }
}
