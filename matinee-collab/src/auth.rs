use std::sync::Arc;

use crate::{HubError, RoomStore, StoreError, UserId};

/// Resolves opaque credentials into user identities.
///
/// Credential issuance lives outside the hub; this only checks that a
/// presented token maps to a known session.
pub struct Auth<S> {
    store: Arc<S>,
}

impl<S> Auth<S>
where
    S: RoomStore,
{
    pub fn new(store: &Arc<S>) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Verifies a credential presented at connect time, yielding the user it
    /// belongs to.
    pub async fn verify(&self, credential: &str) -> Result<UserId, HubError> {
        if credential.is_empty() {
            return Err(HubError::AuthenticationFailed);
        }

        self.store
            .session_by_token(credential)
            .await
            .map(|session| session.user_id)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => HubError::AuthenticationFailed,
                e => HubError::Store(e),
            })
    }
}
