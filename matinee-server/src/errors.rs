use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use matinee_collab::HubError;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Hub(error) => match error {
                HubError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
                HubError::RoomNotFound { .. } => StatusCode::NOT_FOUND,
                HubError::RoomNotActive { .. } => StatusCode::FORBIDDEN,
                HubError::NotAuthorized => StatusCode::FORBIDDEN,
                HubError::Forbidden => StatusCode::FORBIDDEN,
                HubError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                HubError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}
