use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(Debug)]
pub enum AppError {
    UnknownAction(String),
    UnknownNode(String),
    ArtifactExists(String),
    BadArtifactName(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UnknownAction(name) => {
                (StatusCode::BAD_REQUEST, format!("unknown action: {name}")).into_response()
            }
            AppError::UnknownNode(alias) => {
                (StatusCode::NOT_FOUND, format!("unknown node: {alias}")).into_response()
            }
            AppError::ArtifactExists(name) => (
                StatusCode::CONFLICT,
                format!("artifact already exists: {name}"),
            )
                .into_response(),
            AppError::BadArtifactName(name) => (
                StatusCode::BAD_REQUEST,
                format!("invalid artifact name: {name}"),
            )
                .into_response(),
            AppError::InternalServerError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
