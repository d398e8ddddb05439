use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Authenticate(#[from] AuthenticateError),

    #[error("{0}")]
    BadRequest(#[from] BadRequestError),

    #[error("{0}")]
    Server(#[from] ServerError),
}

impl Error {
    fn get_status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Authenticate(AuthenticateError::WrongCredentials) => StatusCode::FORBIDDEN,
            Error::Authenticate(_) => StatusCode::UNAUTHORIZED,
            Error::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(BadRequestError { message: message.into() })
    }

    pub fn server(message: impl Into<String>) -> Self {
        Error::Server(ServerError { message: message.into() })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.get_status_code();
        let body = Json(json!({ "error": self.to_string() }));

        (status_code, body).into_response()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthenticateError {
    #[error("Wrong authentication credentials")]
    WrongCredentials,
    #[error("Invalid authentication credentials")]
    InvalidToken,
    #[error("Missing authentication credentials")]
    MissingCredentials,
}

#[derive(thiserror::Error, Debug, Serialize)]
#[error("{message}")]
pub struct BadRequestError {
    pub message: String,
}

#[derive(thiserror::Error, Debug, Serialize)]
#[error("{message}")]
pub struct ServerError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_message_surfaced() {
        let err = Error::bad_request("Missing image data");
        assert_eq!(err.to_string(), "Missing image data");
        assert_eq!(err.get_status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_error_status() {
        let err = Error::server("model exploded");
        assert_eq!(err.get_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "model exploded");
    }
}
