use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use log::error;

use crate::config::settings::SETTINGS;
use crate::error::errors::{AuthenticateError, Error};

/// Enforced only when `server.api_key` is configured; the default
/// configuration leaves the API open.
pub async fn validate_api_key_mw(req: Request, next: Next) -> Result<impl IntoResponse, Error> {
    let Some(expected_key) = SETTINGS.server.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    match req.headers().get("x-api-key") {
        None => Err(Error::Authenticate(AuthenticateError::MissingCredentials)),
        Some(header) => {
            let api_key_value = match header.to_str() {
                Ok(api_key_value) => api_key_value,
                Err(e) => {
                    error!("failed to parse api key header: {e}");
                    return Err(Error::Authenticate(AuthenticateError::InvalidToken));
                }
            };
            if expected_key != api_key_value {
                return Err(Error::Authenticate(AuthenticateError::WrongCredentials));
            }
            Ok(next.run(req).await)
        }
    }
}
