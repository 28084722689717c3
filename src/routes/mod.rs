mod auth;
mod health_check;
mod users;

pub use auth::{login, logout, refresh, register};
pub use health_check::health_check;
pub use users::{delete_user, get_user, list_users, update_user};

use actix_web::{error::JsonPayloadError, HttpRequest};

use crate::error::{AppError, ValidationError};

/// Maps undecodable JSON bodies onto the validation branch (400)
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::MalformedPayload(err.to_string())).into()
}
