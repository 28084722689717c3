/// Authentication module
///
/// Secret hashing, access token codec, refresh credential management
/// and the login/refresh/logout flow built on them.

mod claims;
mod clock;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{SigningKey, TokenCodec};
pub use password::{
    hash_secret, hash_secret_with_cost, verify_secret, MAX_HASH_COST, MIN_HASH_COST,
};
pub use refresh_token::{generate_refresh_token, RefreshTokenManager, RefreshValidation};
pub use service::{
    validate_profile, AuthService, IssuedTokens, ProfilePayload, RefreshedTokens,
    RegistrationPayload,
};
