/// Middleware module
///
/// Admission control for protected routes and rate limiting for
/// unauthenticated ones.

mod jwt_middleware;
mod rate_limit;

pub use jwt_middleware::{bearer_token, JwtMiddleware};
pub use rate_limit::{RateLimitMiddleware, RateLimiter};
