pub mod jwt_auth;
pub mod rate_limit;

pub use jwt_auth::{JwtAuthMiddleware, MaybeUserId, UserId};
pub use rate_limit::{MemoryRateLimitStore, RateLimitMiddleware, RateLimitStore, RateLimiter};
