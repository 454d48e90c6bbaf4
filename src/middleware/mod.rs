pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod response;

pub use auth::{session_auth_middleware, SessionUser};
pub use rate_limit::{
    classified_rate_limit_middleware, rate_limit_middleware, EndpointClass, RateDecision,
    RateLimiter,
};
pub use request_id::{current_request_id, request_id_middleware};
pub use response::{ApiResponse, ApiResult};
