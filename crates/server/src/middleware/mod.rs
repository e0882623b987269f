pub mod access_control;
pub mod billing;
pub mod rate_limit;
pub mod request_id;
pub mod security;

pub use access_control::{AccessContext, get_current_user, require_auth, require_superuser};
pub use billing::enforce_quota;
pub use rate_limit::{RateLimitConfig, RateLimitExceeded, TokenBucket};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security::security_headers;
