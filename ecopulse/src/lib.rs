pub mod types;
pub mod sanitizer;
pub mod clock;
pub mod rate_limiter;
pub mod retry;
pub mod traits;
pub mod gemini;
pub mod mock;
pub mod service;
pub mod dashboard;

pub use types::*;
pub use sanitizer::{sanitize, SanitizedText};
pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::RateLimiter;
pub use retry::{with_retry, RemoteFailure, RetryPolicy};
pub use traits::RemoteQuery;
pub use gemini::GeminiClient;
pub use mock::MockRemoteQuery;
pub use service::NewsService;
pub use dashboard::{Dashboard, DashboardError, DashboardState, IndexRefreshHandle, InsightPanel, LoadOutcome};
