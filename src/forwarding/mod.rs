pub mod engine;
pub mod rate_limiter;

pub use engine::{Deliverer, DeliveryError, ForwardRequest, ForwardingEngine, TeloxideDeliverer};
pub use rate_limiter::{DestinationRateLimiter, RateLimit};
