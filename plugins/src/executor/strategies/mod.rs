pub mod concurrency;
pub mod retry;

pub use concurrency::{FixedConcurrency, LoadAwareConcurrency};
pub use retry::{ExponentialBackoffPlugin, LinearRetryPlugin};
