pub mod controller;
pub mod loop_worker;
pub mod retry;

pub use controller::PollerController;
pub use loop_worker::{poll_once, PollContext};
pub use retry::{PollFailure, RetryPolicy};
