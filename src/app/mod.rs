pub mod activity_log;
pub mod businesses;
pub mod edits;
pub mod messages;
pub mod notifications;
pub mod rate_limiter;
pub mod spam;
