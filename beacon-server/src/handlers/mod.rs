pub mod notifications;
pub mod streaming;
