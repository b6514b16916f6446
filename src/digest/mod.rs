//! Weekly summary of what a user's communities are sharing.

pub mod compose;
pub mod mailer;
pub mod services;

pub use mailer::{Mailer, TracingMailer};
pub use services::send_weekly_digest;
