//! Mail transports behind the [`MailSender`](reviewmail_notify::MailSender)
//! seam.

pub mod email;
pub mod log;
