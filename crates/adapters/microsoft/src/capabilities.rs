mod receive_mail;
mod send_mail;

pub use receive_mail::{MailState, ReceiveMicrosoftMail};
pub use send_mail::{SendMailOptions, SendMicrosoftMail};
