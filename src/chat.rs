mod event;
mod log;
mod message;

pub use event::ChatEvent;
pub use log::MessageLog;
pub use message::{Message, MessageKey, MessagePage, OutgoingMessage};
