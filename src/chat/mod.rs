mod message;

pub use message::{ContentPart, Message, MessageBuilder, Role};
