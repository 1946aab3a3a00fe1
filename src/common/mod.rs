pub mod error;
pub mod types;

pub use error::{ChatError, ChatResult};
pub use types::{ClassificationResult, Message, Room, SendMessageRequest};
