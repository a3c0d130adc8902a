//! Wire schema for the realtime voice protocol (`OpenAI-Beta: realtime=v1`).
pub mod audio;
pub mod events;
pub mod response;
pub mod session;
pub mod tools;
mod content;

pub use content::items::{FunctionCallItem, FunctionCallOutputItem, Item};
pub use content::message::*;
pub use events::{ClientEvent, ServerEvent};
