pub mod items;
pub mod message;
