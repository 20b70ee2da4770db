pub mod chat;

pub use chat::{ ChatMessage, Conversation, Role };
