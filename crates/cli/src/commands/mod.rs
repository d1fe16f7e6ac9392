pub mod chat;
pub mod personas;
