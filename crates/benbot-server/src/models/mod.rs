pub mod chat;
pub mod memory;
pub mod proxy;
