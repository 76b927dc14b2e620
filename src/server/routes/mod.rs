pub mod chat;
pub mod parental;
pub mod progress;
pub mod sessions;
