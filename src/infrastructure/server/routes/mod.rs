pub mod chat;
pub mod health;
pub mod mcp;
pub mod metrics;
pub mod sessions;
pub mod tools;
