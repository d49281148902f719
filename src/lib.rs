pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{
    agent, catalog, events, executor, federation, metrics, orchestrator, session, subagents,
};
pub use domain::types;
pub use infrastructure::{model, server};
