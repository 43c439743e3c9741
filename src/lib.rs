pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod platform;
pub mod protocol;
pub mod workflow;
pub mod workspace;
