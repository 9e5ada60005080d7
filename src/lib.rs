pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod prompt;
pub mod session;
pub mod store;
pub mod ui;
