pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod display;
pub mod guardrails;
pub mod input;
pub mod providers;
pub mod session;
pub mod tools;
pub mod utils;
