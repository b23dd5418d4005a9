//! scout-cli library, exposed so the HTTP adapter and commands can be tested.

pub mod app;
pub mod commands;
pub mod http;
pub mod progress;
