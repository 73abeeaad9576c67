pub mod cli;
pub mod config;
pub mod encoding;
pub mod logging;
pub mod models;
pub mod parser;
pub mod reader;
pub mod search;
pub mod state;
pub mod task;
pub mod ui;
pub mod viewport;
