pub mod app;
pub mod board;
pub mod windows;
