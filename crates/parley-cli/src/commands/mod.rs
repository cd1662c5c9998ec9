pub mod config;
pub mod conversations;
pub mod demo;
pub mod import;
pub mod models;
pub mod utils;
