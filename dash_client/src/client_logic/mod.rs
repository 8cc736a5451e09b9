pub mod config;
pub mod fallback;
pub mod logger;
pub mod render;
