pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod exif;
pub mod frame;
pub mod graxpert;
pub mod library;
pub mod pipeline;
pub mod post;
pub mod session;
pub mod target;
