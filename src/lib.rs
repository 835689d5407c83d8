pub mod canvas;
pub mod config;
pub mod error;
pub mod picture;
pub mod show;
