pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod monarch;
pub mod output;
pub mod providers;
pub mod semsim;
pub mod server;
