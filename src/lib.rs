pub mod activity;
pub mod cache;
pub mod cli;
pub mod error;
pub mod generator;
pub mod github;
pub mod models;
pub mod publish;
pub mod queries;
pub mod render;
pub mod stats;
pub mod types;
