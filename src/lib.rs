pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod seed;
pub mod service;
pub mod storage;
pub mod store;
