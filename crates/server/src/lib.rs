pub mod config;
pub mod monitor;
pub mod store;
pub mod web;
