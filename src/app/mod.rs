pub mod adb;
pub mod commands;
pub mod config;
pub mod error;
pub mod kill;
pub mod logging;
pub mod models;
pub mod pull;
pub mod selection;
pub mod state;
pub mod worker;
