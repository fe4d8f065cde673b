pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod prefs;
pub mod state;
pub mod storage;
pub mod stylist;
