pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod datetime;
pub mod error;
pub mod model;
pub mod notify;
pub mod storage;
