pub mod app;
pub mod auth;
pub mod categories;
pub mod client;
pub mod config;
pub mod db;
pub mod destinations;
pub mod error;
pub mod messages;
pub mod resource;
pub mod state;
pub mod storage;
pub mod validation;
