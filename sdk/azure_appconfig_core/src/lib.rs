#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod paging;
pub mod sync_token;

pub use error::AppConfigError;
