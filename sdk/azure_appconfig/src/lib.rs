//! # Azure App Configuration
//!
//! Client for the Azure App Configuration Rust SDK.
//!
//! This crate provides Rust bindings for managing the key-values of an
//! [App Configuration](https://learn.microsoft.com/azure/azure-app-configuration/)
//! store: create, read, update and delete settings, list and filter them,
//! walk revision history, and lock settings read-only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_appconfig_core::client::ConfigClient;
//! use azure_appconfig_core::models::MatchConditions;
//! use azure_appconfig::models::ConfigurationSetting;
//! use azure_appconfig::setting::{self, GetSettingOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ConfigClient::from_connection_string(
//!         &std::env::var("AZURE_APPCONFIG_CONNECTION_STRING")?,
//!     )?;
//!
//!     // Store a setting
//!     let greeting = ConfigurationSetting::builder("app/greeting")
//!         .label("production")
//!         .value("hello")
//!         .build()?;
//!     setting::set(&client, &greeting, MatchConditions::Unconditionally).await?;
//!
//!     // Read it back
//!     let options = GetSettingOptions::new().label("production");
//!     if let Some(stored) = setting::get(&client, "app/greeting", &options).await? {
//!         println!("{} = {:?}", stored.key, stored.value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Setting**: A key-value with optional label, content type, and tags.
//!   The key and label pair identifies a setting uniquely.
//! - **Etag**: Version identifier assigned on every write; conditional
//!   operations use it for optimistic concurrency.
//! - **Revision**: Point-in-time snapshot of a setting, retained by the
//!   store for its retention period.
//! - **Lock**: A read-only marker that rejects writes until cleared.
//!
//! ## Modules
//!
//! - [`setting`] - Create, retrieve, list, and delete settings
//! - [`revision`] - Walk setting revision history
//! - [`read_only`] - Lock and unlock settings
//! - [`models`] - Shared types

pub mod models;
pub mod read_only;
pub mod revision;
pub mod setting;
