pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{ApiClient, ClientSettings, LocalStorage, Session};
#[cfg(feature = "cli")]
pub use config::Cli;
pub use config::{HubConfig, ViewDefinition};
pub use core::engine::DashboardEngine;
pub use domain::model::{QueryParams, Record};
pub use utils::error::{HubError, Result};
