//! Health Board Dashboard Library
//!
//! This library polls a health board's status endpoint, renders the result
//! into a color-coded HTML table and manages the board's categories and
//! items over its REST API.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod freshness;
pub mod models;
pub mod preferences;
pub mod render;

pub use client::{HealthBoardClient, HealthSource};
pub use config::Config;
pub use dashboard::{Dashboard, Phase, PollStats};
pub use errors::{DashboardError, Result};
pub use models::{HealthData, HealthItem, ItemUpdate, StatusConfig, StatusStyle};
pub use render::{RenderedTable, Theme};
