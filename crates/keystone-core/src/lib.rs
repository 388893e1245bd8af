//! Keystone: a web backend template with session-cookie auth, role gates,
//! localized JSON envelopes and a user module.

pub mod alarm;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod i18n;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod prelude;
pub mod repositories;
pub mod response;
pub mod services;
pub mod session;
pub mod testing;
pub mod validation;

pub use app::{App, StartupError};
pub use cache::CacheService;
pub use config::Config;
pub use context::RequestContext;
pub use error::{AppError, DomainError};
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};

// Re-export axum so applications can add routes without a direct dependency.
pub use axum::{Router, extract, http, routing};
