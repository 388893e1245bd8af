//! Keystone prelude: the types a handler module usually needs.
//!
//! ```rust,ignore
//! use keystone_core::prelude::*;
//! ```

// ── Core types ─────────────────────────────────────────────────
pub use crate::ApiResponse;
pub use crate::App;
pub use crate::Config;
pub use crate::controllers::AppState;
pub use crate::error::{AppError, DomainError};

// ── Router & routing ───────────────────────────────────────────
pub use crate::Router;
pub use crate::routing::{delete, get, post, put};

// ── Extractors ─────────────────────────────────────────────────
pub use crate::context::RequestContext;
pub use crate::extract::{Path, State};
pub use crate::extractors::{CurrentUser, Json, MaybeUser, ValidatedJson};

// ── Access control ─────────────────────────────────────────────
pub use crate::auth::{AccessGate, roles};

// ── HTTP types ─────────────────────────────────────────────────
pub use crate::http::StatusCode;

// ── Serde / validation (almost every handler needs these) ──────
pub use serde::{Deserialize, Serialize};
pub use validator::Validate;
