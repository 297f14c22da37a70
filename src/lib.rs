//! opflow Rust Library
//!
//! Este crate actúa como fachada del workspace:
//! - Reexporta `opflow_core` (protocolo de invocación) y `opflow_pool`
//!   (pools sobre r2d2).
//! - Expone `config` con la configuración global (`CONFIG`).
//! - Expone `errors` con el error de aplicación.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;
pub mod errors;

pub use opflow_core as core;
pub use opflow_pool as pool;

pub use config::{AppConfig, CONFIG};
pub use errors::AppError;
