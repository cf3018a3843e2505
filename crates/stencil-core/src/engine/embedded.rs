//! Compile-time embedded engine runtime.
//!
//! Used when the configuration does not name a `source`. The path is relative
//! to this file (`crates/stencil-core/src/engine/embedded.rs`).
//!
//! Do NOT move `runtime/handlebars.runtime.json` without updating the
//! `include_str!` path here.

/// Display name for the bundled runtime in diagnostics.
pub const RUNTIME_NAME: &str = "<bundled>";

pub const RUNTIME: &str = include_str!("../../runtime/handlebars.runtime.json");
