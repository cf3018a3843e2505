//! Core library for stencil.
//!
//! Renders named Handlebars templates through a prioritized resolver chain
//! and keeps compiled artifacts in a cache store, so a template is compiled
//! once and executed from the cache afterwards.
//!
//! - [`resolver`]: filesystem and cache resolvers composed by an aggregate chain
//! - [`store`]: cache stores behind the [`store::CacheStore`] trait
//! - [`engine`]: the [`engine::Engine`] boundary and its Handlebars implementation
//! - [`renderer`]: the render state machine and default parameters
//! - [`factory`]: assembly of a ready renderer from [`config::RendererConfig`]

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod helpers;
pub mod key;
pub mod renderer;
pub mod resolver;
pub mod store;

pub use error::{ErrorCategory, Result, StencilError};
pub use renderer::Renderer;
