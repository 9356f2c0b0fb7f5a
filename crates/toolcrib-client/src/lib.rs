//! Reactive client layer for the toolcrib REST API.
//!
//! A component instantiates (or looks up) a [`model::Model`] or a
//! [`collection::Collection`], subscribes to it, and re-renders on
//! notification. All server traffic flows through the [`gateway::Gateway`]
//! seam so tests can drive the whole layer with an in-memory fake.

pub mod auth;
pub mod collection;
pub mod error;
pub mod gateway;
pub mod model;
pub mod spans;
pub mod subscribe;


pub use error::{Error, Result};
