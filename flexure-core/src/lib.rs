//! Shared primitives and traits for the Flexure structural dynamics workspace.
//!
//! `flexure-core` provides the foundation that the other Flexure crates build on:
//!
//! - **Error types**: [`FlexureError`] and [`Result`] for structured error handling
//! - **Traits**: small contracts like [`Summarizable`] and [`Annotated`]

pub mod error;
pub mod traits;

pub use error::{FlexureError, Result};
pub use traits::*;
