//! Core trait definitions for Flexure.
//!
//! These traits define the contracts that domain types implement across crates.

/// A type that carries annotations (names, descriptions, metadata).
pub trait Annotated {
    /// A human-readable name or identifier.
    fn name(&self) -> &str;

    /// An optional description.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
