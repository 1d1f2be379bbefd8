//! aerorag - Similarity retrieval and estimator tools for wing design
//!
//! This is the convenience wrapper crate that re-exports aerorag components
//! with optional feature flags for easy usage.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! aerorag = "0.1"  # Includes core + built-in tools by default
//! ```
//!
//! # Features
//!
//! - `std` (default): Include the built-in estimator tools

// Re-export core
pub use aerorag_core::*;
pub use aerorag_tools;

// Re-export built-in tools if feature is enabled
#[cfg(feature = "std")]
pub use aerorag_std;

/// Prelude module for convenient imports
pub mod prelude {
    pub use aerorag_core::*;
    pub use aerorag_tools::{Tool, ToolError, ToolExecutionResult, ToolOutput, ToolRegistry};

    #[cfg(feature = "std")]
    pub use aerorag_std::default_registry;
}
