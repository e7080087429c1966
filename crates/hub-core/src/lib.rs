//! ideahub/crates/hub-core/src/lib.rs
//!
//! The central domain logic and interface definitions for IdeaHub.

pub mod error;
pub mod models;
pub mod traits;
pub mod view;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
pub use view::*;
