//! # hub-service
//!
//! The application service for IdeaHub: every exposed aggregate operation,
//! the explicit persist-then-enrich lifecycle pipeline, and the reference
//! resolver. Transport adapters (HTTP or otherwise) call into
//! [`PostService`]; this crate knows nothing about routing or sessions.

pub mod resolve;
pub mod service;

pub use service::PostService;
