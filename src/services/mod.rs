//! Application services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the pipeline, storage and publishing logic so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod catalog;
pub mod citation;
pub mod completion;
pub mod generation;
pub mod inflight;
pub mod publish;
pub mod rag;
pub mod render;
pub mod store;
