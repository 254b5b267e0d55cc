//! Event types used by the engine.
//!
//! Events provide a decoupled way for editing code to notify interested
//! parties without direct dependencies between them.
//!
//! Submodules:
//! - [`change`] – will-change / did-emerge / will-perish notifications for
//!   scene components
//!
//! See each submodule for concrete event data, semantics, and example usage.
pub mod change;
