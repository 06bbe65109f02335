//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostGIS-backed reference and spatial repositories
//! - **calculator**: the external carbon calculator run as a child process
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod calculator;
pub mod persistence;
