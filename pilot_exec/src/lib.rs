//! # Pilot library.
//!
//! This library allows other crates in the workspace to access items defined
//! inside the pilot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autopilot core - flies the craft along a resolved waypoint route
pub mod auto;

/// Localisation types - where the craft is in the world
pub mod loc;

/// External interface boundary - traits and types crossing into the host
pub mod ports;
