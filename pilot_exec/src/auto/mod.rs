//! # Autopilot module
//!
//! This module implements the path-following autopilot which flies the craft
//! along a sequence of waypoints through takeoff, cruise, and landing. It is
//! broken down into:
//!
//! - [`path`] - the waypoint path type and segment queries.
//! - [`path_resolver`] - selection of the best forward/return route from the
//!   candidates offered by the host, with periodic retry.
//! - [`pursuit`] - the look-ahead pursuit planner producing the aim point
//!   and corner speed scale.
//! - [`vert_ctrl`] - the PID altitude controller with smoothing, rate
//!   limiting, and the ground-clearance floor.
//! - [`head_ctrl`] - rate-limited yaw steering towards the aim point plus
//!   the cosmetic bank angle.
//! - [`thrust_ctrl`] - horizontal acceleration demands towards the desired
//!   cruise speed.
//! - [`nav_mgr`] - the phase state machine orchestrating the controllers
//!   once per fixed tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod head_ctrl;
pub mod nav_mgr;
pub mod path;
pub mod path_resolver;
pub mod pursuit;
pub mod thrust_ctrl;
pub mod vert_ctrl;
