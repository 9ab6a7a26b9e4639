//! Navigation manager parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the navigation manager and the controllers it drives.
///
/// All values are read-only during a run.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Desired horizontal cruise speed
    pub cruise_speed_ms: f64,

    /// Cruise height above the first route point. Zero or negative means
    /// "fly the route's own altitude profile" during takeoff.
    pub cruise_height_m: f64,

    /// Safe clearance to hold above the ground and above the destination
    pub hover_height_m: f64,

    /// Horizontal distance to the final point at which the run is complete
    pub arrival_radius_m: f64,

    /// Maximum yaw rate in degrees per second
    pub yaw_rate_degs: f64,

    /// Limit on the cosmetic bank angle in degrees
    pub bank_limit_deg: f64,

    /// Vertical controller proportional gain
    pub vert_k_p: f64,

    /// Vertical controller integral gain
    pub vert_k_i: f64,

    /// Vertical controller derivative gain
    pub vert_k_d: f64,

    /// Saturation limit on the vertical velocity demand
    pub max_vert_speed_ms: f64,

    /// Look-ahead distance at standstill
    pub look_ahead_min_m: f64,

    /// Look-ahead distance at cruise speed and above
    pub look_ahead_max_m: f64,

    /// How strongly speed blends the look-ahead between its min and max.
    /// 1 gives the full blend, 0 pins the look-ahead at the minimum.
    pub look_ahead_speed_blend: f64,

    /// How far before a corner the slowdown starts to apply
    pub corner_preview_m: f64,

    /// Speed scale for a 90 degree (or sharper) corner
    pub corner_min_speed_scale: f64,

    /// Distance to the destination inside which the landing approach slows
    pub slow_radius_m: f64,

    /// Creep speed held at the very end of the landing approach
    pub approach_speed_ms: f64,

    /// Target height above the destination during the final approach,
    /// prior to ground snap
    pub flare_height_m: f64,

    /// Altitude target smoothing factor, expressed at a 60 Hz reference
    /// tick rate. 1 follows the raw target immediately (no smoothing),
    /// values towards 0 respond ever more slowly, and 0 freezes the target
    /// at its primed value.
    pub alt_smooth_factor: f64,

    /// Limit on how fast the smoothed altitude target may move, in m/s.
    /// Zero or negative disables the limit.
    pub max_alt_rate_ms: f64,

    /// Range of the downward ground probe
    pub ground_probe_range_m: f64,

    /// Gain applied to the horizontal velocity error to form the
    /// acceleration demand
    pub accel_gain: f64,

    /// If true cruise tracks the route's own altitude profile instead of
    /// flooring it at the cruise height
    pub follow_waypoint_altitude: bool,

    /// If true the craft keeps station above the destination instead of
    /// halting on arrival
    pub hover_at_destination: bool,

    /// Path resolver parameters
    pub path_resolver: crate::auto::path_resolver::Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            cruise_speed_ms: 10.0,
            cruise_height_m: 15.0,
            hover_height_m: 2.0,
            arrival_radius_m: 2.0,
            yaw_rate_degs: 120.0,
            bank_limit_deg: 25.0,
            vert_k_p: 2.0,
            vert_k_i: 0.0,
            vert_k_d: 1.0,
            max_vert_speed_ms: 5.0,
            look_ahead_min_m: 2.0,
            look_ahead_max_m: 10.0,
            look_ahead_speed_blend: 1.0,
            corner_preview_m: 8.0,
            corner_min_speed_scale: 0.35,
            slow_radius_m: 10.0,
            approach_speed_ms: 4.0,
            flare_height_m: 2.5,
            alt_smooth_factor: 0.15,
            max_alt_rate_ms: 0.0,
            ground_probe_range_m: 50.0,
            accel_gain: 1.5,
            follow_waypoint_altitude: false,
            hover_at_destination: false,
            path_resolver: Default::default(),
        }
    }
}
