//! # Navigation manager module
//!
//! This module implements the [`NavMgr`] state machine, which flies the
//! craft along a resolved waypoint route. The run moves through a number of
//! phases:
//!
//! - `Idle` - No run is active, no commands are issued.
//! - `Takeoff` - A one-tick priming phase that points the craft at the
//!   first pursuit point and commands the climb-out altitude.
//! - `Cruise` - Following the route via the pursuit planner.
//! - `Landing` - The lead segment is the final segment, the approach slows
//!   and descends to the flare height.
//! - `Arrived` - Terminal hold above the destination.
//!
//! Each phase is handled by a `mode_xyz` function. The manager must be
//! ticked once per fixed physics step via [`NavMgr::proc`]; while the craft
//! is not drivable the whole tick is skipped and the run state stays
//! frozen.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub use params::Params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Vector3;
use std::fmt::Display;

// Internal
use super::{
    head_ctrl::HeadCtrl,
    path::WaypointPath,
    path_resolver::PathResolver,
    pursuit::{self, PursuitSolution},
    thrust_ctrl,
    vert_ctrl::VertCtrl,
};
use crate::loc::Pose;
use crate::ports::{GroundQuery, MotionDemand, PathCandidate, TickInput};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The navigation manager.
pub struct NavMgr {
    params: Params,

    /// Route resolution and periodic retry
    resolver: PathResolver,

    /// Downward ground probe injected by the host
    ground: Box<dyn GroundQuery>,

    /// Executing phase
    phase: Phase,

    /// The resolved, direction-corrected route for the active run. Empty
    /// while Idle.
    working_path: WaypointPath,

    /// Index of the lead segment into the working points, in
    /// [0, num_points - 2]
    waypoint_index: usize,

    /// Controller objects used to calculate the motion demands
    vert_ctrl: VertCtrl,
    head_ctrl: HeadCtrl,

    output: OutputData,
    report: StatusReport,
}

#[derive(Default, Copy, Clone, Debug)]
pub struct OutputData {
    /// Motion demand for this tick, `None` if the autopilot has nothing to
    /// command (Idle, frozen, or terminal with nothing to hold)
    pub demand: Option<MotionDemand>,
}

/// The status report summarising the manager for displays and telemetry.
#[derive(Default, Copy, Clone, Debug)]
pub struct StatusReport {
    /// Phase at the end of the tick
    pub phase: Phase,

    /// Lead segment index at the end of the tick
    pub waypoint_index: usize,

    /// The pursuit aim point, if one was computed this tick
    pub aim_point_m: Option<Vector3<f64>>,

    /// Corner speed scale from the pursuit planner
    pub corner_speed_scale: f64,

    /// Look-ahead distance from the pursuit planner
    pub look_ahead_m: f64,

    /// Smoothed altitude target, if the vertical controller ran this tick
    pub target_alt_m: Option<f64>,

    /// Altitude error against the smoothed target
    pub alt_error_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible phases of a run. Each phase is handled by a `mode_xyz`
/// function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Takeoff,
    Cruise,
    Landing,
    Arrived,
}

/// Errors that can occur when starting a run.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("Failed to load NavMgr params: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("No route could be resolved from the {0} candidates offered")]
    NoRouteAvailable(usize),

    #[error("The resolved route has fewer than 2 usable points")]
    TooFewPoints,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Takeoff => write!(f, "Takeoff"),
            Phase::Cruise => write!(f, "Cruise"),
            Phase::Landing => write!(f, "Landing"),
            Phase::Arrived => write!(f, "Arrived"),
        }
    }
}

impl NavMgr {
    /// Create a new manager from already-built parameters.
    pub fn new(params: Params, ground: Box<dyn GroundQuery>) -> Self {
        let resolver = PathResolver::new(params.path_resolver.clone());
        let vert_ctrl = VertCtrl::new(&params);

        Self {
            params,
            resolver,
            ground,
            phase: Phase::Idle,
            working_path: WaypointPath::new_empty(),
            waypoint_index: 0,
            vert_ctrl,
            head_ctrl: HeadCtrl::new(),
            output: OutputData::default(),
            report: StatusReport::default(),
        }
    }

    /// Create a new manager, loading parameters from the given file.
    pub fn init(params_path: &str, ground: Box<dyn GroundQuery>) -> Result<Self, NavError> {
        let params: Params = match util::params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(NavError::ParamLoadError(e)),
        };

        Ok(Self::new(params, ground))
    }

    /// The current phase, for displays.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True whenever a run is active (phase is anything but Idle).
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// True if every requested route has been resolved.
    pub fn routes_resolved(&self) -> bool {
        self.resolver.all_resolved()
    }

    /// Begin a forward run.
    ///
    /// Resolves (or refreshes) the forward route from the candidates and
    /// starts the run. If no route resolves the craft stays Idle and the
    /// resolver keeps retrying on its interval.
    pub fn start_forward(
        &mut self,
        candidates: &[PathCandidate],
        pose: &Pose,
    ) -> Result<(), NavError> {
        self.resolver.resolve(candidates, pose.position2());

        let path = match self.resolver.forward_path() {
            Some(p) => p.clone(),
            None => {
                warn!("StartForward: no forward route available, staying Idle");
                self.resolver.start_tracking();
                return Err(NavError::NoRouteAvailable(candidates.len()));
            }
        };

        self.begin(&path, false)
    }

    /// Begin a return run.
    ///
    /// Uses the dedicated return route if one resolves, otherwise flies the
    /// forward route's points in reverse.
    pub fn start_return(
        &mut self,
        candidates: &[PathCandidate],
        pose: &Pose,
    ) -> Result<(), NavError> {
        self.resolver.resolve(candidates, pose.position2());

        if let Some(path) = self.resolver.return_path() {
            let path = path.clone();
            return self.begin(&path, false);
        }

        match self.resolver.forward_path() {
            Some(p) => {
                let path = p.clone();
                self.begin(&path, true)
            }
            None => {
                warn!("StartReturn: no route available, staying Idle");
                self.resolver.start_tracking();
                Err(NavError::NoRouteAvailable(candidates.len()))
            }
        }
    }

    /// Cancel the run and return to Idle. Idempotent.
    pub fn stop(&mut self) {
        if self.phase != Phase::Idle {
            info!("Autopilot stopped, returning to Idle");
        }

        self.phase = Phase::Idle;
        self.working_path = WaypointPath::new_empty();
        self.waypoint_index = 0;
        self.vert_ctrl.reset();
        self.head_ctrl.reset();
        self.resolver.cancel();
    }

    /// Process one fixed tick.
    ///
    /// `candidates` is the host's current set of route candidates, used by
    /// the resolver's periodic retry. Never faults: every failure mode
    /// degrades to holding the current state.
    pub fn proc(&mut self, input: &TickInput, candidates: &[PathCandidate]) -> (OutputData, StatusReport) {
        // Setup cycle data
        self.output = OutputData::default();
        self.report = StatusReport {
            phase: self.phase,
            waypoint_index: self.waypoint_index,
            ..Default::default()
        };

        // While the craft can't accept commands the whole tick is skipped,
        // freezing the run where it is. This is expected and recoverable,
        // not a fault.
        if !input.drivable {
            return (self.output, self.report);
        }

        // Cooperative retry of any unresolved routes
        self.resolver
            .poll(input.dt_s, candidates, input.pose.position2());

        match self.phase {
            Phase::Idle => (),
            Phase::Takeoff => self.mode_takeoff(input),
            Phase::Cruise => self.mode_cruise(input),
            Phase::Landing => self.mode_landing(input),
            Phase::Arrived => self.mode_arrived(input),
        }

        self.report.phase = self.phase;
        self.report.waypoint_index = self.waypoint_index;

        (self.output, self.report)
    }

    /// Load the working route and prime the run.
    ///
    /// Aborts back to Idle without touching any controller state if fewer
    /// than 2 usable points are present. Non-finite candidate points were
    /// already dropped when the resolver built the path.
    fn begin(&mut self, path: &WaypointPath, reverse: bool) -> Result<(), NavError> {
        let path = if reverse { path.reversed() } else { path.clone() };

        if path.get_num_points() < 2 {
            warn!("Cannot begin a run on a route with fewer than 2 usable points");
            return Err(NavError::TooFewPoints);
        }

        info!(
            "Run begun: {} waypoints over {:.1} m ({})",
            path.get_num_points(),
            path.get_length().unwrap_or(0.0),
            if reverse { "reversed" } else { "forward" }
        );

        self.working_path = path;
        self.waypoint_index = 0;
        self.vert_ctrl.reset();
        self.head_ctrl.reset();
        self.set_phase(Phase::Takeoff);

        Ok(())
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            info!("NavMgr phase change to: {}", phase);
            self.phase = phase;
        }
    }

    /// Mode takeoff.
    ///
    /// A one-tick altitude-priming phase: the climb-out target is commanded
    /// and the craft starts moving towards the first pursuit point, then
    /// the run transitions straight into Cruise. The transition is
    /// deliberately not gated on the altitude actually being reached.
    fn mode_takeoff(&mut self, input: &TickInput) {
        let first = self.working_path.points_m[0];
        let second = self.working_path.points_m[1];

        self.steer(input);

        let raw_target_m = if self.params.cruise_height_m > 0.0 {
            (first[2] + self.params.cruise_height_m)
                .max(first[2] + self.params.hover_height_m + 1.0)
        } else {
            input.pose.altitude_m().max(second[2])
        };
        self.command_altitude(input, raw_target_m);

        self.set_phase(Phase::Cruise);
    }

    /// Mode cruise.
    ///
    /// Pursuit-follow the route. Hands over to Landing once the lead
    /// segment is the final segment.
    fn mode_cruise(&mut self, input: &TickInput) {
        let plan = self.steer(input);

        let first = self.working_path.points_m[0];
        let raw_target_m = if self.params.follow_waypoint_altitude {
            plan.aim_point_m[2]
        } else {
            plan.aim_point_m[2].max(first[2] + self.params.cruise_height_m)
        };
        self.command_altitude(input, raw_target_m);

        if self.waypoint_index >= self.working_path.get_num_points() - 2 {
            self.set_phase(Phase::Landing);
        }
    }

    /// Mode landing.
    ///
    /// Slowed approach descending to the flare height. Completes once the
    /// craft is horizontally within the arrival radius of the final point.
    fn mode_landing(&mut self, input: &TickInput) {
        let final_m = match self.working_path.points_m.last() {
            Some(p) => *p,
            None => return,
        };

        let flat_dist_m = (input.pose.position2() - final_m.xy()).norm();
        if flat_dist_m <= self.params.arrival_radius_m {
            self.set_phase(Phase::Arrived);

            if !self.params.hover_at_destination {
                // Kill the remaining approach velocity on arrival
                self.output.demand = Some(MotionDemand {
                    halt: true,
                    ..Default::default()
                });
            }
            return;
        }

        self.steer(input);

        let raw_target_m =
            final_m[2] + self.params.flare_height_m.max(self.params.hover_height_m);
        self.command_altitude(input, raw_target_m);
    }

    /// Mode arrived.
    ///
    /// Terminal hold: keep commanding the hover altitude above the
    /// destination, no horizontal demands.
    fn mode_arrived(&mut self, input: &TickInput) {
        let final_m = match self.working_path.points_m.last() {
            Some(p) => *p,
            None => return,
        };

        self.command_altitude(input, final_m[2] + self.params.hover_height_m);
    }

    /// Run the pursuit planner and issue the heading and thrust demands.
    fn steer(&mut self, input: &TickInput) -> PursuitSolution {
        let flat_vel = input.velocity_ms.xy();

        let plan = pursuit::plan(
            input.pose.position_m,
            flat_vel.norm(),
            &self.working_path,
            self.waypoint_index,
            &self.params,
        );
        self.waypoint_index = plan.index;

        let mut demand = self.output.demand.take().unwrap_or_default();

        if let Some((yaw_rad, bank_rad)) =
            self.head_ctrl
                .step(&input.pose, plan.aim_point_m, input.dt_s, &self.params)
        {
            demand.yaw_rad = Some(yaw_rad);
            demand.bank_rad = Some(bank_rad);
        }

        // The landing slow-down keys off the distance to the last working
        // point. `steer` is only called with at least 2 points loaded.
        let flat_dist_to_final_m = match self.working_path.points_m.last() {
            Some(p) => (input.pose.position2() - p.xy()).norm(),
            None => 0.0,
        };

        demand.accel_mss = Some(thrust_ctrl::accel_demand(
            self.phase,
            input.pose.position2(),
            flat_vel,
            plan.aim_point_m.xy(),
            plan.corner_speed_scale,
            flat_dist_to_final_m,
            &self.params,
        ));

        self.output.demand = Some(demand);

        self.report.aim_point_m = Some(plan.aim_point_m);
        self.report.corner_speed_scale = plan.corner_speed_scale;
        self.report.look_ahead_m = plan.look_ahead_m;

        plan
    }

    /// Step the vertical controller and issue the vertical velocity demand.
    fn command_altitude(&mut self, input: &TickInput, raw_target_m: f64) {
        let ground_hit_m = self
            .ground
            .probe_down(input.pose.position_m, self.params.ground_probe_range_m);

        let vert_vel_ms = self.vert_ctrl.step(
            raw_target_m,
            input.pose.altitude_m(),
            input.velocity_ms[2],
            ground_hit_m,
            input.dt_s,
            &self.params,
        );

        let mut demand = self.output.demand.take().unwrap_or_default();
        demand.vert_vel_ms = Some(vert_vel_ms);
        self.output.demand = Some(demand);

        self.report.target_alt_m = self.vert_ctrl.smoothed_target_m();
        self.report.alt_error_m = match self.report.target_alt_m {
            Some(t) => t - input.pose.altitude_m(),
            None => 0.0,
        };
    }
}
