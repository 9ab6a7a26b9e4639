//! Main pilot executable entry point.
//!
//! # Architecture
//!
//! This executable flies the autopilot against a simple kinematic craft
//! model, standing in for the host environment that would normally own the
//! physics. The general execution methodology consists of:
//!
//!     - Initialise the session and logging
//!     - Load parameters and build the navigation manager
//!     - Main loop:
//!         - Sample the craft state into the tick input
//!         - Navigation manager processing
//!         - Apply the motion demands to the craft model
//!         - Cycle management
//!
//! The craft flies the demo route out, then back, then the executable ends.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use pilot_lib::{
    auto::nav_mgr::{NavMgr, Params, Phase},
    loc::Pose,
    ports::{GroundQuery, MotionDemand, PathCandidate, TickInput},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use nalgebra::{Vector2, Vector3};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Limit on the number of cycles a single leg may take before the run is
/// declared stuck and the executable exits.
const MAX_CYCLES_PER_LEG: u64 = 10000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flat ground at a fixed height, standing in for the host's ray probe.
struct FlatGround {
    height_m: f64,
}

/// Kinematic point-mass craft model used in place of the host's physics.
struct Craft {
    pose: Pose,
    velocity_ms: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("pilot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Pilot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    let ground = Box::new(FlatGround { height_m: 0.0 });

    // Fall back on the built-in parameters if the file isn't available, so
    // the demo runs without a deployed params directory
    let mut nav_mgr = match NavMgr::init("nav_mgr.toml", ground) {
        Ok(n) => n,
        Err(e) => {
            warn!("Could not load NavMgr params ({}), using defaults", e);
            NavMgr::new(
                Params::default(),
                Box::new(FlatGround { height_m: 0.0 }),
            )
        }
    };

    info!("NavMgr init complete\n");

    // ---- DEMO SCENE ----

    let candidates = demo_candidates();
    let mut craft = Craft {
        pose: Pose::default(),
        velocity_ms: Vector3::zeros(),
    };

    info!("Flying {} candidate route(s)", candidates.len());

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    nav_mgr
        .start_forward(&candidates, &craft.pose)
        .wrap_err("Could not start the forward run")?;

    let mut returning = false;
    let mut num_cycles: u64 = 0;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let tick_input = TickInput {
            dt_s: CYCLE_PERIOD_S,
            pose: craft.pose,
            velocity_ms: craft.velocity_ms,
            drivable: true,
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (output, report) = nav_mgr.proc(&tick_input, &candidates);

        if let Some(demand) = output.demand {
            craft.apply(&demand, CYCLE_PERIOD_S);
        }

        // Progress report on the 1 Hz
        if num_cycles % 10 == 0 {
            info!(
                "[{}] wp {} pos ({:7.2}, {:7.2}, {:6.2}) spd {:5.2} m/s scale {:.2}",
                report.phase,
                report.waypoint_index,
                craft.pose.position_m[0],
                craft.pose.position_m[1],
                craft.pose.position_m[2],
                craft.velocity_ms.xy().norm(),
                report.corner_speed_scale,
            );
        }

        // ---- LEG MANAGEMENT ----

        if report.phase == Phase::Arrived {
            if returning {
                info!("Return leg complete, stopping");
                nav_mgr.stop();
                break;
            }

            info!("Forward leg complete, turning for home\n");
            nav_mgr
                .start_return(&candidates, &craft.pose)
                .wrap_err("Could not start the return run")?;
            returning = true;
            num_cycles = 0;
        }

        num_cycles += 1;
        if num_cycles > MAX_CYCLES_PER_LEG {
            warn!("Leg did not complete within {} cycles", MAX_CYCLES_PER_LEG);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}

/// Build the demo route candidate set.
///
/// A single dog-leg route climbing gently away from the origin. The second
/// candidate is a decoy far from the craft, exercising the resolver's
/// nearest-start scoring.
fn demo_candidates() -> Vec<PathCandidate> {
    vec![
        PathCandidate {
            name: String::from("ridge transit"),
            tag: String::from("flight"),
            points_m: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(60.0, 0.0, 5.0),
                Vector3::new(60.0, 80.0, 10.0),
                Vector3::new(120.0, 80.0, 10.0),
            ],
        },
        PathCandidate {
            name: String::from("valley decoy"),
            tag: String::from("flight"),
            points_m: vec![
                Vector3::new(500.0, 500.0, 0.0),
                Vector3::new(600.0, 500.0, 0.0),
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GroundQuery for FlatGround {
    fn probe_down(&self, from_m: Vector3<f64>, max_range_m: f64) -> Option<f64> {
        if from_m[2] - self.height_m <= max_range_m {
            Some(self.height_m)
        } else {
            None
        }
    }
}

impl Craft {
    /// Apply one tick's motion demands to the craft model.
    ///
    /// Horizontal acceleration integrates into the velocity, the vertical
    /// velocity demand is taken directly, and yaw snaps to the (already rate
    /// limited) demand.
    fn apply(&mut self, demand: &MotionDemand, dt_s: f64) {
        if demand.halt {
            self.velocity_ms = Vector3::zeros();
        }

        if let Some(accel_mss) = demand.accel_mss {
            let dv: Vector2<f64> = accel_mss * dt_s;
            self.velocity_ms[0] += dv[0];
            self.velocity_ms[1] += dv[1];
        }

        if let Some(vert_vel_ms) = demand.vert_vel_ms {
            self.velocity_ms[2] = vert_vel_ms;
        }

        if let Some(yaw_rad) = demand.yaw_rad {
            self.pose.yaw_rad = yaw_rad;
        }

        self.pose.position_m += self.velocity_ms * dt_s;
    }
}
