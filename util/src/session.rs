//! Session management
//!
//! A session is a single execution of one of the pilot software executables.
//! Each session gets its own directory under the software root, holding the
//! log file for that run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (PILOT_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        match SESSION_EPOCH.try_init_once(Utc::now) {
            Ok(_) => (),
            Err(e) => return Err(SessionError::CannotInitEpoch(e)),
        };

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Get the root directory
        let root = crate::host::get_pilot_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        // Create the session path
        let mut session_root: PathBuf = root;
        session_root.push(String::from(sessions_dir));
        session_root.push(format!("{}_{}", exec_name, timestamp));

        // Create the directory
        if let Err(e) = fs::create_dir_all(&session_root) {
            return Err(SessionError::CannotCreateDir(e));
        }

        // Log file lives at the top of the session directory
        let mut log_file_path = session_root.clone();
        log_file_path.push(format!("{}.log", exec_name));

        Ok(Self {
            session_root,
            log_file_path,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the session epoch, the UTC time at which the session started.
pub fn get_epoch() -> DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => *e,
        None => {
            // If the epoch isn't initialised (for example in unit tests which
            // don't create a session) fall back on the current time so that
            // elapsed seconds read as zero.
            Utc::now()
        }
    }
}

/// Get the number of seconds elapsed since the session epoch.
pub fn get_elapsed_seconds() -> f64 {
    let elapsed = Utc::now() - get_epoch();

    match elapsed.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => elapsed.num_milliseconds() as f64 / 1e3,
    }
}
