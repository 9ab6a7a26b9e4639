//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (PILOT_SW_ROOT) is not set")]
    SwRootNotSet
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the pilot software installation.
///
/// The root is read from the `PILOT_SW_ROOT` environment variable, which
/// should point at the directory containing `params` and `sessions`.
pub fn get_pilot_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var("PILOT_SW_ROOT") {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(_) => Err(HostError::SwRootNotSet)
    }
}
