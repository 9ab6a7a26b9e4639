//! # Path
//!
//! This module defines the waypoint path flown by the autopilot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector3};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path defining the desired route of the craft.
///
/// Points are anchor positions in the Nav Frame (X/Y horizontal, Z up).
/// Paths are read-only once built - the autopilot copies them into its own
/// working point list rather than mutating them.
#[derive(Clone, Serialize, Debug)]
pub struct WaypointPath {
    pub points_m: Vec<Vector3<f64>>,
}

/// A segment between two path points
#[derive(Debug, Clone, Copy)]
pub struct PathSegment {
    /// The start point of the segment
    pub start_m: Vector3<f64>,

    /// The target of the segment
    pub target_m: Vector3<f64>,

    /// The length of the segment in 3D
    pub length_m: f64,

    /// The length of the segment projected onto the horizontal plane
    pub flat_length_m: f64,

    /// The heading (angle to the +ve x axis) of the segment
    pub heading_rad: f64,

    /// Unit vector pointing in the horizontal direction of the segment.
    /// For a vertical segment this is zero.
    pub direction2: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointPath {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        WaypointPath {
            points_m: Vec::new(),
        }
    }

    /// Build a path from raw anchor points, dropping any point with a
    /// non-finite component.
    pub fn from_points(points_m: &[Vector3<f64>]) -> Self {
        WaypointPath {
            points_m: points_m
                .iter()
                .filter(|p| p.iter().all(|c| c.is_finite()))
                .copied()
                .collect(),
        }
    }

    /// Return a copy of this path with the point order reversed.
    pub fn reversed(&self) -> Self {
        let mut points_m = self.points_m.clone();
        points_m.reverse();
        WaypointPath { points_m }
    }

    /// Returns the path segment connecting the target point and the previous
    /// point.
    ///
    /// If no segment exists (the target is the first point in the sequence or
    /// is beyond the end of the sequence) then `None` will be returned
    pub fn get_segment_to_target(&self, target_index: usize) -> Option<PathSegment> {
        // If the path is invalid (not enough points)
        if self.points_m.len() < 2 {
            return None;
        }

        // Catch invalid targets
        if target_index == 0 || target_index >= self.points_m.len() {
            return None;
        }

        let start_m = self.points_m[target_index - 1];
        let target_m = self.points_m[target_index];

        let diff = target_m - start_m;
        let length_m = diff.norm();
        let flat = diff.xy();
        let flat_length_m = flat.norm();

        // Heading follows the horizontal projection. A purely vertical
        // segment has no meaningful heading, leave it at zero along with the
        // direction vector.
        let (heading_rad, direction2) = if flat_length_m > f64::EPSILON {
            (flat[1].atan2(flat[0]), flat / flat_length_m)
        } else {
            (0.0, Vector2::zeros())
        };

        Some(PathSegment {
            start_m,
            target_m,
            length_m,
            flat_length_m,
            heading_rad,
            direction2,
        })
    }

    /// Return the length of the path in meters.
    ///
    /// If the path is empty (not enough points) then `None` is returned.
    pub fn get_length(&self) -> Option<f64> {
        if self.points_m.len() < 2 {
            return None;
        }

        let mut length_m = 0f64;

        // Length is defined as the sum of the length of all path segments
        for i in 1..self.points_m.len() {
            length_m += (self.points_m[i] - self.points_m[i - 1]).norm();
        }

        Some(length_m)
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_segment_query() {
        let path = WaypointPath {
            points_m: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
                Vector3::new(10.0, 10.0, 5.0),
            ],
        };

        // No segment to the first point or past the end
        assert!(path.get_segment_to_target(0).is_none());
        assert!(path.get_segment_to_target(3).is_none());

        let seg = path.get_segment_to_target(1).unwrap();
        assert!((seg.length_m - 10.0).abs() < 1e-12);
        assert!((seg.flat_length_m - 10.0).abs() < 1e-12);
        assert!(seg.heading_rad.abs() < 1e-12);

        // Second segment climbs 5 m over 10 m of ground track
        let seg = path.get_segment_to_target(2).unwrap();
        assert!((seg.flat_length_m - 10.0).abs() < 1e-12);
        assert!((seg.length_m - 125f64.sqrt()).abs() < 1e-12);
        assert!((seg.heading_rad - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        assert!((path.get_length().unwrap() - (10.0 + 125f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_segment() {
        let path = WaypointPath {
            points_m: vec![Vector3::new(1.0, 1.0, 0.0), Vector3::new(1.0, 1.0, 4.0)],
        };

        let seg = path.get_segment_to_target(1).unwrap();
        assert_eq!(seg.flat_length_m, 0.0);
        assert_eq!(seg.direction2, Vector2::zeros());
        assert!((seg.length_m - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_points_drops_non_finite() {
        let path = WaypointPath::from_points(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(f64::NAN, 0.0, 0.0),
            Vector3::new(1.0, f64::INFINITY, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ]);

        assert_eq!(path.get_num_points(), 2);
        assert_eq!(path.points_m[1], Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_reversed() {
        let path = WaypointPath {
            points_m: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
            ],
        };

        let rev = path.reversed();
        assert_eq!(rev.points_m[0], Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(rev.points_m[2], Vector3::new(0.0, 0.0, 0.0));

        // Reversal must not touch the original
        assert_eq!(path.points_m[0], Vector3::new(0.0, 0.0, 0.0));
    }
}
