//! # Path resolver
//!
//! The resolver picks the best forward and return routes out of the
//! candidates offered by the host environment. Candidates are filtered by
//! optional tag, name, and radius criteria, then scored by how close their
//! representative point is to the craft. If the filters rule out every
//! candidate the full set is scored instead - over-constrained filters must
//! never leave the craft without a route that does exist.
//!
//! Resolution retries on a configurable interval as a cooperative periodic
//! task: the navigation manager polls the resolver once per tick and the
//! resolver decides whether enough time has elapsed for another attempt.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector2;
use serde::Deserialize;

// Internal
use super::path::WaypointPath;
use crate::ports::PathCandidate;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Score bonus for a candidate matching the tag filter.
const TAG_MATCH_BONUS: f64 = 10.0;

/// Score bonus for a candidate matching the name filter.
const NAME_MATCH_BONUS: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the path resolver
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Exact tag a forward route candidate should carry. `None` disables the
    /// filter.
    pub tag_filter: Option<String>,

    /// Case-insensitive substring a forward route candidate's name should
    /// contain. `None` disables the filter.
    pub name_filter: Option<String>,

    /// Tag identifying a dedicated return route. If neither this nor
    /// `return_name_filter` is set no return route is resolved and return
    /// runs fly the forward route in reverse.
    pub return_tag_filter: Option<String>,

    /// Case-insensitive substring identifying a dedicated return route.
    pub return_name_filter: Option<String>,

    /// Only consider candidates whose representative point is within this
    /// radius of the craft. `None` disables the filter.
    pub search_radius_m: Option<f64>,

    /// Time between resolution attempts while a route is missing.
    pub retry_interval_s: f64,

    /// If true the resolver keeps re-resolving on the interval even after
    /// both routes are found, tracking changes in the candidate set. If
    /// false it stops once every requested route is resolved.
    pub keep_tracking: bool,
}

/// The path resolver state.
pub struct PathResolver {
    params: Params,

    /// Resolved forward route
    forward: Option<WaypointPath>,

    /// Resolved dedicated return route
    return_route: Option<WaypointPath>,

    /// Seconds accumulated since the last resolution attempt
    timer_s: f64,

    /// True while the periodic retry task is armed
    tracking: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            tag_filter: None,
            name_filter: None,
            return_tag_filter: None,
            return_name_filter: None,
            search_radius_m: None,
            retry_interval_s: 1.0,
            keep_tracking: true,
        }
    }
}

impl Params {
    /// True if a dedicated return route has been asked for at all.
    pub fn wants_return_route(&self) -> bool {
        self.return_tag_filter.is_some() || self.return_name_filter.is_some()
    }
}

impl PathResolver {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            forward: None,
            return_route: None,
            timer_s: 0.0,
            tracking: false,
        }
    }

    /// The currently resolved forward route, if any.
    pub fn forward_path(&self) -> Option<&WaypointPath> {
        self.forward.as_ref()
    }

    /// The currently resolved dedicated return route, if any.
    pub fn return_path(&self) -> Option<&WaypointPath> {
        self.return_route.as_ref()
    }

    /// Find the best candidate for the forward or return route.
    ///
    /// Filtering never empties the result on its own: if no candidate passes
    /// the filters the full candidate set is scored instead. Returns `None`
    /// only if `candidates` itself is empty (or, for the return route, no
    /// return filters are configured).
    pub fn find_best_path<'a>(
        &self,
        candidates: &'a [PathCandidate],
        craft_pos2: Vector2<f64>,
        is_return: bool,
    ) -> Option<&'a PathCandidate> {
        let (tag_filter, name_filter) = if is_return {
            // No return filters configured means no dedicated return route
            if !self.params.wants_return_route() {
                return None;
            }
            (&self.params.return_tag_filter, &self.params.return_name_filter)
        } else {
            (&self.params.tag_filter, &self.params.name_filter)
        };

        let matches_tag = |c: &PathCandidate| match tag_filter {
            Some(tag) => c.tag == *tag,
            None => false,
        };
        let matches_name = |c: &PathCandidate| match name_filter {
            Some(name) => c.name.to_lowercase().contains(&name.to_lowercase()),
            None => false,
        };
        let in_radius = |c: &PathCandidate| match (self.params.search_radius_m, c.rep_point(is_return)) {
            (Some(radius), Some(rep)) => (rep.xy() - craft_pos2).norm_squared() <= radius * radius,
            (Some(_), None) => false,
            (None, _) => true,
        };

        // Apply the filters, each one only if configured
        let filtered: Vec<&PathCandidate> = candidates
            .iter()
            .filter(|c| tag_filter.is_none() || matches_tag(c))
            .filter(|c| name_filter.is_none() || matches_name(c))
            .filter(|c| in_radius(c))
            .collect();

        // Never report "no route" just because the filters over-constrained
        // the set - fall back to scoring everything
        let scored: Vec<&PathCandidate> = if filtered.is_empty() {
            candidates.iter().collect()
        } else {
            filtered
        };

        // Score by negative squared flat distance to the representative
        // point, with flat bonuses for filter matches. The bonuses only
        // matter in the fallback branch, where not every candidate matches.
        let mut best: Option<(&PathCandidate, f64)> = None;
        for candidate in scored {
            let rep = match candidate.rep_point(is_return) {
                Some(p) => p,
                None => continue,
            };

            let mut score = -(rep.xy() - craft_pos2).norm_squared();
            if matches_tag(candidate) {
                score += TAG_MATCH_BONUS;
            }
            if matches_name(candidate) {
                score += NAME_MATCH_BONUS;
            }

            // Strictly-greater comparison keeps the first candidate on ties
            match best {
                Some((_, best_score)) if score <= best_score => (),
                _ => best = Some((candidate, score)),
            }
        }

        best.map(|(c, _)| c)
    }

    /// Attempt to resolve every missing route right now.
    ///
    /// Returns true if all requested routes are resolved afterwards.
    pub fn resolve(&mut self, candidates: &[PathCandidate], craft_pos2: Vector2<f64>) -> bool {
        if self.forward.is_none() || self.params.keep_tracking {
            if let Some(best) = self.find_best_path(candidates, craft_pos2, false) {
                debug!("Forward route resolved to \"{}\"", best.name);
                self.forward = Some(WaypointPath::from_points(&best.points_m));
            }
        }

        if self.params.wants_return_route() && (self.return_route.is_none() || self.params.keep_tracking) {
            if let Some(best) = self.find_best_path(candidates, craft_pos2, true) {
                debug!("Return route resolved to \"{}\"", best.name);
                self.return_route = Some(WaypointPath::from_points(&best.points_m));
            }
        }

        self.all_resolved()
    }

    /// Arm the periodic retry task. The next [`PathResolver::poll`] after
    /// the retry interval elapses will attempt resolution.
    pub fn start_tracking(&mut self) {
        if !self.tracking {
            info!("Path resolver tracking started");
        }
        self.tracking = true;
        self.timer_s = 0.0;
    }

    /// Cancel the periodic retry task.
    pub fn cancel(&mut self) {
        self.tracking = false;
        self.timer_s = 0.0;
    }

    /// Drop any resolved routes, forcing a fresh resolution.
    pub fn clear(&mut self) {
        self.forward = None;
        self.return_route = None;
    }

    /// Cooperative periodic tick of the retry task.
    ///
    /// Accumulates elapsed time and attempts resolution once the retry
    /// interval has passed. Tracking stops by itself once all requested
    /// routes are resolved, unless `keep_tracking` asks for it to continue
    /// indefinitely.
    pub fn poll(&mut self, dt_s: f64, candidates: &[PathCandidate], craft_pos2: Vector2<f64>) {
        if !self.tracking {
            return;
        }

        self.timer_s += dt_s;
        if self.timer_s < self.params.retry_interval_s {
            return;
        }
        self.timer_s = 0.0;

        if self.resolve(candidates, craft_pos2) && !self.params.keep_tracking {
            self.tracking = false;
        }
    }

    /// True if every requested route has been resolved.
    pub fn all_resolved(&self) -> bool {
        self.forward.is_some() && (!self.params.wants_return_route() || self.return_route.is_some())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    fn candidate(name: &str, tag: &str, start: Vector3<f64>, end: Vector3<f64>) -> PathCandidate {
        PathCandidate {
            name: String::from(name),
            tag: String::from(tag),
            points_m: vec![start, end],
        }
    }

    fn default_resolver() -> PathResolver {
        PathResolver::new(Params::default())
    }

    #[test]
    fn test_nearest_start_wins() {
        let resolver = default_resolver();
        let candidates = vec![
            candidate(
                "far",
                "route",
                Vector3::new(100.0, 0.0, 0.0),
                Vector3::new(110.0, 0.0, 0.0),
            ),
            candidate(
                "near",
                "route",
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
            ),
        ];

        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), false)
            .unwrap();
        assert_eq!(best.name, "near");
    }

    #[test]
    fn test_return_scores_last_point() {
        let mut params = Params::default();
        params.return_tag_filter = Some(String::from("return"));
        let resolver = PathResolver::new(params);

        // Craft sits at the end of "homeward", whose last point is nearby
        let candidates = vec![
            candidate(
                "outward",
                "return",
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(100.0, 0.0, 0.0),
            ),
            candidate(
                "homeward",
                "return",
                Vector3::new(100.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
            ),
        ];

        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), true)
            .unwrap();
        assert_eq!(best.name, "homeward");
    }

    #[test]
    fn test_no_return_filters_means_no_return_route() {
        let resolver = default_resolver();
        let candidates = vec![candidate(
            "route",
            "route",
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
        )];

        assert!(resolver
            .find_best_path(&candidates, Vector2::zeros(), true)
            .is_none());
    }

    #[test]
    fn test_filter_fallback() {
        let mut params = Params::default();
        params.tag_filter = Some(String::from("no_such_tag"));
        let resolver = PathResolver::new(params);

        let candidates = vec![candidate(
            "only",
            "route",
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
        )];

        // The filter matches nothing, but a route must still come back
        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), false)
            .unwrap();
        assert_eq!(best.name, "only");
    }

    #[test]
    fn test_tag_bonus_in_fallback() {
        let mut params = Params::default();
        // Radius excludes everything, forcing the fallback branch
        params.search_radius_m = Some(0.5);
        params.tag_filter = Some(String::from("flight"));
        let resolver = PathResolver::new(params);

        // "tagged" starts slightly further away but carries the tag, which
        // is worth +10 against a distance difference of ~5 m^2
        let candidates = vec![
            candidate(
                "untagged",
                "other",
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
            ),
            candidate(
                "tagged",
                "flight",
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
            ),
        ];

        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), false)
            .unwrap();
        assert_eq!(best.name, "tagged");
    }

    #[test]
    fn test_tie_breaks_to_first() {
        let resolver = default_resolver();
        let candidates = vec![
            candidate(
                "first",
                "route",
                Vector3::new(5.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
            ),
            candidate(
                "second",
                "route",
                Vector3::new(5.0, 0.0, 0.0),
                Vector3::new(20.0, 0.0, 0.0),
            ),
        ];

        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), false)
            .unwrap();
        assert_eq!(best.name, "first");
    }

    #[test]
    fn test_name_filter_case_insensitive() {
        let mut params = Params::default();
        params.name_filter = Some(String::from("RIDGE"));
        let resolver = PathResolver::new(params);

        let candidates = vec![
            candidate(
                "valley run",
                "route",
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(10.0, 0.0, 0.0),
            ),
            candidate(
                "ridge crossing",
                "route",
                Vector3::new(50.0, 0.0, 0.0),
                Vector3::new(60.0, 0.0, 0.0),
            ),
        ];

        let best = resolver
            .find_best_path(&candidates, Vector2::zeros(), false)
            .unwrap();
        assert_eq!(best.name, "ridge crossing");
    }

    #[test]
    fn test_poll_respects_interval_and_cancel() {
        let mut params = Params::default();
        params.retry_interval_s = 0.5;
        params.keep_tracking = false;
        let mut resolver = PathResolver::new(params);
        resolver.start_tracking();

        let candidates = vec![candidate(
            "route",
            "route",
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
        )];

        // Not enough time accumulated yet
        resolver.poll(0.2, &candidates, Vector2::zeros());
        resolver.poll(0.2, &candidates, Vector2::zeros());
        assert!(resolver.forward_path().is_none());

        // Interval elapses, route resolves, tracking stops on its own
        resolver.poll(0.2, &candidates, Vector2::zeros());
        assert!(resolver.forward_path().is_some());
        assert!(!resolver.tracking);

        // Cancel is idempotent
        resolver.cancel();
        resolver.cancel();
        assert!(!resolver.tracking);
    }
}
