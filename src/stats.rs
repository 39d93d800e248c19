use std::time::Duration;

use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::math::{path_length, polygon_area, union_area_approximate};
use crate::obstacles::Obstacle;
use crate::planner::PathGenerator;
use crate::vertex::{Point, Waypoint};

/// Figures shown alongside the plan
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlanStats {
    pub path_length_units: f64,
    pub path_length_m: f64,
    pub coverage_area_units: f64,
    pub coverage_area_m2: f64,
    pub obstacles_area_m2: f64,
    pub useful_area_m2: f64,
    /// Boundary area over the area swept along the path; a display ratio
    pub efficiency: f64,
    pub estimated_time: Duration,
}

impl PlanStats {
    /// Estimated traversal time as `m:ss`
    pub fn eta_label(&self) -> String {
        format_eta(self.estimated_time)
    }
}

pub fn format_eta(duration: Duration) -> String {
    let total = duration.as_secs_f64().round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Presentation constants the statistics depend on
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatsParams {
    pub units_per_meter: f64,
    pub union_cell_size: f64,
    pub coverage_width_m: f64,
    pub average_speed_mps: f64,
}

impl From<&EditorConfig> for StatsParams {
    fn from(config: &EditorConfig) -> Self {
        StatsParams {
            units_per_meter: config.units_per_meter,
            union_cell_size: config.union_cell_size,
            coverage_width_m: config.coverage_width_m,
            average_speed_mps: config.average_speed_mps,
        }
    }
}

impl Default for StatsParams {
    fn default() -> Self {
        StatsParams::from(&EditorConfig::default())
    }
}

/// Result of asking the generator for a new path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanOutcome {
    Generated { waypoints: usize },
    /// The generator found no pattern; the previous path was cleared
    Empty,
}

/// Committed boundary, generated path and the statistics derived from both
#[derive(Debug, Default)]
pub struct PlanModel {
    boundary: Option<Vec<Point>>,
    path: Vec<Waypoint>,
    stats: PlanStats,
    params: StatsParams,
}

impl PlanModel {
    pub fn new(params: StatsParams) -> Self {
        PlanModel {
            params,
            ..PlanModel::default()
        }
    }

    pub fn boundary(&self) -> Option<&[Point]> {
        self.boundary.as_deref()
    }

    pub fn path(&self) -> &[Waypoint] {
        &self.path
    }

    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    pub fn params(&self) -> &StatsParams {
        &self.params
    }

    /// Replaces the boundary and drops the path planned for the old one.
    ///
    /// Fewer than three points leave the model untouched and return `false`.
    pub fn set_boundary(&mut self, points: Vec<Point>, obstacles: &[&Obstacle]) -> bool {
        if points.len() < 3 {
            return false;
        }
        info!(vertices = points.len(), "boundary committed");
        self.boundary = Some(points);
        self.path.clear();
        self.recompute(obstacles);
        true
    }

    /// Runs `generator` over the boundary and the given static obstacles.
    ///
    /// Returns `None` when no boundary is committed.
    pub fn generate(
        &mut self,
        generator: &dyn PathGenerator,
        static_obstacles: &[Obstacle],
        all_obstacles: &[&Obstacle],
    ) -> Option<PlanOutcome> {
        let boundary = self.boundary.as_deref()?;
        self.path = generator.generate(boundary, static_obstacles);
        self.recompute(all_obstacles);
        if self.path.is_empty() {
            info!("path generator returned no waypoints");
            Some(PlanOutcome::Empty)
        } else {
            info!(
                waypoints = self.path.len(),
                length_m = self.stats.path_length_m,
                "coverage path generated"
            );
            Some(PlanOutcome::Generated {
                waypoints: self.path.len(),
            })
        }
    }

    /// Installs an externally produced path, e.g. from a session snapshot
    pub fn set_path(&mut self, path: Vec<Waypoint>, obstacles: &[&Obstacle]) {
        self.path = path;
        self.recompute(obstacles);
    }

    pub fn clear(&mut self) {
        self.boundary = None;
        self.path.clear();
        self.stats = PlanStats::default();
    }

    /// Refreshes the statistics after the boundary, obstacles or path changed
    pub fn recompute(&mut self, obstacles: &[&Obstacle]) {
        self.stats = compute_stats(self.boundary.as_deref(), obstacles, &self.path, &self.params);
        debug!(stats = ?self.stats, "plan statistics recomputed");
    }
}

pub fn compute_stats(
    boundary: Option<&[Point]>,
    obstacles: &[&Obstacle],
    path: &[Waypoint],
    params: &StatsParams,
) -> PlanStats {
    let Some(boundary) = boundary else {
        return PlanStats::default();
    };

    let units_sq = params.units_per_meter * params.units_per_meter;
    let path_length_units = path_length(path.iter().map(Waypoint::position));
    let path_length_m = path_length_units / params.units_per_meter;
    let coverage_area_units = polygon_area(boundary);
    let coverage_area_m2 = coverage_area_units / units_sq;
    let polygons: Vec<&[Point]> = obstacles.iter().map(|obstacle| obstacle.points.as_slice()).collect();
    let obstacles_area_m2 = union_area_approximate(&polygons, params.union_cell_size) / units_sq;
    let useful_area_m2 = (coverage_area_m2 - obstacles_area_m2).max(0.0);

    let swept_area_m2 = path_length_m * params.coverage_width_m;
    let efficiency = if path_length_m > 0.0 && swept_area_m2 > 0.0 {
        coverage_area_m2 / swept_area_m2
    } else {
        0.0
    };
    let estimated_time = if path_length_m > 0.0 && params.average_speed_mps > 0.0 {
        // Saturates for paths too long to time
        Duration::try_from_secs_f64(path_length_m / params.average_speed_mps).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    };

    PlanStats {
        path_length_units,
        path_length_m,
        coverage_area_units,
        coverage_area_m2,
        obstacles_area_m2,
        useful_area_m2,
        efficiency,
        estimated_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::{ObstacleKind, ObstacleRegistry};
    use crate::planner::StripeGenerator;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn no_boundary_means_zero_stats() {
        let path = vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(100.0, 0.0, 0.0)];
        let stats = compute_stats(None, &[], &path, &StatsParams::default());
        assert_eq!(stats, PlanStats::default());
    }

    #[test]
    fn extreme_path_length_saturates_eta() {
        let boundary = square(0.0, 0.0, 100.0);
        let path = vec![Waypoint::new(-1e308, 0.0, 0.0), Waypoint::new(1e308, 0.0, 0.0)];
        let stats = compute_stats(Some(&boundary), &[], &path, &StatsParams::default());
        assert!(stats.path_length_units.is_infinite());
        assert_eq!(stats.estimated_time, Duration::MAX);
        assert_eq!(stats.efficiency, 0.0);
        assert!(!stats.eta_label().is_empty());
    }

    #[test]
    fn empty_path_still_reports_areas() {
        let boundary = square(0.0, 0.0, 100.0);
        let stats = compute_stats(Some(&boundary), &[], &[], &StatsParams::default());
        assert_eq!(stats.coverage_area_units, 10_000.0);
        assert_eq!(stats.coverage_area_m2, 4.0);
        assert_eq!(stats.useful_area_m2, 4.0);
        assert_eq!(stats.path_length_units, 0.0);
        assert_eq!(stats.estimated_time, Duration::ZERO);
        assert_eq!(stats.efficiency, 0.0);
    }

    #[test]
    fn straight_path_length_and_eta() {
        let boundary = square(0.0, 0.0, 100.0);
        let path = vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(100.0, 0.0, 0.0)];
        let stats = compute_stats(Some(&boundary), &[], &path, &StatsParams::default());
        assert_eq!(stats.path_length_units, 100.0);
        assert_eq!(stats.path_length_m, 2.0);
        // 2 m at 0.5 m/s
        assert_eq!(stats.estimated_time, Duration::from_secs(4));
        assert_eq!(stats.eta_label(), "0:04");
        // 4 m² boundary over 2 m × 0.5 m swept
        assert!((stats.efficiency - 4.0).abs() < 1e-12);
    }

    #[test]
    fn useful_area_never_negative() {
        let boundary = square(0.0, 0.0, 10.0);
        let mut registry = ObstacleRegistry::new();
        registry.add(square(-50.0, -50.0, 100.0), ObstacleKind::Static);
        registry.add(square(100.0, 100.0, 100.0), ObstacleKind::Dynamic);
        let obstacles: Vec<&Obstacle> = registry.list_all().collect();
        let stats = compute_stats(Some(&boundary), &obstacles, &[], &StatsParams::default());
        assert!(stats.obstacles_area_m2 > stats.coverage_area_m2);
        assert_eq!(stats.useful_area_m2, 0.0);
    }

    #[test]
    fn eta_formats_minutes_and_seconds() {
        assert_eq!(format_eta(Duration::from_secs(0)), "0:00");
        assert_eq!(format_eta(Duration::from_secs(75)), "1:15");
        assert_eq!(format_eta(Duration::from_secs(3601)), "60:01");
    }

    #[test]
    fn replacing_boundary_discards_stale_path() {
        let mut model = PlanModel::new(StatsParams::default());
        assert!(model.generate(&StripeGenerator::default(), &[], &[]).is_none());

        assert!(model.set_boundary(square(0.0, 0.0, 100.0), &[]));
        let outcome = model.generate(&StripeGenerator::default(), &[], &[]);
        assert!(matches!(outcome, Some(PlanOutcome::Generated { .. })));
        assert!(model.stats().path_length_units > 0.0);

        assert!(!model.set_boundary(vec![Point::ZERO], &[]));
        assert!(!model.path().is_empty());

        assert!(model.set_boundary(square(0.0, 0.0, 50.0), &[]));
        assert!(model.path().is_empty());
        assert_eq!(model.stats().coverage_area_units, 2_500.0);
    }
}
