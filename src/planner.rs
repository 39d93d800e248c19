use tracing::{debug, warn};

use crate::math::Bounds;
use crate::obstacles::Obstacle;
use crate::vertex::{Point, Waypoint};

/// Default distance between neighbouring stripes, in world units
pub const DEFAULT_STRIPE_SPACING: f64 = 25.0;

/// Upper bound on scanlines per path; larger areas yield no path
pub const MAX_STRIPES: usize = 100_000;

const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Produces a coverage path for a boundary and the obstacles it must avoid.
///
/// Implementations return an empty path when they cannot cover the area; the
/// editor reports that as "no path available" rather than as a failure.
pub trait PathGenerator {
    fn generate(&self, boundary: &[Point], obstacles: &[Obstacle]) -> Vec<Waypoint>;
}

/// Back-and-forth horizontal stripes at a fixed spacing
#[derive(Clone, Copy, Debug)]
pub struct StripeGenerator {
    pub spacing: f64,
}

impl Default for StripeGenerator {
    fn default() -> Self {
        StripeGenerator {
            spacing: DEFAULT_STRIPE_SPACING,
        }
    }
}

impl StripeGenerator {
    pub fn new(spacing: f64) -> Self {
        StripeGenerator { spacing }
    }
}

impl PathGenerator for StripeGenerator {
    fn generate(&self, boundary: &[Point], obstacles: &[Obstacle]) -> Vec<Waypoint> {
        if boundary.len() < 3 || !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Vec::new();
        }
        let Some(bounds) = Bounds::of(boundary) else {
            return Vec::new();
        };

        let stripes = (bounds.height() / self.spacing).ceil();
        if !(stripes.is_finite() && stripes <= MAX_STRIPES as f64) {
            warn!(stripes, spacing = self.spacing, "too many stripes, no path generated");
            return Vec::new();
        }

        let mut points = Vec::new();
        let mut forward = true;
        let mut previous_y = f64::NEG_INFINITY;
        for k in 0..stripes as usize {
            let y = bounds.min.y + self.spacing * (k as f64 + 0.5);
            if y >= bounds.max.y {
                break;
            }
            if y <= previous_y {
                warn!(y, spacing = self.spacing, "stripe spacing below coordinate precision");
                return Vec::new();
            }
            previous_y = y;

            let mut free = intervals(scanline_intersect(boundary, y));
            for obstacle in obstacles {
                for blocked in intervals(scanline_intersect(&obstacle.points, y)) {
                    free = subtract(free, blocked);
                }
            }

            if !free.is_empty() {
                if !forward {
                    free.reverse();
                }
                for (x0, x1) in free {
                    let (start, end) = if forward { (x0, x1) } else { (x1, x0) };
                    points.push(Point::new(start, y));
                    points.push(Point::new(end, y));
                }
                forward = !forward;
            }
        }

        debug!(
            spacing = self.spacing,
            waypoints = points.len(),
            obstacles = obstacles.len(),
            "stripe path generated"
        );
        with_headings(&points)
    }
}

/// Attaches to every point the heading towards its successor; the last point
/// keeps the heading of the segment that reached it.
pub fn with_headings(points: &[Point]) -> Vec<Waypoint> {
    let mut heading = 0.0;
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            if let Some(next) = points.get(i + 1) {
                heading = point.heading_to(*next);
            }
            Waypoint::new(point.x, point.y, heading)
        })
        .collect()
}

/// X coordinates where the horizontal line at `y` crosses polygon edges, sorted
fn scanline_intersect(polygon: &[Point], y: f64) -> Vec<f64> {
    let n = polygon.len();
    if n < 3 {
        return Vec::new();
    }
    let mut xs = Vec::new();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
            let t = (y - a.y) / (b.y - a.y);
            xs.push(a.x + t * (b.x - a.x));
        }
    }
    xs.sort_by(f64::total_cmp);
    xs
}

fn intervals(xs: Vec<f64>) -> Vec<(f64, f64)> {
    xs.chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(x0, x1)| x1 - x0 > MIN_SEGMENT_LENGTH)
        .collect()
}

fn subtract(free: Vec<(f64, f64)>, (b0, b1): (f64, f64)) -> Vec<(f64, f64)> {
    let mut result = Vec::with_capacity(free.len() + 1);
    for (x0, x1) in free {
        if b1 <= x0 || b0 >= x1 {
            result.push((x0, x1));
            continue;
        }
        if b0 - x0 > MIN_SEGMENT_LENGTH {
            result.push((x0, b0));
        }
        if x1 - b1 > MIN_SEGMENT_LENGTH {
            result.push((b1, x1));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point_in_polygon;
    use crate::obstacles::{ObstacleKind, ObstacleRegistry};

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn stripes_alternate_direction() {
        let path = StripeGenerator::new(25.0).generate(&square(0.0, 0.0, 100.0), &[]);
        assert_eq!(path.len(), 8);
        assert_eq!(path[0].position(), Point::new(0.0, 12.5));
        assert_eq!(path[1].position(), Point::new(100.0, 12.5));
        assert_eq!(path[2].position(), Point::new(100.0, 37.5));
        assert_eq!(path[3].position(), Point::new(0.0, 37.5));
        assert_eq!(path[0].heading, 0.0);
        assert!((path[2].heading - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn stripes_skip_obstacle_interiors() {
        let mut registry = ObstacleRegistry::new();
        registry.add(square(40.0, 0.0, 20.0), ObstacleKind::Static);
        let obstacle = registry.static_obstacles()[0].clone();

        let path = StripeGenerator::new(10.0).generate(&square(0.0, 0.0, 100.0), &[obstacle.clone()]);
        assert!(!path.is_empty());
        for pair in path.chunks_exact(2) {
            let mid = Point::new((pair[0].x + pair[1].x) / 2.0, pair[0].y);
            if pair[0].y == pair[1].y {
                assert!(!point_in_polygon(mid, &obstacle.points), "segment crosses obstacle at {mid:?}");
            }
        }
    }

    #[test]
    fn degenerate_inputs_produce_empty_paths() {
        let generator = StripeGenerator::new(10.0);
        assert!(generator.generate(&[Point::ZERO, Point::new(1.0, 1.0)], &[]).is_empty());
        assert!(StripeGenerator::new(0.0).generate(&square(0.0, 0.0, 50.0), &[]).is_empty());
    }

    #[test]
    fn fully_blocked_boundary_yields_no_path() {
        let mut registry = ObstacleRegistry::new();
        registry.add(square(-10.0, -10.0, 120.0), ObstacleKind::Static);
        let path = StripeGenerator::new(10.0)
            .generate(&square(0.0, 0.0, 100.0), registry.static_obstacles());
        assert!(path.is_empty());
    }

    #[test]
    fn headings_point_to_successor() {
        let waypoints = with_headings(&[Point::new(0.0, 0.0), Point::new(0.0, 10.0)]);
        assert!((waypoints[0].heading - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(waypoints[1].heading, waypoints[0].heading);
    }

    #[test]
    fn stripes_stop_when_coordinates_lose_precision() {
        let boundary = [
            Point::new(0.0, 1e18),
            Point::new(1000.0, 1e18),
            Point::new(0.0, 1e18 + 2048.0),
        ];
        assert!(StripeGenerator::new(25.0).generate(&boundary, &[]).is_empty());
    }

    #[test]
    fn stripe_count_is_capped() {
        let boundary = square(0.0, 0.0, 1e9);
        assert!(StripeGenerator::new(1.0).generate(&boundary, &[]).is_empty());
        let path = StripeGenerator::new(1e9 / MAX_STRIPES as f64).generate(&boundary, &[]);
        assert_eq!(path.len(), 2 * MAX_STRIPES);
    }
}
