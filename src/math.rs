use tracing::debug;

use crate::vertex::Point;

/// Default edge length of a sampling cell for [`union_area_approximate`], in world units.
///
/// Smaller cells trade time for accuracy: the estimate error is bounded by the
/// number of cells straddling polygon edges, so it shrinks with the cell size
/// but never reaches zero for edges that are not grid aligned.
pub const DEFAULT_UNION_CELL_SIZE: f64 = 5.0;

/// Signed area of a polygon using the shoelace formula
///
/// Counter-clockwise vertex order (in a y-up frame) yields a positive value.
/// Fewer than three vertices describe no surface and yield zero.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    // Relative to the first vertex so far-off polygons keep their precision
    let origin = points[0];
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i] - origin;
        let b = points[(i + 1) % n] - origin;
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Unsigned polygon area
pub fn polygon_area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Even-odd ray casting test
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Sum of segment lengths along an open polyline
pub fn path_length(points: impl IntoIterator<Item = Point>) -> f64 {
    let mut iter = points.into_iter();
    let Some(mut previous) = iter.next() else {
        return 0.0;
    };
    let mut total = 0.0;
    for point in iter {
        total += previous.distance(point);
        previous = point;
    }
    total
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Bounding box of a point set, `None` when empty
    pub fn of(points: &[Point]) -> Option<Bounds> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds {
            min: *first,
            max: *first,
        };
        for point in rest {
            bounds.include(*point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, point: Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        let mut merged = self;
        merged.include(other.min);
        merged.include(other.max);
        merged
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Most grid cells [`union_area_approximate`] samples; beyond it the cell grows
pub const MAX_UNION_SAMPLES: usize = 1_000_000;

/// Largest cell index still exactly representable as `f64`
const MAX_EXACT_INDEX: f64 = (1u64 << 52) as f64;

/// Approximate area covered by the union of several polygons
///
/// One polygon is measured exactly. For two or more, square cells of
/// `cell_size` are laid over the joint bounding box and every cell whose centre
/// lies in at least one polygon counts as covered. Only cells under some
/// polygon's own bounding box are visited, and the cell is coarsened when that
/// would still exceed [`MAX_UNION_SAMPLES`]. The result depends on the grid
/// resolution and is not an exact union.
pub fn union_area_approximate<P: AsRef<[Point]>>(polygons: &[P], cell_size: f64) -> f64 {
    let shapes: Vec<(&[Point], Bounds)> = polygons
        .iter()
        .map(AsRef::as_ref)
        .filter(|points| points.len() >= 3)
        .filter_map(|points| Bounds::of(points).map(|bounds| (points, bounds)))
        .collect();

    match shapes.as_slice() {
        [] => return 0.0,
        [(single, _)] => return polygon_area(single),
        _ => {}
    }

    debug_assert!(cell_size > 0.0, "union sampling cell size must be positive");
    let mut cell = if cell_size.is_finite() && cell_size > 0.0 {
        cell_size
    } else {
        DEFAULT_UNION_CELL_SIZE
    };

    let Some(joint) = shapes.iter().map(|(_, bounds)| *bounds).reduce(Bounds::union) else {
        return 0.0;
    };

    // Cell index range touching `lo..=hi`, inclusive
    let span = |lo: f64, hi: f64, origin: f64, cell: f64| {
        (
            ((lo - origin) / cell).floor().max(0.0),
            ((hi - origin) / cell).floor().max(0.0),
        )
    };
    let samples = |cell: f64| -> f64 {
        shapes
            .iter()
            .map(|(_, b)| {
                let (r0, r1) = span(b.min.y, b.max.y, joint.min.y, cell);
                let (c0, c1) = span(b.min.x, b.max.x, joint.min.x, cell);
                (r1 - r0 + 1.0) * (c1 - c0 + 1.0)
            })
            .sum()
    };
    for _ in 0..8 {
        let estimate = samples(cell);
        if !(estimate > MAX_UNION_SAMPLES as f64) {
            break;
        }
        cell *= (estimate / MAX_UNION_SAMPLES as f64).sqrt().max(1.5);
    }

    let spans: Vec<[f64; 4]> = shapes
        .iter()
        .map(|(_, b)| {
            let (r0, r1) = span(b.min.y, b.max.y, joint.min.y, cell);
            let (c0, c1) = span(b.min.x, b.max.x, joint.min.x, cell);
            [r0, r1, c0, c1]
        })
        .collect();
    let exact_indices = spans.iter().flatten().all(|i| *i <= MAX_EXACT_INDEX);
    if !(exact_indices && samples(cell) <= MAX_UNION_SAMPLES as f64 && cell.is_finite()) {
        // Grid cannot resolve these coordinates; overlaps are counted twice
        let sum: f64 = shapes.iter().map(|(points, _)| polygon_area(points)).sum();
        debug!(cell, sum, "union sampling out of range, summing areas");
        return sum;
    }
    let ranges: Vec<((usize, usize), (usize, usize))> = spans
        .iter()
        .map(|[r0, r1, c0, c1]| {
            (
                (*r0 as usize, *r1 as usize),
                (*c0 as usize, *c1 as usize),
            )
        })
        .collect();
    let rows = merge_spans(ranges.iter().map(|(rows, _)| *rows).collect());

    let mut covered = 0usize;
    for (first_row, last_row) in rows {
        for row in first_row..=last_row {
            let y = joint.min.y + (row as f64 + 0.5) * cell;
            let columns = merge_spans(
                ranges
                    .iter()
                    .filter(|((r0, r1), _)| (*r0..=*r1).contains(&row))
                    .map(|(_, columns)| *columns)
                    .collect(),
            );
            for (first_column, last_column) in columns {
                for column in first_column..=last_column {
                    let x = joint.min.x + (column as f64 + 0.5) * cell;
                    let centre = Point::new(x, y);
                    let hit = shapes.iter().any(|(points, b)| {
                        x >= b.min.x
                            && x <= b.max.x
                            && y >= b.min.y
                            && y <= b.max.y
                            && point_in_polygon(centre, points)
                    });
                    if hit {
                        covered += 1;
                    }
                }
            }
        }
    }

    covered as f64 * cell * cell
}

/// Sorts inclusive index spans and joins the ones that overlap or touch
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (lo, hi) in spans {
        match merged.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}
