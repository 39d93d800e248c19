use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::point_in_polygon;
use crate::vertex::Point;

/// Session-unique obstacle identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(String);

impl ObstacleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObstacleId {
    fn from(value: &str) -> Self {
        ObstacleId(value.to_owned())
    }
}

/// Whether the path generator has to route around the obstacle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Static,
    Dynamic,
}

impl ObstacleKind {
    fn id_prefix(self) -> &'static str {
        match self {
            ObstacleKind::Static => "obstacle",
            ObstacleKind::Dynamic => "dynamic",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub points: Vec<Point>,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn contains(&self, point: Point) -> bool {
        point_in_polygon(point, &self.points)
    }
}

impl AsRef<[Point]> for Obstacle {
    fn as_ref(&self) -> &[Point] {
        &self.points
    }
}

/// Committed static and dynamic obstacles plus the single highlighted one
#[derive(Debug, Default)]
pub struct ObstacleRegistry {
    statics: Vec<Obstacle>,
    dynamics: Vec<Obstacle>,
    highlighted: Option<ObstacleId>,
    next_id: u64,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a polygon and returns its fresh id.
    ///
    /// Polygons with fewer than three vertices are rejected without side effects.
    pub fn add(&mut self, points: Vec<Point>, kind: ObstacleKind) -> Option<ObstacleId> {
        if points.len() < 3 {
            debug!(vertices = points.len(), ?kind, "rejected degenerate obstacle");
            return None;
        }

        self.next_id += 1;
        let id = ObstacleId(format!("{}-{}", kind.id_prefix(), self.next_id));
        let obstacle = Obstacle {
            id: id.clone(),
            points,
            kind,
        };
        match kind {
            ObstacleKind::Static => self.statics.push(obstacle),
            ObstacleKind::Dynamic => self.dynamics.push(obstacle),
        }
        debug!(%id, ?kind, "obstacle added");
        Some(id)
    }

    pub fn remove(&mut self, id: &ObstacleId) -> Option<Obstacle> {
        let removed = [&mut self.statics, &mut self.dynamics]
            .into_iter()
            .find_map(|list| {
                let index = list.iter().position(|obstacle| &obstacle.id == id)?;
                Some(list.remove(index))
            })?;

        if self.highlighted.as_ref() == Some(id) {
            self.highlighted = None;
        }
        debug!(%id, "obstacle removed");
        Some(removed)
    }

    /// Highlights `id`, replacing any previous highlight.
    ///
    /// Unknown ids leave the current highlight untouched.
    pub fn highlight(&mut self, id: &ObstacleId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.highlighted = Some(id.clone());
        true
    }

    pub fn clear_highlight(&mut self) {
        self.highlighted = None;
    }

    pub fn highlighted(&self) -> Option<&ObstacleId> {
        self.highlighted.as_ref()
    }

    pub fn get(&self, id: &ObstacleId) -> Option<&Obstacle> {
        self.list_all().find(|obstacle| &obstacle.id == id)
    }

    /// Static obstacles in insertion order, then dynamic ones in insertion order
    pub fn list_all(&self) -> impl Iterator<Item = &Obstacle> + '_ {
        self.statics.iter().chain(self.dynamics.iter())
    }

    pub fn static_obstacles(&self) -> &[Obstacle] {
        &self.statics
    }

    pub fn dynamic_obstacles(&self) -> &[Obstacle] {
        &self.dynamics
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.dynamics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Topmost obstacle containing `point`; dynamic ones draw above static ones
    pub fn obstacle_at(&self, point: Point) -> Option<&Obstacle> {
        self.dynamics
            .iter()
            .rev()
            .chain(self.statics.iter().rev())
            .find(|obstacle| obstacle.contains(point))
    }

    /// Id following `current` in [`list_all`](Self::list_all) order, wrapping around
    pub fn next_id_after(&self, current: Option<&ObstacleId>) -> Option<ObstacleId> {
        let ids: Vec<&ObstacleId> = self.list_all().map(|obstacle| &obstacle.id).collect();
        let next = match current.and_then(|id| ids.iter().position(|candidate| *candidate == id)) {
            Some(index) => ids.get((index + 1) % ids.len()),
            None => ids.first(),
        };
        next.map(|id| (*id).clone())
    }

    /// Drops every obstacle; the id counter keeps running
    pub fn clear(&mut self) {
        self.statics.clear();
        self.dynamics.clear();
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f64) -> Vec<Point> {
        vec![
            Point::new(offset, 0.0),
            Point::new(offset + 10.0, 0.0),
            Point::new(offset + 5.0, 8.0),
        ]
    }

    #[test]
    fn rejects_polygons_with_fewer_than_three_points() {
        let mut registry = ObstacleRegistry::new();
        let id = registry.add(vec![Point::ZERO, Point::new(1.0, 1.0)], ObstacleKind::Static);
        assert!(id.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn lists_static_before_dynamic_in_insertion_order() {
        let mut registry = ObstacleRegistry::new();
        let d1 = registry.add(triangle(0.0), ObstacleKind::Dynamic).unwrap();
        let s1 = registry.add(triangle(20.0), ObstacleKind::Static).unwrap();
        let s2 = registry.add(triangle(40.0), ObstacleKind::Static).unwrap();
        let d2 = registry.add(triangle(60.0), ObstacleKind::Dynamic).unwrap();

        let order: Vec<&ObstacleId> = registry.list_all().map(|o| &o.id).collect();
        assert_eq!(order, vec![&s1, &s2, &d1, &d2]);
        assert_eq!(registry.static_obstacles().len(), 2);
        assert_eq!(registry.dynamic_obstacles().len(), 2);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut registry = ObstacleRegistry::new();
        let first = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        registry.remove(&first);
        let second = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        assert_ne!(first, second);
        registry.clear();
        let third = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        assert_ne!(third, first);
        assert_ne!(third, second);
    }

    #[test]
    fn removing_missing_id_is_a_no_op() {
        let mut registry = ObstacleRegistry::new();
        registry.add(triangle(0.0), ObstacleKind::Static);
        assert!(registry.remove(&ObstacleId::from("obstacle-99")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn highlight_is_exclusive_and_cleared_on_removal() {
        let mut registry = ObstacleRegistry::new();
        let a = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        let b = registry.add(triangle(20.0), ObstacleKind::Dynamic).unwrap();

        assert!(registry.highlight(&a));
        assert!(registry.highlight(&b));
        assert_eq!(registry.highlighted(), Some(&b));

        assert!(!registry.highlight(&ObstacleId::from("missing")));
        assert_eq!(registry.highlighted(), Some(&b));

        registry.remove(&b);
        assert_eq!(registry.highlighted(), None);

        registry.highlight(&a);
        registry.clear_highlight();
        assert_eq!(registry.highlighted(), None);
    }

    #[test]
    fn hit_test_prefers_latest_dynamic_obstacle() {
        let mut registry = ObstacleRegistry::new();
        let below = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        let above = registry.add(triangle(0.0), ObstacleKind::Dynamic).unwrap();
        let hit = registry.obstacle_at(Point::new(5.0, 2.0)).map(|o| o.id.clone());
        assert_eq!(hit, Some(above));
        registry.remove(&hit.unwrap());
        let hit = registry.obstacle_at(Point::new(5.0, 2.0)).map(|o| o.id.clone());
        assert_eq!(hit, Some(below));
        assert!(registry.obstacle_at(Point::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn cycling_wraps_around() {
        let mut registry = ObstacleRegistry::new();
        assert_eq!(registry.next_id_after(None), None);
        let a = registry.add(triangle(0.0), ObstacleKind::Static).unwrap();
        let b = registry.add(triangle(20.0), ObstacleKind::Static).unwrap();
        assert_eq!(registry.next_id_after(None), Some(a.clone()));
        assert_eq!(registry.next_id_after(Some(&a)), Some(b.clone()));
        assert_eq!(registry.next_id_after(Some(&b)), Some(a));
    }
}
