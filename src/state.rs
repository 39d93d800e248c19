use crate::drawing::Mode;
use crate::obstacles::ObstacleRegistry;
use crate::playback::{PlaybackStatus, SimState};
use crate::stats::PlanStats;
use crate::vertex::{Point, RobotPose, Waypoint};
use crate::view::ViewTransform;

/// Borrowed view of everything a renderer draws
pub struct Scene<'a> {
    pub view: &'a ViewTransform,
    pub mode: Mode,
    pub boundary: Option<&'a [Point]>,
    pub obstacles: &'a ObstacleRegistry,
    /// Vertices of the polygon being drawn
    pub buffer: &'a [Point],
    pub path: &'a [Waypoint],
    pub robot: Option<RobotPose>,
    pub sim: SimState,
    pub playback: PlaybackStatus,
    pub speed: f64,
    pub stats: &'a PlanStats,
    pub units_per_meter: f64,
    pub message: &'a str,
}

/// Front-end only flags
#[derive(Clone, Debug, Default)]
pub struct UiState {
    /// Show the debug overlay
    pub debug: bool,
    /// Show the key help panel
    pub help: bool,
    pub quit: bool,
    /// Last pointer position in screen units
    pub pointer: Option<Point>,
}
