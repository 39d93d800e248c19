use tracing::debug;

use crate::obstacles::ObstacleKind;
use crate::vertex::Point;

/// Minimum number of vertices a committed polygon carries
pub const MIN_POLYGON_VERTICES: usize = 3;

/// What the operator is currently drawing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Ready,
    DrawingBoundary,
    DrawingObstacle,
    DrawingDynamicObstacle,
}

impl Mode {
    pub fn is_drawing(self) -> bool {
        self != Mode::Ready
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Ready => "Ready",
            Mode::DrawingBoundary => "Drawing boundary",
            Mode::DrawingObstacle => "Drawing obstacle",
            Mode::DrawingDynamicObstacle => "Drawing dynamic obstacle",
        }
    }
}

/// Polygon the drawing target produces once committed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawTarget {
    Boundary,
    Obstacle(ObstacleKind),
}

impl DrawTarget {
    fn mode(self) -> Mode {
        match self {
            DrawTarget::Boundary => Mode::DrawingBoundary,
            DrawTarget::Obstacle(ObstacleKind::Static) => Mode::DrawingObstacle,
            DrawTarget::Obstacle(ObstacleKind::Dynamic) => Mode::DrawingDynamicObstacle,
        }
    }

    fn of(mode: Mode) -> Option<DrawTarget> {
        match mode {
            Mode::Ready => None,
            Mode::DrawingBoundary => Some(DrawTarget::Boundary),
            Mode::DrawingObstacle => Some(DrawTarget::Obstacle(ObstacleKind::Static)),
            Mode::DrawingDynamicObstacle => Some(DrawTarget::Obstacle(ObstacleKind::Dynamic)),
        }
    }
}

/// Operator input understood by the drawing machine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawCommand {
    Start(DrawTarget),
    PlacePoint(Point),
    UndoPoint,
    Finish,
    Cancel,
}

/// Result of feeding one [`DrawCommand`] to the machine
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOutcome {
    /// Command does not apply in the current mode
    Ignored,
    Started(DrawTarget),
    PointPlaced { count: usize },
    PointRemoved { count: usize },
    /// Buffer became a polygon; the caller stores it
    Committed { target: DrawTarget, points: Vec<Point> },
    /// Buffer dropped without producing a polygon
    Discarded { target: DrawTarget, count: usize },
}

/// Mode plus the vertices placed since the drawing started
#[derive(Debug, Default)]
pub struct DrawingMachine {
    mode: Mode,
    buffer: Vec<Point>,
}

impl DrawingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &[Point] {
        &self.buffer
    }

    pub fn apply(&mut self, command: DrawCommand) -> DrawOutcome {
        let outcome = match (DrawTarget::of(self.mode), command) {
            (current, DrawCommand::Start(target)) => {
                if let Some(previous) = current {
                    if !self.buffer.is_empty() {
                        debug!(?previous, count = self.buffer.len(), "drawing switched, buffer dropped");
                    }
                }
                self.buffer.clear();
                self.mode = target.mode();
                DrawOutcome::Started(target)
            }
            (None, _) => DrawOutcome::Ignored,
            (Some(_), DrawCommand::PlacePoint(point)) => {
                self.buffer.push(point);
                DrawOutcome::PointPlaced {
                    count: self.buffer.len(),
                }
            }
            (Some(_), DrawCommand::UndoPoint) => match self.buffer.pop() {
                Some(_) => DrawOutcome::PointRemoved {
                    count: self.buffer.len(),
                },
                None => DrawOutcome::Ignored,
            },
            (Some(target), DrawCommand::Finish) => {
                let points = self.leave();
                if points.len() >= MIN_POLYGON_VERTICES {
                    DrawOutcome::Committed { target, points }
                } else {
                    DrawOutcome::Discarded {
                        target,
                        count: points.len(),
                    }
                }
            }
            (Some(target), DrawCommand::Cancel) => {
                let points = self.leave();
                DrawOutcome::Discarded {
                    target,
                    count: points.len(),
                }
            }
        };

        debug_assert!(self.mode.is_drawing() || self.buffer.is_empty());
        outcome
    }

    pub fn start(&mut self, target: DrawTarget) -> DrawOutcome {
        self.apply(DrawCommand::Start(target))
    }

    pub fn place_point(&mut self, point: Point) -> DrawOutcome {
        self.apply(DrawCommand::PlacePoint(point))
    }

    pub fn undo_point(&mut self) -> DrawOutcome {
        self.apply(DrawCommand::UndoPoint)
    }

    pub fn finish(&mut self) -> DrawOutcome {
        self.apply(DrawCommand::Finish)
    }

    pub fn cancel(&mut self) -> DrawOutcome {
        self.apply(DrawCommand::Cancel)
    }

    /// Returns to `Ready`, handing back whatever was buffered
    fn leave(&mut self) -> Vec<Point> {
        self.mode = Mode::Ready;
        std::mem::take(&mut self.buffer)
    }
}
