use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::drawing::{DrawOutcome, DrawTarget, DrawingMachine, Mode};
use crate::error::EditorError;
use crate::obstacles::{Obstacle, ObstacleId, ObstacleKind, ObstacleRegistry};
use crate::planner::{PathGenerator, StripeGenerator};
use crate::playback::{PlaybackController, PlaybackStatus, SimState, TickEvent};
use crate::session::SessionSnapshot;
use crate::state::Scene;
use crate::stats::{PlanModel, PlanOutcome, PlanStats, StatsParams};
use crate::vertex::{Point, RobotPose, Waypoint};
use crate::view::ViewTransform;

/// State transition announced to listeners after it happened
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    View,
    ModeChanged(Mode),
    PointPlaced { count: usize },
    BoundaryCommitted,
    ObstacleAdded(ObstacleId),
    ObstacleRemoved(ObstacleId),
    /// In-progress polygon dropped without being committed
    DrawingDiscarded,
    HighlightChanged(Option<ObstacleId>),
    PathChanged,
    Playback(PlaybackStatus),
    RobotMoved(RobotPose),
    SessionLoaded,
    Reset,
}

/// Renderer, button-state updater or anything else that follows the editor
pub trait ChangeListener {
    fn on_change(&mut self, change: &Change);
}

impl<F: FnMut(&Change)> ChangeListener for F {
    fn on_change(&mut self, change: &Change) {
        self(change)
    }
}

/// Intent-level command surface shared by every front end
pub struct Editor {
    config: EditorConfig,
    view: ViewTransform,
    drawing: DrawingMachine,
    obstacles: ObstacleRegistry,
    plan: PlanModel,
    playback: PlaybackController,
    generator: Box<dyn PathGenerator>,
    listeners: Vec<Box<dyn ChangeListener>>,
    message: String,
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let generator = Box::new(StripeGenerator::new(config.stripe_spacing));
        Editor::with_generator(config, generator)
    }

    pub fn with_generator(config: EditorConfig, generator: Box<dyn PathGenerator>) -> Self {
        Editor {
            view: ViewTransform::new(config.min_scale, config.max_scale),
            drawing: DrawingMachine::new(),
            obstacles: ObstacleRegistry::new(),
            plan: PlanModel::new(StatsParams::from(&config)),
            playback: PlaybackController::new(&config),
            generator,
            listeners: Vec::new(),
            message: String::from("Ready"),
            config,
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn mode(&self) -> Mode {
        self.drawing.mode()
    }

    pub fn buffer(&self) -> &[Point] {
        self.drawing.buffer()
    }

    pub fn boundary(&self) -> Option<&[Point]> {
        self.plan.boundary()
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    pub fn path(&self) -> &[Waypoint] {
        self.plan.path()
    }

    pub fn stats(&self) -> &PlanStats {
        self.plan.stats()
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn sim_state(&self) -> SimState {
        self.playback.state()
    }

    /// Latest operator-facing status line
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            view: &self.view,
            mode: self.drawing.mode(),
            boundary: self.plan.boundary(),
            obstacles: &self.obstacles,
            buffer: self.drawing.buffer(),
            path: self.plan.path(),
            robot: self.playback.pose(),
            sim: self.playback.state(),
            playback: self.playback.status(),
            speed: self.playback.speed(),
            stats: self.plan.stats(),
            units_per_meter: self.config.units_per_meter,
            message: &self.message,
        }
    }

    /// Begins drawing a new boundary; the committed one stays until this finishes
    pub fn start_boundary(&mut self) {
        self.start(DrawTarget::Boundary);
    }

    pub fn start_obstacle(&mut self) {
        self.start(DrawTarget::Obstacle(ObstacleKind::Static));
    }

    pub fn start_dynamic_obstacle(&mut self) {
        self.start(DrawTarget::Obstacle(ObstacleKind::Dynamic));
    }

    fn start(&mut self, target: DrawTarget) {
        let outcome = self.drawing.start(target);
        self.apply_draw_outcome(outcome);
    }

    /// Places a vertex at a pointer position given in screen coordinates
    pub fn place_point_at_screen(&mut self, screen: Point) {
        let world = self.view.screen_to_world(screen);
        self.place_point(world);
    }

    pub fn place_point(&mut self, world: Point) {
        let outcome = self.drawing.place_point(world);
        self.apply_draw_outcome(outcome);
    }

    pub fn undo_point(&mut self) {
        let outcome = self.drawing.undo_point();
        self.apply_draw_outcome(outcome);
    }

    pub fn finish_current(&mut self) {
        let outcome = self.drawing.finish();
        self.apply_draw_outcome(outcome);
    }

    pub fn cancel_current(&mut self) {
        let outcome = self.drawing.cancel();
        self.apply_draw_outcome(outcome);
    }

    fn apply_draw_outcome(&mut self, outcome: DrawOutcome) {
        match outcome {
            DrawOutcome::Ignored => {}
            DrawOutcome::Started(target) => {
                self.message = match target {
                    DrawTarget::Boundary => "Click to place boundary points, Enter to finish".into(),
                    DrawTarget::Obstacle(ObstacleKind::Static) => {
                        "Click to place obstacle points, Enter to finish".into()
                    }
                    DrawTarget::Obstacle(ObstacleKind::Dynamic) => {
                        "Click to place dynamic obstacle points, Enter to finish".into()
                    }
                };
                self.notify(Change::ModeChanged(self.drawing.mode()));
            }
            DrawOutcome::PointPlaced { count } | DrawOutcome::PointRemoved { count } => {
                self.message = format!("{}: {count} point(s)", self.drawing.mode().label());
                self.notify(Change::PointPlaced { count });
            }
            DrawOutcome::Committed { target, points } => {
                match target {
                    DrawTarget::Boundary => self.commit_boundary(points),
                    DrawTarget::Obstacle(kind) => {
                        self.add_obstacle(points, kind);
                    }
                }
                self.notify(Change::ModeChanged(Mode::Ready));
            }
            DrawOutcome::Discarded { target, count } => {
                debug!(?target, count, "in-progress polygon discarded");
                self.message = "Drawing discarded".into();
                self.notify(Change::DrawingDiscarded);
                self.notify(Change::ModeChanged(Mode::Ready));
            }
        }
    }

    fn commit_boundary(&mut self, points: Vec<Point>) {
        let had_path = !self.plan.path().is_empty();
        let obstacles: Vec<&Obstacle> = self.obstacles.list_all().collect();
        if self.plan.set_boundary(points, &obstacles) {
            if had_path {
                self.playback.reset();
                self.notify(Change::PathChanged);
            }
            self.message = format!(
                "Boundary set: {:.2} m²",
                self.plan.stats().coverage_area_m2
            );
            self.notify(Change::BoundaryCommitted);
        }
    }

    /// Adds an obstacle directly, bypassing the drawing buffer
    pub fn add_obstacle(&mut self, points: Vec<Point>, kind: ObstacleKind) -> Option<ObstacleId> {
        let id = self.obstacles.add(points, kind)?;
        self.refresh_stats();
        self.message = match kind {
            ObstacleKind::Static => format!("Obstacle {id} added"),
            ObstacleKind::Dynamic => format!("Dynamic obstacle {id} added"),
        };
        self.notify(Change::ObstacleAdded(id.clone()));
        Some(id)
    }

    pub fn remove_obstacle(&mut self, id: &ObstacleId) -> bool {
        let was_highlighted = self.obstacles.highlighted() == Some(id);
        if self.obstacles.remove(id).is_none() {
            return false;
        }
        self.refresh_stats();
        self.message = format!("Obstacle {id} removed");
        self.notify(Change::ObstacleRemoved(id.clone()));
        if was_highlighted {
            self.notify(Change::HighlightChanged(None));
        }
        true
    }

    pub fn remove_highlighted(&mut self) -> bool {
        match self.obstacles.highlighted().cloned() {
            Some(id) => self.remove_obstacle(&id),
            None => false,
        }
    }

    pub fn highlight_obstacle(&mut self, id: &ObstacleId) -> bool {
        if !self.obstacles.highlight(id) {
            return false;
        }
        self.message = format!("Selected {id}");
        self.notify(Change::HighlightChanged(Some(id.clone())));
        true
    }

    pub fn clear_highlight(&mut self) {
        if self.obstacles.highlighted().is_some() {
            self.obstacles.clear_highlight();
            self.notify(Change::HighlightChanged(None));
        }
    }

    /// Highlights the obstacle under a screen position, or clears the highlight
    pub fn highlight_at_screen(&mut self, screen: Point) -> Option<ObstacleId> {
        let world = self.view.screen_to_world(screen);
        match self.obstacles.obstacle_at(world).map(|obstacle| obstacle.id.clone()) {
            Some(id) => {
                self.highlight_obstacle(&id);
                Some(id)
            }
            None => {
                self.clear_highlight();
                None
            }
        }
    }

    pub fn cycle_highlight(&mut self) -> Option<ObstacleId> {
        let next = self.obstacles.next_id_after(self.obstacles.highlighted())?;
        self.highlight_obstacle(&next);
        Some(next)
    }

    pub fn clear_obstacles(&mut self) {
        if self.obstacles.is_empty() {
            return;
        }
        let removed: Vec<ObstacleId> = self.obstacles.list_all().map(|o| o.id.clone()).collect();
        self.obstacles.clear();
        self.refresh_stats();
        self.message = "Obstacles cleared".into();
        for id in removed {
            self.notify(Change::ObstacleRemoved(id));
        }
    }

    fn refresh_stats(&mut self) {
        let obstacles: Vec<&Obstacle> = self.obstacles.list_all().collect();
        self.plan.recompute(&obstacles);
    }

    /// Generates a coverage path over the boundary around the static obstacles.
    ///
    /// An empty result is not an error; it is reported as "no path available".
    pub fn generate_path(&mut self) -> Result<PlanOutcome, EditorError> {
        if self.plan.boundary().is_none() {
            self.message = EditorError::NoBoundary.to_string();
            return Err(EditorError::NoBoundary);
        }

        self.playback.reset();
        let all: Vec<&Obstacle> = self.obstacles.list_all().collect();
        let outcome = self
            .plan
            .generate(self.generator.as_ref(), self.obstacles.static_obstacles(), &all)
            .ok_or(EditorError::NoBoundary)?;

        self.message = match outcome {
            PlanOutcome::Generated { waypoints } => format!(
                "Path generated: {waypoints} waypoints, {:.2} m, ETA {}",
                self.plan.stats().path_length_m,
                self.plan.stats().eta_label()
            ),
            PlanOutcome::Empty => EditorError::NoPath.to_string(),
        };
        self.notify(Change::PathChanged);
        Ok(outcome)
    }

    pub fn clear_path(&mut self) {
        if self.plan.path().is_empty() {
            return;
        }
        self.playback.reset();
        let obstacles: Vec<&Obstacle> = self.obstacles.list_all().collect();
        self.plan.set_path(Vec::new(), &obstacles);
        self.notify(Change::PathChanged);
    }

    /// Starts playback over the current path, resuming when paused
    pub fn run(&mut self, now: Duration) -> Result<(), EditorError> {
        if let Err(err) = self.playback.run(self.plan.path(), now) {
            let err = EditorError::from(err);
            self.message = err.to_string();
            return Err(err);
        }
        self.message = "Simulation running".into();
        self.notify(Change::Playback(self.playback.status()));
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        if !self.playback.pause() {
            return false;
        }
        self.message = format!("Paused at {:.0}%", self.playback.state().progress);
        self.notify(Change::Playback(PlaybackStatus::Paused));
        true
    }

    pub fn resume(&mut self, now: Duration) -> bool {
        if !self.playback.resume(now) {
            return false;
        }
        self.message = "Simulation running".into();
        self.notify(Change::Playback(PlaybackStatus::Running));
        true
    }

    /// Space-bar semantics: run when idle, pause when running, resume when paused
    pub fn toggle_playback(&mut self, now: Duration) -> Result<(), EditorError> {
        let state = self.playback.state();
        match (state.running, state.paused) {
            (true, false) => {
                self.pause();
                Ok(())
            }
            (true, true) => {
                self.resume(now);
                Ok(())
            }
            (false, _) => self.run(now),
        }
    }

    pub fn stop(&mut self) {
        if !self.playback.state().running {
            return;
        }
        self.playback.stop();
        self.message = "Simulation stopped".into();
        self.notify(Change::Playback(PlaybackStatus::Stopped));
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
        self.message = format!("Speed x{:.1}", self.playback.speed());
    }

    /// Runs the playback tick if one is due at `now`
    pub fn poll(&mut self, now: Duration) -> Option<TickEvent> {
        let event = self.playback.poll(self.plan.path(), now)?;
        match event {
            TickEvent::Moved(pose) => self.notify(Change::RobotMoved(pose)),
            TickEvent::Completed => {
                self.message = "Coverage complete: 100%".into();
                self.notify(Change::Playback(PlaybackStatus::Complete));
            }
        }
        Some(event)
    }

    /// Time at which [`poll`](Self::poll) next has work, if any
    pub fn next_tick_due(&self) -> Option<Duration> {
        self.playback.next_due()
    }

    /// Zooms by `factor` keeping the world point under `focal` in place
    pub fn zoom_at(&mut self, focal: Point, factor: f64) {
        if self.view.zoom_at(focal, factor) {
            self.notify(Change::View);
        }
    }

    pub fn zoom_in(&mut self, focal: Point) {
        self.zoom_at(focal, self.config.zoom_step);
    }

    pub fn zoom_out(&mut self, focal: Point) {
        self.zoom_at(focal, 1.0 / self.config.zoom_step);
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.view.pan_by(delta);
        self.notify(Change::View);
    }

    pub fn begin_drag(&mut self, cursor: Point) {
        self.view.begin_drag(cursor);
    }

    pub fn drag_to(&mut self, cursor: Point) {
        if self.view.drag_to(cursor) {
            self.notify(Change::View);
        }
    }

    pub fn end_drag(&mut self) {
        self.view.end_drag();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
        self.notify(Change::View);
    }

    /// Boundary, obstacles and path as a serializable snapshot
    pub fn export_snapshot(&self) -> SessionSnapshot {
        let points = |list: &[Obstacle]| -> Vec<Vec<Point>> {
            list.iter().map(|o| o.points.clone()).collect()
        };
        SessionSnapshot {
            boundary: self.plan.boundary().map(<[Point]>::to_vec).unwrap_or_default(),
            obstacles: points(self.obstacles.static_obstacles()),
            dynamic_obstacles: points(self.obstacles.dynamic_obstacles()),
            planned_path: self.plan.path().to_vec(),
        }
    }

    /// Replaces the session with `snapshot`; degenerate polygons are skipped
    pub fn import_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.clear_session();

        let mut skipped = 0usize;
        for (list, kind) in [
            (snapshot.obstacles, ObstacleKind::Static),
            (snapshot.dynamic_obstacles, ObstacleKind::Dynamic),
        ] {
            for points in list {
                if self.obstacles.add(points, kind).is_none() {
                    skipped += 1;
                }
            }
        }

        let all: Vec<&Obstacle> = self.obstacles.list_all().collect();
        if !snapshot.boundary.is_empty() && !self.plan.set_boundary(snapshot.boundary, &all) {
            skipped += 1;
        }
        if self.plan.boundary().is_some() {
            self.plan.set_path(snapshot.planned_path, &all);
        } else {
            self.plan.recompute(&all);
        }

        if skipped > 0 {
            warn!(skipped, "ignored polygons with fewer than three points");
        }
        info!(
            obstacles = self.obstacles.len(),
            waypoints = self.plan.path().len(),
            "session imported"
        );
        self.message = format!(
            "Session loaded: {} obstacle(s), {} waypoint(s)",
            self.obstacles.len(),
            self.plan.path().len()
        );
        self.notify(Change::SessionLoaded);
    }

    pub fn save_session(&mut self, path: &Path) -> Result<(), EditorError> {
        match self.export_snapshot().save(path) {
            Ok(()) => {
                info!(path = %path.display(), "session exported");
                self.message = format!("Saved {}", path.display());
                Ok(())
            }
            Err(err) => {
                self.message = err.to_string();
                Err(err.into())
            }
        }
    }

    pub fn load_session(&mut self, path: &Path) -> Result<(), EditorError> {
        match SessionSnapshot::load(path) {
            Ok(snapshot) => {
                self.import_snapshot(snapshot);
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "session import failed");
                self.message = err.to_string();
                Err(err.into())
            }
        }
    }

    /// Clears drawings, obstacles, path and playback; the view is kept
    pub fn reset(&mut self) {
        self.clear_session();
        self.message = "Session cleared".into();
        self.notify(Change::Reset);
    }

    fn clear_session(&mut self) {
        self.drawing.cancel();
        self.playback.reset();
        self.obstacles.clear();
        self.plan.clear();
    }

    fn notify(&mut self, change: Change) {
        for listener in &mut self.listeners {
            listener.on_change(&change);
        }
    }
}
