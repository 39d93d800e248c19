use std::cell::Cell;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{EditorConfig, PLAYBACK_SPEED_RANGE};
use crate::vertex::{RobotPose, Waypoint};

/// Monotonic time source driving playback ticks
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("no path available")]
    NoPath,
}

/// Status shown to the operator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Complete,
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "Idle",
            PlaybackStatus::Running => "Running",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Complete => "Complete",
        }
    }
}

/// Run flags and the cursor into the path
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimState {
    pub running: bool,
    pub paused: bool,
    pub index: usize,
    /// Percentage in `[0, 100]`
    pub progress: f64,
}

/// What a single advance produced
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickEvent {
    Moved(RobotPose),
    Completed,
}

/// Advances a robot along a precomputed path, one waypoint per tick
#[derive(Debug)]
pub struct PlaybackController {
    state: SimState,
    status: PlaybackStatus,
    pose: Option<RobotPose>,
    next_due: Option<Duration>,
    speed: f64,
    base_tick: Duration,
    min_tick: Duration,
}

impl Default for PlaybackController {
    fn default() -> Self {
        PlaybackController::new(&EditorConfig::default())
    }
}

impl PlaybackController {
    pub fn new(config: &EditorConfig) -> Self {
        PlaybackController {
            state: SimState::default(),
            status: PlaybackStatus::Idle,
            pose: None,
            next_due: None,
            speed: clamp_speed(config.playback_speed),
            base_tick: config.base_tick(),
            min_tick: config.min_tick(),
        }
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn pose(&self) -> Option<RobotPose> {
        self.pose
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
    }

    /// Delay between ticks; higher speed shortens it down to the floor
    pub fn tick_delay(&self) -> Duration {
        self.base_tick.div_f64(self.speed).max(self.min_tick)
    }

    /// Time at which the next tick is due, if one is scheduled
    pub fn next_due(&self) -> Option<Duration> {
        self.next_due
    }

    /// Starts playback from the beginning, or resumes when paused
    pub fn run(&mut self, path: &[Waypoint], now: Duration) -> Result<(), PlaybackError> {
        if path.is_empty() {
            info!("playback requested without a path");
            return Err(PlaybackError::NoPath);
        }
        if self.state.running {
            if self.state.paused {
                self.resume(now);
            }
            return Ok(());
        }

        self.state = SimState {
            running: true,
            paused: false,
            index: 0,
            progress: 0.0,
        };
        self.status = PlaybackStatus::Running;
        self.next_due = Some(now + self.tick_delay());
        info!(waypoints = path.len(), speed = self.speed, "playback started");
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        if !self.state.running || self.state.paused {
            return false;
        }
        self.state.paused = true;
        self.status = PlaybackStatus::Paused;
        self.next_due = None;
        info!(index = self.state.index, "playback paused");
        true
    }

    pub fn resume(&mut self, now: Duration) -> bool {
        if !(self.state.running && self.state.paused) {
            return false;
        }
        self.state.paused = false;
        self.status = PlaybackStatus::Running;
        self.next_due = Some(now + self.tick_delay());
        info!(index = self.state.index, "playback resumed");
        true
    }

    pub fn stop(&mut self) {
        self.halt();
        self.status = PlaybackStatus::Stopped;
        info!("playback stopped");
    }

    /// Returns to `Idle` without announcing a stop, e.g. after a session reset
    pub fn reset(&mut self) {
        self.halt();
        self.status = PlaybackStatus::Idle;
    }

    fn halt(&mut self) {
        self.state = SimState::default();
        self.pose = None;
        self.next_due = None;
    }

    /// Advances once if a tick is due at `now` and schedules the following one
    pub fn poll(&mut self, path: &[Waypoint], now: Duration) -> Option<TickEvent> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        let event = self.step(path)?;
        if let TickEvent::Moved(_) = event {
            self.next_due = Some(now + self.tick_delay());
        }
        Some(event)
    }

    /// One advance of the cursor, regardless of the schedule.
    ///
    /// Returns `None` unless playback is running and not paused.
    pub fn step(&mut self, path: &[Waypoint]) -> Option<TickEvent> {
        if !self.state.running || self.state.paused {
            return None;
        }

        let index = self.state.index;
        if path.is_empty() || index + 1 >= path.len() {
            self.halt();
            self.state.progress = 100.0;
            self.status = PlaybackStatus::Complete;
            info!(waypoints = path.len(), "coverage complete");
            return Some(TickEvent::Completed);
        }

        let current = path[index].position();
        let next = path[index + 1].position();
        let pose = RobotPose {
            position: current,
            heading: current.heading_to(next),
        };
        self.pose = Some(pose);
        self.state.progress = 100.0 * (index + 1) as f64 / path.len() as f64;
        self.state.index = index + 1;
        debug!(index = self.state.index, progress = self.state.progress, "playback tick");
        Some(TickEvent::Moved(pose))
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(PLAYBACK_SPEED_RANGE.0, PLAYBACK_SPEED_RANGE.1)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_path(len: usize) -> Vec<Waypoint> {
        (0..len)
            .map(|i| Waypoint::new(i as f64 * 10.0, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn run_without_path_reports_no_path() {
        let mut playback = PlaybackController::default();
        let err = playback.run(&[], Duration::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "no path available");
        assert!(!playback.state().running);
        assert_eq!(playback.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn heading_between_first_two_waypoints_is_zero() {
        let path = vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(100.0, 0.0, 0.0)];
        let mut playback = PlaybackController::default();
        playback.run(&path, Duration::ZERO).unwrap();
        match playback.step(&path) {
            Some(TickEvent::Moved(pose)) => assert_eq!(pose.heading, 0.0),
            other => panic!("expected move, got {other:?}"),
        }
        assert_eq!(playback.state().progress, 50.0);
        assert_eq!(playback.step(&path), Some(TickEvent::Completed));
        assert_eq!(playback.step(&path), None);
        assert_eq!(playback.status(), PlaybackStatus::Complete);
        assert_eq!(playback.state().progress, 100.0);
        assert!(!playback.state().running);
    }

    #[test]
    fn pause_preserves_index_and_resume_continues() {
        let path = line_path(10);
        let clock = ManualClock::new();
        let mut playback = PlaybackController::default();
        playback.run(&path, clock.now()).unwrap();

        for _ in 0..4 {
            clock.advance(playback.tick_delay());
            assert!(matches!(playback.poll(&path, clock.now()), Some(TickEvent::Moved(_))));
        }
        assert_eq!(playback.state().index, 4);

        assert!(playback.pause());
        assert!(!playback.pause());
        clock.advance(Duration::from_secs(10));
        assert_eq!(playback.poll(&path, clock.now()), None);
        assert_eq!(playback.state().index, 4);

        assert!(playback.resume(clock.now()));
        clock.advance(playback.tick_delay());
        match playback.poll(&path, clock.now()) {
            Some(TickEvent::Moved(pose)) => assert_eq!(pose.position.x, 40.0),
            other => panic!("expected move, got {other:?}"),
        }
        assert_eq!(playback.state().index, 5);
    }

    #[test]
    fn run_while_paused_resumes_instead_of_restarting() {
        let path = line_path(5);
        let mut playback = PlaybackController::default();
        playback.run(&path, Duration::ZERO).unwrap();
        playback.step(&path);
        playback.step(&path);
        playback.pause();
        playback.run(&path, Duration::ZERO).unwrap();
        assert_eq!(playback.status(), PlaybackStatus::Running);
        assert_eq!(playback.state().index, 2);
    }

    #[test]
    fn stop_resets_cursor() {
        let path = line_path(5);
        let mut playback = PlaybackController::default();
        playback.run(&path, Duration::ZERO).unwrap();
        playback.step(&path);
        playback.stop();
        let state = playback.state();
        assert_eq!(state, SimState::default());
        assert!(playback.pose().is_none());
        assert_eq!(playback.status(), PlaybackStatus::Stopped);
        assert!(!playback.resume(Duration::ZERO));
    }

    #[test]
    fn poll_waits_for_the_delay() {
        let path = line_path(3);
        let clock = ManualClock::new();
        let mut playback = PlaybackController::default();
        playback.run(&path, clock.now()).unwrap();
        assert_eq!(playback.poll(&path, clock.now()), None);
        clock.advance(playback.tick_delay() / 2);
        assert_eq!(playback.poll(&path, clock.now()), None);
        clock.advance(playback.tick_delay());
        assert!(playback.poll(&path, clock.now()).is_some());
    }

    #[test]
    fn completion_stops_rescheduling() {
        let path = line_path(3);
        let mut playback = PlaybackController::default();
        playback.run(&path, Duration::ZERO).unwrap();
        let mut now = Duration::ZERO;
        let mut events = Vec::new();
        while let Some(due) = playback.next_due() {
            now = now.max(due);
            events.push(playback.poll(&path, now).expect("tick due"));
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events.last(), Some(&TickEvent::Completed));
        assert_eq!(playback.status(), PlaybackStatus::Complete);
    }

    #[test]
    fn faster_speed_shortens_delay_down_to_floor() {
        let mut playback = PlaybackController::default();
        let base = playback.tick_delay();
        playback.set_speed(2.0);
        assert!(playback.tick_delay() < base);
        playback.set_speed(1_000.0);
        assert_eq!(playback.speed(), 10.0);
        assert_eq!(playback.tick_delay(), Duration::from_millis(10));
    }
}
