use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use tracing::{error, info, warn};

use crate::editor::Editor;
use crate::graphics::{cell_center, draw_text, render_scene, Canvas, CELL_HEIGHT, CELL_WIDTH};
use crate::playback::{Clock, PlaybackStatus, SystemClock};
use crate::state::UiState;
use crate::vertex::Point;

/// Redraw cadence when nothing else wakes the loop
const FRAME_INTERVAL: Duration = Duration::from_millis(50);
/// Screen units moved per arrow key press
const PAN_STEP: f64 = 40.0;
/// Rows reserved under the canvas for status and statistics
const FOOTER_ROWS: usize = 3;

/// Interactive terminal canvas driving an [`Editor`]
pub struct CanvasWidget {
    editor: Editor,
    ui: UiState,
    clock: SystemClock,
    session_path: PathBuf,
    size: (usize, usize),
    frames_since_last_update: usize,
    last_fps_calculation: Instant,
    fps: f64,
}

impl CanvasWidget {
    pub fn new(editor: Editor, session_path: PathBuf) -> Self {
        CanvasWidget {
            editor,
            ui: UiState::default(),
            clock: SystemClock::default(),
            session_path,
            size: terminal_size(),
            frames_since_last_update: 0,
            last_fps_calculation: Instant::now(),
            fps: 0.0,
        }
    }

    /// Takes over the terminal until the operator quits
    pub fn run(mut self) -> Result<Editor> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide)
            .context("failed to enter alternate screen")?;

        let result = self.event_loop(&mut stdout);

        if let Err(err) = execute!(stdout, Show, DisableMouseCapture, LeaveAlternateScreen) {
            error!(?err, "failed to leave alternate screen");
        }
        if let Err(err) = disable_raw_mode() {
            error!(?err, "failed to disable raw mode");
        }

        result.map(|()| self.editor)
    }

    fn event_loop(&mut self, out: &mut impl Write) -> Result<()> {
        info!(session = %self.session_path.display(), "editor started");
        self.paint(out)?;

        while !self.ui.quit {
            let now = self.clock.now();
            let timeout = self
                .editor
                .next_tick_due()
                .map(|due| due.saturating_sub(now).min(FRAME_INTERVAL))
                .unwrap_or(FRAME_INTERVAL);

            if event::poll(timeout).context("failed to poll terminal events")? {
                let event = event::read().context("failed to read terminal event")?;
                self.handle_event(event);
            }

            self.editor.poll(self.clock.now());
            self.paint(out)?;
        }

        info!("editor closed");
        Ok(())
    }

    /// Dispatches one terminal event to the editor
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(columns, rows) => {
                self.size = (columns as usize, rows as usize);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let now = self.clock.now();
        let centre = self.canvas_centre();

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.ui.quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.ui.quit = true,
            KeyCode::Char('b') => self.editor.start_boundary(),
            KeyCode::Char('o') => self.editor.start_obstacle(),
            KeyCode::Char('y') => self.editor.start_dynamic_obstacle(),
            KeyCode::Enter => self.editor.finish_current(),
            KeyCode::Esc => {
                if self.editor.mode().is_drawing() {
                    self.editor.cancel_current();
                } else {
                    self.editor.clear_highlight();
                }
            }
            KeyCode::Backspace => self.editor.undo_point(),
            KeyCode::Char('g') => {
                if let Err(err) = self.editor.generate_path() {
                    warn!(%err, "path generation refused");
                }
            }
            KeyCode::Char(' ') => {
                if let Err(err) = self.editor.toggle_playback(now) {
                    warn!(%err, "playback refused");
                }
            }
            KeyCode::Char('s') => self.editor.stop(),
            KeyCode::Tab => {
                self.editor.cycle_highlight();
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                self.editor.remove_highlighted();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.editor.zoom_in(centre),
            KeyCode::Char('-') => self.editor.zoom_out(centre),
            KeyCode::Left => self.editor.pan_by(Point::new(PAN_STEP, 0.0)),
            KeyCode::Right => self.editor.pan_by(Point::new(-PAN_STEP, 0.0)),
            KeyCode::Up => self.editor.pan_by(Point::new(0.0, PAN_STEP)),
            KeyCode::Down => self.editor.pan_by(Point::new(0.0, -PAN_STEP)),
            KeyCode::Char('0') => self.editor.reset_view(),
            KeyCode::Char('[') => {
                let speed = self.editor.playback().speed() / 1.5;
                self.editor.set_speed(speed);
            }
            KeyCode::Char(']') => {
                let speed = self.editor.playback().speed() * 1.5;
                self.editor.set_speed(speed);
            }
            KeyCode::Char('w') => {
                let path = self.session_path.clone();
                if let Err(err) = self.editor.save_session(&path) {
                    warn!(%err, "session export failed");
                }
            }
            KeyCode::Char('l') => {
                let path = self.session_path.clone();
                if let Err(err) = self.editor.load_session(&path) {
                    warn!(%err, "session import failed");
                }
            }
            KeyCode::Char('c') => self.editor.reset(),
            KeyCode::Char('d') | KeyCode::Char('D') => self.ui.debug = !self.ui.debug,
            KeyCode::Char('h') | KeyCode::Char('?') => self.ui.help = !self.ui.help,
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (_, canvas_rows) = self.canvas_size();
        if mouse.row as usize >= canvas_rows {
            // Footer rows are not part of the drawing surface
            self.ui.pointer = None;
            if let MouseEventKind::Up(_) = mouse.kind {
                self.editor.end_drag();
            }
            return;
        }
        let screen = cell_center(mouse.column as usize, mouse.row as usize);
        self.ui.pointer = Some(screen);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.editor.mode().is_drawing() {
                    self.editor.place_point_at_screen(screen);
                } else {
                    self.editor.highlight_at_screen(screen);
                }
            }
            MouseEventKind::Down(MouseButton::Right) | MouseEventKind::Down(MouseButton::Middle) => {
                self.editor.begin_drag(screen);
            }
            MouseEventKind::Drag(MouseButton::Right) | MouseEventKind::Drag(MouseButton::Middle) => {
                self.editor.drag_to(screen);
            }
            MouseEventKind::Up(MouseButton::Right) | MouseEventKind::Up(MouseButton::Middle) => {
                self.editor.end_drag();
            }
            MouseEventKind::ScrollUp => self.editor.zoom_in(screen),
            MouseEventKind::ScrollDown => self.editor.zoom_out(screen),
            _ => {}
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    fn canvas_centre(&self) -> Point {
        let (columns, rows) = self.canvas_size();
        Point::new(
            columns as f64 * CELL_WIDTH / 2.0,
            rows as f64 * CELL_HEIGHT / 2.0,
        )
    }

    fn canvas_size(&self) -> (usize, usize) {
        (self.size.0, self.size.1.saturating_sub(FOOTER_ROWS))
    }

    /// Rasterizes the current frame, canvas plus footer
    pub fn compose(&mut self) -> Canvas {
        // Update FPS calculation
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let duration = now.duration_since(self.last_fps_calculation);
        if duration.as_secs_f64() >= 1.0 {
            self.fps = self.frames_since_last_update as f64 / duration.as_secs_f64();
            self.frames_since_last_update = 0;
            self.last_fps_calculation = now;
        }

        let (width, height) = self.size;
        let (_, canvas_rows) = self.canvas_size();
        let mut canvas = Canvas::new(width, canvas_rows);
        let scene = self.editor.scene();
        render_scene(&mut canvas, &scene);
        canvas.grow_to(height);

        // Separator and footer
        for x in 0..width {
            canvas.set(x as isize, canvas_rows as isize, '─', Color::DarkGrey);
        }
        let stats = scene.stats;
        let mode_line = format!(
            "[{}] {} | {} {:.0}% x{:.1} | {}",
            scene.mode.label(),
            scene.obstacles.len(),
            scene.playback.label(),
            scene.sim.progress,
            scene.speed,
            scene.message
        );
        draw_text(&mut canvas, 0, canvas_rows + 1, &mode_line, Color::White);
        let stats_line = format!(
            "Path {:.2} m | Area {:.2} m² | Obstacles {:.2} m² | Useful {:.2} m² | Eff {:.2} | ETA {}",
            stats.path_length_m,
            stats.coverage_area_m2,
            stats.obstacles_area_m2,
            stats.useful_area_m2,
            stats.efficiency,
            stats.eta_label()
        );
        draw_text(&mut canvas, 0, canvas_rows + 2, &stats_line, Color::Grey);

        // Add debug info if debug mode is enabled
        if self.ui.debug {
            let view = scene.view.state();
            let lines = [
                format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                format!("Zoom: {:.2}", view.scale),
                format!("Pan: ({:.1}, {:.1})", view.pan_x, view.pan_y),
                format!("FPS: {:.2}", self.fps),
                format!("Tick index: {}", scene.sim.index),
                match self.ui.pointer {
                    Some(pointer) => {
                        let world = scene.view.screen_to_world(pointer);
                        format!(
                            "Pointer: ({:.2} m, {:.2} m)",
                            world.x / scene.units_per_meter,
                            world.y / scene.units_per_meter
                        )
                    }
                    None => "Pointer: -".to_string(),
                },
            ];
            for (row, line) in lines.iter().enumerate() {
                draw_text(&mut canvas, 1, row, line, Color::White);
            }
        }

        if self.ui.help {
            for (row, line) in HELP.iter().enumerate() {
                let x = width.saturating_sub(34);
                draw_text(&mut canvas, x, row, line, Color::Grey);
            }
        }

        // Display 'Paused' if the simulation is paused
        if scene.playback == PlaybackStatus::Paused {
            let text = "Paused";
            let x = width.saturating_sub(text.len()) / 2;
            draw_text(&mut canvas, x, canvas_rows / 2, text, Color::White);
        }

        canvas
    }

    fn paint(&mut self, out: &mut impl Write) -> Result<()> {
        let canvas = self.compose();
        for y in 0..canvas.height() {
            queue!(out, MoveTo(0, y as u16))?;
            let mut current = None;
            for cell in canvas.row(y) {
                if current != Some(cell.fg) {
                    queue!(out, SetForegroundColor(cell.fg))?;
                    current = Some(cell.fg);
                }
                queue!(out, Print(cell.glyph))?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush().context("failed to flush terminal")?;
        Ok(())
    }
}

const HELP: [&str; 13] = [
    "b/o/y  draw boundary/obstacle/dyn",
    "Enter  finish   Esc cancel",
    "Bksp   undo point",
    "g      generate path",
    "Space  run/pause/resume  s stop",
    "[ ]    playback speed",
    "Tab    select  x remove selected",
    "wheel  zoom   right-drag pan",
    "+/-    zoom   arrows pan  0 reset",
    "w/l    save/load session",
    "c      clear session",
    "d      debug overlay",
    "q      quit",
];

/// Terminal size in (columns, rows)
pub fn terminal_size() -> (usize, usize) {
    if let Some(size) = termsize::get() {
        return (size.cols as usize, size.rows as usize);
    }
    terminal::size()
        .map(|(columns, rows)| (columns as usize, rows as usize))
        .unwrap_or((80, 24))
}

/// Loads `path` into the editor when it exists
pub fn preload_session(editor: &mut Editor, path: &Path) -> Result<()> {
    if path.exists() {
        editor
            .load_session(path)
            .with_context(|| format!("failed to load session {}", path.display()))?;
    }
    Ok(())
}
