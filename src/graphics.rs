use std::f64::consts::FRAC_PI_4;

use crossterm::style::Color;

use crate::math::{point_in_polygon, Bounds};
use crate::obstacles::ObstacleKind;
use crate::playback::PlaybackStatus;
use crate::state::Scene;
use crate::vertex::Point;
use crate::view::ViewTransform;

/// Screen units spanned by one terminal cell horizontally
pub const CELL_WIDTH: f64 = 8.0;
/// Screen units spanned by one terminal cell vertically
pub const CELL_HEIGHT: f64 = 16.0;

const BOUNDARY_COLOR: Color = Color::Green;
const STATIC_COLOR: Color = Color::Red;
const DYNAMIC_COLOR: Color = Color::Yellow;
const HIGHLIGHT_COLOR: Color = Color::Magenta;
const PATH_COLOR: Color = Color::DarkCyan;
const TRAVERSED_COLOR: Color = Color::Cyan;
const BUFFER_COLOR: Color = Color::White;
const ROBOT_COLOR: Color = Color::White;

/// One character cell of the canvas
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub glyph: char,
    pub fg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            glyph: ' ',
            fg: Color::Reset,
        }
    }
}

/// Character grid the scene is rasterized into
#[derive(Clone, Debug)]
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    pub fn set(&mut self, x: isize, y: isize, glyph: char, fg: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.cells[y as usize * self.width + x as usize] = Cell { glyph, fg };
    }

    /// Appends blank rows until the canvas is `height` rows tall
    pub fn grow_to(&mut self, height: usize) {
        if height > self.height {
            self.cells.resize(self.width * height, Cell::default());
            self.height = height;
        }
    }

    /// Cells of row `y`, left to right
    pub fn row(&self, y: usize) -> &[Cell] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Row `y` as plain text, without colours
    pub fn row_text(&self, y: usize) -> String {
        self.row(y).iter().map(|cell| cell.glyph).collect()
    }
}

/// Screen-space centre of a terminal cell
pub fn cell_center(column: usize, row: usize) -> Point {
    Point::new(
        (column as f64 + 0.5) * CELL_WIDTH,
        (row as f64 + 0.5) * CELL_HEIGHT,
    )
}

/// Terminal cell under a screen-space point
pub fn screen_to_cell(screen: Point) -> (isize, isize) {
    (
        (screen.x / CELL_WIDTH).floor() as isize,
        (screen.y / CELL_HEIGHT).floor() as isize,
    )
}

fn world_to_cell(view: &ViewTransform, world: Point) -> (isize, isize) {
    screen_to_cell(view.world_to_screen(world))
}

/// Draws a line between two cells using Bresenham's algorithm
pub fn draw_line(
    (mut x0, mut y0): (isize, isize),
    (x1, y1): (isize, isize),
    canvas: &mut Canvas,
    glyph: char,
    color: Color,
) {
    // Lines far outside the canvas are not worth walking cell by cell
    let limit = (canvas.width() + canvas.height()) * 4;
    let (adx, ady) = (x1.abs_diff(x0), y1.abs_diff(y0));
    if adx > limit || ady > limit {
        return;
    }

    let dx = adx as isize;
    let dy = -(ady as isize);
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy; // error value e_xy

    loop {
        canvas.set(x0, y0, glyph, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draws consecutive world-space points as connected cell lines
pub fn draw_polyline(
    canvas: &mut Canvas,
    view: &ViewTransform,
    points: &[Point],
    closed: bool,
    glyph: char,
    color: Color,
) {
    for pair in points.windows(2) {
        draw_line(
            world_to_cell(view, pair[0]),
            world_to_cell(view, pair[1]),
            canvas,
            glyph,
            color,
        );
    }
    if closed && points.len() > 2 {
        if let (Some(last), Some(first)) = (points.last(), points.first()) {
            draw_line(
                world_to_cell(view, *last),
                world_to_cell(view, *first),
                canvas,
                glyph,
                color,
            );
        }
    }
}

/// Fills every cell whose centre falls inside the world-space polygon
pub fn fill_polygon(
    canvas: &mut Canvas,
    view: &ViewTransform,
    polygon: &[Point],
    glyph: char,
    color: Color,
) {
    let Some(bounds) = Bounds::of(polygon) else {
        return;
    };

    // Compute bounding box of the polygon in cell space
    let (min_x, min_y) = world_to_cell(view, bounds.min);
    let (max_x, max_y) = world_to_cell(view, bounds.max);
    let min_x = min_x.max(0) as usize;
    let min_y = min_y.max(0) as usize;
    let max_x = max_x.min(canvas.width() as isize - 1);
    let max_y = max_y.min(canvas.height() as isize - 1);
    if max_x < 0 || max_y < 0 {
        return;
    }

    for y in min_y..=max_y as usize {
        for x in min_x..=max_x as usize {
            let world = view.screen_to_world(cell_center(x, y));
            if point_in_polygon(world, polygon) {
                canvas.set(x as isize, y as isize, glyph, color);
            }
        }
    }
}

/// Writes text starting at a cell, clipped to the canvas
pub fn draw_text(canvas: &mut Canvas, x: usize, y: usize, text: &str, color: Color) {
    for (offset, glyph) in text.chars().enumerate() {
        canvas.set((x + offset) as isize, y as isize, glyph, color);
    }
}

/// Arrow pointing along `heading`; screen y grows downwards
pub fn heading_glyph(heading: f64) -> char {
    const ARROWS: [char; 8] = ['→', '↘', '↓', '↙', '←', '↖', '↑', '↗'];
    let octant = (heading / FRAC_PI_4).round() as i64;
    ARROWS[octant.rem_euclid(8) as usize]
}

/// Rasterizes boundary, obstacles, path, drawing buffer and robot
pub fn render_scene(canvas: &mut Canvas, scene: &Scene<'_>) {
    let view = scene.view;

    if let Some(boundary) = scene.boundary {
        fill_polygon(canvas, view, boundary, '·', Color::DarkGreen);
        draw_polyline(canvas, view, boundary, true, '#', BOUNDARY_COLOR);
    }

    let highlighted = scene.obstacles.highlighted();
    for obstacle in scene.obstacles.list_all() {
        let color = if highlighted == Some(&obstacle.id) {
            HIGHLIGHT_COLOR
        } else {
            match obstacle.kind {
                ObstacleKind::Static => STATIC_COLOR,
                ObstacleKind::Dynamic => DYNAMIC_COLOR,
            }
        };
        let glyph = match obstacle.kind {
            ObstacleKind::Static => '▓',
            ObstacleKind::Dynamic => '░',
        };
        fill_polygon(canvas, view, &obstacle.points, glyph, color);
        draw_polyline(canvas, view, &obstacle.points, true, '█', color);
    }

    let path: Vec<Point> = scene.path.iter().map(|w| w.position()).collect();
    draw_polyline(canvas, view, &path, false, '-', PATH_COLOR);
    if scene.sim.running && scene.sim.index > 0 {
        let travelled = &path[..=scene.sim.index.min(path.len().saturating_sub(1))];
        draw_polyline(canvas, view, travelled, false, '=', TRAVERSED_COLOR);
    }

    if !scene.buffer.is_empty() {
        draw_polyline(canvas, view, scene.buffer, false, '.', BUFFER_COLOR);
        for point in scene.buffer {
            let (x, y) = world_to_cell(view, *point);
            canvas.set(x, y, '+', BUFFER_COLOR);
        }
    }

    if let Some(robot) = scene.robot {
        let (x, y) = world_to_cell(view, robot.position);
        canvas.set(x, y, heading_glyph(robot.heading), ROBOT_COLOR);
    }

    if scene.playback == PlaybackStatus::Complete {
        let text = "Coverage complete";
        let x = canvas.width().saturating_sub(text.len()) / 2;
        draw_text(canvas, x, canvas.height() / 2, text, Color::Green);
    }
}
