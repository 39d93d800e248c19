//! Console editor for robot coverage paths: draw a boundary and obstacles,
//! generate a stripe pattern, inspect its statistics and replay it.

pub mod config;
pub mod drawing;
pub mod editor;
pub mod error;
pub mod graphics;
pub mod math;
pub mod obstacles;
pub mod planner;
pub mod playback;
pub mod session;
pub mod state;
pub mod stats;
pub mod vertex;
pub mod view;
pub mod widget;

pub use config::EditorConfig;
pub use editor::{Change, ChangeListener, Editor};
pub use error::EditorError;
pub use obstacles::{Obstacle, ObstacleId, ObstacleKind};
pub use planner::{PathGenerator, StripeGenerator};
pub use session::SessionSnapshot;
pub use vertex::{Point, Waypoint};
