use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vertex::{Point, Waypoint};

/// Flat save/restore record of everything the operator drew and planned.
///
/// Every field is optional when reading; a missing field loads as empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub boundary: Vec<Point>,
    pub obstacles: Vec<Vec<Point>>,
    pub dynamic_obstacles: Vec<Vec<Point>>,
    pub planned_path: Vec<Waypoint>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
