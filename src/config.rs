use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::SeatingError;
use crate::parser::{OrderPolicy, StudentId};
use crate::placement::DesignatedRooms;
use crate::room::{RoomCatalog, RoomSource, SnakePolicy};

pub const CONFIG_FILE: &str = "config.json";

/// Distancing applied to a room after it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEntry {
    pub name: String,
    pub source: RoomSource,
    #[serde(default)]
    pub spacing: Option<Spacing>,
}

/// Everything one seating run needs besides the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub rooms: Vec<RoomEntry>,
    pub dsa_room: Option<String>,
    pub nopc_room: Option<String>,
    pub nopc_students: Vec<StudentId>,
    pub order: OrderPolicy,
    pub snake: SnakePolicy,
    pub output_prefix: Option<String>,
    /// Folder relative room paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, SeatingError> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        info!(path = %path.display(), rooms = config.rooms.len(), "run configuration loaded");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SeatingError> {
        let config: Self = serde_json::from_str(text)?;
        config.snake.validate()?;
        Ok(config)
    }

    /// Loads every configured room, applying spacing where requested.
    pub fn build_catalog(&self) -> Result<RoomCatalog, SeatingError> {
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for entry in &self.rooms {
            let mut grid = entry.source.load(&entry.name, &self.base_dir)?;
            if let Some(spacing) = entry.spacing {
                grid.apply_spacing(spacing.rows, spacing.cols);
            }
            info!(room = %entry.name, seats = grid.capacity(), "room loaded");
            rooms.push(grid);
        }
        Ok(RoomCatalog::new(rooms)?)
    }

    pub fn designated(&self) -> DesignatedRooms {
        DesignatedRooms {
            dsa: self.dsa_room.clone(),
            no_pc: self.nopc_room.clone(),
        }
    }

    /// `<folder>/<folder-name>_<yyyymmdd>` unless a prefix is configured.
    pub fn output_prefix(&self, folder: &Path) -> PathBuf {
        if let Some(prefix) = &self.output_prefix {
            return folder.join(prefix);
        }
        let stem = folder
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "seating".to_string());
        folder.join(format!("{}_{}", stem, Local::now().format("%Y%m%d")))
    }
}
