use std::collections::HashMap;

use super::RoomGrid;
use crate::error::ConfigError;

/// Rooms in declaration order. Names are unique.
#[derive(Debug, Clone, Default)]
pub struct RoomCatalog {
    rooms: Vec<RoomGrid>,
}

impl RoomCatalog {
    /// Builds a catalog. When the same room appears more than once each copy
    /// is renamed `1R`, `2R`, ... so sessions sharing a room stay apart.
    pub fn new(mut rooms: Vec<RoomGrid>) -> Result<Self, ConfigError> {
        if rooms.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for room in &rooms {
            *counts.entry(room.name().to_string()).or_insert(0) += 1;
        }
        let mut seen: HashMap<String, usize> = HashMap::new();
        for room in rooms.iter_mut() {
            let name = room.name().to_string();
            if counts.get(&name).copied().unwrap_or(0) > 1 {
                let n = seen.entry(name.clone()).or_insert(0);
                *n += 1;
                room.rename(format!("{}{}", n, name));
            }
        }

        Ok(Self { rooms })
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> &[RoomGrid] {
        &self.rooms
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(RoomGrid::name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.rooms.iter().position(|r| r.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&RoomGrid> {
        self.rooms.iter().find(|r| r.name() == name)
    }

    pub(crate) fn room_mut(&mut self, index: usize) -> Option<&mut RoomGrid> {
        self.rooms.get_mut(index)
    }

    /// Room with the most free seats; ties go to the earliest declared room.
    pub fn most_free(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, room) in self.rooms.iter().enumerate() {
            let free = room.capacity();
            if best.map(|(_, b)| free > b).unwrap_or(true) {
                best = Some((i, free));
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn total_capacity(&self) -> usize {
        self.rooms.iter().map(RoomGrid::capacity).sum()
    }

    pub fn total_occupied(&self) -> usize {
        self.rooms.iter().map(RoomGrid::occupied_count).sum()
    }
}
