use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::error::PlacementError;
use crate::parser::StudentId;
use crate::room::SeatLabel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub student: StudentId,
    pub room: String,
    pub seat: SeatLabel,
}

/// Append-only record of committed seats, kept in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentLedger {
    entries: Vec<Assignment>,
    index: HashMap<StudentId, usize>,
}

impl AssignmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, student: StudentId, room: &str, seat: SeatLabel) -> Result<&Assignment, PlacementError> {
        if self.index.contains_key(&student) {
            return Err(PlacementError::DuplicateAssignment(student));
        }
        self.index.insert(student.clone(), self.entries.len());
        self.entries.push(Assignment {
            student,
            room: room.to_string(),
            seat,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn lookup(&self, student: &StudentId) -> Option<&Assignment> {
        self.index.get(student).map(|&i| &self.entries[i])
    }

    pub fn is_placed(&self, student: &StudentId) -> bool {
        self.index.contains_key(student)
    }

    /// Ids from `students` that have no entry.
    pub fn unassigned<'a>(&self, students: impl IntoIterator<Item = &'a StudentId>) -> BTreeSet<StudentId> {
        students
            .into_iter()
            .filter(|id| !self.is_placed(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.iter()
    }

    pub fn in_room<'a>(&'a self, room: &'a str) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.iter().filter(move |a| a.room == room)
    }

    pub fn room_count(&self, room: &str) -> usize {
        self.in_room(room).count()
    }
}
