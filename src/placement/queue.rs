use serde::Serialize;
use std::collections::VecDeque;

use crate::parser::{Partition, StudentId};

/// Priority class of a queued student. Classes are served in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueClass {
    Dsa,
    NoPc,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub student: StudentId,
    pub class: QueueClass,
}

/// Students waiting for a seat. Only ever popped from the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementQueue {
    entries: VecDeque<QueueEntry>,
}

impl PlacementQueue {
    /// DSA first, then no-PC, then everyone else; each class keeps the
    /// order of the partition.
    pub fn from_partition(partition: &Partition) -> Self {
        let classes = [
            (QueueClass::Dsa, &partition.dsa),
            (QueueClass::NoPc, &partition.no_pc),
            (QueueClass::General, &partition.on_site),
        ];
        let entries = classes
            .into_iter()
            .flat_map(|(class, ids)| {
                ids.iter().map(move |id| QueueEntry {
                    student: id.clone(),
                    class,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_class(&self, class: QueueClass) -> bool {
        self.entries.iter().any(|e| e.class == class)
    }

    pub fn ids(&self) -> Vec<StudentId> {
        self.entries.iter().map(|e| e.student.clone()).collect()
    }
}
