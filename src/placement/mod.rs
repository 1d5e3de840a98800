pub mod engine;
pub mod ledger;
pub mod queue;

pub use engine::{place_all, DesignatedRooms};
pub use ledger::AssignmentLedger;
pub use queue::PlacementQueue;

use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::error::{PlacementError, SeatingError};
use crate::parser::{order_roster, partition_roster, Partition, StudentId, StudentRecord};
use crate::room::{RoomCatalog, RoomGrid, SeatLabeler, SnakePolicy};

/// Per-room figures printed after a run and served by the web API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room: String,
    pub seats: usize,
    pub occupied: usize,
    pub first_surname: Option<String>,
    pub last_surname: Option<String>,
}

/// A finished run: filled rooms, the ledger and the roster with seats
/// written back.
#[derive(Debug, Clone)]
pub struct SeatingPlan {
    pub catalog: RoomCatalog,
    pub ledger: AssignmentLedger,
    pub students: Vec<StudentRecord>,
    pub partition: Partition,
    pub snake: SnakePolicy,
}

impl SeatingPlan {
    pub fn student(&self, id: &StudentId) -> Option<&StudentRecord> {
        self.students.iter().find(|s| &s.id == id)
    }

    pub fn labeler(&self, room: &RoomGrid) -> SeatLabeler {
        SeatLabeler::new(room, self.snake)
    }

    /// Students seated in `room`, in commit order.
    pub fn students_in<'a>(&'a self, room: &'a str) -> impl Iterator<Item = &'a StudentRecord> + 'a {
        self.ledger.in_room(room).filter_map(move |a| self.student(&a.student))
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.catalog
            .rooms()
            .iter()
            .map(|room| {
                let mut surnames: Vec<&str> = self
                    .students_in(room.name())
                    .map(|s| s.surname.as_str())
                    .collect();
                surnames.sort_by_key(|s| s.to_lowercase());
                RoomSummary {
                    room: room.name().to_string(),
                    seats: room.seat_count(),
                    occupied: self.ledger.room_count(room.name()),
                    first_surname: surnames.first().map(|s| s.to_string()),
                    last_surname: surnames.last().map(|s| s.to_string()),
                }
            })
            .collect()
    }
}

/// Seats a whole roster into `catalog`.
///
/// Fails without a partial result: a capacity shortfall lists every student
/// left in the queue.
pub fn plan_seating(
    config: &RunConfig,
    mut students: Vec<StudentRecord>,
    mut catalog: RoomCatalog,
) -> Result<SeatingPlan, SeatingError> {
    order_roster(&mut students, config.order);
    let partition = partition_roster(&mut students, &config.nopc_students);
    let queue = PlacementQueue::from_partition(&partition);

    info!(
        students = partition.seated_len(),
        seats = catalog.total_capacity(),
        rooms = catalog.len(),
        "placing students"
    );
    let ledger = place_all(&mut catalog, queue, &config.designated(), config.snake)?;

    let missing = ledger.unassigned(partition.seated_ids());
    if !missing.is_empty() {
        return Err(PlacementError::Uncovered {
            missing: missing.into_iter().collect(),
        }
        .into());
    }

    for student in students.iter_mut() {
        if let Some(assignment) = ledger.lookup(&student.id) {
            student.room = Some(assignment.room.clone());
            student.seat = Some(assignment.seat.clone());
        }
    }

    Ok(SeatingPlan {
        catalog,
        ledger,
        students,
        partition,
        snake: config.snake,
    })
}
