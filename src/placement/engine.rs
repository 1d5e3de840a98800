use serde::Serialize;
use tracing::{debug, info, warn};

use super::ledger::AssignmentLedger;
use super::queue::{PlacementQueue, QueueClass};
use crate::error::{ConfigError, PlacementError};
use crate::parser::StudentId;
use crate::room::{Cell, RoomCatalog, SeatLabeler, SnakePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Students queued, rooms may still have room.
    Pending,
    /// A single seat commit is in progress.
    Placing,
    Drained,
    /// The selected room had no free seat while students were still queued.
    Exhausted,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Drained | EngineState::Exhausted)
    }
}

/// Rooms pinned to a priority class. The DSA room defaults to the first
/// room of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignatedRooms {
    pub dsa: Option<String>,
    pub no_pc: Option<String>,
}

/// What is left once the engine stops.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub state: EngineState,
    pub ledger: AssignmentLedger,
    pub residual: Vec<StudentId>,
}

/// Seats queued students one at a time.
///
/// DSA and no-PC students always take the first free cell of their
/// designated room. Everyone else goes to the room that currently has the
/// most free seats, so rooms fill evenly.
pub struct PlacementEngine<'a> {
    catalog: &'a mut RoomCatalog,
    labelers: Vec<SeatLabeler>,
    dsa_room: Option<usize>,
    no_pc_room: Option<usize>,
    queue: PlacementQueue,
    ledger: AssignmentLedger,
    state: EngineState,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(
        catalog: &'a mut RoomCatalog,
        queue: PlacementQueue,
        designated: &DesignatedRooms,
        snake: SnakePolicy,
    ) -> Result<Self, ConfigError> {
        let snake = snake.validate()?;
        let dsa_name = designated
            .dsa
            .clone()
            .or_else(|| catalog.names().next().map(str::to_string));
        let dsa_room = resolve(catalog, &queue, QueueClass::Dsa, dsa_name.as_deref())?;
        let no_pc_room = resolve(catalog, &queue, QueueClass::NoPc, designated.no_pc.as_deref())?;

        let labelers = catalog
            .rooms()
            .iter()
            .map(|room| SeatLabeler::new(room, snake))
            .collect();
        let state = if queue.is_empty() {
            EngineState::Drained
        } else {
            EngineState::Pending
        };

        Ok(Self {
            catalog,
            labelers,
            dsa_room,
            no_pc_room,
            queue,
            ledger: AssignmentLedger::new(),
            state,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn ledger(&self) -> &AssignmentLedger {
        &self.ledger
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Commits the seat of the student at the head of the queue.
    pub fn step(&mut self) -> Result<EngineState, PlacementError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        let Some(entry) = self.queue.front().cloned() else {
            self.state = EngineState::Drained;
            return Ok(self.state);
        };

        let target = match entry.class {
            QueueClass::Dsa => self.dsa_room,
            QueueClass::NoPc => self.no_pc_room,
            QueueClass::General => self.catalog.most_free(),
        };
        let Some(index) = target else {
            self.state = EngineState::Exhausted;
            return Ok(self.state);
        };
        let Some(room) = self.catalog.room_mut(index) else {
            self.state = EngineState::Exhausted;
            return Ok(self.state);
        };
        let Some((row, col)) = room.first_free_cell() else {
            warn!(
                room = room.name(),
                class = ?entry.class,
                remaining = self.queue.len(),
                "room is full, placement exhausted"
            );
            self.state = EngineState::Exhausted;
            return Ok(self.state);
        };

        self.state = EngineState::Placing;
        let seat = self.labelers[index]
            .label(row, col)
            .ok_or_else(|| PlacementError::CellNotFree {
                room: room.name().to_string(),
                row,
                col,
                cell: room.cell(row, col).cloned().unwrap_or(Cell::Blocked),
            })?;
        room.occupy(row, col, entry.student.clone())?;
        self.ledger.record(entry.student.clone(), room.name(), seat.clone())?;
        self.queue.pop_front();
        debug!(
            student = %entry.student,
            room = room.name(),
            seat = %seat,
            class = ?entry.class,
            "seat committed"
        );

        self.state = if self.queue.is_empty() {
            EngineState::Drained
        } else {
            EngineState::Pending
        };
        Ok(self.state)
    }

    /// Steps until the queue drains or a room runs out of seats.
    pub fn run(&mut self) -> Result<EngineState, PlacementError> {
        loop {
            let state = self.step()?;
            if state.is_terminal() {
                info!(
                    placed = self.ledger.len(),
                    remaining = self.queue.len(),
                    state = ?state,
                    "placement finished"
                );
                return Ok(state);
            }
        }
    }

    pub fn finish(self) -> PlacementOutcome {
        PlacementOutcome {
            state: self.state,
            residual: self.queue.ids(),
            ledger: self.ledger,
        }
    }
}

fn resolve(
    catalog: &RoomCatalog,
    queue: &PlacementQueue,
    class: QueueClass,
    name: Option<&str>,
) -> Result<Option<usize>, ConfigError> {
    let needed = queue.contains_class(class);
    let what = match class {
        QueueClass::Dsa => "DSA",
        QueueClass::NoPc => "no-PC",
        QueueClass::General => "on-site",
    };
    match name {
        Some(name) => match catalog.index_of(name) {
            Some(index) => {
                if needed {
                    info!(room = name, class = what, "designated room");
                }
                Ok(Some(index))
            }
            None if needed => Err(ConfigError::UnknownRoom(name.to_string())),
            None => Ok(None),
        },
        None if needed => Err(ConfigError::NoDesignatedRoom(what)),
        None => Ok(None),
    }
}

/// Runs the engine to completion. A run that does not drain is a capacity
/// shortfall listing every student still queued.
pub fn place_all(
    catalog: &mut RoomCatalog,
    queue: PlacementQueue,
    designated: &DesignatedRooms,
    snake: SnakePolicy,
) -> Result<AssignmentLedger, crate::error::SeatingError> {
    let mut engine = PlacementEngine::new(catalog, queue, designated, snake)?;
    engine.run()?;
    if engine.state() == EngineState::Exhausted {
        warn!(
            placed = engine.ledger().len(),
            unplaced = engine.remaining(),
            "not enough seats for the roster"
        );
    }
    let outcome = engine.finish();
    match outcome.state {
        EngineState::Drained => Ok(outcome.ledger),
        _ => Err(PlacementError::Capacity {
            unplaced: outcome.residual,
        }
        .into()),
    }
}
