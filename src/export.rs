use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::display::write_room_diagram;
use crate::error::SeatingError;
use crate::parser::StudentRecord;
use crate::placement::SeatingPlan;
use crate::room::{Cell, RoomGrid};

const ASSIGNMENT_HEADERS: [&str; 6] = ["MATRICOLA", "COGNOME", "NOME", "NOTE", "AULA", "POSTO"];

/// Writes the assignment table: one row per seated student.
pub fn write_assignments<'a, W: Write>(
    writer: W,
    students: impl IntoIterator<Item = &'a StudentRecord>,
) -> Result<(), SeatingError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(ASSIGNMENT_HEADERS)?;
    for student in students.into_iter().filter(|s| !s.is_excluded()) {
        let seat = student.seat.as_ref().map(|s| s.to_string()).unwrap_or_default();
        wtr.write_record([
            student.id.as_str(),
            student.surname.as_str(),
            student.name.as_str(),
            student.note.as_str(),
            student.room.as_deref().unwrap_or(""),
            seat.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the final cell matrix of a room. Occupied cells hold the student
/// id, free seats `x`, the desk `##`, anything else is left empty.
pub fn write_room_matrix<W: Write>(writer: W, grid: &RoomGrid) -> Result<(), SeatingError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in grid.matrix() {
        let record: Vec<&str> = row
            .iter()
            .map(|cell| match cell {
                Cell::Occupied(id) => id.as_str(),
                Cell::Free => "x",
                Cell::Desk => "##",
                Cell::Blocked => "",
            })
            .collect();
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes every output of a run next to `prefix` and returns the files.
pub fn export_plan(plan: &SeatingPlan, prefix: &Path) -> Result<Vec<PathBuf>, SeatingError> {
    let mut written = Vec::new();

    let path = with_suffix(prefix, "_prenotati.csv");
    write_assignments(std::fs::File::create(&path)?, &plan.students)?;
    written.push(path);

    for grid in plan.catalog.rooms() {
        let room = grid.name();

        let path = with_suffix(prefix, &format!("_prenotati_{}.csv", room));
        write_assignments(std::fs::File::create(&path)?, plan.students_in(room))?;
        written.push(path);

        let path = with_suffix(prefix, &format!("_disposizioni_{}.txt", room));
        write_room_diagram(grid, &plan.labeler(grid), &path)?;
        written.push(path);

        let path = with_suffix(prefix, &format!("_disposizioni_{}.csv", room));
        write_room_matrix(std::fs::File::create(&path)?, grid)?;
        written.push(path);
    }

    info!(files = written.len(), prefix = %prefix.display(), "plan exported");
    Ok(written)
}
