use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::placement::SeatingPlan;
use crate::room::{Cell, RoomGrid, SeatLabeler};

const DESK_CAPTION: &str = "Professor Desk";

/// Formats a student as `SURNAME Name`
pub fn format_student_name(surname: &str, name: &str) -> String {
    if name.is_empty() {
        surname.to_uppercase()
    } else {
        format!("{} {}", surname.to_uppercase(), name)
    }
}

/// Renders a room as a text diagram with grid row 0 at the bottom.
/// Rooms without desk cells get a `Professor Desk` caption under row 0.
/// Occupied cells show the student id, free seats `x`, desk cells `##`.
pub fn render_room(grid: &RoomGrid, labeler: &SeatLabeler) -> String {
    let width = grid
        .matrix()
        .flatten()
        .filter_map(|cell| cell.student().map(|id| id.as_str().len()))
        .max()
        .unwrap_or(0)
        .max(2);
    let gutter = (0..grid.rows())
        .filter_map(|r| labeler.row_label(r).map(|l| l.len()))
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    out.push_str(&format!("** {} **\n", grid.name()));

    out.push_str(&" ".repeat(gutter));
    for c in 0..grid.cols() {
        let header = labeler.col_label(c).map(|n| n.to_string()).unwrap_or_default();
        out.push_str(&format!(" {:^width$}", header, width = width));
    }
    out.push('\n');

    let rows: Vec<&[Cell]> = grid.matrix().collect();
    for (r, row) in rows.iter().enumerate().rev() {
        let label = labeler.row_label(r).unwrap_or_default();
        let mut line = format!("{:<gutter$}", label, gutter = gutter);
        for cell in row.iter() {
            let text = match cell {
                Cell::Occupied(id) => id.as_str(),
                Cell::Free => "x",
                Cell::Desk => "##",
                Cell::Blocked => "",
            };
            line.push_str(&format!(" {:^width$}", text, width = width));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let has_desk = grid.matrix().flatten().any(|c| *c == Cell::Desk);
    if !has_desk {
        let total = gutter + grid.cols() * (width + 1);
        out.push_str(&format!("{:^total$}\n", DESK_CAPTION, total = total.max(DESK_CAPTION.len())));
    }
    out
}

/// Writes the diagram of one room to `path`
pub fn write_room_diagram(grid: &RoomGrid, labeler: &SeatLabeler, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(render_room(grid, labeler).as_bytes())?;
    Ok(())
}

/// Prints the outcome of a run in a readable format
pub fn print_plan_summary(plan: &SeatingPlan) {
    println!("\n=== Seating Plan ===");
    println!(
        "Seated: {} (DSA: {}, no-PC: {}, on-site: {}), excluded online: {}",
        plan.ledger.len(),
        plan.partition.dsa.len(),
        plan.partition.no_pc.len(),
        plan.partition.on_site.len(),
        plan.partition.excluded.len()
    );
    println!(
        "Occupied seats: {}, free seats left: {}",
        plan.catalog.total_occupied(),
        plan.catalog.total_capacity()
    );

    println!("\nRooms:");
    for summary in plan.summaries() {
        let range = match (&summary.first_surname, &summary.last_surname) {
            (Some(first), Some(last)) => format!("{} - {}", first.to_uppercase(), last.to_uppercase()),
            _ => "[EMPTY]".to_string(),
        };
        println!(
            "  {} -> {}/{} seats, {}",
            summary.room, summary.occupied, summary.seats, range
        );
    }
}
