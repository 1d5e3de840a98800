use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{Cell, RoomGrid};
use crate::error::{ConfigError, SeatingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

/// Rows and columns whose cartesian product is seated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

/// Inclusive rectangle between two `row:col` coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: String,
    pub end: String,
}

/// Declarative room layout.
///
/// ```json
/// {
///   "size": { "rows": 5, "cols": 5 },
///   "seats": { "rows": [1, 2, 3, 4], "cols": [0, 1, 2, 3, 4] },
///   "banned": [{ "start": "2:2", "end": "2:2" }],
///   "desk": { "start": "0:1", "end": "0:3" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLayout {
    pub size: GridSize,
    #[serde(alias = "sits")]
    pub seats: Option<SeatSpec>,
    #[serde(default, alias = "banned_sits")]
    pub banned: Vec<CellRange>,
    pub desk: Option<CellRange>,
}

impl RoomLayout {
    /// Builds the grid. Seats are laid first, then banned ranges, then the desk.
    pub fn build(&self, name: &str) -> Result<RoomGrid, ConfigError> {
        let GridSize { rows, cols } = self.size;
        let bounds = |what: &'static str, row: usize, col: usize| -> Result<(), ConfigError> {
            if row < rows && col < cols {
                Ok(())
            } else {
                Err(ConfigError::OutOfBounds {
                    room: name.to_string(),
                    what,
                    row,
                    col,
                    rows,
                    cols,
                })
            }
        };

        let seats = self.seats.as_ref().ok_or_else(|| ConfigError::Missing {
            room: name.to_string(),
            what: "seat",
        })?;
        let desk = self.desk.as_ref().ok_or_else(|| ConfigError::Missing {
            room: name.to_string(),
            what: "desk",
        })?;

        let mut grid = RoomGrid::new(name, rows, cols);
        for &r in &seats.rows {
            for &c in &seats.cols {
                bounds("seat", r, c)?;
                grid.set(r, c, Cell::Free);
            }
        }

        for range in &self.banned {
            let ((r0, c0), (r1, c1)) = parse_range(name, range)?;
            bounds("banned range", r1, c1)?;
            fill(&mut grid, (r0, c0), (r1, c1), Cell::Blocked);
        }

        let ((r0, c0), (r1, c1)) = parse_range(name, desk)?;
        bounds("desk", r1, c1)?;
        fill(&mut grid, (r0, c0), (r1, c1), Cell::Desk);

        if grid.capacity() == 0 {
            return Err(ConfigError::NoSeats(name.to_string()));
        }
        Ok(grid)
    }

    pub fn from_file(path: &Path) -> Result<Self, SeatingError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

fn fill(grid: &mut RoomGrid, from: (usize, usize), to: (usize, usize), value: Cell) {
    for r in from.0..=to.0 {
        for c in from.1..=to.1 {
            grid.set(r, c, value.clone());
        }
    }
}

fn parse_coordinate(room: &str, value: &str) -> Result<(usize, usize), ConfigError> {
    let bad = || ConfigError::BadCoordinate {
        room: room.to_string(),
        value: value.to_string(),
    };
    let (r, c) = value.split_once(':').ok_or_else(bad)?;
    let r = r.trim().parse().map_err(|_| bad())?;
    let c = c.trim().parse().map_err(|_| bad())?;
    Ok((r, c))
}

/// Parses both ends of a range, normalising so that start <= end.
fn parse_range(room: &str, range: &CellRange) -> Result<((usize, usize), (usize, usize)), ConfigError> {
    let (r0, c0) = parse_coordinate(room, &range.start)?;
    let (r1, c1) = parse_coordinate(room, &range.end)?;
    Ok(((r0.min(r1), c0.min(c1)), (r0.max(r1), c0.max(c1))))
}

/// Inclusive, zero-based cell window of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

/// Zero-based index of a column name: A -> 0, Z -> 25, AA -> 26.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let n = letters.bytes().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
    })?;
    Some(n - 1)
}

fn parse_a1(cell: &str) -> Option<(usize, usize)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters)?;
    let row: usize = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col))
}

/// Parses an A1-style window such as `B2:U20`.
pub fn parse_window(window: &str) -> Result<Window, ConfigError> {
    let bad = || ConfigError::BadWindow(window.to_string());
    let upper = window.trim().to_ascii_uppercase();
    let (start, end) = upper.split_once(':').ok_or_else(bad)?;
    let (r0, c0) = parse_a1(start).ok_or_else(bad)?;
    let (r1, c1) = parse_a1(end).ok_or_else(bad)?;
    Ok(Window {
        first_row: r0.min(r1),
        last_row: r0.max(r1),
        first_col: c0.min(c1),
        last_col: c0.max(c1),
    })
}

/// A cell marks a seat when its value is numerically one.
fn is_seat_marker(value: &str) -> bool {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map(|v| v == 1.0)
        .unwrap_or(false)
}

/// Reads a delimited marker sheet and cuts `window` out of it.
///
/// With `headers`, the first row of the cut holds column numbers and its
/// first column holds row numbers; both are dropped before markers are read.
pub fn read_markers(
    path: &Path,
    delimiter: u8,
    window: Option<Window>,
    headers: bool,
) -> Result<Vec<Vec<bool>>, SeatingError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut markers = Vec::new();
    let mut header_row = headers;
    for (r, record) in reader.records().enumerate() {
        let record = record?;
        if let Some(w) = window {
            if r < w.first_row {
                continue;
            }
            if r > w.last_row {
                break;
            }
        }
        if header_row {
            header_row = false;
            continue;
        }
        let row: Vec<bool> = record
            .iter()
            .enumerate()
            .filter(|(c, _)| window.map(|w| *c >= w.first_col && *c <= w.last_col).unwrap_or(true))
            .skip(usize::from(headers))
            .map(|(_, value)| is_seat_marker(value))
            .collect();
        markers.push(row);
    }
    Ok(markers)
}

fn default_delimiter() -> char {
    '\t'
}

fn default_headers() -> bool {
    true
}

/// Where a room's layout comes from. Relative paths resolve against the
/// folder of the run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomSource {
    LayoutFile(PathBuf),
    Inline(RoomLayout),
    Window {
        file: PathBuf,
        #[serde(default)]
        position: Option<String>,
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// The window starts with a column-number row and a row-number column.
        #[serde(default = "default_headers")]
        headers: bool,
    },
}

impl RoomSource {
    pub fn load(&self, name: &str, base_dir: &Path) -> Result<RoomGrid, SeatingError> {
        match self {
            RoomSource::LayoutFile(path) => Ok(RoomLayout::from_file(&base_dir.join(path))?.build(name)?),
            RoomSource::Inline(layout) => Ok(layout.build(name)?),
            RoomSource::Window {
                file,
                position,
                delimiter,
                headers,
            } => {
                let window = position.as_deref().map(parse_window).transpose()?;
                let delimiter = u8::try_from(*delimiter)
                    .ok()
                    .filter(u8::is_ascii)
                    .ok_or_else(|| ConfigError::BadDelimiter {
                        room: name.to_string(),
                        delimiter: *delimiter,
                    })?;
                let markers = read_markers(&base_dir.join(file), delimiter, window, *headers)?;
                Ok(RoomGrid::from_markers(name, &markers)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RoomLayout {
        serde_json::from_str(
            r#"{
                "size": { "rows": 5, "cols": 5 },
                "seats": { "rows": [0, 1, 2, 3], "cols": [0, 1, 2, 3, 4] },
                "banned": [{ "start": "2:2", "end": "2:2" }, { "start": "0:0", "end": "1:0" }],
                "desk": { "start": "4:1", "end": "4:3" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn builds_declarative_layout() {
        let grid = layout().build("R1").unwrap();
        assert_eq!((grid.rows(), grid.cols()), (5, 5));
        assert_eq!(grid.capacity(), 20 - 3);
        assert_eq!(grid.cell(2, 2), Some(&Cell::Blocked));
        assert_eq!(grid.cell(4, 2), Some(&Cell::Desk));
        assert_eq!(grid.cell(4, 0), Some(&Cell::Blocked));
        assert_eq!(grid.first_free_cell(), Some((0, 1)));
    }

    #[test]
    fn out_of_bounds_seat_fails() {
        let mut layout = layout();
        layout.seats = Some(SeatSpec {
            rows: vec![0, 5],
            cols: vec![0],
        });
        let err = layout.build("R1").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfBounds { what: "seat", row: 5, .. }));
    }

    #[test]
    fn out_of_bounds_desk_fails() {
        let mut layout = layout();
        layout.desk = Some(CellRange {
            start: "4:0".into(),
            end: "4:9".into(),
        });
        assert!(matches!(
            layout.build("R1").unwrap_err(),
            ConfigError::OutOfBounds { what: "desk", .. }
        ));
    }

    #[test]
    fn missing_desk_or_seats_fail() {
        let mut no_desk = layout();
        no_desk.desk = None;
        assert_eq!(
            no_desk.build("R1").unwrap_err(),
            ConfigError::Missing { room: "R1".into(), what: "desk" }
        );

        let mut no_seats = layout();
        no_seats.seats = None;
        assert!(matches!(
            no_seats.build("R1").unwrap_err(),
            ConfigError::Missing { what: "seat", .. }
        ));
    }

    #[test]
    fn bad_coordinate_fails() {
        let mut layout = layout();
        layout.banned = vec![CellRange {
            start: "two".into(),
            end: "2:2".into(),
        }];
        assert!(matches!(
            layout.build("R1").unwrap_err(),
            ConfigError::BadCoordinate { .. }
        ));
    }

    #[test]
    fn parses_windows() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AB"), Some(27));
        assert_eq!(
            parse_window("B2:U20").unwrap(),
            Window {
                first_row: 1,
                last_row: 19,
                first_col: 1,
                last_col: 20,
            }
        );
        assert!(parse_window("B2").is_err());
        assert!(parse_window("2B:U20").is_err());
    }

    #[test]
    fn reads_marker_window() {
        let dir = std::env::temp_dir().join(format!("exam-seating-window-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("aula.tsv");
        std::fs::write(&file, "x\tx\tx\tx\nx\t1\t0\t1\nx\t1\t1\t\nx\tx\tx\tx\n").unwrap();

        let source = RoomSource::Window {
            file: PathBuf::from("aula.tsv"),
            position: Some("B2:D3".into()),
            delimiter: '\t',
            headers: false,
        };
        let grid = source.load("Aula", &dir).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (2, 3));
        assert_eq!(grid.capacity(), 4);
        assert!(!grid.is_seat(0, 1));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn source_deserializes_from_json() {
        let source: RoomSource =
            serde_json::from_str(r#"{ "window": { "file": "aule.tsv", "position": "B2:U20" } }"#).unwrap();
        assert_eq!(
            source,
            RoomSource::Window {
                file: PathBuf::from("aule.tsv"),
                position: Some("B2:U20".into()),
                delimiter: '\t',
                headers: true,
            }
        );
    }

    #[test]
    fn header_row_and_index_column_are_not_seats() {
        let dir = std::env::temp_dir().join(format!("exam-seating-headers-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("aula.tsv");
        std::fs::write(
            &file,
            "title\t\t\t\t\n\
             \t\t1\t2\t3\n\
             \t1\t1\t0\t1\n\
             \t2\t1\t1\t0\n\
             \t3\t0\t1\t1\n",
        )
        .unwrap();

        let source = RoomSource::Window {
            file: PathBuf::from("aula.tsv"),
            position: Some("B2:E5".into()),
            delimiter: '\t',
            headers: true,
        };
        let grid = source.load("Aula", &dir).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (3, 3));
        assert_eq!(grid.capacity(), 6);
        assert!(grid.is_seat(0, 0));
        assert!(!grid.is_seat(0, 1));
        assert!(!grid.is_seat(2, 0));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn oversized_column_letters_are_rejected() {
        assert_eq!(column_index("AAAAAAAAAAAAAAAA"), None);
        assert!(matches!(
            parse_window("AAAAAAAAAAAAAAAA1:B2"),
            Err(ConfigError::BadWindow(_))
        ));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let source = RoomSource::Window {
            file: PathBuf::from("missing.tsv"),
            position: None,
            delimiter: 'é',
            headers: true,
        };
        let err = source.load("Aula", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            SeatingError::Config(ConfigError::BadDelimiter { delimiter: 'é', .. })
        ));
    }
}
