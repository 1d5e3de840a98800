use csv::{ReaderBuilder, StringRecord, Trim};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::RosterError;
use crate::room::SeatLabel;

/// Prefix of the roster exports dropped into an exam folder.
pub const ROSTER_FILE_PREFIX: &str = "VISAP_Elenco_Studenti_";

/// Matriculation number, the primary key of a student.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StudentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placement class of a student, derived once from the note field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// DSA / extra time: seated in the designated DSA room.
    Accommodation,
    /// Needs a room without computers.
    NoPc,
    /// Sits the exam online, never seated.
    OnlineExcluded,
    OnSite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub surname: String,
    pub name: String,
    pub note: String,
    pub category: Category,
    pub room: Option<String>,
    pub seat: Option<SeatLabel>,
}

impl StudentRecord {
    pub fn new(id: &str, surname: &str, name: &str, note: &str) -> Self {
        Self {
            id: StudentId::from(id.trim()),
            surname: surname.trim().to_string(),
            name: name.trim().to_string(),
            note: note.trim().to_string(),
            category: classify(note),
            room: None,
            seat: None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.category == Category::OnlineExcluded
    }
}

/// Classifies a free-text note. Matching is case-insensitive; accommodation
/// wins over no-PC, which wins over the online exclusion.
pub fn classify(note: &str) -> Category {
    let note = note.to_lowercase();
    if note.contains("dsa") || note.contains("tempo aggiuntivo") {
        Category::Accommodation
    } else if note.contains("nopc") {
        Category::NoPc
    } else if note.contains("esame online") {
        Category::OnlineExcluded
    } else {
        Category::OnSite
    }
}

/// Order in which students of the same class are seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// By surname, then name. Ties keep roster order.
    #[default]
    Alphabetical,
    /// Reproducible shuffle.
    Shuffled { seed: u64 },
    /// Exactly as the roster lists them.
    AsGiven,
}

pub fn order_roster(records: &mut [StudentRecord], policy: OrderPolicy) {
    match policy {
        OrderPolicy::Alphabetical => records.sort_by(|a, b| {
            a.surname
                .to_lowercase()
                .cmp(&b.surname.to_lowercase())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }),
        OrderPolicy::Shuffled { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            records.shuffle(&mut rng);
        }
        OrderPolicy::AsGiven => {}
    }
}

/// The roster split into the disjoint placement classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub dsa: Vec<StudentId>,
    pub no_pc: Vec<StudentId>,
    pub on_site: Vec<StudentId>,
    pub excluded: Vec<StudentId>,
}

impl Partition {
    /// Every student that must end up with a seat.
    pub fn seated_ids(&self) -> impl Iterator<Item = &StudentId> {
        self.dsa.iter().chain(&self.no_pc).chain(&self.on_site)
    }

    pub fn seated_len(&self) -> usize {
        self.dsa.len() + self.no_pc.len() + self.on_site.len()
    }
}

/// Splits an already ordered roster. On-site students listed in `no_pc_ids`
/// are moved to the no-PC class; their category is updated in place.
pub fn partition_roster(records: &mut [StudentRecord], no_pc_ids: &[StudentId]) -> Partition {
    let no_pc_ids: HashSet<&StudentId> = no_pc_ids.iter().collect();
    let mut partition = Partition::default();

    for record in records.iter_mut() {
        if record.category == Category::OnSite && no_pc_ids.contains(&record.id) {
            record.category = Category::NoPc;
        }
        let queue = match record.category {
            Category::Accommodation => &mut partition.dsa,
            Category::NoPc => &mut partition.no_pc,
            Category::OnSite => &mut partition.on_site,
            Category::OnlineExcluded => &mut partition.excluded,
        };
        queue.push(record.id.clone());
    }

    info!(
        dsa = partition.dsa.len(),
        no_pc = partition.no_pc.len(),
        on_site = partition.on_site.len(),
        excluded = partition.excluded.len(),
        "roster partitioned"
    );
    partition
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        names.iter().any(|n| h == *n)
    })
}

/// Reads one roster CSV from any reader.
pub fn load_roster_from_reader<R: Read>(reader: R) -> Result<Vec<StudentRecord>, RosterError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let id_col = find_column(&headers, &["matricola", "id", "student_id"])
        .ok_or(RosterError::MissingColumn("MATRICOLA"))?;
    let surname_col = find_column(&headers, &["cognome", "surname"])
        .ok_or(RosterError::MissingColumn("COGNOME"))?;
    let name_col = find_column(&headers, &["nome", "name"]);
    let note_col = find_column(&headers, &["note", "notes"]);

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let id = row.get(id_col).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        let surname = row.get(surname_col).unwrap_or("");
        let name = name_col.and_then(|c| row.get(c)).unwrap_or("");
        let note = note_col.and_then(|c| row.get(c)).unwrap_or("");
        records.push(StudentRecord::new(id, surname, name, note));
    }
    Ok(records)
}

/// Loads and concatenates roster files, dropping repeated ids (first one wins).
pub fn load_roster<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<StudentRecord>, RosterError> {
    let mut records = Vec::new();
    for path in paths {
        let file = File::open(path.as_ref())?;
        records.extend(load_roster_from_reader(file)?);
    }
    Ok(dedup_roster(records))
}

/// Finds every `VISAP_Elenco_Studenti_*.csv` in `folder`, sorted by file name.
pub fn find_roster_files(folder: &Path) -> Result<Vec<PathBuf>, RosterError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let is_csv = path.extension().map(|e| e == "csv").unwrap_or(false);
            let named = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ROSTER_FILE_PREFIX))
                .unwrap_or(false);
            is_csv && named
        })
        .collect();
    if files.is_empty() {
        return Err(RosterError::NoFiles(folder.display().to_string()));
    }
    files.sort();
    Ok(files)
}

pub fn dedup_roster(records: Vec<StudentRecord>) -> Vec<StudentRecord> {
    let mut seen = HashSet::new();
    let total = records.len();
    let unique: Vec<StudentRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(
            duplicates = total - unique.len(),
            "duplicate students in the roster, keeping the first occurrence"
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
MATRICOLA,COGNOME,NOME,DOCENTE,NOTE
300,Verdi,Anna,Rossi,
100,Bianchi,Luca,Rossi,Dsa
200,Neri,Marco,Rossi,Esame online
400,Gialli,Sara,Rossi,Tempo aggiuntivo 30%
500,Azzurri,Paolo,Rossi,NoPC
,Vuoto,Riga,Rossi,
";

    fn roster() -> Vec<StudentRecord> {
        load_roster_from_reader(ROSTER.as_bytes()).unwrap()
    }

    #[test]
    fn classify_notes() {
        assert_eq!(classify("Dsa"), Category::Accommodation);
        assert_eq!(classify("DSA certificato"), Category::Accommodation);
        assert_eq!(classify("Tempo aggiuntivo"), Category::Accommodation);
        assert_eq!(classify("NoPC"), Category::NoPc);
        assert_eq!(classify("Esame online"), Category::OnlineExcluded);
        assert_eq!(classify(""), Category::OnSite);
        assert_eq!(classify("Dsa, Esame online"), Category::Accommodation);
    }

    #[test]
    fn loads_rows_and_skips_missing_ids() {
        let records = roster();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].id.as_str(), "300");
        assert_eq!(records[1].category, Category::Accommodation);
        assert_eq!(records[2].category, Category::OnlineExcluded);
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let err = load_roster_from_reader("COGNOME,NOME\nRossi,Anna\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RosterError::MissingColumn("MATRICOLA")));
    }

    #[test]
    fn english_headers_are_accepted() {
        let records =
            load_roster_from_reader("id,surname,name,note\n1,Doe,Jane,\n".as_bytes()).unwrap();
        assert_eq!(records[0].surname, "Doe");
    }

    #[test]
    fn alphabetical_order_is_by_surname() {
        let mut records = roster();
        order_roster(&mut records, OrderPolicy::Alphabetical);
        let surnames: Vec<&str> = records.iter().map(|r| r.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Azzurri", "Bianchi", "Gialli", "Neri", "Verdi"]);
    }

    #[test]
    fn shuffle_is_reproducible() {
        let mut a = roster();
        let mut b = roster();
        order_roster(&mut a, OrderPolicy::Shuffled { seed: 7 });
        order_roster(&mut b, OrderPolicy::Shuffled { seed: 7 });
        let ids_a: Vec<_> = a.iter().map(|r| r.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn partition_is_disjoint_and_ordered() {
        let mut records = roster();
        order_roster(&mut records, OrderPolicy::Alphabetical);
        let partition = partition_roster(&mut records, &[StudentId::from("300")]);

        assert_eq!(partition.dsa, vec![StudentId::from("100"), StudentId::from("400")]);
        assert_eq!(partition.no_pc, vec![StudentId::from("500"), StudentId::from("300")]);
        assert!(partition.on_site.is_empty());
        assert_eq!(partition.excluded, vec![StudentId::from("200")]);
        assert_eq!(partition.seated_len(), 4);
        assert_eq!(records[4].category, Category::NoPc);
    }

    #[test]
    fn no_pc_list_does_not_pull_in_excluded_students() {
        let mut records = roster();
        let partition = partition_roster(&mut records, &[StudentId::from("200")]);
        assert_eq!(partition.excluded, vec![StudentId::from("200")]);
        assert!(!partition.no_pc.contains(&StudentId::from("200")));
    }

    #[test]
    fn dedup_keeps_first() {
        let records = vec![
            StudentRecord::new("1", "A", "", ""),
            StudentRecord::new("1", "B", "", ""),
            StudentRecord::new("2", "C", "", ""),
        ];
        let unique = dedup_roster(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].surname, "A");
    }

    #[test]
    fn finds_roster_files_in_folder() {
        let dir = std::env::temp_dir().join(format!("exam-seating-roster-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("VISAP_Elenco_Studenti_2.csv"), ROSTER).unwrap();
        std::fs::write(dir.join("VISAP_Elenco_Studenti_1.csv"), ROSTER).unwrap();
        std::fs::write(dir.join("other.csv"), ROSTER).unwrap();

        let files = find_roster_files(&dir).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("VISAP_Elenco_Studenti_1.csv"));

        let records = load_roster(&files).unwrap();
        assert_eq!(records.len(), 5);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
