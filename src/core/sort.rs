use crate::domain::model::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// The single active sort column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: &str, direction: SortDirection) -> Self {
        Self {
            column: column.to_string(),
            direction,
        }
    }

    /// Clicking a header: same column flips, another column starts ascending.
    pub fn toggle(current: Option<&SortState>, column: &str) -> SortState {
        match current {
            Some(state) if state.column == column => SortState {
                column: state.column.clone(),
                direction: state.direction.flipped(),
            },
            _ => SortState::new(column, SortDirection::Asc),
        }
    }
}

/// Ranks missing values first, then numbers, then text.
#[derive(Debug, Clone)]
enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Parses "40%", "40.00% (Média)" or "12,5%" into the leading number.
pub fn parse_percent(s: &str) -> Option<f64> {
    let head = s.split('%').next()?.trim().replace(',', ".");
    head.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn coerce_str(s: &str) -> SortKey {
    if s.contains('%') {
        if let Some(n) = parse_percent(s) {
            return SortKey::Number(n);
        }
    }
    match s.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && !s.trim().is_empty() => SortKey::Number(n),
        _ => SortKey::Text(s.to_string()),
    }
}

fn sort_key(value: Option<&Value>) -> SortKey {
    match value {
        None | Some(Value::Null) => SortKey::Missing,
        Some(Value::Number(n)) => n
            .as_f64()
            .map(SortKey::Number)
            .unwrap_or_else(|| SortKey::Text(n.to_string())),
        Some(Value::String(s)) => coerce_str(s),
        Some(other) => SortKey::Text(other.to_string()),
    }
}

/// Total order over cell values: missing, then numbers, then case-sensitive text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Stable sort by one column; ties keep their input order in both directions.
pub fn sort_records(records: &[Record], column: &str, direction: SortDirection) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sort_in_place(&mut sorted, column, direction);
    sorted
}

pub fn sort_in_place(records: &mut [Record], column: &str, direction: SortDirection) {
    records.sort_by(|a, b| {
        let cmp = compare_values(a.get(column), b.get(column));
        match direction {
            SortDirection::Asc => cmp,
            SortDirection::Desc => cmp.reverse(),
        }
    });
}
