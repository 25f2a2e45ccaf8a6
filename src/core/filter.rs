use crate::domain::model::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Active predicates of a view. Empty members match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub statuses: BTreeSet<String>,
    #[serde(default)]
    pub creators: BTreeSet<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub created_from: Option<NaiveDate>,
    #[serde(default)]
    pub created_to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
            && self.creators.is_empty()
            && self.search_term().is_none()
            && self.created_from.is_none()
            && self.created_to.is_none()
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.statuses.insert(status.to_string());
        self
    }

    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creators.insert(creator.trim().to_string());
        self
    }

    pub fn with_search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn with_created_from(mut self, date: NaiveDate) -> Self {
        self.created_from = Some(date);
        self
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Which columns each predicate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterFields {
    #[serde(default = "default_status_field")]
    pub status_field: String,
    #[serde(default)]
    pub creator_field: Option<String>,
    #[serde(default)]
    pub date_field: Option<String>,
    #[serde(default)]
    pub search_fields: Vec<String>,
}

fn default_status_field() -> String {
    "status".to_string()
}

impl Default for FilterFields {
    fn default() -> Self {
        Self {
            status_field: default_status_field(),
            creator_field: None,
            date_field: None,
            search_fields: Vec::new(),
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and `DD/MM/YYYY`.
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Splits a comma-separated name list, dropping blanks.
pub fn split_names(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

pub fn matches(record: &Record, criteria: &FilterCriteria, fields: &FilterFields) -> bool {
    if !criteria.statuses.is_empty() {
        match record.text(&fields.status_field) {
            Some(status) if criteria.statuses.contains(&status) => {}
            _ => return false,
        }
    }

    if !criteria.creators.is_empty() {
        let names = fields
            .creator_field
            .as_deref()
            .and_then(|f| record.text(f))
            .unwrap_or_default();
        if !split_names(&names).any(|n| criteria.creators.contains(n)) {
            return false;
        }
    }

    if let Some(term) = criteria.search_term() {
        let hit = fields.search_fields.iter().any(|f| {
            record
                .text(f)
                .map(|v| v.to_lowercase().contains(&term))
                .unwrap_or(false)
        });
        if !hit {
            return false;
        }
    }

    if criteria.created_from.is_some() || criteria.created_to.is_some() {
        let date = fields
            .date_field
            .as_deref()
            .and_then(|f| record.text(f))
            .and_then(|s| parse_record_date(&s));
        let Some(date) = date else {
            return false;
        };
        if criteria.created_from.is_some_and(|from| date < from) {
            return false;
        }
        if criteria.created_to.is_some_and(|to| date > to) {
            return false;
        }
    }

    true
}

/// Order-preserving filter: a record survives iff it matches every active predicate.
pub fn apply_filters(records: &[Record], criteria: &FilterCriteria, fields: &FilterFields) -> Vec<Record> {
    if criteria.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches(r, criteria, fields))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> FilterFields {
        FilterFields {
            status_field: "status".to_string(),
            creator_field: Some("criadores".to_string()),
            date_field: Some("data_criacao".to_string()),
            search_fields: vec!["nome".to_string(), "descricao".to_string()],
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            Record::new()
                .with("id", 1)
                .with("nome", "Bot de WhatsApp")
                .with("descricao", "Atendimento")
                .with("status", "ativo")
                .with("criadores", "Ana, Bob")
                .with("data_criacao", "2024-01-14T23:59:59Z"),
            Record::new()
                .with("id", 2)
                .with("nome", "Relatório N1")
                .with("descricao", "Planilha automática")
                .with("status", "arquivado")
                .with("criadores", "Bob")
                .with("data_criacao", "2024-01-15T00:00:00Z"),
            Record::new()
                .with("id", 3)
                .with("nome", "Extrator Dropi")
                .with("descricao", "Pedidos")
                .with("status", "ativo")
                .with("criadores", "Carla")
                .with("data_criacao", "2024-02-01"),
        ]
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().filter_map(|r| r.text("id")).collect()
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let records = sample();
        assert_eq!(apply_filters(&records, &FilterCriteria::default(), &fields()), records);
        let blank = FilterCriteria::default().with_search("   ");
        assert_eq!(apply_filters(&records, &blank, &fields()), records);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample();
        let criteria = FilterCriteria::default().with_status("ativo").with_creator("Ana");
        let once = apply_filters(&records, &criteria, &fields());
        let twice = apply_filters(&once, &criteria, &fields());
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec!["1"]);
    }

    #[test]
    fn test_status_membership() {
        let criteria = FilterCriteria::default().with_status("ativo");
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["1", "3"]);
    }

    #[test]
    fn test_creator_intersection_on_comma_lists() {
        let criteria = FilterCriteria::default().with_creator("Bob");
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["1", "2"]);
        let criteria = FilterCriteria::default().with_creator("Carla").with_creator("Ana");
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["1", "3"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_fields() {
        let criteria = FilterCriteria::default().with_search("PLANILHA");
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["2"]);
        let criteria = FilterCriteria::default().with_search("dropi");
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["3"]);
    }

    #[test]
    fn test_created_from_is_start_of_day_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let criteria = FilterCriteria::default().with_created_from(start);
        assert_eq!(ids(&apply_filters(&sample(), &criteria, &fields())), vec!["2", "3"]);
    }

    #[test]
    fn test_unparseable_date_fails_active_date_filter() {
        let records = vec![Record::new().with("id", 9).with("data_criacao", "ontem")];
        let criteria =
            FilterCriteria::default().with_created_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(apply_filters(&records, &criteria, &fields()).is_empty());
    }

    #[test]
    fn test_parse_record_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_record_date("2024-01-15"), d);
        assert_eq!(parse_record_date("15/01/2024"), d);
        assert_eq!(parse_record_date("2024-01-15 08:30:00"), d);
        assert_eq!(parse_record_date("2024-01-15T08:30:00.123"), d);
        assert_eq!(parse_record_date("2024-01-15T08:30:00-03:00"), d);
        assert_eq!(parse_record_date("janeiro"), None);
    }
}
