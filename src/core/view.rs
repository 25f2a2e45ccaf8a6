use crate::core::aggregate::{AggregateSummary, Memo, SummarySpec};
use crate::core::filter::{apply_filters, FilterCriteria, FilterFields};
use crate::core::sort::{sort_in_place, SortState};
use crate::domain::model::Record;
use crate::utils::error::{ErrorCategory, HubError, Result};

/// Identifies one fetch; only the newest ticket may replace the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    Stale,
}

/// What the error banner shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewError {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&HubError> for ViewError {
    fn from(e: &HubError) -> Self {
        Self {
            category: e.category(),
            message: e.user_friendly_message(),
        }
    }
}

/// Local state of one tabular page.
pub struct TableView {
    records: Vec<Record>,
    fields: FilterFields,
    criteria: FilterCriteria,
    sort: Option<SortState>,
    summary_spec: SummarySpec,
    error: Option<ViewError>,
    generation: u64,
    memo: Memo<Vec<Record>, AggregateSummary>,
}

impl TableView {
    pub fn new(fields: FilterFields, summary_spec: SummarySpec) -> Self {
        Self {
            records: Vec::new(),
            fields,
            criteria: FilterCriteria::default(),
            sort: None,
            summary_spec,
            error: None,
            generation: 0,
            memo: Memo::new(),
        }
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket(self.generation)
    }

    /// Applies a finished fetch. Superseded tickets are ignored; failures keep
    /// the previous records and set the banner error.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<Record>>) -> FetchOutcome {
        match result {
            Ok(records) => self.apply_records(ticket, records),
            Err(e) => self.fail_fetch(ticket, &e),
        }
    }

    pub fn apply_records(&mut self, ticket: FetchTicket, records: Vec<Record>) -> FetchOutcome {
        if self.is_stale(ticket) {
            return FetchOutcome::Stale;
        }
        self.records = records;
        self.error = None;
        FetchOutcome::Applied
    }

    pub fn fail_fetch(&mut self, ticket: FetchTicket, error: &HubError) -> FetchOutcome {
        if self.is_stale(ticket) {
            return FetchOutcome::Stale;
        }
        tracing::warn!(
            "Fetch failed, keeping {} previous records: {}",
            self.records.len(),
            error
        );
        self.error = Some(ViewError::from(error));
        FetchOutcome::Failed
    }

    fn is_stale(&self, ticket: FetchTicket) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                "Discarding stale fetch result (ticket {}, current {})",
                ticket.0,
                self.generation
            );
            return true;
        }
        false
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn set_search(&mut self, term: &str) {
        self.criteria.search = Some(term.to_string());
    }

    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self, column: &str) {
        self.sort = Some(SortState::toggle(self.sort.as_ref(), column));
    }

    pub fn filtered(&self) -> Vec<Record> {
        apply_filters(&self.records, &self.criteria, &self.fields)
    }

    /// Filtered, then sorted by the active column.
    pub fn visible(&self) -> Vec<Record> {
        let mut rows = self.filtered();
        if let Some(sort) = &self.sort {
            sort_in_place(&mut rows, &sort.column, sort.direction);
        }
        rows
    }

    pub fn summary(&mut self) -> AggregateSummary {
        let filtered = self.filtered();
        let spec = &self.summary_spec;
        self.memo
            .get_or_compute(&filtered, |rows| AggregateSummary::compute(rows, spec))
            .clone()
    }

    pub fn summary_spec(&self) -> &SummarySpec {
        &self.summary_spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sort::SortDirection;

    fn view() -> TableView {
        TableView::new(
            FilterFields {
                search_fields: vec!["nome".to_string()],
                ..Default::default()
            },
            SummarySpec {
                status_vocabulary: vec!["ativo".to_string(), "pausado".to_string()],
                ..Default::default()
            },
        )
    }

    fn rec(id: i64, nome: &str, status: &str) -> Record {
        Record::new().with("id", id).with("nome", nome).with("status", status)
    }

    #[test]
    fn test_failed_fetch_keeps_previous_records() {
        let mut v = view();
        let t = v.begin_fetch();
        assert_eq!(v.complete_fetch(t, Ok(vec![rec(1, "a", "ativo")])), FetchOutcome::Applied);

        let t = v.begin_fetch();
        let err = HubError::ServerFaultError {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(v.complete_fetch(t, Err(err)), FetchOutcome::Failed);
        assert_eq!(v.records().len(), 1);
        assert_eq!(v.error().unwrap().category, ErrorCategory::ServerFault);

        let t = v.begin_fetch();
        v.complete_fetch(t, Ok(vec![]));
        assert!(v.error().is_none());
    }

    #[test]
    fn test_banner_shows_server_detail_for_client_errors() {
        let mut v = view();
        let t = v.begin_fetch();
        let err = crate::adapters::http::classify_failure(
            403,
            r#"{"detail": "Você não tem permissão para executar essa ação."}"#,
        );
        assert_eq!(v.fail_fetch(t, &err), FetchOutcome::Failed);
        assert!(v.error().unwrap().message.contains("permissão"));

        let t = v.begin_fetch();
        let err = crate::adapters::http::classify_failure(500, "<html><body>Server Error</body></html>");
        v.fail_fetch(t, &err);
        assert!(v.error().unwrap().message.contains("HTTP 500"));
    }

    #[test]
    fn test_stale_fetch_is_ignored() {
        let mut v = view();
        let first = v.begin_fetch();
        let second = v.begin_fetch();
        assert_eq!(v.complete_fetch(second, Ok(vec![rec(2, "new", "ativo")])), FetchOutcome::Applied);
        assert_eq!(v.complete_fetch(first, Ok(vec![rec(1, "old", "ativo")])), FetchOutcome::Stale);
        assert_eq!(v.records()[0].text("nome").as_deref(), Some("new"));
    }

    #[test]
    fn test_visible_filters_then_sorts() {
        let mut v = view().with_records(vec![
            rec(1, "Zeta", "ativo"),
            rec(2, "alfa", "pausado"),
            rec(3, "Beta", "ativo"),
        ]);
        v.set_criteria(FilterCriteria::default().with_status("ativo"));
        v.toggle_sort("nome");
        let names: Vec<String> = v.visible().iter().filter_map(|r| r.text("nome")).collect();
        assert_eq!(names, vec!["Beta", "Zeta"]);

        v.toggle_sort("nome");
        assert_eq!(v.sort_state().unwrap().direction, SortDirection::Desc);
        v.reset_filters();
        assert_eq!(v.visible().len(), 3);
    }

    #[test]
    fn test_summary_tracks_filters() {
        let mut v = view().with_records(vec![rec(1, "a", "ativo"), rec(2, "b", "pausado")]);
        assert_eq!(v.summary().total, 2);
        v.set_search("b");
        let s = v.summary();
        assert_eq!(s.total, 1);
        assert_eq!(s.by_status.get("pausado"), 1);
        assert_eq!(s.by_status.get("ativo"), 0);
    }
}
