use crate::config::toml_config::ViewDefinition;
use crate::core::aggregate::AggregateSummary;
use crate::core::export::ReportBundle;
use crate::core::view::{FetchOutcome, TableView};
use crate::domain::model::{QueryParams, Record};
use crate::domain::ports::RecordSource;
use crate::domain::schema::{map_records, RecordSchema};
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Visible rows and their summary at one point in time.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub rows: Vec<Record>,
    pub columns: Vec<String>,
    pub summary: AggregateSummary,
}

/// Drives one view: fetch, validate at the boundary, then hand records to the view.
pub struct DashboardEngine<S: RecordSource> {
    source: S,
    resource: String,
    schema: RecordSchema,
    columns: Vec<String>,
    precision: u32,
    view: Arc<Mutex<TableView>>,
}

impl<S: RecordSource> DashboardEngine<S> {
    pub fn new(source: S, definition: &ViewDefinition) -> Self {
        let mut view = TableView::new(definition.filter_fields(), definition.summary_spec());
        view.set_sort(definition.default_sort.clone());
        Self {
            source,
            resource: definition.resource.clone(),
            schema: definition.schema(),
            columns: definition.columns.clone(),
            precision: definition.precision(),
            view: Arc::new(Mutex::new(view)),
        }
    }

    pub fn view(&self) -> Arc<Mutex<TableView>> {
        Arc::clone(&self.view)
    }

    /// The view lock is not held while the request is in flight, so a newer
    /// refresh can start and supersede this one.
    pub async fn refresh(&self, params: &QueryParams) -> Result<FetchOutcome> {
        let ticket = self.view.lock().await.begin_fetch();
        tracing::info!("🔄 Refreshing '{}'", self.resource);

        let result = match self.source.fetch_records(&self.resource, params).await {
            Ok(records) => self.schema.validate(&records).map(|_| records),
            Err(e) => Err(e),
        };

        let mut view = self.view.lock().await;
        match result {
            Ok(records) => {
                let count = records.len();
                let outcome = view.apply_records(ticket, records);
                if outcome == FetchOutcome::Applied {
                    tracing::info!("✅ Loaded {} records from '{}'", count, self.resource);
                }
                Ok(outcome)
            }
            Err(e) => match view.fail_fetch(ticket, &e) {
                FetchOutcome::Stale => Ok(FetchOutcome::Stale),
                _ => Err(e),
            },
        }
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let mut view = self.view.lock().await;
        let rows = view.visible();
        let columns = if self.columns.is_empty() {
            rows.first().map(Record::columns).unwrap_or_default()
        } else {
            self.columns.clone()
        };
        ViewSnapshot {
            rows,
            columns,
            summary: view.summary(),
        }
    }

    pub async fn report(&self) -> Result<ReportBundle> {
        let snapshot = self.snapshot().await;
        ReportBundle::build(&snapshot.rows, &snapshot.columns, snapshot.summary, self.precision)
    }

    /// Visible rows mapped into a feature record type such as `DropiOrder`.
    pub async fn typed_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let rows = self.view.lock().await.visible();
        map_records(&rows, &self.schema.key_field)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }
}
