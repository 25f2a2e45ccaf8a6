use crate::core::aggregate::AggregateSummary;
use crate::core::render::{chart_series, render_table, stat_cards, ChartSeries, StatCard};
use crate::domain::model::Record;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub csv: String,
    pub tsv: String,
    pub summary: AggregateSummary,
    pub cards: Vec<StatCard>,
    pub charts: Vec<ChartSeries>,
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    summary: &'a AggregateSummary,
    cards: &'a [StatCard],
}

impl ReportBundle {
    pub fn build(
        rows: &[Record],
        columns: &[String],
        summary: AggregateSummary,
        precision: u32,
    ) -> Result<Self> {
        Ok(Self {
            csv: render_table(rows, columns, b',')?,
            tsv: render_table(rows, columns, b'\t')?,
            cards: stat_cards(&summary, precision),
            charts: chart_series(&summary),
            summary,
        })
    }

    pub fn to_zip(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file::<_, ()>("tabela.csv", FileOptions::default())?;
        zip.write_all(self.csv.as_bytes())?;

        zip.start_file::<_, ()>("tabela.tsv", FileOptions::default())?;
        zip.write_all(self.tsv.as_bytes())?;

        zip.start_file::<_, ()>("resumo.json", FileOptions::default())?;
        let summary = SummaryFile {
            summary: &self.summary,
            cards: &self.cards,
        };
        zip.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;

        if !self.charts.is_empty() {
            zip.start_file::<_, ()>("graficos.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&self.charts)?.as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Writes the bundle as a ZIP through `storage`; returns the number of bytes written.
pub async fn export_report<S: Storage>(storage: &S, file_name: &str, bundle: &ReportBundle) -> Result<usize> {
    let data = bundle.to_zip()?;
    tracing::debug!("Writing ZIP file ({} bytes) to storage", data.len());
    storage.write_file(file_name, &data).await?;
    Ok(data.len())
}
