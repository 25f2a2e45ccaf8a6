//! Per-product effectiveness (delivered over total) from an uploaded order CSV.

use crate::core::aggregate::{format_percentage, ratio_percentage};
use crate::domain::model::Record;
use crate::utils::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TOTAL_LABEL: &str = "Total";
pub const AVERAGE_NOTE: &str = "(Média)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfetividadeOptions {
    pub product_column: String,
    pub status_column: String,
    /// Used when there is no status column: a count, or the status of a confirmed order.
    pub confirmed_column: String,
    /// Delivered count beside a numeric confirmed column; `Entregues` is also accepted.
    pub delivered_column: String,
    pub delivered_statuses: Vec<String>,
    pub precision: u32,
}

impl Default for EfetividadeOptions {
    fn default() -> Self {
        Self {
            product_column: "Product".to_string(),
            status_column: "Status".to_string(),
            confirmed_column: "Confirmed".to_string(),
            delivered_column: "Delivered".to_string(),
            delivered_statuses: vec!["Delivered".to_string(), "Entregue".to_string()],
            precision: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEffectiveness {
    pub product: String,
    pub total: usize,
    pub delivered: usize,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfetividadeTable {
    pub rows: Vec<ProductEffectiveness>,
    pub precision: u32,
}

impl EfetividadeTable {
    /// Mean effectiveness over product rows; 0 for an empty table.
    pub fn average(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.rows.iter().map(|r| r.effectiveness).sum();
        let factor = 10f64.powi(self.precision as i32);
        (sum / self.rows.len() as f64 * factor).round() / factor
    }

    /// Table rows as records, followed by the `Total` row.
    pub fn to_records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .rows
            .iter()
            .map(|r| {
                Record::new()
                    .with("Produto", r.product.clone())
                    .with("Totais", r.total)
                    .with("Entregues", r.delivered)
                    .with("Efetividade", format_percentage(r.effectiveness, self.precision))
            })
            .collect();

        let total: usize = self.rows.iter().map(|r| r.total).sum();
        let delivered: usize = self.rows.iter().map(|r| r.delivered).sum();
        records.push(
            Record::new()
                .with("Produto", TOTAL_LABEL)
                .with("Totais", total)
                .with("Entregues", delivered)
                .with(
                    "Efetividade",
                    format!("{} {}", format_percentage(self.average(), self.precision), AVERAGE_NOTE),
                ),
        );
        records
    }

    pub fn columns() -> Vec<String> {
        ["Produto", "Totais", "Entregues", "Efetividade"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Per-product totals in first-seen product order.
#[derive(Default)]
struct Tally {
    index: HashMap<String, usize>,
    rows: Vec<ProductEffectiveness>,
}

impl Tally {
    fn add(&mut self, product: &str, total: usize, delivered: usize) {
        let product = product.trim();
        if product.is_empty() {
            return;
        }
        let rows = &mut self.rows;
        let slot = *self.index.entry(product.to_string()).or_insert_with(|| {
            rows.push(ProductEffectiveness {
                product: product.to_string(),
                total: 0,
                delivered: 0,
                effectiveness: 0.0,
            });
            rows.len() - 1
        });
        rows[slot].total += total;
        rows[slot].delivered += delivered;
    }

    fn finish(self, precision: u32) -> EfetividadeTable {
        let mut rows = self.rows;
        for row in &mut rows {
            row.effectiveness = ratio_percentage(row.delivered as f64, row.total as f64, precision);
        }
        EfetividadeTable { rows, precision }
    }
}

fn is_delivered(status: &str, options: &EfetividadeOptions) -> bool {
    options
        .delivered_statuses
        .iter()
        .any(|d| d.eq_ignore_ascii_case(status.trim()))
}

/// Groups `(product, status)` pairs, one pair per order.
pub fn compute_effectiveness<'a>(
    orders: impl IntoIterator<Item = (&'a str, &'a str)>,
    options: &EfetividadeOptions,
) -> EfetividadeTable {
    let mut tally = Tally::default();
    for (product, status) in orders {
        tally.add(product, 1, usize::from(is_delivered(status, options)));
    }
    tally.finish(options.precision)
}

/// Parses an uploaded order CSV.
///
/// With a status column every row is one order. Without one, the confirmed
/// column is read per row: a number is a confirmed count (delivered count from
/// the delivered column, 0 when absent), anything else is that order's status.
pub fn parse_orders_csv(bytes: &[u8], options: &EfetividadeOptions) -> Result<EfetividadeTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(column))
    };
    let product_idx = find(&options.product_column)
        .ok_or_else(|| HubError::client_validation(&options.product_column, "Coluna ausente no CSV"))?;
    let status_idx = find(&options.status_column);
    let confirmed_idx = find(&options.confirmed_column);
    let delivered_idx = find(&options.delivered_column).or_else(|| find("Entregues"));
    let value_idx = status_idx
        .or(confirmed_idx)
        .ok_or_else(|| HubError::client_validation(&options.status_column, "Coluna ausente no CSV"))?;
    let counts_allowed = status_idx.is_none();

    let mut tally = Tally::default();
    let mut lines = 0usize;
    for (n, row) in reader.records().enumerate() {
        let row = row?;
        lines += 1;
        let product = row.get(product_idx).unwrap_or_default();
        let value = row.get(value_idx).unwrap_or_default();

        match value.parse::<usize>() {
            Ok(confirmed) if counts_allowed => {
                let delivered = match delivered_idx.and_then(|i| row.get(i)) {
                    Some(cell) if !cell.is_empty() => cell.parse::<usize>().map_err(|_| {
                        HubError::client_validation(
                            &options.delivered_column,
                            format!("Valor não numérico na linha {}: {}", n + 2, cell),
                        )
                    })?,
                    _ => 0,
                };
                if delivered > confirmed {
                    return Err(HubError::client_validation(
                        &options.delivered_column,
                        format!("Entregues maior que confirmados na linha {}", n + 2),
                    ));
                }
                tally.add(product, confirmed, delivered);
            }
            _ => tally.add(product, 1, usize::from(is_delivered(value, options))),
        }
    }

    let table = tally.finish(options.precision);
    tracing::debug!(
        "Computed effectiveness for {} products from {} lines",
        table.rows.len(),
        lines
    );
    Ok(table)
}
