use crate::core::filter::split_names;
use crate::core::sort::parse_percent;
use crate::domain::model::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Bucket for records with no value in a grouped field.
pub const UNSPECIFIED: &str = "Não especificado";
/// Bucket for values outside a fixed vocabulary.
pub const OTHER: &str = "outros";
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub total: usize,
    /// Vocabulary order; every vocabulary entry is present, even at zero.
    pub counts: Vec<(String, usize)>,
}

impl CategoryCounts {
    pub fn get(&self, category: &str) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    fn sum_of(&self, categories: &[String]) -> usize {
        categories.iter().map(|c| self.get(c)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

/// `numerator` categories over `denominator` categories, or over the total when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: Vec<String>,
    #[serde(default)]
    pub denominator: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySpec {
    pub status_field: String,
    pub status_vocabulary: Vec<String>,
    pub sum_field: Option<String>,
    pub group_field: Option<String>,
    pub ratios: Vec<RatioSpec>,
    pub precision: u32,
    pub top_n: usize,
}

impl Default for SummarySpec {
    fn default() -> Self {
        Self {
            status_field: "status".to_string(),
            status_vocabulary: Vec::new(),
            sum_field: None,
            group_field: None,
            ratios: Vec::new(),
            precision: 1,
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub total: usize,
    pub by_status: CategoryCounts,
    pub sum: Option<(String, f64)>,
    pub ratios: Vec<(String, f64)>,
    pub top_groups: Vec<GroupCount>,
}

impl AggregateSummary {
    pub fn compute(records: &[Record], spec: &SummarySpec) -> Self {
        let by_status = count_by_category(records, &spec.status_field, &spec.status_vocabulary);

        let ratios = spec
            .ratios
            .iter()
            .map(|r| {
                let numerator = by_status.sum_of(&r.numerator);
                let denominator = match &r.denominator {
                    Some(cats) => by_status.sum_of(cats),
                    None => by_status.total,
                };
                (
                    r.name.clone(),
                    ratio_percentage(numerator as f64, denominator as f64, spec.precision),
                )
            })
            .collect();

        Self {
            total: records.len(),
            sum: spec
                .sum_field
                .as_ref()
                .map(|f| (f.clone(), sum_column(records, f))),
            ratios,
            top_groups: spec
                .group_field
                .as_deref()
                .map(|f| top_n_grouping(records, f, spec.top_n))
                .unwrap_or_default(),
            by_status,
        }
    }

    pub fn ratio(&self, name: &str) -> Option<f64> {
        self.ratios.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

pub fn count_by_category(records: &[Record], field: &str, vocabulary: &[String]) -> CategoryCounts {
    let mut counts: Vec<(String, usize)> = vocabulary.iter().map(|c| (c.clone(), 0)).collect();
    let mut other = 0;

    for record in records {
        let value = record.text(field).unwrap_or_default();
        match counts.iter_mut().find(|(c, _)| *c == value) {
            Some((_, n)) => *n += 1,
            None => other += 1,
        }
    }
    if other > 0 {
        counts.push((OTHER.to_string(), other));
    }

    CategoryCounts {
        total: records.len(),
        counts,
    }
}

/// Numbers, numeric strings and percentage strings; anything else is `None`.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.contains('%') => parse_percent(s),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Missing and non-numeric values count as zero.
pub fn sum_column(records: &[Record], field: &str) -> f64 {
    records
        .iter()
        .filter_map(|r| r.get(field).and_then(numeric_value))
        .sum()
}

/// `numerator / denominator * 100` rounded to `precision` decimals; 0 when the denominator is 0.
pub fn ratio_percentage(numerator: f64, denominator: f64, precision: u32) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let factor = 10f64.powi(precision as i32);
    ((numerator * 100.0 / denominator) * factor).round() / factor
}

pub fn format_percentage(value: f64, precision: u32) -> String {
    format!("{:.prec$}%", value, prec = precision as usize)
}

/// Counts each distinct name of a comma-separated field, highest first, truncated to `n`.
pub fn top_n_grouping(records: &[Record], field: &str, n: usize) -> Vec<GroupCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in records {
        let value = record.text(field).unwrap_or_default();
        let mut any = false;
        for name in split_names(&value) {
            *counts.entry(name.to_string()).or_insert(0) += 1;
            any = true;
        }
        if !any {
            *counts.entry(UNSPECIFIED.to_string()).or_insert(0) += 1;
        }
    }

    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(name, count)| GroupCount { name, count })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    groups.truncate(n);
    groups
}

/// Remembers the last result and recomputes only when the input changes.
#[derive(Debug, Default)]
pub struct Memo<K, V> {
    last: Option<(K, V)>,
}

impl<K: PartialEq + Clone, V> Memo<K, V> {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn get_or_compute(&mut self, key: &K, compute: impl FnOnce(&K) -> V) -> &V {
        if !matches!(&self.last, Some((k, _)) if k == key) {
            self.last = None;
        }
        let (_, value) = self.last.get_or_insert_with(|| (key.clone(), compute(key)));
        &*value
    }
}
