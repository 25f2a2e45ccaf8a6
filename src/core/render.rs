//! Presentation mapping: badges, tiers, stat cards, chart series and table text.

use crate::core::aggregate::{format_percentage, AggregateSummary, OTHER};
use crate::domain::model::Record;
use crate::utils::error::{HubError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Green,
    Teal,
    Blue,
    Yellow,
    Orange,
    Red,
    Gray,
}

const STATUS_COLORS: &[(&str, ColorToken)] = &[
    ("ativo", ColorToken::Green),
    ("active", ColorToken::Green),
    ("entregue", ColorToken::Green),
    ("delivered", ColorToken::Green),
    ("concluído", ColorToken::Blue),
    ("concluido", ColorToken::Blue),
    ("completed", ColorToken::Blue),
    ("em_andamento", ColorToken::Teal),
    ("processando", ColorToken::Teal),
    ("pausado", ColorToken::Yellow),
    ("paused", ColorToken::Yellow),
    ("pendente", ColorToken::Orange),
    ("pending", ColorToken::Orange),
    ("arquivado", ColorToken::Gray),
    ("cancelado", ColorToken::Red),
    ("cancelled", ColorToken::Red),
    ("erro", ColorToken::Red),
    ("failed", ColorToken::Red),
    ("devolvido", ColorToken::Red),
];

/// Badge color for a status; unknown statuses get `Gray`.
pub fn status_badge_color(status: &str) -> ColorToken {
    let key = status.trim().to_lowercase();
    STATUS_COLORS
        .iter()
        .find(|(s, _)| *s == key)
        .map(|(_, c)| *c)
        .unwrap_or(ColorToken::Gray)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectivenessTier {
    Strong,
    Good,
    Fair,
    Weak,
}

impl EffectivenessTier {
    pub fn color(self) -> ColorToken {
        match self {
            EffectivenessTier::Strong => ColorToken::Green,
            EffectivenessTier::Good => ColorToken::Teal,
            EffectivenessTier::Fair => ColorToken::Yellow,
            EffectivenessTier::Weak => ColorToken::Red,
        }
    }
}

pub fn effectiveness_tier(percentage: f64) -> EffectivenessTier {
    if percentage >= 60.0 {
        EffectivenessTier::Strong
    } else if percentage >= 50.0 {
        EffectivenessTier::Good
    } else if percentage >= 40.0 {
        EffectivenessTier::Fair
    } else {
        EffectivenessTier::Weak
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    pub color: ColorToken,
}

pub fn stat_cards(summary: &AggregateSummary, precision: u32) -> Vec<StatCard> {
    let mut cards = vec![StatCard {
        label: "Total".to_string(),
        value: summary.total.to_string(),
        color: ColorToken::Blue,
    }];

    for (status, count) in &summary.by_status.counts {
        cards.push(StatCard {
            label: status.clone(),
            value: count.to_string(),
            color: if status == OTHER {
                ColorToken::Gray
            } else {
                status_badge_color(status)
            },
        });
    }

    if let Some((field, total)) = &summary.sum {
        cards.push(StatCard {
            label: field.clone(),
            value: format!("{:.2}", total),
            color: ColorToken::Teal,
        });
    }

    for (name, pct) in &summary.ratios {
        cards.push(StatCard {
            label: name.clone(),
            value: format_percentage(*pct, precision),
            color: effectiveness_tier(*pct).color(),
        });
    }
    cards
}

/// Data handed to the external charting library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

pub fn chart_series(summary: &AggregateSummary) -> Vec<ChartSeries> {
    let mut series = vec![ChartSeries {
        name: "status".to_string(),
        points: summary
            .by_status
            .counts
            .iter()
            .map(|(label, n)| ChartPoint {
                label: label.clone(),
                value: *n as f64,
            })
            .collect(),
    }];
    if !summary.top_groups.is_empty() {
        series.push(ChartSeries {
            name: "top".to_string(),
            points: summary
                .top_groups
                .iter()
                .map(|g| ChartPoint {
                    label: g.name.clone(),
                    value: g.count as f64,
                })
                .collect(),
        });
    }
    series
}

/// Header plus one line per record, in the given column order.
pub fn render_table(records: &[Record], columns: &[String], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| record.text(c).unwrap_or_default()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| HubError::processing(format!("Failed to flush table: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| HubError::processing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::{CategoryCounts, GroupCount};

    #[test]
    fn test_unknown_status_falls_back_to_gray() {
        assert_eq!(status_badge_color("Ativo"), ColorToken::Green);
        assert_eq!(status_badge_color(" ERRO "), ColorToken::Red);
        assert_eq!(status_badge_color("status_inventado"), ColorToken::Gray);
        assert_eq!(status_badge_color(""), ColorToken::Gray);
    }

    #[test]
    fn test_effectiveness_tiers() {
        assert_eq!(effectiveness_tier(60.0), EffectivenessTier::Strong);
        assert_eq!(effectiveness_tier(59.99), EffectivenessTier::Good);
        assert_eq!(effectiveness_tier(50.0), EffectivenessTier::Good);
        assert_eq!(effectiveness_tier(40.0), EffectivenessTier::Fair);
        assert_eq!(effectiveness_tier(39.9), EffectivenessTier::Weak);
        assert_eq!(effectiveness_tier(0.0).color(), ColorToken::Red);
    }

    fn summary() -> AggregateSummary {
        AggregateSummary {
            total: 10,
            by_status: CategoryCounts {
                total: 10,
                counts: vec![("ativo".to_string(), 3), ("arquivado".to_string(), 7)],
            },
            sum: None,
            ratios: vec![("ativos".to_string(), 30.0)],
            top_groups: vec![GroupCount {
                name: "Ana".to_string(),
                count: 2,
            }],
        }
    }

    #[test]
    fn test_stat_cards() {
        let cards = stat_cards(&summary(), 1);
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].value, "10");
        assert_eq!(cards[1].color, ColorToken::Green);
        assert_eq!(cards[3].value, "30.0%");
        assert_eq!(cards[3].color, ColorToken::Red);
    }

    #[test]
    fn test_chart_series_json() {
        let series = chart_series(&summary());
        assert_eq!(series.len(), 2);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json[0]["points"][1]["label"], "arquivado");
        assert_eq!(json[1]["points"][0]["value"], 2.0);
    }

    #[test]
    fn test_render_table() {
        let records = vec![
            Record::new().with("Produto", "Creme, 50ml").with("Totais", 10),
            Record::new().with("Produto", "Sérum"),
        ];
        let columns = vec!["Produto".to_string(), "Totais".to_string()];
        let csv = render_table(&records, &columns, b',').unwrap();
        assert_eq!(csv, "Produto,Totais\n\"Creme, 50ml\",10\nSérum,\n");
        let tsv = render_table(&records, &columns, b'\t').unwrap();
        assert!(tsv.starts_with("Produto\tTotais\n"));
    }
}
