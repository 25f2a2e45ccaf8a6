//! Validation of fetched record lists, and mapping into typed feature records.

use crate::domain::model::Record;
use crate::utils::error::{HubError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub key_field: String,
    pub required: Vec<String>,
}

impl RecordSchema {
    pub fn new(key_field: &str) -> Self {
        Self {
            key_field: key_field.to_string(),
            required: Vec::new(),
        }
    }

    pub fn require(mut self, column: &str) -> Self {
        self.required.push(column.to_string());
        self
    }

    /// Every record carries the key field and the required columns, and all
    /// records share the first record's column set.
    pub fn validate(&self, records: &[Record]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let expected: BTreeSet<&String> = first.data.keys().collect();

        for (index, record) in records.iter().enumerate() {
            let label = record
                .text(&self.key_field)
                .unwrap_or_else(|| format!("#{}", index));

            if record.text(&self.key_field).is_none() {
                return Err(HubError::SchemaError {
                    record: label,
                    message: format!("missing key field '{}'", self.key_field),
                });
            }
            if let Some(missing) = self.required.iter().find(|c| !record.data.contains_key(*c)) {
                return Err(HubError::SchemaError {
                    record: label,
                    message: format!("missing required column '{}'", missing),
                });
            }
            let columns: BTreeSet<&String> = record.data.keys().collect();
            if columns != expected {
                return Err(HubError::SchemaError {
                    record: label,
                    message: "column set differs from the first record".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Maps raw records into a typed struct, naming the first record that fails.
pub fn map_records<T: DeserializeOwned>(records: &[Record], key_field: &str) -> Result<Vec<T>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let value = serde_json::to_value(&record.data)?;
            serde_json::from_value(value).map_err(|e| HubError::SchemaError {
                record: record
                    .text(key_field)
                    .unwrap_or_else(|| format!("#{}", index)),
                message: e.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProject {
    pub id: i64,
    pub nome: String,
    pub status: String,
    #[serde(default)]
    pub criadores_nomes: Option<String>,
    #[serde(default)]
    pub data_criacao: Option<String>,
    #[serde(default)]
    pub horas_economizadas_mes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropiOrder {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub total_order: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessRow {
    #[serde(rename = "Produto")]
    pub produto: String,
    #[serde(rename = "Totais")]
    pub totais: f64,
    #[serde(rename = "Entregues")]
    pub entregues: f64,
    #[serde(rename = "Efetividade")]
    pub efetividade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyExecution {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub execution_date: Option<String>,
}
