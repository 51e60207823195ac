//! Sonda en memoria sobre tablas fixture.
//!
//! Entiende exactamente la forma de SELECT que compone el intérprete:
//! `SELECT <campos> FROM <tabla> WHERE <col> = <literal> [AND ...]`.
//! Suficiente para tests y para los dry-runs de la CLI; no es un motor SQL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use order_core::errors::ProbeError;
use order_core::model::{QueryResult, Scalar};
use order_core::providers::SqlProbe;

use super::ensure_readonly;

/// Tabla fixture: columnas nombradas + filas de escalares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

#[derive(Debug, Default)]
pub struct InMemoryTableProbe {
    tables: HashMap<String, FixtureTable>,
}

impl InMemoryTableProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga fixtures desde un objeto JSON `{tabla: {columns, rows}}`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        let tables: HashMap<String, FixtureTable> =
            serde_json::from_value(value.clone()).map_err(|e| format!("invalid fixtures: {e}"))?;
        Ok(Self { tables })
    }

    pub fn insert_table(&mut self, name: impl Into<String>, table: FixtureTable) {
        self.tables.insert(name.into(), table);
    }
}

#[async_trait]
impl SqlProbe for InMemoryTableProbe {
    async fn query(&self, sql: &str, _timeout: Duration) -> Result<QueryResult, ProbeError> {
        ensure_readonly(sql)?;
        let parsed = parse_select(sql).ok_or_else(|| ProbeError::Rejected { reason: format!("unsupported SELECT shape: {sql}") })?;
        let Some(table) = self.tables.get(&parsed.table) else {
            return Ok(QueryResult { columns: parsed.fields.clone(),
                                    rows: Vec::new(),
                                    row_count: 0 });
        };

        let mut rows = Vec::new();
        'rows: for row in &table.rows {
            for (column, expected) in &parsed.conditions {
                let idx = table.columns.iter().position(|c| c == column);
                let actual = idx.and_then(|i| row.get(i)).cloned().unwrap_or(Scalar::Null);
                if !actual.loose_eq(expected) {
                    continue 'rows;
                }
            }
            let projected: Vec<Scalar> = parsed.fields
                                               .iter()
                                               .map(|f| {
                                                   table.columns
                                                        .iter()
                                                        .position(|c| c == f)
                                                        .and_then(|i| row.get(i))
                                                        .cloned()
                                                        .unwrap_or(Scalar::Null)
                                               })
                                               .collect();
            rows.push(projected);
        }
        let row_count = rows.len();
        Ok(QueryResult { columns: parsed.fields, rows, row_count })
    }
}

struct ParsedSelect {
    fields: Vec<String>,
    table: String,
    conditions: Vec<(String, Scalar)>,
}

fn parse_select(sql: &str) -> Option<ParsedSelect> {
    let rest = sql.trim().strip_prefix("SELECT ")?;
    let (fields_part, rest) = rest.split_once(" FROM ")?;
    let (table_part, where_part) = match rest.split_once(" WHERE ") {
        Some((t, w)) => (t, Some(w)),
        None => (rest, None),
    };
    let fields: Vec<String> = fields_part.split(',').map(|f| f.trim().to_string()).collect();
    let table = table_part.trim().to_string();

    let mut conditions = Vec::new();
    if let Some(clause) = where_part {
        for part in split_top_level_and(clause) {
            let (column, value) = part.split_once('=')?;
            conditions.push((column.trim().to_string(), parse_literal(value.trim())?));
        }
    }
    Some(ParsedSelect { fields, table, conditions })
}

/// Divide por ` AND ` fuera de comillas simples.
fn split_top_level_and(clause: &str) -> Vec<&str> {
    let bytes = clause.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_quote = !in_quote;
                i += 1;
            }
            b' ' if !in_quote && clause[i..].to_uppercase().starts_with(" AND ") => {
                parts.push(&clause[start..i]);
                i += " AND ".len();
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(&clause[start..]);
    parts
}

/// Literal SQL tal como lo emite el renderer: cadena citada con `''`
/// duplicada, número decimal, `NULL`, `TRUE`/`FALSE`.
fn parse_literal(text: &str) -> Option<Scalar> {
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Some(Scalar::Str(inner.replace("''", "'")));
    }
    match text.to_uppercase().as_str() {
        "NULL" => return Some(Scalar::Null),
        "TRUE" => return Some(Scalar::Bool(true)),
        "FALSE" => return Some(Scalar::Bool(false)),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Scalar::Int(i));
    }
    text.parse::<f64>().ok().map(Scalar::Float)
}
