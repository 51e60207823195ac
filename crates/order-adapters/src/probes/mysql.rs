//! Sonda MySQL sobre un pool sqlx.
//!
//! La guarda SELECT-only se aplica antes de tocar el pool; el deadline por
//! llamada se impone con `tokio::time::timeout` y vence como
//! `ProbeError::Timeout`. Errores transitorios de base se reintentan con
//! una pausa de 1 s, hasta `max_retries` intentos.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySqlPool, Row};
use tracing::{debug, warn};

use order_core::errors::ProbeError;
use order_core::model::{QueryResult, Scalar};
use order_core::providers::SqlProbe;

use super::ensure_readonly;

pub struct MySqlProbe {
    pool: MySqlPool,
    max_retries: u32,
}

impl MySqlProbe {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool, max_retries: 3 }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ProbeError> {
        let pool = MySqlPoolOptions::new().max_connections(max_connections)
                                          .connect(url)
                                          .await
                                          .map_err(|e| ProbeError::Db { detail: e.to_string() })?;
        Ok(Self::new(pool))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }
}

#[async_trait]
impl SqlProbe for MySqlProbe {
    async fn query(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ProbeError> {
        ensure_readonly(sql)?;
        debug!(sql, "probe query");

        let mut attempt = 0;
        loop {
            attempt += 1;
            match tokio::time::timeout(timeout, sqlx::query(sql).fetch_all(&self.pool)).await {
                Err(_) => return Err(ProbeError::Timeout { secs: timeout.as_secs() }),
                Ok(Ok(rows)) => return Ok(to_query_result(&rows)),
                Ok(Err(e)) if attempt < self.max_retries => {
                    warn!(attempt, max = self.max_retries, error = %e, "mysql error, retrying in 1s");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Ok(Err(e)) => return Err(ProbeError::Db { detail: e.to_string() }),
            }
        }
    }
}

fn to_query_result(rows: &[MySqlRow]) -> QueryResult {
    let columns: Vec<String> = rows.first()
                                   .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
                                   .unwrap_or_default();
    let data: Vec<Vec<Scalar>> = rows.iter()
                                     .map(|row| (0..row.columns().len()).map(|i| decode_scalar(row, i)).collect())
                                     .collect();
    let row_count = data.len();
    QueryResult { columns, rows: data, row_count }
}

/// Decodifica una celda al escalar más fiel que el driver permita; los
/// tipos binarios caen a UTF-8 con reemplazo y lo indecodificable a NULL.
fn decode_scalar(row: &MySqlRow, i: usize) -> Scalar {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(Scalar::Int).unwrap_or(Scalar::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(Scalar::Float).unwrap_or(Scalar::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(Scalar::Bool).unwrap_or(Scalar::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(Scalar::Str).unwrap_or(Scalar::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v.map(|b| Scalar::Str(String::from_utf8_lossy(&b).into_owned())).unwrap_or(Scalar::Null);
    }
    Scalar::Null
}
