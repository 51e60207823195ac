//! Resultados de sondeo, registros DML y desenlace de una corrida.

use serde::{Deserialize, Serialize};

use super::{Context, DmlKind, Scalar};
use crate::errors::EngineError;
use crate::event::RunTrace;

/// Resultado del sondeo read-only inyectado (§ puerto `SqlProbe`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self { columns: Vec::new(), rows: Vec::new(), row_count: 0 }
    }

    /// Valor de una columna por nombre en una fila dada; columna ausente o
    /// fila corta → `Null` (un NULL de SQL también llega como `Null`).
    pub fn value_at(&self, row: usize, column: &str) -> Scalar {
        let Some(idx) = self.columns.iter().position(|c| c == column) else {
            return Scalar::Null;
        };
        self.rows
            .get(row)
            .and_then(|r| r.get(idx))
            .cloned()
            .unwrap_or(Scalar::Null)
    }
}

/// Una sentencia de cambio lista para revisión humana, en forma literal y
/// parametrizada. El invariante clave: sustituir `parameters` en
/// `template_sql` posicionalmente (con las mismas reglas de citado) produce
/// exactamente `rendered_sql`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmlRecord {
    pub kind: DmlKind,
    pub table: String,
    pub rendered_sql: String,
    pub template_sql: String,
    /// Pares (nombre, valor) en orden de aparición izquierda→derecha.
    pub parameters: Vec<(String, Scalar)>,
    pub description: String,
}

/// Desenlace de una corrida del intérprete. Todas las variantes conservan la
/// traza para diagnóstico.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome")]
pub enum RunOutcome {
    /// La receta terminó y produjo al menos un registro DML.
    Completed {
        dml: Vec<DmlRecord>,
        context_snapshot: Context,
        trace: RunTrace,
    },
    /// Un paso RETURN_ERROR decidió rechazar la orden; no es un error del
    /// motor sino el resultado principal de la corrida.
    UserError { message: String, trace: RunTrace },
    /// Fallo del motor (sondeo agotado, predicado inválido, salto roto...).
    EngineError { error: EngineError, trace: RunTrace },
}

impl RunOutcome {
    pub fn trace(&self) -> &RunTrace {
        match self {
            RunOutcome::Completed { trace, .. } => trace,
            RunOutcome::UserError { trace, .. } => trace,
            RunOutcome::EngineError { trace, .. } => trace,
        }
    }
}
