//! Traza de ejecución de una corrida.
//!
//! Rol en el flujo:
//! - El intérprete anota una entrada por paso ejecutado: (número, operación,
//!   decisión tomada) más el instante del reloj inyectado.
//! - La traza pertenece a exactamente una corrida y viaja entera en el
//!   `RunOutcome` (también en los fallidos) para diagnóstico del operador.
//! - El tope de iteraciones acota su longitud: nunca más de 100 entradas.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{DmlKind, StepOpKind};

/// Decisión observable de un paso: hacia dónde transicionó y por qué.
/// `target: None` significa el sentinela fin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision")]
pub enum StepDecision {
    /// Avance directo (caída a `step + 1`, salto incondicional o fin).
    Advance { target: Option<u32> },
    /// Predicado evaluado verdadero → `next_step`.
    BranchTrue { target: Option<u32> },
    /// Predicado evaluado falso → `else_step`.
    BranchFalse { target: Option<u32> },
    /// El sondeo falló o no devolvió filas y se tomó `on_failure`.
    FallbackTaken { target: Option<u32> },
    /// Se emitió un registro DML y se transicionó.
    DmlEmitted {
        kind: DmlKind,
        table: String,
        target: Option<u32>,
    },
    /// Paso terminal exitoso.
    CompletedOk,
    /// Paso terminal RETURN_ERROR (rechazo decidido por la receta).
    ReturnedError,
    /// El paso abortó la corrida.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub step: u32,
    pub operation: StepOpKind,
    #[serde(flatten)]
    pub decision: StepDecision,
    /// Advertencias no fatales (p. ej. sondeo con múltiples filas).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Traza append-only de una corrida, propiedad exclusiva del intérprete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunTrace {
    entries: Vec<TraceEntry>,
}

impl RunTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
