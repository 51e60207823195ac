//! Taxonomía de errores del núcleo.
//!
//! Un `EngineError` es el fallo de una corrida completa; los errores de
//! componente (`EvalError`, `RenderError`, `ProbeError`, ...) se anotan con
//! el paso donde ocurrieron al propagarse. `UserError` NO vive aquí: es un
//! desenlace legítimo de la receta (ver `RunOutcome`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallo del evaluador de predicados (§ gramática cerrada).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum EvalError {
    #[error("predicate exceeds {max} bytes")]
    TooLong { max: usize },
    #[error("unexpected character `{ch}` at byte {at}")]
    BadChar { ch: char, at: usize },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("malformed number at byte {at}")]
    BadNumber { at: usize },
    #[error("parse error: {detail}")]
    Parse { detail: String },
    #[error("cannot order {lhs} against {rhs}")]
    CrossTypeOrdering { lhs: String, rhs: String },
}

/// Fallo del renderer de plantillas.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RenderError {
    #[error("missing variable `{name}` in context")]
    MissingVar { name: String },
    #[error("control character in value for `{name}`")]
    ControlChar { name: String },
    #[error("invalid SQL identifier `{ident}`")]
    BadIdentifier { ident: String },
    /// Paso DML sin la forma que exige su tipo (defensivo: la validación
    /// del catálogo lo hace inalcanzable para recetas cargadas).
    #[error("malformed DML step: {detail}")]
    Shape { detail: String },
}

/// Fallo del sondeo SQL read-only. Un deadline vencido llega como `Timeout`
/// y se trata igual que cualquier otro fallo de sondeo (camino `on_failure`).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ProbeError {
    #[error("probe timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("probe rejected statement: {reason}")]
    Rejected { reason: String },
    #[error("database error: {detail}")]
    Db { detail: String },
}

/// Fallo del cliente LLM inyectado.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum LlmError {
    #[error("llm call timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("llm transport error: {detail}")]
    Transport { detail: String },
    #[error("llm api error: {detail}")]
    Api { detail: String },
}

/// Fallo del matcher: salida malformada del LLM o transporte caído. La
/// política de reintento único vive en el matcher; aquí sólo la forma.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("llm failure: {0}")]
    Llm(#[from] LlmError),
    #[error("unparseable llm reply: {detail}")]
    Malformed { detail: String },
    #[error("matched_index {got} outside [1..{max}]")]
    IndexOutOfRange { got: i64, max: usize },
    #[error("confidence {got} outside [0, 1]")]
    BadConfidence { got: f64 },
    #[error("extracted parameters malformed: {detail}")]
    BadParams { detail: String },
    #[error("match cancelled")]
    Cancelled,
}

/// Fallo de carga/validación de una receta (BadRecipe). La receta se omite
/// del catálogo; las demás siguen cargando.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RecipeError {
    #[error("unreadable file: {detail}")]
    Io { detail: String },
    #[error("invalid document: {detail}")]
    Schema { detail: String },
    #[error("work_order_type is empty")]
    EmptyType,
    #[error("duplicate work_order_type `{work_order_type}`")]
    DuplicateType { work_order_type: String },
    #[error("recipe has no steps")]
    NoSteps,
    #[error("duplicate step number {step}")]
    DuplicateStep { step: u32 },
    #[error("step {step} jumps to missing step {target}")]
    MissingTarget { step: u32, target: u32 },
    #[error("step {step}: branch condition without else_step")]
    ConditionWithoutElse { step: u32 },
    #[error("step {step}: on_failure must not carry a condition")]
    ConditionalFailure { step: u32 },
    #[error("step {step}: {detail}")]
    StepShape { step: u32, detail: String },
    #[error("step {step}: invalid SQL identifier `{ident}`")]
    BadIdentifier { step: u32, ident: String },
}

/// Error terminal de una corrida del intérprete.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EngineError {
    /// El sondeo falló o devolvió cero filas y el paso no tenía `on_failure`.
    #[error("query failed at step {step}: {detail}")]
    QueryFailed { step: u32, detail: String },
    /// El predicado de una rama no se pudo evaluar.
    #[error("predicate `{predicate}` failed at step {step}: {source}")]
    Eval {
        step: u32,
        predicate: String,
        source: EvalError,
    },
    /// Variable ausente u otro fallo de render fuera de RETURN_ERROR.
    #[error("render failed at step {step}: {source}")]
    Render { step: u32, source: RenderError },
    /// Salto a un paso inexistente. Defensivo: la validación del catálogo
    /// debería hacerlo inalcanzable.
    #[error("step {step} jumped to unknown step {target}")]
    BadJump { step: u32, target: u32 },
    #[error("iteration limit of {limit} exceeded")]
    IterationLimit { limit: u32 },
    /// La corrida terminó sin pasar por RETURN_ERROR y sin acumular DML.
    #[error("run finished without producing DML")]
    NoDmlProduced,
    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Paso asociado, si el error lo tiene.
    pub fn step(&self) -> Option<u32> {
        match self {
            EngineError::QueryFailed { step, .. }
            | EngineError::Eval { step, .. }
            | EngineError::Render { step, .. }
            | EngineError::BadJump { step, .. } => Some(*step),
            _ => None,
        }
    }
}
