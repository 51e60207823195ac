//! Pipeline por orden: compuerta de mutación → matcher → intérprete →
//! artefacto DML.
//!
//! Equivale a la operación `run(user_text, seed_params, catalog, deadline)`
//! que el núcleo expone al upstream: se llama una vez por orden aceptada,
//! dentro de un worker del dispatcher. La clasificación de intención es
//! externa; aquí sólo importa la compuerta "¿es una mutación?".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use order_core::dml::{assemble, DmlArtifact};
use order_core::errors::{EngineError, MatchError};
use order_core::event::RunTrace;
use order_core::matcher::{MatchOutcome, RecipeMatcher};
use order_core::model::{Context, RunOutcome};
use order_core::providers::CancelToken;
use order_core::store::RecipeStore;
use order_core::StepEngine;

/// Tipo de operación ya clasificado por el upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

/// Orden de trabajo aceptada por el ingreso.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkOrderRequest {
    pub task_id: String,
    pub operation: OperationKind,
    /// Texto libre del solicitante.
    pub content: String,
    /// Metadatos del upstream; en colisión de claves ganan los parámetros
    /// extraídos por el matcher.
    #[serde(default)]
    pub parameters: Context,
}

/// Dependencias compartidas del pipeline. El catálogo es de sólo lectura
/// tras la carga; el motor y el matcher son compartibles entre corridas.
pub struct PipelineDeps {
    pub store: Arc<RecipeStore>,
    pub matcher: RecipeMatcher,
    pub engine: StepEngine,
}

/// Desenlace a nivel de servicio de una orden de trabajo.
#[derive(Debug, Serialize)]
#[serde(tag = "result")]
pub enum WorkOrderOutcome {
    /// Mutación completada: artefacto DML listo para la capa de correo.
    Artifact(Box<DmlArtifact>),
    /// La orden no es una mutación; fuera del alcance de este motor.
    NotAMutation,
    /// El matcher no encontró receta con confianza suficiente. No se
    /// reintenta; se aflora al usuario.
    NoMatch { confidence: f64, reasoning: String },
    /// El matcher agotó su reintento único.
    MatchFailed { detail: String },
    /// La receta rechazó la orden (RETURN_ERROR).
    UserRejected { message: String, trace: RunTrace },
    /// Fallo del motor durante la corrida.
    RunFailed { error: EngineError, trace: RunTrace },
}

pub async fn process_work_order(request: WorkOrderRequest,
                                deps: &PipelineDeps,
                                cancel: &CancelToken)
                                -> WorkOrderOutcome {
    let task_id = request.task_id.as_str();
    if request.operation != OperationKind::Mutation {
        info!(task_id, "non-mutation order, skipping");
        return WorkOrderOutcome::NotAMutation;
    }

    let matched = match deps.matcher.match_order(&request.content, &deps.store, cancel).await {
        Ok(MatchOutcome::Matched(m)) => m,
        Ok(MatchOutcome::Unmatched { confidence, reasoning }) => {
            info!(task_id, confidence, "no recipe matched");
            return WorkOrderOutcome::NoMatch { confidence, reasoning };
        }
        Err(MatchError::Cancelled) => {
            return WorkOrderOutcome::RunFailed { error: EngineError::Cancelled,
                                                 trace: RunTrace::new() };
        }
        Err(e) => {
            warn!(task_id, error = %e, "matcher failed");
            return WorkOrderOutcome::MatchFailed { detail: e.to_string() };
        }
    };
    info!(task_id,
          recipe = %matched.recipe.work_order_type,
          confidence = matched.confidence,
          "recipe matched");

    // Siembra: metadatos del upstream debajo, parámetros del matcher encima.
    let mut seed = request.parameters;
    seed.merge_over(matched.params.clone());

    match deps.engine.run(&matched.recipe, seed, cancel).await {
        RunOutcome::Completed { dml, context_snapshot, trace } => {
            info!(task_id, statements = dml.len(), steps = trace.len(), "run completed");
            let artifact = assemble(task_id, &matched.recipe, dml, context_snapshot);
            WorkOrderOutcome::Artifact(Box::new(artifact))
        }
        RunOutcome::UserError { message, trace } => {
            info!(task_id, %message, "recipe rejected the order");
            WorkOrderOutcome::UserRejected { message, trace }
        }
        RunOutcome::EngineError { error, trace } => {
            warn!(task_id, error = %error, "run failed");
            WorkOrderOutcome::RunFailed { error, trace }
        }
    }
}
