//! Núcleo del intérprete de recetas.
//!
//! `current_step` es un contador de programa sobre los números de paso;
//! el contexto es el frame; las ramas son saltos condicionales y el tope
//! de iteraciones es el presupuesto de ejecución. Los saltos no
//! secuenciales son de primera clase: nada aquí asume que la lista de
//! pasos se recorre en orden.
//!
//! Dentro de una corrida la ejecución es estrictamente secuencial; la
//! suspensión sólo ocurre en la sonda SQL. El token de cancelación se
//! observa antes de cada llamada externa.

use std::sync::Arc;
use std::time::Duration;

use crate::constants::ITERATION_CAP;
use crate::errors::EngineError;
use crate::event::{RunTrace, StepDecision, TraceEntry};
use crate::model::{Context, DmlRecord, QueryStep, Recipe, RunOutcome, Scalar, Step, StepOp};
use crate::providers::{CancelToken, Clock, SqlProbe};
use crate::template::{check_identifier, render_lenient, render_sql_with_params};
use crate::{dml, eval};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub iteration_cap: u32,
    /// Deadline por llamada a la sonda; el vencimiento se trata como fallo
    /// de sondeo (camino `on_failure`).
    pub probe_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { iteration_cap: ITERATION_CAP,
               probe_timeout: Duration::from_secs(10) }
    }
}

/// Motor de ejecución de recetas. Compartible entre corridas concurrentes:
/// todo el estado mutable (contexto, acumulador, traza) vive en `run`.
pub struct StepEngine {
    probe: Arc<dyn SqlProbe>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl StepEngine {
    pub fn new(probe: Arc<dyn SqlProbe>, clock: Arc<dyn Clock>) -> Self {
        Self { probe, clock, config: EngineConfig::default() }
    }

    pub fn with_config(probe: Arc<dyn SqlProbe>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self { probe, clock, config }
    }

    /// Ejecuta una receta contra un contexto sembrado y devuelve el
    /// desenlace. La traza viaja en todas las variantes del resultado.
    pub async fn run(&self, recipe: &Recipe, seed: Context, cancel: &CancelToken) -> RunOutcome {
        let index = recipe.step_index();
        let mut ctx = seed;
        let mut acc: Vec<DmlRecord> = Vec::new();
        let mut trace = RunTrace::new();
        let mut iterations: u32 = 0;

        let Some(entry) = recipe.entry_step() else {
            // Inalcanzable con catálogo validado; defensivo.
            return RunOutcome::EngineError { error: EngineError::NoDmlProduced, trace };
        };
        let mut current: Option<u32> = Some(entry);

        while let Some(step_no) = current {
            iterations += 1;
            if iterations > self.config.iteration_cap {
                return RunOutcome::EngineError { error: EngineError::IterationLimit { limit: self.config.iteration_cap },
                                                 trace };
            }
            // El índice contiene todo destino ya verificado; la entrada
            // existe por construcción.
            let step: &Step = index[&step_no];

            match &step.op {
                StepOp::Query(q) => {
                    match self.exec_query(step_no, q, &mut ctx, cancel, &index, &mut trace).await {
                        Ok(target) => current = target,
                        Err(error) => return RunOutcome::EngineError { error, trace },
                    }
                }
                StepOp::GenerateDml(d) => {
                    let record = match dml::render_statement(d, &ctx) {
                        Ok(r) => r,
                        Err(source) => {
                            let error = EngineError::Render { step: step_no, source };
                            trace.push(self.entry(step_no, step, StepDecision::Failed { reason: error.to_string() }, None));
                            return RunOutcome::EngineError { error, trace };
                        }
                    };
                    let target = match d.next_step {
                        Some(explicit) => match self.checked_jump(step_no, explicit, &index) {
                            Ok(t) => t,
                            Err(error) => return RunOutcome::EngineError { error, trace },
                        },
                        None => fall_through(step_no, &index),
                    };
                    trace.push(self.entry(step_no,
                                          step,
                                          StepDecision::DmlEmitted { kind: record.kind,
                                                                     table: record.table.clone(),
                                                                     target },
                                          None));
                    acc.push(record);
                    current = target;
                }
                StepOp::ReturnSuccess(r) => {
                    let note = r.message.as_ref().map(|m| render_lenient(m, &ctx));
                    trace.push(self.entry(step_no, step, StepDecision::CompletedOk, note));
                    current = None;
                }
                StepOp::ReturnError(r) => {
                    let message = render_lenient(&r.message, &ctx);
                    trace.push(self.entry(step_no, step, StepDecision::ReturnedError, None));
                    return RunOutcome::UserError { message, trace };
                }
            }
        }

        if acc.is_empty() {
            RunOutcome::EngineError { error: EngineError::NoDmlProduced, trace }
        } else {
            RunOutcome::Completed { dml: acc, context_snapshot: ctx, trace }
        }
    }

    /// Ejecuta un paso QUERY completo: render, sondeo, commit al contexto y
    /// decisión de rama. Devuelve el siguiente paso (o fin).
    async fn exec_query(&self,
                        step_no: u32,
                        q: &QueryStep,
                        ctx: &mut Context,
                        cancel: &CancelToken,
                        index: &std::collections::BTreeMap<u32, &Step>,
                        trace: &mut RunTrace)
                        -> Result<Option<u32>, EngineError> {
        let step = index[&step_no];

        // Identificadores y WHERE pasan por el renderer; es la única vía de
        // entrada de datos externos al SQL.
        check_identifier(&q.table).map_err(|source| EngineError::Render { step: step_no, source })?;
        for f in &q.output_fields {
            check_identifier(f).map_err(|source| EngineError::Render { step: step_no, source })?;
        }
        let where_sql = render_sql_with_params(&q.where_clause, ctx).map_err(|source| EngineError::Render { step: step_no, source })?;
        let sql = format!("SELECT {} FROM {} WHERE {}",
                          q.output_fields.join(", "),
                          q.table,
                          where_sql.literal);

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let probed = self.probe.query(&sql, self.config.probe_timeout).await;

        let result = match probed {
            Ok(r) if r.row_count > 0 => r,
            other => {
                // Fallo de sondeo: error del puerto o cero filas.
                let detail = match other {
                    Ok(_) => "query returned no rows".to_string(),
                    Err(e) => e.to_string(),
                };
                return match &q.on_failure {
                    Some(fallback) => {
                        let target = self.checked_jump(step_no, fallback.next_step, index)?;
                        trace.push(self.entry(step_no, step, StepDecision::FallbackTaken { target }, Some(detail)));
                        Ok(target)
                    }
                    None => {
                        trace.push(self.entry(step_no, step, StepDecision::Failed { reason: detail.clone() }, None));
                        Err(EngineError::QueryFailed { step: step_no, detail })
                    }
                };
            }
        };

        // Ambigüedad: más de una fila no es fatal (el DML resultante sigue
        // pasando por revisión humana) pero el operador debe verla.
        let note = if result.row_count > 1 {
            Some(format!("{} rows matched, first row used", result.row_count))
        } else {
            None
        };
        for field in &q.output_fields {
            let value: Scalar = result.value_at(0, field);
            ctx.insert(field.clone(), value);
        }

        let (decision, target) = match &q.on_success {
            Some(branch) => match &branch.condition {
                Some(predicate) => {
                    let truthy = eval::eval_predicate(predicate, ctx).map_err(|source| EngineError::Eval { step: step_no,
                                                                                                           predicate: predicate.clone(),
                                                                                                           source })?;
                    if truthy {
                        let t = self.checked_jump(step_no, branch.next_step, index)?;
                        (StepDecision::BranchTrue { target: t }, t)
                    } else {
                        let t = self.checked_jump(step_no, branch.else_step.flatten(), index)?;
                        (StepDecision::BranchFalse { target: t }, t)
                    }
                }
                None => {
                    let t = self.checked_jump(step_no, branch.next_step, index)?;
                    (StepDecision::Advance { target: t }, t)
                }
            },
            None => {
                let t = fall_through(step_no, index);
                (StepDecision::Advance { target: t }, t)
            }
        };
        trace.push(self.entry(step_no, step, decision, note));
        Ok(target)
    }

    /// Verifica que un salto explícito apunte a un paso existente. Tras la
    /// validación del catálogo esto es inalcanzable; defensivo.
    fn checked_jump(&self,
                    from: u32,
                    target: Option<u32>,
                    index: &std::collections::BTreeMap<u32, &Step>)
                    -> Result<Option<u32>, EngineError> {
        match target {
            Some(t) if !index.contains_key(&t) => Err(EngineError::BadJump { step: from, target: t }),
            other => Ok(other),
        }
    }

    fn entry(&self, step_no: u32, step: &Step, decision: StepDecision, note: Option<String>) -> TraceEntry {
        TraceEntry { step: step_no,
                     operation: step.op.kind(),
                     decision,
                     note,
                     at: self.clock.now() }
    }
}

/// Caída al paso `step + 1` si existe; si no, fin de la corrida.
fn fall_through(step_no: u32, index: &std::collections::BTreeMap<u32, &Step>) -> Option<u32> {
    let next = step_no + 1;
    index.contains_key(&next).then_some(next)
}
