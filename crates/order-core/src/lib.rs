//! order-core: motor declarativo de órdenes de trabajo de mutación.
//!
//! Contiene los seis componentes del núcleo, en orden de dependencia:
//! evaluador de predicados (`eval`), renderer de plantillas (`template`),
//! catálogo de recetas (`store`), matcher vía LLM (`matcher`), intérprete
//! de pasos (`engine`) y ensamblado del artefacto DML (`dml`). Todo I/O
//! externo (sonda SQL, LLM, reloj) entra por los puertos de `providers`.

pub mod constants;
pub mod dml;
pub mod engine;
pub mod errors;
pub mod eval;
pub mod event;
pub mod hashing;
pub mod matcher;
pub mod model;
pub mod providers;
pub mod store;
pub mod template;

// Re-exports públicos principales
pub use dml::{assemble, DmlArtifact, Risk};
pub use engine::{EngineConfig, StepEngine};
pub use errors::{EngineError, EvalError, LlmError, MatchError, ProbeError, RenderError};
pub use event::{RunTrace, StepDecision, TraceEntry};
pub use matcher::{MatchOutcome, MatchedRecipe, RecipeMatcher};
pub use model::{Context, DmlKind, DmlRecord, QueryResult, Recipe, RunOutcome, Scalar, Step, StepOp};
pub use providers::{CancelToken, Clock, LlmClient, SqlProbe, SystemClock};
pub use store::{CatalogStatus, RecipeStore};
