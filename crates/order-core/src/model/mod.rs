//! Modelos neutrales del núcleo (Scalar, Context, Recipe, resultados).
//!
//! Propósito en el flujo:
//! - `Scalar` y `Context` son el estado mutable de una corrida: variables
//!   sembradas por el matcher/upstream y extendidas por pasos QUERY.
//! - `Recipe`/`Step`/`Branch` son el programa declarativo inmutable que el
//!   intérprete ejecuta.
//! - `QueryResult`, `DmlRecord` y `RunOutcome` son los datos que cruzan los
//!   puertos hacia y desde el exterior.

pub mod context;
pub mod outcome;
pub mod recipe;
pub mod value;

pub use context::Context;
pub use outcome::{DmlRecord, QueryResult, RunOutcome};
pub use recipe::{Branch, DmlKind, DmlStep, ErrorStep, QueryStep, Recipe, RecipeDoc, Step, StepOp, StepOpKind, SuccessStep};
pub use value::Scalar;
