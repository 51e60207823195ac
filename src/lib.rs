//! orderflow_rust: capa de servicio del procesador de órdenes de trabajo.
//!
//! Orquesta el núcleo (`order-core`) con los adaptadores reales: configura
//! desde el entorno, despacha cada orden aceptada a un pool acotado de
//! workers y ejecuta el pipeline matcher → intérprete → artefacto DML.

pub mod config;
pub mod runtime;
pub mod workflow;

pub use runtime::{Dispatcher, DispatcherConfig, OverflowPolicy, Submission};
pub use workflow::{process_work_order, OperationKind, PipelineDeps, WorkOrderOutcome, WorkOrderRequest};
