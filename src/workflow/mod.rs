//! Pipeline de procesamiento de una orden de trabajo.

mod process;

pub use process::{process_work_order, OperationKind, PipelineDeps, WorkOrderOutcome, WorkOrderRequest};
