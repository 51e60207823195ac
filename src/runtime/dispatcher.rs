//! Dispatcher de órdenes de trabajo.
//!
//! Cada orden aceptada es una tarea independiente propiedad de un worker
//! lógico; el pool (por defecto 32) acota el fan-out hacia LLM y base de
//! datos. La cola es un canal FIFO acotado; al saturarse, la política
//! elegida decide: `Queue` aplica back-pressure al que envía, `Reject`
//! devuelve el rechazo inmediatamente para que el ingreso responda.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use order_core::providers::CancelToken;

use crate::workflow::{process_work_order, PipelineDeps, WorkOrderOutcome, WorkOrderRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Encolar con back-pressure (el `submit` espera sitio).
    Queue,
    /// Rechazar inmediatamente cuando la cola está llena.
    Reject,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_depth: usize,
    pub overflow: OverflowPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 32,
               queue_depth: 128,
               overflow: OverflowPolicy::Queue }
    }
}

struct Job {
    request: WorkOrderRequest,
    cancel: CancelToken,
    reply: oneshot::Sender<WorkOrderOutcome>,
}

/// Asidero de una orden aceptada: permite cancelarla y esperar su desenlace.
pub struct JobHandle {
    cancel: CancelToken,
    rx: oneshot::Receiver<WorkOrderOutcome>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Espera el desenlace; `None` si el dispatcher se apagó antes de
    /// procesar la orden.
    pub async fn outcome(self) -> Option<WorkOrderOutcome> {
        self.rx.await.ok()
    }
}

pub enum Submission {
    Accepted(JobHandle),
    Rejected,
}

pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    overflow: OverflowPolicy,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(deps: Arc<PipelineDeps>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(config.queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..config.workers.max(1)).map(|id| {
                                                    let rx = rx.clone();
                                                    let deps = deps.clone();
                                                    tokio::spawn(worker_loop(id, rx, deps))
                                                })
                                                .collect();
        Self { tx, overflow: config.overflow, workers }
    }

    /// Somete una orden. Con política `Queue` puede suspender al llamador
    /// hasta que haya sitio en la cola.
    pub async fn submit(&self, request: WorkOrderRequest) -> Submission {
        let cancel = CancelToken::new();
        let (reply, rx) = oneshot::channel();
        let job = Job { request, cancel: cancel.clone(), reply };
        let accepted = match self.overflow {
            OverflowPolicy::Queue => self.tx.send(job).await.is_ok(),
            OverflowPolicy::Reject => self.tx.try_send(job).is_ok(),
        };
        if accepted {
            Submission::Accepted(JobHandle { cancel, rx })
        } else {
            Submission::Rejected
        }
    }

    /// Cierra la cola y espera a que los workers drenen lo pendiente.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn worker_loop(id: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>, deps: Arc<PipelineDeps>) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            debug!(worker = id, "queue closed, worker exiting");
            return;
        };
        debug!(worker = id, task_id = %job.request.task_id, "job picked up");
        let outcome = process_work_order(job.request, &deps, &job.cancel).await;
        // El receptor puede haberse ido (caller desinteresado); no es error.
        let _ = job.reply.send(outcome);
    }
}
