//! Servicio headless: lee órdenes de trabajo (JSON por línea) de stdin y
//! emite el desenlace de cada una por stdout. El ingreso HTTP real vive
//! fuera de este repositorio; esta tubería es la interfaz de integración.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use order_adapters::{InMemoryTableProbe, MySqlProbe, OpenAiChatClient};
use order_core::engine::EngineConfig;
use order_core::matcher::RecipeMatcher;
use order_core::providers::SqlProbe;
use order_core::store::RecipeStore;
use order_core::StepEngine;
use orderflow_rust::config::CONFIG;
use orderflow_rust::{Dispatcher, DispatcherConfig, PipelineDeps, Submission, WorkOrderOutcome, WorkOrderRequest};

#[derive(Serialize)]
struct OutcomeLine<'a> {
    task_id: &'a str,
    #[serde(flatten)]
    outcome: &'a WorkOrderOutcome,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    let (store, status) = RecipeStore::load_dir(&CONFIG.recipes_dir);
    info!(dir = %CONFIG.recipes_dir, loaded = status.loaded, "recipe catalog loaded");
    for e in &status.errors {
        warn!(file = %e.file, reason = %e.reason, "recipe skipped");
    }
    if store.is_empty() {
        error!("empty recipe catalog, nothing to match against");
        std::process::exit(4);
    }

    let probe: Arc<dyn SqlProbe> = match &CONFIG.probe.database_url {
        Some(url) => match MySqlProbe::connect(url, CONFIG.probe.max_connections).await {
            Ok(p) => Arc::new(p),
            Err(e) => {
                error!(error = %e, "cannot connect probe pool");
                std::process::exit(5);
            }
        },
        None => {
            warn!("DATABASE_URL not set, using empty in-memory probe");
            Arc::new(InMemoryTableProbe::new())
        }
    };

    let llm = Arc::new(OpenAiChatClient::new(CONFIG.llm.base_url.clone(),
                                             CONFIG.llm.api_key.clone(),
                                             CONFIG.llm.model.clone()));
    let engine_config = EngineConfig { probe_timeout: CONFIG.probe.timeout,
                                       ..EngineConfig::default() };
    let deps = Arc::new(PipelineDeps { store: Arc::new(store),
                                       matcher: RecipeMatcher::new(llm).with_timeout(CONFIG.llm.timeout),
                                       engine: StepEngine::with_config(probe,
                                                                       Arc::new(order_core::providers::SystemClock),
                                                                       engine_config) });
    let dispatcher = Dispatcher::new(deps,
                                     DispatcherConfig { workers: CONFIG.dispatcher.workers,
                                                        queue_depth: CONFIG.dispatcher.queue_depth,
                                                        overflow: CONFIG.dispatcher.overflow });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inflight: Vec<tokio::task::JoinHandle<()>> = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let request: WorkOrderRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unparseable work order line");
                continue;
            }
        };
        let task_id = request.task_id.clone();
        match dispatcher.submit(request).await {
            Submission::Accepted(handle) => {
                inflight.push(tokio::spawn(async move {
                    if let Some(outcome) = handle.outcome().await {
                        let line = OutcomeLine { task_id: &task_id, outcome: &outcome };
                        println!("{}", serde_json::to_string(&line).unwrap_or_default());
                    }
                }));
            }
            Submission::Rejected => {
                warn!(task_id = %task_id, "queue full, order rejected");
                println!("{}", serde_json::json!({"task_id": task_id, "result": "Rejected"}));
            }
        }
    }

    for task in inflight {
        let _ = task.await;
    }
    dispatcher.shutdown().await;
    info!("stdin closed, service stopped");
}
