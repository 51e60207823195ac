use std::sync::Arc;

use order_adapters::InMemoryTableProbe;
use order_core::dml::assemble;
use order_core::model::{Context, RunOutcome};
use order_core::providers::{CancelToken, SystemClock};
use order_core::store::RecipeStore;
use order_core::StepEngine;

fn main() {
    // CLI mínima:
    //   order-cli validate --dir <RECIPES>
    //   order-cli run --dir <RECIPES> --type <WORK_ORDER_TYPE> --params '<JSON>' [--fixtures <FILE>] [--task <ID>]
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("order-cli: use 'validate' or 'run' subcommands");
        std::process::exit(2);
    }
    match args[1].as_str() {
        "validate" => validate(&args[2..]),
        "run" => run(&args[2..]),
        other => {
            eprintln!("order-cli: unknown subcommand '{other}'");
            std::process::exit(2);
        }
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == name {
            return args.get(i + 1).map(|s| s.as_str());
        }
        i += 1;
    }
    None
}

fn validate(args: &[String]) {
    let Some(dir) = flag_value(args, "--dir") else {
        eprintln!("Uso: order-cli validate --dir <RECIPES>");
        std::process::exit(2);
    };
    let (store, status) = RecipeStore::load_dir(dir);
    println!("recetas cargadas: {}", status.loaded);
    for recipe in store.list_all() {
        println!("  {} ({})", recipe.work_order_type, &recipe.recipe_hash[..12]);
    }
    if !status.errors.is_empty() {
        eprintln!("errores: {}", status.errors.len());
        for e in &status.errors {
            eprintln!("  [{}] {}", e.file, e.reason);
        }
        std::process::exit(4);
    }
}

fn run(args: &[String]) {
    let (Some(dir), Some(wo_type), Some(params_raw)) =
        (flag_value(args, "--dir"), flag_value(args, "--type"), flag_value(args, "--params"))
    else {
        eprintln!("Uso: order-cli run --dir <RECIPES> --type <TYPE> --params '<JSON>' [--fixtures <FILE>] [--task <ID>]");
        std::process::exit(2);
    };

    let (store, status) = RecipeStore::load_dir(dir);
    if !status.errors.is_empty() {
        for e in &status.errors {
            eprintln!("[order-cli run] receta inválida [{}]: {}", e.file, e.reason);
        }
    }
    let Some(recipe) = store.get(wo_type) else {
        eprintln!("[order-cli run] tipo no encontrado en el catálogo: {wo_type}");
        std::process::exit(4);
    };

    let params_json: serde_json::Value = match serde_json::from_str(params_raw) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("[order-cli run] --params no es JSON: {e}");
            std::process::exit(3);
        }
    };
    let Some(obj) = params_json.as_object() else {
        eprintln!("[order-cli run] --params debe ser un objeto JSON");
        std::process::exit(3);
    };
    let (seed, rejected) = Context::from_json_object(obj);
    if !rejected.is_empty() {
        eprintln!("[order-cli run] parámetros no escalares ignorados: {}", rejected.join(", "));
    }

    let probe = match flag_value(args, "--fixtures") {
        Some(path) => match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).map_err(|e| e.to_string()))
            .and_then(|v| InMemoryTableProbe::from_json(&v))
        {
            Ok(p) => p,
            Err(e) => {
                eprintln!("[order-cli run] fixtures inválidas: {e}");
                std::process::exit(3);
            }
        },
        None => InMemoryTableProbe::new(),
    };

    let task_id = flag_value(args, "--task").map(|s| s.to_string()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let engine = StepEngine::new(Arc::new(probe), Arc::new(SystemClock));

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let outcome = runtime.block_on(engine.run(&recipe, seed, &CancelToken::new()));

    match outcome {
        RunOutcome::Completed { dml, context_snapshot, trace } => {
            let artifact = assemble(task_id, &recipe, dml, context_snapshot);
            println!("{}", serde_json::to_string_pretty(&artifact).unwrap());
            eprintln!("pasos ejecutados: {}", trace.len());
        }
        RunOutcome::UserError { message, trace } => {
            eprintln!("rechazado por la receta: {message}");
            eprintln!("traza: {}", serde_json::to_string(&trace).unwrap());
            std::process::exit(3);
        }
        RunOutcome::EngineError { error, trace } => {
            eprintln!("error del motor: {error}");
            eprintln!("traza: {}", serde_json::to_string(&trace).unwrap());
            std::process::exit(5);
        }
    }
}
