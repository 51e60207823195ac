//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable
//! (`CONFIG`). Los valores por defecto permiten arrancar sin base de datos
//! (sonda en memoria, para dry-runs) pero no sin catálogo de recetas.

use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::runtime::OverflowPolicy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
});

pub struct AppConfig {
    /// Directorio del catálogo de recetas.
    pub recipes_dir: String,
    pub dispatcher: DispatcherSettings,
    pub llm: LlmSettings,
    pub probe: ProbeSettings,
}

pub struct DispatcherSettings {
    pub workers: usize,
    pub queue_depth: usize,
    pub overflow: OverflowPolicy,
}

pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct ProbeSettings {
    /// URL MySQL; sin definir, el servicio usa la sonda en memoria (vacía).
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let overflow = match env::var("QUEUE_POLICY").as_deref() {
            Ok("reject") => OverflowPolicy::Reject,
            _ => OverflowPolicy::Queue,
        };
        Self { recipes_dir: env::var("RECIPES_DIR").unwrap_or_else(|_| "recipes".to_string()),
               dispatcher: DispatcherSettings { workers: parse_env("WORKER_POOL_SIZE", 32),
                                                queue_depth: parse_env("QUEUE_DEPTH", 128),
                                                overflow },
               llm: LlmSettings { base_url: env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                                  api_key: env::var("LLM_API_KEY").unwrap_or_default(),
                                  model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                                  timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)) },
               probe: ProbeSettings { database_url: env::var("DATABASE_URL").ok(),
                                      max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 16),
                                      timeout: Duration::from_secs(parse_env("PROBE_TIMEOUT_SECS", 10)) } }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
