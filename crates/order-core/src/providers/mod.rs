//! Puertos de capacidades externas del núcleo.
//!
//! Sonda SQL, cliente LLM y reloj son parámetros de la corrida, no
//! singletons de proceso: así el núcleo se prueba con fakes en memoria.
//! Las implementaciones deben ser seguras para uso concurrente desde
//! múltiples corridas (`Send + Sync`); el contrato de deadline es por
//! llamada y el vencimiento se devuelve como error del puerto.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{LlmError, ProbeError};
use crate::model::QueryResult;

/// Sonda SQL de sólo lectura. Recibe SQL completamente renderizado (sin
/// placeholders) y DEBE imponer SELECT-only en su frontera.
#[async_trait]
pub trait SqlProbe: Send + Sync {
    async fn query(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ProbeError>;
}

/// Cliente de modelo de lenguaje. El núcleo parsea la respuesta como JSON
/// estricto; el transporte es asunto del adaptador.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

/// Reloj inyectado; sólo lo consume la traza.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj de sistema por defecto.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Token de cancelación cooperativa. El intérprete lo observa antes de cada
/// llamada externa; una corrida cancelada termina con
/// `EngineError::Cancelled`, traza parcial incluida y acumulador descartado.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn el_token_clonado_comparte_estado() {
        let t = CancelToken::new();
        let c = t.clone();
        assert!(!c.is_cancelled());
        t.cancel();
        assert!(c.is_cancelled());
    }
}
