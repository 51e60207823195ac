//! order-adapters: implementaciones concretas de los puertos de order-core.
//!
//! - `probes`: sonda en memoria para tests/dry-runs y sonda MySQL (sqlx)
//!   con guarda SELECT-only en la frontera.
//! - `llm`: cliente chat OpenAI-compatible (reqwest) y fake guionizado.

pub mod llm;
pub mod probes;

pub use llm::{OpenAiChatClient, ScriptedLlm};
pub use probes::{FixtureTable, InMemoryTableProbe, MySqlProbe};
