//! Sondas SQL de sólo lectura.

pub mod memory;
pub mod mysql;

pub use memory::{FixtureTable, InMemoryTableProbe};
pub use mysql::MySqlProbe;

use order_core::errors::ProbeError;

/// Guarda de frontera: sólo se aceptan sentencias SELECT. El escaneo de
/// palabras prohibidas es por subcadena (sobre-rechaza antes que dejar
/// pasar); el SQL llega completamente renderizado, sin placeholders.
pub fn ensure_readonly(sql: &str) -> Result<(), ProbeError> {
    let upper = sql.trim().to_uppercase();
    if !upper.starts_with("SELECT") {
        return Err(ProbeError::Rejected { reason: "only SELECT statements are allowed".into() });
    }
    const FORBIDDEN: [&str; 13] = ["INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
                                   "GRANT", "REVOKE", "REPLACE", "RENAME", "CALL", "EXECUTE"];
    for keyword in FORBIDDEN {
        if upper.contains(keyword) {
            return Err(ProbeError::Rejected { reason: format!("forbidden keyword: {keyword}") });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_select_pasa_la_guarda() {
        assert!(ensure_readonly("SELECT id FROM t WHERE id = 1").is_ok());
        assert!(ensure_readonly("  select 1").is_ok());
        assert!(ensure_readonly("DELETE FROM t").is_err());
        assert!(ensure_readonly("SELECT 1; DROP TABLE t").is_err());
        // Sobre-rechazo deliberado: la palabra prohibida cuenta incluso
        // dentro de un literal.
        assert!(ensure_readonly("SELECT 1 FROM t WHERE note = 'please UPDATE me'").is_err());
    }
}
