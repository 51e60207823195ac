//! Constantes del motor core.
//!
//! Valores que forman parte del contrato observable del intérprete y del
//! matcher. Cambiarlos altera la semántica de ejecución de todas las
//! recetas, no sólo la de una corrida concreta.

/// Versión lógica del motor. Se anota en cada artefacto DML para poder
/// correlacionar revisiones humanas con la versión del intérprete que las
/// produjo.
pub const ENGINE_VERSION: &str = "0.4";

/// Tope de iteraciones por corrida. Una receta con ciclos (saltos hacia
/// atrás) nunca ejecuta más pasos que este límite.
pub const ITERATION_CAP: u32 = 100;

/// Umbral mínimo de confianza para aceptar la receta elegida por el LLM.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Longitud máxima (bytes) de un predicado antes de rechazarlo sin parsear.
/// Acota el tiempo de análisis frente a entradas hostiles.
pub const MAX_PREDICATE_BYTES: usize = 2048;

/// Nombre de archivo (sin extensión) que el catálogo ignora al cargar.
pub const SCHEMA_FILE_STEM: &str = "schema";
