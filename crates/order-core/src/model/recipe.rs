//! Receta declarativa: el programa que ejecuta el intérprete.
//!
//! Una receta es un documento inmutable identificado por `work_order_type`.
//! Sus pasos forman un grafo de control: los números de paso no necesitan
//! ser contiguos ni monótonos y los saltos (`next_step`/`else_step`) son de
//! primera clase. El sentinela "fin" se escribe `null` en el documento.
//!
//! Distinción ausente/null en `next_step` de GENERATE_DML:
//! - campo ausente  → caída al paso `step + 1` (o terminar si no existe);
//! - `null` explícito → terminar la corrida.
//! Por eso el campo se modela como `Option<Option<u32>>`.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Documento tal como vive en disco. Claves desconocidas de nivel superior
/// se rechazan en la deserialización.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDoc {
    pub work_order_type: String,
    pub description: String,
    pub steps: Vec<Step>,
    /// Sólo documentación para el revisor; el intérprete no lo usa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_sql_template: Option<String>,
}

/// Receta validada y lista para ejecutar, con su hash de contenido.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub work_order_type: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub final_sql_template: Option<String>,
    /// Hash SHA-256 del JSON canónico del documento. Versiona el catálogo
    /// por contenido; no participa en la semántica de ejecución.
    pub recipe_hash: String,
}

impl Recipe {
    pub fn from_doc(doc: RecipeDoc, recipe_hash: String) -> Self {
        Self { work_order_type: doc.work_order_type,
               description: doc.description,
               steps: doc.steps,
               final_sql_template: doc.final_sql_template,
               recipe_hash }
    }

    /// Índice número → paso. Los números son únicos (validado al cargar).
    pub fn step_index(&self) -> BTreeMap<u32, &Step> {
        self.steps.iter().map(|s| (s.step, s)).collect()
    }

    /// Paso de entrada: el de número más bajo.
    pub fn entry_step(&self) -> Option<u32> {
        self.steps.iter().map(|s| s.step).min()
    }

    /// Parámetros que la receta necesita del exterior: todo placeholder
    /// referenciado por alguna plantilla que ningún `output_fields` de un
    /// QUERY produce. Orden de primera aparición.
    pub fn required_params(&self) -> Vec<String> {
        let produced: Vec<&str> = self.steps
                                      .iter()
                                      .filter_map(|s| match &s.op {
                                          StepOp::Query(q) => Some(q.output_fields.iter().map(|f| f.as_str())),
                                          _ => None,
                                      })
                                      .flatten()
                                      .collect();
        let mut required: Vec<String> = Vec::new();
        let mut push_from = |template: &str| {
            for name in crate::template::placeholders(template) {
                if !produced.contains(&name.as_str()) && !required.contains(&name) {
                    required.push(name);
                }
            }
        };
        for s in &self.steps {
            match &s.op {
                StepOp::Query(q) => {
                    push_from(&q.where_clause);
                    for b in [&q.on_success, &q.on_failure].into_iter().flatten() {
                        if let Some(cond) = &b.condition {
                            push_from(cond);
                        }
                    }
                }
                StepOp::GenerateDml(d) => {
                    for tpl in d.set.iter().flat_map(|m| m.values()) {
                        push_from(tpl);
                    }
                    for tpl in d.values.iter().flat_map(|m| m.values()) {
                        push_from(tpl);
                    }
                    if let Some(w) = &d.where_clause {
                        push_from(w);
                    }
                    if let Some(desc) = &d.description {
                        push_from(desc);
                    }
                }
                StepOp::ReturnSuccess(r) => {
                    if let Some(m) = &r.message {
                        push_from(m);
                    }
                }
                StepOp::ReturnError(r) => push_from(&r.message),
            }
        }
        required
    }
}

/// Un paso: número + operación etiquetada por el campo `operation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step: u32,
    #[serde(flatten)]
    pub op: StepOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum StepOp {
    #[serde(rename = "QUERY")]
    Query(QueryStep),
    #[serde(rename = "GENERATE_DML")]
    GenerateDml(DmlStep),
    #[serde(rename = "RETURN_SUCCESS")]
    ReturnSuccess(SuccessStep),
    #[serde(rename = "RETURN_ERROR")]
    ReturnError(ErrorStep),
}

impl StepOp {
    pub fn kind(&self) -> StepOpKind {
        match self {
            StepOp::Query(_) => StepOpKind::Query,
            StepOp::GenerateDml(_) => StepOpKind::GenerateDml,
            StepOp::ReturnSuccess(_) => StepOpKind::ReturnSuccess,
            StepOp::ReturnError(_) => StepOpKind::ReturnError,
        }
    }
}

/// Clasificación neutra de operaciones, para trazas y mensajes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOpKind {
    #[serde(rename = "QUERY")]
    Query,
    #[serde(rename = "GENERATE_DML")]
    GenerateDml,
    #[serde(rename = "RETURN_SUCCESS")]
    ReturnSuccess,
    #[serde(rename = "RETURN_ERROR")]
    ReturnError,
}

impl fmt::Display for StepOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepOpKind::Query => "QUERY",
            StepOpKind::GenerateDml => "GENERATE_DML",
            StepOpKind::ReturnSuccess => "RETURN_SUCCESS",
            StepOpKind::ReturnError => "RETURN_ERROR",
        };
        f.write_str(s)
    }
}

/// Sondeo read-only: compone `SELECT <output_fields> FROM <table> WHERE ...`
/// y vuelca la primera fila al contexto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStep {
    pub table: String,
    #[serde(rename = "where")]
    pub where_clause: String,
    pub output_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Branch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Branch>,
}

/// Emite un registro DML (UPDATE/INSERT/DELETE) al acumulador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmlStep {
    #[serde(rename = "type")]
    pub kind: DmlKind,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<IndexMap<String, String>>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<IndexMap<String, String>>,
    /// Texto para el revisor; plantilla renderizada en modo laxo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub next_step: Option<Option<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStep {
    pub message: String,
}

/// Salto condicional o incondicional. Con `condition` presente, verdadero →
/// `next_step`, falso → `else_step` (obligatorio en ese caso); sin
/// `condition`, salto directo a `next_step`. `null` como destino = fin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Branch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub next_step: Option<u32>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub else_step: Option<Option<u32>>,
}

/// Tipo de sentencia DML generada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmlKind {
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "DELETE")]
    Delete,
}

impl fmt::Display for DmlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DmlKind::Update => "UPDATE",
            DmlKind::Insert => "INSERT",
            DmlKind::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Deserializa distinguiendo campo ausente de `null` explícito: el campo
/// ausente queda `None` (vía `default`), `null` queda `Some(None)`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
    where D: Deserializer<'de>
{
    Option::<u32>::deserialize(deserializer).map(Some)
}
