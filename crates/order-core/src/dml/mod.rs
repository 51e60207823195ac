//! Render de sentencias DML y ensamblado del artefacto de revisión.
//!
//! Cada registro sale en dos formas: literal (para mostrar al revisor) y
//! parametrizada con `?` (para ejecutar). Los pares (nombre, valor) se
//! acumulan en orden de aparición izquierda→derecha sobre la sentencia
//! completa, de modo que la re-sustitución posicional reproduce el literal.

use serde::Serialize;

use crate::constants::ENGINE_VERSION;
use crate::errors::RenderError;
use crate::model::{Context, DmlKind, DmlRecord, DmlStep, Recipe};
use crate::template::{check_identifier, render_lenient, render_sql_with_params, RenderedSql};

/// Renderiza un paso GENERATE_DML contra el contexto actual.
pub fn render_statement(step: &DmlStep, ctx: &Context) -> Result<DmlRecord, RenderError> {
    check_identifier(&step.table)?;

    let mut literal = String::new();
    let mut template = String::new();
    let mut params = Vec::new();
    let mut push = |rendered: RenderedSql, lit: &mut String, tpl: &mut String| {
        lit.push_str(&rendered.literal);
        tpl.push_str(&rendered.template);
        params.extend(rendered.params);
    };

    match step.kind {
        DmlKind::Update => {
            literal.push_str(&format!("UPDATE {} SET ", step.table));
            template.push_str(&format!("UPDATE {} SET ", step.table));
            let set = step.set.as_ref().ok_or_else(|| RenderError::Shape { detail: "UPDATE without set map".into() })?;
            for (i, (column, tpl)) in set.iter().enumerate() {
                check_identifier(column)?;
                if i > 0 {
                    literal.push_str(", ");
                    template.push_str(", ");
                }
                literal.push_str(column);
                literal.push_str(" = ");
                template.push_str(column);
                template.push_str(" = ");
                push(render_sql_with_params(tpl, ctx)?, &mut literal, &mut template);
            }
            let where_clause = step.where_clause
                                   .as_ref()
                                   .ok_or_else(|| RenderError::Shape { detail: "UPDATE without where clause".into() })?;
            literal.push_str(" WHERE ");
            template.push_str(" WHERE ");
            push(render_sql_with_params(where_clause, ctx)?, &mut literal, &mut template);
        }
        DmlKind::Insert => {
            let values = step.values.as_ref().ok_or_else(|| RenderError::Shape { detail: "INSERT without values map".into() })?;
            let mut columns = Vec::with_capacity(values.len());
            for column in values.keys() {
                check_identifier(column)?;
                columns.push(column.as_str());
            }
            let head = format!("INSERT INTO {} ({}) VALUES (", step.table, columns.join(", "));
            literal.push_str(&head);
            template.push_str(&head);
            for (i, tpl) in values.values().enumerate() {
                if i > 0 {
                    literal.push_str(", ");
                    template.push_str(", ");
                }
                push(render_sql_with_params(tpl, ctx)?, &mut literal, &mut template);
            }
            literal.push(')');
            template.push(')');
        }
        DmlKind::Delete => {
            let where_clause = step.where_clause
                                   .as_ref()
                                   .ok_or_else(|| RenderError::Shape { detail: "DELETE without where clause".into() })?;
            literal.push_str(&format!("DELETE FROM {} WHERE ", step.table));
            template.push_str(&format!("DELETE FROM {} WHERE ", step.table));
            push(render_sql_with_params(where_clause, ctx)?, &mut literal, &mut template);
        }
    }

    let description = match &step.description {
        Some(tpl) => render_lenient(tpl, ctx),
        None => format!("{} {}", step.kind, step.table),
    };

    Ok(DmlRecord { kind: step.kind,
                   table: step.table.clone(),
                   rendered_sql: literal,
                   template_sql: template,
                   parameters: params,
                   description })
}

/// Nivel de riesgo orientativo para el revisor; nunca bloquea la emisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// Clasifica el acumulador completo:
/// - `high`: algún UPDATE/DELETE con WHERE vacío o sin token de comparación;
/// - `medium`: algún DELETE restante, o UPDATEs sobre más de una tabla;
/// - `low`: el resto.
pub fn classify_risk(records: &[DmlRecord]) -> Risk {
    let mutating = |r: &&DmlRecord| matches!(r.kind, DmlKind::Update | DmlKind::Delete);
    if records.iter().filter(mutating).any(|r| !where_has_comparison(&r.rendered_sql)) {
        return Risk::High;
    }
    if records.iter().any(|r| r.kind == DmlKind::Delete) {
        return Risk::Medium;
    }
    let update_tables: Vec<&str> = records.iter()
                                          .filter(|r| r.kind == DmlKind::Update)
                                          .map(|r| r.table.as_str())
                                          .collect();
    if update_tables.iter().any(|t| *t != update_tables[0]) {
        return Risk::Medium;
    }
    Risk::Low
}

/// ¿El WHERE renderizado contiene algún token de comparación? Un WHERE
/// ausente o vacío cuenta como "no".
fn where_has_comparison(rendered_sql: &str) -> bool {
    let upper = rendered_sql.to_uppercase();
    let Some(pos) = upper.find(" WHERE ") else {
        return false;
    };
    let clause = upper[pos + " WHERE ".len()..].trim();
    if clause.is_empty() {
        return false;
    }
    clause.contains('=')
        || clause.contains('<')
        || clause.contains('>')
        || clause.contains(" IN ")
        || clause.contains(" LIKE ")
}

/// Artefacto final entregado a la capa de correo para revisión humana.
/// Los renderers aguas abajo deben ejecutar la forma parametrizada; el
/// literal es sólo para mostrar.
#[derive(Debug, Clone, Serialize)]
pub struct DmlArtifact {
    pub task_id: String,
    pub recipe_type: String,
    pub recipe_hash: String,
    pub engine_version: String,
    pub affected_tables: Vec<String>,
    pub risk: Risk,
    pub description: String,
    pub dml: Vec<DmlRecord>,
    pub context_snapshot: Context,
}

/// Finaliza el acumulador de una corrida completada.
pub fn assemble(task_id: impl Into<String>, recipe: &Recipe, dml: Vec<DmlRecord>, context_snapshot: Context) -> DmlArtifact {
    let mut affected_tables: Vec<String> = Vec::new();
    for r in &dml {
        if !affected_tables.contains(&r.table) {
            affected_tables.push(r.table.clone());
        }
    }
    let risk = classify_risk(&dml);
    let description = dml.iter().map(|r| r.description.as_str()).collect::<Vec<_>>().join("; ");
    DmlArtifact { task_id: task_id.into(),
                  recipe_type: recipe.work_order_type.clone(),
                  recipe_hash: recipe.recipe_hash.clone(),
                  engine_version: ENGINE_VERSION.to_string(),
                  affected_tables,
                  risk,
                  description,
                  dml,
                  context_snapshot }
}
