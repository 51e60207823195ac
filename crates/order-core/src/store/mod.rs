//! Catálogo de recetas en disco.
//!
//! Un directorio de documentos JSON, una receta por archivo; el archivo
//! `schema.*` se salta por nombre. Cada documento se parsea y valida contra
//! el esquema; el primer fallo excluye ese archivo del catálogo (las demás
//! recetas cargan igual) y queda anotado en `CatalogStatus`. Tras la carga
//! el catálogo es de sólo lectura: `get`/`list_all` concurrentes no
//! necesitan lock.
//!
//! Chequeos de validación (todos deben pasar):
//! - conformidad de tipos del documento (serde) y claves de nivel superior
//!   conocidas;
//! - `work_order_type` no vacío y único en el catálogo;
//! - números de paso únicos; existe paso de entrada (el de número mínimo);
//! - todo `next_step`/`else_step`/`on_failure.next_step` nulo o existente;
//! - ninguna `condition` sin `else_step`; `on_failure` sin `condition`;
//! - consistencia de forma en GENERATE_DML (UPDATE: set+where; DELETE:
//!   where; INSERT: values);
//! - identificadores SQL válidos en tablas, columnas y output_fields.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::constants::SCHEMA_FILE_STEM;
use crate::errors::RecipeError;
use crate::hashing::hash_value;
use crate::model::{Branch, DmlKind, Recipe, RecipeDoc, StepOp};
use crate::template::check_identifier;

/// Resumen de una (re)carga de catálogo.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
    pub loaded: usize,
    pub errors: Vec<CatalogError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogError {
    pub file: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct RecipeStore {
    dir: PathBuf,
    cache: HashMap<String, Arc<Recipe>>,
}

impl RecipeStore {
    /// Carga todas las recetas de `dir`. Los errores por archivo no abortan
    /// la carga del resto.
    pub fn load_dir(dir: impl AsRef<Path>) -> (Self, CatalogStatus) {
        let mut store = Self { dir: dir.as_ref().to_path_buf(),
                               cache: HashMap::new() };
        let status = store.reload();
        (store, status)
    }

    /// Re-enumera el directorio y reemplaza la caché completa.
    pub fn reload(&mut self) -> CatalogStatus {
        let mut cache: HashMap<String, Arc<Recipe>> = HashMap::new();
        let mut errors = Vec::new();

        let mut files: Vec<PathBuf> = match fs::read_dir(&self.dir) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path()))
                                  .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
                                  .filter(|p| p.file_stem().map(|s| s != SCHEMA_FILE_STEM).unwrap_or(true))
                                  .collect(),
            Err(e) => {
                errors.push(CatalogError { file: self.dir.display().to_string(),
                                           reason: format!("cannot read directory: {e}") });
                self.cache = cache;
                return CatalogStatus { loaded: 0, errors };
            }
        };
        // Orden estable para que los duplicados se resuelvan igual en cada
        // recarga.
        files.sort();

        for path in files {
            let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
            match load_recipe_file(&path) {
                Ok(recipe) => {
                    if cache.contains_key(&recipe.work_order_type) {
                        errors.push(CatalogError { file,
                                                   reason: RecipeError::DuplicateType { work_order_type: recipe.work_order_type.clone() }.to_string() });
                        continue;
                    }
                    cache.insert(recipe.work_order_type.clone(), Arc::new(recipe));
                }
                Err(e) => errors.push(CatalogError { file, reason: e.to_string() }),
            }
        }

        let loaded = cache.len();
        self.cache = cache;
        CatalogStatus { loaded, errors }
    }

    pub fn get(&self, work_order_type: &str) -> Option<Arc<Recipe>> {
        self.cache.get(work_order_type).cloned()
    }

    /// Todas las recetas, ordenadas por tipo para que el matcher construya
    /// ordinales deterministas.
    pub fn list_all(&self) -> Vec<Arc<Recipe>> {
        let mut all: Vec<Arc<Recipe>> = self.cache.values().cloned().collect();
        all.sort_by(|a, b| a.work_order_type.cmp(&b.work_order_type));
        all
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn load_recipe_file(path: &Path) -> Result<Recipe, RecipeError> {
    let raw = fs::read_to_string(path).map_err(|e| RecipeError::Io { detail: e.to_string() })?;
    parse_and_validate(&raw)
}

/// Parsea y valida un documento de receta. Expuesto también para round-trips
/// en tests.
pub fn parse_and_validate(raw: &str) -> Result<Recipe, RecipeError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| RecipeError::Schema { detail: e.to_string() })?;
    let doc: RecipeDoc = serde_json::from_value(value.clone()).map_err(|e| RecipeError::Schema { detail: e.to_string() })?;
    let recipe = Recipe::from_doc(doc, hash_value(&value));
    validate(&recipe)?;
    Ok(recipe)
}

fn validate(recipe: &Recipe) -> Result<(), RecipeError> {
    if recipe.work_order_type.trim().is_empty() {
        return Err(RecipeError::EmptyType);
    }
    if recipe.steps.is_empty() {
        return Err(RecipeError::NoSteps);
    }

    let mut numbers: Vec<u32> = Vec::with_capacity(recipe.steps.len());
    for s in &recipe.steps {
        if numbers.contains(&s.step) {
            return Err(RecipeError::DuplicateStep { step: s.step });
        }
        numbers.push(s.step);
    }

    let exists = |n: u32| numbers.contains(&n);
    let check_target = |step: u32, target: Option<u32>| -> Result<(), RecipeError> {
        match target {
            Some(t) if !exists(t) => Err(RecipeError::MissingTarget { step, target: t }),
            _ => Ok(()),
        }
    };
    let check_branch = |step: u32, branch: &Branch, is_failure: bool| -> Result<(), RecipeError> {
        if branch.condition.is_some() {
            if is_failure {
                return Err(RecipeError::ConditionalFailure { step });
            }
            if branch.else_step.is_none() {
                return Err(RecipeError::ConditionWithoutElse { step });
            }
        }
        check_target(step, branch.next_step)?;
        check_target(step, branch.else_step.flatten())
    };
    let check_ident = |step: u32, ident: &str| -> Result<(), RecipeError> {
        check_identifier(ident).map_err(|_| RecipeError::BadIdentifier { step, ident: ident.to_string() })
    };

    for s in &recipe.steps {
        match &s.op {
            StepOp::Query(q) => {
                check_ident(s.step, &q.table)?;
                if q.output_fields.is_empty() {
                    return Err(RecipeError::StepShape { step: s.step,
                                                       detail: "QUERY requires output_fields".into() });
                }
                for f in &q.output_fields {
                    check_ident(s.step, f)?;
                }
                if let Some(b) = &q.on_success {
                    check_branch(s.step, b, false)?;
                }
                if let Some(b) = &q.on_failure {
                    check_branch(s.step, b, true)?;
                }
            }
            StepOp::GenerateDml(d) => {
                check_ident(s.step, &d.table)?;
                match d.kind {
                    DmlKind::Update => {
                        if d.set.as_ref().map(|m| m.is_empty()).unwrap_or(true) {
                            return Err(RecipeError::StepShape { step: s.step,
                                                               detail: "UPDATE requires a non-empty set map".into() });
                        }
                        if d.where_clause.is_none() {
                            return Err(RecipeError::StepShape { step: s.step,
                                                               detail: "UPDATE requires a where clause".into() });
                        }
                    }
                    DmlKind::Delete => {
                        if d.where_clause.is_none() {
                            return Err(RecipeError::StepShape { step: s.step,
                                                               detail: "DELETE requires a where clause".into() });
                        }
                    }
                    DmlKind::Insert => {
                        if d.values.as_ref().map(|m| m.is_empty()).unwrap_or(true) {
                            return Err(RecipeError::StepShape { step: s.step,
                                                               detail: "INSERT requires a non-empty values map".into() });
                        }
                    }
                }
                for col in d.set.iter().flat_map(|m| m.keys()).chain(d.values.iter().flat_map(|m| m.keys())) {
                    check_ident(s.step, col)?;
                }
                check_target(s.step, d.next_step.flatten())?;
            }
            StepOp::ReturnSuccess(_) | StepOp::ReturnError(_) => {}
        }
    }
    Ok(())
}
