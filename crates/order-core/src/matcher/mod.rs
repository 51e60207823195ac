//! Matcher de recetas vía LLM.
//!
//! Dos llamadas por orden de trabajo: (1) elegir la receta enumerando el
//! catálogo como `"<ordinal>. <tipo>: <descripción>"` y pidiendo JSON
//! estricto `{matched_index, confidence, reasoning}`; (2) extraer los
//! parámetros requeridos por la receta elegida. Cualquier salida no
//! parseable, índice fuera de rango o confianza fuera de [0,1] es
//! `MatchError`; confianza bajo el umbral es `Unmatched` (no error).
//!
//! El LLM no es determinista, pero desde el punto de vista del intérprete
//! el matcher se comporta como función pura de (texto, catálogo): se llama
//! exactamente una vez por corrida y su salida queda capturada. Política de
//! reintento: un único reintento ante salida malformada o transporte caído,
//! luego se aflora el error.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::CONFIDENCE_THRESHOLD;
use crate::errors::MatchError;
use crate::model::{Context, Recipe};
use crate::providers::{CancelToken, LlmClient};
use crate::store::RecipeStore;

/// Receta elegida con sus parámetros extraídos del texto libre.
#[derive(Debug, Clone)]
pub struct MatchedRecipe {
    pub recipe: Arc<Recipe>,
    pub params: Context,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched(Box<MatchedRecipe>),
    /// El LLM respondió bien pero sin confianza suficiente. Se aflora al
    /// usuario; no se reintenta.
    Unmatched { confidence: f64, reasoning: String },
}

pub struct RecipeMatcher {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    threshold: f64,
}

#[derive(Debug, Deserialize)]
struct SelectionReply {
    matched_index: i64,
    confidence: f64,
    reasoning: Option<String>,
}

impl RecipeMatcher {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm,
               timeout: Duration::from_secs(30),
               threshold: CONFIDENCE_THRESHOLD }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resuelve el texto libre contra el catálogo completo.
    pub async fn match_order(&self,
                             user_text: &str,
                             store: &RecipeStore,
                             cancel: &CancelToken)
                             -> Result<MatchOutcome, MatchError> {
        let catalog = store.list_all();
        if catalog.is_empty() {
            return Ok(MatchOutcome::Unmatched { confidence: 0.0,
                                                reasoning: "empty recipe catalog".into() });
        }

        let selection_prompt = build_selection_prompt(&catalog, user_text);
        let max = catalog.len();
        let reply: SelectionReply = self.ask(&selection_prompt, cancel, move |text| {
                                            let reply = parse_selection(text)?;
                                            if reply.matched_index < 1 || reply.matched_index as usize > max {
                                                return Err(MatchError::IndexOutOfRange { got: reply.matched_index, max });
                                            }
                                            if !(0.0..=1.0).contains(&reply.confidence) {
                                                return Err(MatchError::BadConfidence { got: reply.confidence });
                                            }
                                            Ok(reply)
                                        })
                                        .await?;
        let reasoning = reply.reasoning.unwrap_or_default();
        if reply.confidence < self.threshold {
            return Ok(MatchOutcome::Unmatched { confidence: reply.confidence, reasoning });
        }

        let recipe = catalog[(reply.matched_index - 1) as usize].clone();
        let extraction_prompt = build_extraction_prompt(&recipe, user_text);
        let params = self.ask(&extraction_prompt, cancel, parse_params).await?;

        Ok(MatchOutcome::Matched(Box::new(MatchedRecipe { recipe,
                                                          params,
                                                          confidence: reply.confidence,
                                                          reasoning })))
    }

    /// Una llamada LLM + parseo/validación, con un único reintento ante
    /// cualquier `MatchError`.
    async fn ask<T>(&self,
                    prompt: &str,
                    cancel: &CancelToken,
                    parse: impl Fn(&str) -> Result<T, MatchError>)
                    -> Result<T, MatchError> {
        let mut last_err = None;
        for _ in 0..2 {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }
            match self.llm.complete(prompt, self.timeout).await {
                Ok(text) => match parse(&text) {
                    Ok(v) => return Ok(v),
                    Err(e) => last_err = Some(e),
                },
                Err(e) => last_err = Some(MatchError::Llm(e)),
            }
        }
        Err(last_err.unwrap_or(MatchError::Malformed { detail: "no attempts made".into() }))
    }
}

fn build_selection_prompt(catalog: &[Arc<Recipe>], user_text: &str) -> String {
    let mut prompt = String::from(
        "You match database change work orders to declarative change recipes.\n\
         Available recipes:\n",
    );
    for (i, recipe) in catalog.iter().enumerate() {
        prompt.push_str(&format!("{}. {}: {}\n", i + 1, recipe.work_order_type, recipe.description));
    }
    prompt.push_str("\nWork order:\n");
    prompt.push_str(user_text);
    prompt.push_str(
        "\n\nReply with a single JSON object and nothing else:\n\
         {\"matched_index\": <1-based index of the best recipe>, \
         \"confidence\": <score in [0, 1]>, \
         \"reasoning\": \"<short explanation>\"}\n",
    );
    prompt
}

fn build_extraction_prompt(recipe: &Recipe, user_text: &str) -> String {
    let required = recipe.required_params();
    let mut prompt = String::from("Extract the parameters a change recipe needs from a work order.\n");
    prompt.push_str(&format!("Recipe {}: {}\n", recipe.work_order_type, recipe.description));
    prompt.push_str(&format!("Parameters to extract: {}\n", required.join(", ")));
    prompt.push_str("\nWork order:\n");
    prompt.push_str(user_text);
    prompt.push_str(
        "\n\nReply with a single JSON object and nothing else, mapping every parameter \
         name to a scalar value (string, number, boolean or null).\n",
    );
    prompt
}

fn parse_selection(text: &str) -> Result<SelectionReply, MatchError> {
    serde_json::from_str(extract_json(text)).map_err(|e| MatchError::Malformed { detail: e.to_string() })
}

fn parse_params(text: &str) -> Result<Context, MatchError> {
    let value: serde_json::Value =
        serde_json::from_str(extract_json(text)).map_err(|e| MatchError::Malformed { detail: e.to_string() })?;
    let obj = value.as_object().ok_or_else(|| MatchError::BadParams { detail: "reply is not a JSON object".into() })?;
    let (ctx, rejected) = Context::from_json_object(obj);
    if !rejected.is_empty() {
        return Err(MatchError::BadParams { detail: format!("non-scalar values for: {}", rejected.join(", ")) });
    }
    Ok(ctx)
}

/// Aísla el cuerpo JSON: tolera un bloque cercado ```json ... ``` (salida
/// habitual de los modelos); todo lo demás debe ser JSON desnudo.
fn extract_json(text: &str) -> &str {
    let t = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = t.find(fence) {
            let body = &t[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrae_json_cercado_y_desnudo() {
        assert_eq!(extract_json("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn parseo_estricto_de_seleccion() {
        assert!(parse_selection("{\"matched_index\": 1, \"confidence\": 0.9, \"reasoning\": \"r\"}").is_ok());
        assert!(parse_selection("I think recipe 1").is_err());
        assert!(parse_selection("{\"matched_index\": \"one\", \"confidence\": 0.9}").is_err());
    }

    #[test]
    fn parseo_de_parametros_solo_escalares() {
        let ctx = parse_params("{\"customerID\": \"0002-ORFBO\", \"new_price\": 80}").unwrap();
        assert_eq!(ctx.len(), 2);
        assert!(matches!(parse_params("{\"x\": [1]}"), Err(MatchError::BadParams { .. })));
        assert!(matches!(parse_params("[1, 2]"), Err(MatchError::BadParams { .. })));
    }
}
