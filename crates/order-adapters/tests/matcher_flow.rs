//! Flujo del matcher contra el LLM guionizado.

use std::sync::Arc;

use order_adapters::ScriptedLlm;
use order_core::errors::{LlmError, MatchError};
use order_core::matcher::{MatchOutcome, RecipeMatcher};
use order_core::model::Scalar;
use order_core::providers::CancelToken;
use order_core::store::RecipeStore;

fn catalog_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cancel_marine_order.json"),
                   r#"{"work_order_type": "cancel_marine_order", "description": "取消海运单",
                       "steps": [{"step": 1, "operation": "RETURN_ERROR", "message": "m"}]}"#).unwrap();
    std::fs::write(dir.path().join("update_telco_customer.json"),
                   r#"{"work_order_type": "update_telco_customer", "description": "修改月费",
                       "steps": [
                           {"step": 1, "operation": "GENERATE_DML", "type": "UPDATE", "table": "telco_customer",
                            "set": {"MonthlyCharges": "{new_price}"}, "where": "customerID = {customerID}"}]}"#).unwrap();
    dir
}

#[tokio::test]
async fn empareja_y_extrae_parametros() {
    let dir = catalog_dir();
    let (store, status) = RecipeStore::load_dir(dir.path());
    assert!(status.errors.is_empty());

    // list_all ordena por tipo: 1=cancel_marine_order, 2=update_telco_customer.
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 2, "confidence": 0.93, "reasoning": "price change"}"#,
        r#"{"customerID": "0002-ORFBO", "new_price": 80}"#,
    ]));
    let matcher = RecipeMatcher::new(llm.clone());

    let outcome = matcher.match_order("请把客户 0002-ORFBO 的月费改为 80", &store, &CancelToken::new())
                         .await
                         .unwrap();
    let MatchOutcome::Matched(matched) = outcome else {
        panic!("expected Matched");
    };
    assert_eq!(matched.recipe.work_order_type, "update_telco_customer");
    assert_eq!(matched.params.get("new_price"), Some(&Scalar::Int(80)));
    assert!((matched.confidence - 0.93).abs() < f64::EPSILON);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("1. cancel_marine_order: 取消海运单"));
    assert!(prompts[0].contains("2. update_telco_customer: 修改月费"));
    // La extracción pide exactamente los parámetros que la receta no produce.
    assert!(prompts[1].contains("new_price"));
    assert!(prompts[1].contains("customerID"));
}

#[tokio::test]
async fn confianza_baja_es_unmatched_sin_segunda_llamada() {
    let dir = catalog_dir();
    let (store, _) = RecipeStore::load_dir(dir.path());
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 1, "confidence": 0.4, "reasoning": "unsure"}"#,
    ]));
    let matcher = RecipeMatcher::new(llm.clone());

    let outcome = matcher.match_order("no clue", &store, &CancelToken::new()).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Unmatched { .. }));
    assert_eq!(llm.prompts().len(), 1);
}

#[tokio::test]
async fn salida_cercada_se_acepta_y_malformada_reintenta_una_vez() {
    let dir = catalog_dir();
    let (store, _) = RecipeStore::load_dir(dir.path());
    // Primer intento malformado, segundo en bloque cercado: debe emparejar.
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        "definitely recipe two",
        "```json\n{\"matched_index\": 2, \"confidence\": 0.9, \"reasoning\": \"r\"}\n```",
        r#"{"customerID": "C1", "new_price": 10}"#,
    ]));
    let matcher = RecipeMatcher::new(llm.clone());

    let outcome = matcher.match_order("cambia el precio", &store, &CancelToken::new()).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched(_)));
    assert_eq!(llm.prompts().len(), 3);
}

#[tokio::test]
async fn malformada_dos_veces_aflora_el_error() {
    let dir = catalog_dir();
    let (store, _) = RecipeStore::load_dir(dir.path());
    let llm = Arc::new(ScriptedLlm::with_replies(&["nope", "still nope"]));
    let matcher = RecipeMatcher::new(llm.clone());

    let err = matcher.match_order("texto", &store, &CancelToken::new()).await.unwrap_err();
    assert!(matches!(err, MatchError::Malformed { .. }));
    assert_eq!(llm.prompts().len(), 2);
}

#[tokio::test]
async fn indice_fuera_de_rango_y_confianza_invalida() {
    let dir = catalog_dir();
    let (store, _) = RecipeStore::load_dir(dir.path());

    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 7, "confidence": 0.9, "reasoning": "r"}"#,
        r#"{"matched_index": 7, "confidence": 0.9, "reasoning": "r"}"#,
    ]));
    let err = RecipeMatcher::new(llm).match_order("x", &store, &CancelToken::new()).await.unwrap_err();
    assert!(matches!(err, MatchError::IndexOutOfRange { got: 7, .. }));

    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 1, "confidence": 1.5, "reasoning": "r"}"#,
        r#"{"matched_index": 1, "confidence": 1.5, "reasoning": "r"}"#,
    ]));
    let err = RecipeMatcher::new(llm).match_order("x", &store, &CancelToken::new()).await.unwrap_err();
    assert!(matches!(err, MatchError::BadConfidence { .. }));
}

#[tokio::test]
async fn fallo_de_transporte_se_reintenta() {
    let dir = catalog_dir();
    let (store, _) = RecipeStore::load_dir(dir.path());
    let llm = Arc::new(ScriptedLlm::new(vec![
        Err(LlmError::Timeout { secs: 30 }),
        Ok(r#"{"matched_index": 1, "confidence": 0.95, "reasoning": "r"}"#.to_string()),
        Ok(r#"{}"#.to_string()),
    ]));
    let matcher = RecipeMatcher::new(llm.clone());

    // Timeout en el primer intento, éxito en el reintento.
    let outcome = matcher.match_order("取消", &store, &CancelToken::new()).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched(_)));
}
