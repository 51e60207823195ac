//! Pipeline completo con LLM guionizado y sonda de fixtures, usando el
//! catálogo de ejemplo del repositorio.

use std::sync::Arc;

use order_adapters::{FixtureTable, InMemoryTableProbe, ScriptedLlm};
use order_core::dml::Risk;
use order_core::matcher::RecipeMatcher;
use order_core::model::{Context, Scalar};
use order_core::providers::{CancelToken, SystemClock};
use order_core::store::RecipeStore;
use order_core::StepEngine;
use orderflow_rust::{process_work_order, OperationKind, PipelineDeps, WorkOrderOutcome, WorkOrderRequest};

fn telco_probe() -> InMemoryTableProbe {
    let mut probe = InMemoryTableProbe::new();
    probe.insert_table("telco_customer",
                       FixtureTable { columns: vec!["customerID".into(), "MonthlyCharges".into()],
                                      rows: vec![vec![Scalar::Str("0002-ORFBO".into()), Scalar::Float(65.6)]] });
    probe
}

fn deps(llm: Arc<ScriptedLlm>, probe: InMemoryTableProbe) -> PipelineDeps {
    let (store, status) = RecipeStore::load_dir("recipes");
    assert!(status.errors.is_empty(), "example catalog must be valid: {:?}", status.errors);
    PipelineDeps { store: Arc::new(store),
                   matcher: RecipeMatcher::new(llm),
                   engine: StepEngine::new(Arc::new(probe), Arc::new(SystemClock)) }
}

fn request(content: &str) -> WorkOrderRequest {
    WorkOrderRequest { task_id: "T-1001".into(),
                       operation: OperationKind::Mutation,
                       content: content.into(),
                       parameters: Context::new() }
}

#[tokio::test]
async fn orden_de_cambio_de_precio_produce_artefacto() {
    // list_all ordena por tipo: 1=cancel_marine_order, 2=update_telco_customer.
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 2, "confidence": 0.95, "reasoning": "price change request"}"#,
        r#"{"customerID": "0002-ORFBO", "new_price": 80}"#,
    ]));
    let deps = deps(llm, telco_probe());

    let outcome = process_work_order(request("请把客户 0002-ORFBO 的月费调整为 80"), &deps, &CancelToken::new()).await;
    let WorkOrderOutcome::Artifact(artifact) = outcome else {
        panic!("expected Artifact, got {outcome:?}");
    };
    assert_eq!(artifact.task_id, "T-1001");
    assert_eq!(artifact.recipe_type, "update_telco_customer");
    assert_eq!(artifact.affected_tables, vec!["telco_customer".to_string()]);
    assert_eq!(artifact.risk, Risk::Low);
    assert_eq!(artifact.dml.len(), 1);
    assert_eq!(artifact.dml[0].rendered_sql,
               "UPDATE telco_customer SET MonthlyCharges = 80 WHERE customerID = '0002-ORFBO'");
    assert_eq!(artifact.dml[0].template_sql,
               "UPDATE telco_customer SET MonthlyCharges = ? WHERE customerID = ?");
    // La descripción de la receta llega renderizada al artefacto.
    assert!(artifact.description.contains("0002-ORFBO"));
}

#[tokio::test]
async fn los_parametros_del_matcher_ganan_a_los_del_upstream() {
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 2, "confidence": 0.9, "reasoning": "r"}"#,
        r#"{"customerID": "0002-ORFBO", "new_price": 80}"#,
    ]));
    let deps = deps(llm, telco_probe());
    let mut req = request("调价");
    req.parameters.insert("new_price", Scalar::Int(999));
    req.parameters.insert("approver", Scalar::Str("ops".into()));

    let outcome = process_work_order(req, &deps, &CancelToken::new()).await;
    let WorkOrderOutcome::Artifact(artifact) = outcome else {
        panic!("expected Artifact, got {outcome:?}");
    };
    // 80 (matcher) pisa a 999 (upstream); approver sobrevive en el snapshot.
    assert_eq!(artifact.dml[0].parameters[0].1, Scalar::Int(80));
    assert_eq!(artifact.context_snapshot.get("approver"), Some(&Scalar::Str("ops".into())));
}

#[tokio::test]
async fn cliente_inexistente_rechaza_via_return_error() {
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 2, "confidence": 0.9, "reasoning": "r"}"#,
        r#"{"customerID": "9999-NOPE", "new_price": 80}"#,
    ]));
    let deps = deps(llm, telco_probe());

    let outcome = process_work_order(request("改 9999-NOPE 的价格"), &deps, &CancelToken::new()).await;
    let WorkOrderOutcome::UserRejected { message, .. } = outcome else {
        panic!("expected UserRejected, got {outcome:?}");
    };
    assert_eq!(message, "客户不存在，客户编号: 9999-NOPE");
}

#[tokio::test]
async fn confianza_baja_es_no_match() {
    let llm = Arc::new(ScriptedLlm::with_replies(&[
        r#"{"matched_index": 1, "confidence": 0.2, "reasoning": "unclear request"}"#,
    ]));
    let deps = deps(llm, telco_probe());

    let outcome = process_work_order(request("帮我看看这个"), &deps, &CancelToken::new()).await;
    assert!(matches!(outcome, WorkOrderOutcome::NoMatch { .. }));
}

#[tokio::test]
async fn una_consulta_no_entra_al_motor() {
    let llm = Arc::new(ScriptedLlm::with_replies(&[]));
    let deps = deps(llm.clone(), telco_probe());
    let mut req = request("查询订单");
    req.operation = OperationKind::Query;

    let outcome = process_work_order(req, &deps, &CancelToken::new()).await;
    assert!(matches!(outcome, WorkOrderOutcome::NotAMutation));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn matcher_agotado_es_match_failed() {
    let llm = Arc::new(ScriptedLlm::with_replies(&["garbage", "more garbage"]));
    let deps = deps(llm, telco_probe());

    let outcome = process_work_order(request("取消海运单 R1"), &deps, &CancelToken::new()).await;
    assert!(matches!(outcome, WorkOrderOutcome::MatchFailed { .. }));
}
