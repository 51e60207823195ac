//! Invariantes del artefacto DML: parámetros vs placeholders, re-sustitución
//! posicional y tablas afectadas.

use order_core::dml::{assemble, render_statement, Risk};
use order_core::model::{Context, DmlStep, Scalar};
use order_core::store::parse_and_validate;

fn ctx(pairs: &[(&str, Scalar)]) -> Context {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn step(raw: &str) -> DmlStep {
    serde_json::from_str(raw).unwrap()
}

/// Citado idéntico al del renderer, para reproducir el literal desde la
/// forma parametrizada.
fn quote(value: &Scalar) -> String {
    match value {
        Scalar::Null => "NULL".into(),
        Scalar::Bool(true) => "TRUE".into(),
        Scalar::Bool(false) => "FALSE".into(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

fn resubstitute(template: &str, params: &[(String, Scalar)]) -> String {
    let mut out = String::new();
    let mut iter = params.iter();
    for ch in template.chars() {
        if ch == '?' {
            let (_, value) = iter.next().expect("more placeholders than parameters");
            out.push_str(&quote(value));
        } else {
            out.push(ch);
        }
    }
    assert!(iter.next().is_none(), "more parameters than placeholders");
    out
}

#[test]
fn parametros_igualan_placeholders_y_resubstituyen() {
    let c = ctx(&[("id", Scalar::Str("x'y".into())),
                  ("n", Scalar::Int(-2)),
                  ("f", Scalar::Float(0.5)),
                  ("b", Scalar::Bool(false)),
                  ("z", Scalar::Null)]);
    let cases = [
        r#"{"type": "UPDATE", "table": "t", "set": {"a": "{n}", "b": "{f}", "c": "NOW()"},
            "where": "id = {id} AND flag = {b}"}"#,
        r#"{"type": "INSERT", "table": "t", "values": {"a": "{id}", "b": "'fixed'", "c": "{z}"}}"#,
        r#"{"type": "DELETE", "table": "t", "where": "id = {id} OR alt = {id}"}"#,
    ];
    for raw in cases {
        let record = render_statement(&step(raw), &c).unwrap();
        let holes = record.template_sql.matches('?').count();
        assert_eq!(record.parameters.len(), holes, "case: {raw}");
        assert_eq!(resubstitute(&record.template_sql, &record.parameters),
                   record.rendered_sql,
                   "case: {raw}");
    }
}

#[test]
fn tablas_afectadas_en_ambos_sentidos() {
    let c = ctx(&[("id", Scalar::Int(1))]);
    let records = vec![
        render_statement(&step(r#"{"type": "UPDATE", "table": "t_a", "set": {"x": "{id}"}, "where": "id = {id}"}"#), &c).unwrap(),
        render_statement(&step(r#"{"type": "INSERT", "table": "t_b", "values": {"x": "{id}"}}"#), &c).unwrap(),
        render_statement(&step(r#"{"type": "UPDATE", "table": "t_a", "set": {"y": "{id}"}, "where": "id = {id}"}"#), &c).unwrap(),
    ];
    let recipe = parse_and_validate(
        r#"{"work_order_type": "t", "description": "d", "steps": [
            {"step": 1, "operation": "RETURN_SUCCESS"}]}"#,
    ).unwrap();
    let artifact = assemble("task-1", &recipe, records, c);

    // Toda tabla del artefacto aparece en algún registro y viceversa.
    assert_eq!(artifact.affected_tables, vec!["t_a".to_string(), "t_b".to_string()]);
    for r in &artifact.dml {
        assert!(artifact.affected_tables.contains(&r.table));
    }
    for t in &artifact.affected_tables {
        assert!(artifact.dml.iter().any(|r| &r.table == t));
    }
    assert_eq!(artifact.recipe_type, "t");
    assert_eq!(artifact.risk, Risk::Low);
}

#[test]
fn riesgo_del_artefacto_updates_multitabla() {
    let c = ctx(&[("id", Scalar::Int(1))]);
    let records = vec![
        render_statement(&step(r#"{"type": "UPDATE", "table": "t_a", "set": {"x": "{id}"}, "where": "id = {id}"}"#), &c).unwrap(),
        render_statement(&step(r#"{"type": "UPDATE", "table": "t_b", "set": {"x": "{id}"}, "where": "id = {id}"}"#), &c).unwrap(),
    ];
    let recipe = parse_and_validate(
        r#"{"work_order_type": "t", "description": "d", "steps": [
            {"step": 1, "operation": "RETURN_SUCCESS"}]}"#,
    ).unwrap();
    let artifact = assemble("task-2", &recipe, records, c);
    assert_eq!(artifact.risk, Risk::Medium);
}
