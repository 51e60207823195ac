//! Evaluador seguro de predicados de rama.
//!
//! La superficie aceptada es exactamente la gramática de comparaciones,
//! membresía y conectores lógicos; el parser es descendente recursivo y la
//! evaluación un recorrido por `match` sobre nodos etiquetados. Nunca se
//! carga código, se invocan funciones ni se accede a atributos: el texto
//! hostil muere en el léxico o en el parser. La entrada se acota en bytes
//! antes de tocarla.
//!
//! Reglas de tipos:
//! - `null` sólo es igual a `null`; cualquier otra comparación contra
//!   `null` (incluidos `<`/`>`) es falsa.
//! - Orden numérico entre enteros/flotantes; orden lexicográfico entre
//!   cadenas; ordenar tipos cruzados es `EvalError`.
//! - Igualdad entre tipos cruzados es falsa, nunca error.
//! - `in` prueba membresía por igualdad; lista vacía siempre falso.

mod ast;
mod parser;
mod token;

use crate::constants::MAX_PREDICATE_BYTES;
use crate::errors::EvalError;
use crate::model::{Context, Scalar};

use ast::{Atom, Expr};
use token::CmpOp;

/// Evalúa `predicate` contra `ctx`. Variables ausentes resuelven a `null`.
pub fn eval_predicate(predicate: &str, ctx: &Context) -> Result<bool, EvalError> {
    if predicate.len() > MAX_PREDICATE_BYTES {
        return Err(EvalError::TooLong { max: MAX_PREDICATE_BYTES });
    }
    let expr = parser::parse(predicate)?;
    eval_expr(&expr, ctx)
}

fn eval_expr(expr: &Expr, ctx: &Context) -> Result<bool, EvalError> {
    match expr {
        Expr::Cmp { op, lhs, rhs } => {
            let l = resolve(lhs, ctx);
            let r = resolve(rhs, ctx);
            compare(*op, &l, &r)
        }
        Expr::InList { needle, list, negated } => {
            let n = resolve(needle, ctx);
            let found = list.iter().any(|item| n.loose_eq(&resolve(item, ctx)));
            Ok(found != *negated)
        }
        Expr::Not(inner) => Ok(!eval_expr(inner, ctx)?),
        Expr::And(a, b) => Ok(eval_expr(a, ctx)? && eval_expr(b, ctx)?),
        Expr::Or(a, b) => Ok(eval_expr(a, ctx)? || eval_expr(b, ctx)?),
    }
}

fn resolve(atom: &Atom, ctx: &Context) -> Scalar {
    match atom {
        Atom::Lit(v) => v.clone(),
        Atom::Var(name) => ctx.get(name).cloned().unwrap_or(Scalar::Null),
    }
}

fn compare(op: CmpOp, lhs: &Scalar, rhs: &Scalar) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq => Ok(lhs.loose_eq(rhs)),
        CmpOp::Ne => Ok(!lhs.loose_eq(rhs)),
        _ => {
            // Cualquier orden que involucre null es falso, sin error.
            if lhs.is_null() || rhs.is_null() {
                return Ok(false);
            }
            let ordering = match (lhs, rhs) {
                (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
                _ => match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| cross_type(lhs, rhs))?,
                    _ => return Err(cross_type(lhs, rhs)),
                },
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            })
        }
    }
}

fn cross_type(lhs: &Scalar, rhs: &Scalar) -> EvalError {
    EvalError::CrossTypeOrdering { lhs: lhs.type_name().to_string(),
                                   rhs: rhs.type_name().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Scalar)]) -> Context {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn comparaciones_basicas() {
        let c = ctx(&[("status", Scalar::Str("10".into())), ("amount", Scalar::Int(120))]);
        assert!(eval_predicate("{status} == '10'", &c).unwrap());
        assert!(eval_predicate("{amount} > 100 and {status} == '10'", &c).unwrap());
        assert!(!eval_predicate("{amount} < 100 or {status} != '10'", &c).unwrap());
        assert!(eval_predicate("not {amount} < 100", &c).unwrap());
    }

    #[test]
    fn semantica_de_null() {
        let c = ctx(&[("marine_order_id", Scalar::Str("M1".into())), ("vacio", Scalar::Null)]);
        assert!(eval_predicate("{marine_order_id} != null", &c).unwrap());
        assert!(eval_predicate("{vacio} == null", &c).unwrap());
        // Variable ausente resuelve a null sin error.
        assert!(eval_predicate("{no_existe} == null", &c).unwrap());
        // Orden contra null es falso, no error.
        assert!(!eval_predicate("{vacio} < 5", &c).unwrap());
        assert!(!eval_predicate("{vacio} >= 5", &c).unwrap());
    }

    #[test]
    fn membresia_en_listas() {
        let c = ctx(&[("status", Scalar::Str("11".into()))]);
        assert!(eval_predicate("{status} in ['10', '11', '12']", &c).unwrap());
        assert!(eval_predicate("{status} not in ['98', '99']", &c).unwrap());
        assert!(!eval_predicate("{status} in []", &c).unwrap());
    }

    #[test]
    fn igualdad_cruzada_es_falsa_orden_cruzado_es_error() {
        let c = ctx(&[("s", Scalar::Str("5".into())), ("n", Scalar::Int(5))]);
        assert!(!eval_predicate("{s} == {n}", &c).unwrap());
        assert!(eval_predicate("{s} != {n}", &c).unwrap());
        assert!(matches!(eval_predicate("{s} > {n}", &c),
                         Err(EvalError::CrossTypeOrdering { .. })));
    }

    #[test]
    fn numerico_cruzado_int_float() {
        let c = ctx(&[("i", Scalar::Int(2)), ("f", Scalar::Float(2.5))]);
        assert!(eval_predicate("{i} < {f}", &c).unwrap());
        assert!(eval_predicate("{i} == 2.0", &c).unwrap());
    }

    #[test]
    fn precedencia_not_and_or() {
        let c = ctx(&[("a", Scalar::Bool(true))]);
        // not liga más fuerte que and, and más que or.
        assert!(eval_predicate("not {a} == false and {a} == true", &c).unwrap());
        assert!(eval_predicate("{a} == false or {a} == true and {a} == true", &c).unwrap());
        assert!(eval_predicate("({a} == false or {a} == true) and {a} == true", &c).unwrap());
    }

    #[test]
    fn atomo_suelto_no_es_predicado() {
        let c = Context::new();
        assert!(matches!(eval_predicate("{x}", &c), Err(EvalError::Parse { .. })));
        assert!(matches!(eval_predicate("true", &c), Err(EvalError::Parse { .. })));
    }

    #[test]
    fn entradas_hostiles_mueren_en_el_lexico() {
        let c = Context::new();
        for hostile in ["__import__('os').system('rm -rf /')",
                        "exec('x')",
                        "(lambda: 1)()",
                        "{x}.__class__",
                        "open('/etc/passwd')",
                        "{a} == 1; drop",
                        "@decorator"] {
            let res = eval_predicate(hostile, &c);
            assert!(res.is_err(), "hostile input must fail: {hostile}");
        }
    }

    #[test]
    fn entrada_sobredimensionada() {
        let big = format!("{{x}} == '{}'", "a".repeat(MAX_PREDICATE_BYTES));
        assert!(matches!(eval_predicate(&big, &Context::new()), Err(EvalError::TooLong { .. })));
    }

    /// Mini-fuzz determinista: ninguna entrada arbitraria debe producir otra
    /// cosa que `Ok(bool)` o `EvalError` (nunca pánico ni efectos).
    #[test]
    fn fuzz_deterministico_sin_panico() {
        let alphabet: Vec<char> = "{}()[]'\",.=!<>aoin01 _-".chars().collect();
        let mut seed: u64 = 0x5DEECE66D;
        for _ in 0..2000 {
            let mut input = String::new();
            for _ in 0..24 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let idx = (seed >> 33) as usize % alphabet.len();
                input.push(alphabet[idx]);
            }
            let _ = eval_predicate(&input, &Context::new());
        }
    }
}
