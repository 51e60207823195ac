//! AST del predicado: nodos etiquetados, sin nada ejecutable.

use super::token::CmpOp;
use crate::model::Scalar;

/// Átomo: referencia a variable o literal. Las variables se resuelven en
/// evaluación, no en parseo.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Var(String),
    Lit(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Cmp { op: CmpOp, lhs: Atom, rhs: Atom },
    InList { needle: Atom, list: Vec<Atom>, negated: bool },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}
