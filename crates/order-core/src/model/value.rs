//! Valor escalar del contexto.
//!
//! El contexto de una corrida sólo admite escalares: cadena, entero, flotante,
//! booleano o nulo. Arrays/objetos JSON se rechazan en la deserialización
//! (representación `untagged`: ninguna variante los acepta).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Nombre corto del tipo, para mensajes de error.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Valor numérico si la variante pertenece a la familia numérica.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Igualdad semántica del evaluador: null sólo es igual a null, la
    /// familia numérica compara por valor (1 == 1.0) y los tipos cruzados
    /// restantes nunca son iguales.
    pub fn loose_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Conversión desde JSON; los compuestos no tienen representación.
    pub fn from_json(v: &serde_json::Value) -> Option<Scalar> {
        match v {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i))
                } else {
                    n.as_f64().map(Scalar::Float)
                }
            }
            serde_json::Value::String(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }
}

/// Forma cruda (`render` modo raw): la cadena tal cual, números en decimal,
/// `true`/`false` y `null`.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializa_escalares_y_rechaza_compuestos() {
        let s: Scalar = serde_json::from_str("\"0002-ORFBO\"").unwrap();
        assert_eq!(s, Scalar::Str("0002-ORFBO".into()));
        let s: Scalar = serde_json::from_str("80").unwrap();
        assert_eq!(s, Scalar::Int(80));
        let s: Scalar = serde_json::from_str("1.5").unwrap();
        assert_eq!(s, Scalar::Float(1.5));
        let s: Scalar = serde_json::from_str("null").unwrap();
        assert!(s.is_null());
        assert!(serde_json::from_str::<Scalar>("[1,2]").is_err());
        assert!(serde_json::from_str::<Scalar>("{\"a\":1}").is_err());
    }

    #[test]
    fn igualdad_numerica_cruzada_y_null() {
        assert!(Scalar::Int(1).loose_eq(&Scalar::Float(1.0)));
        assert!(Scalar::Null.loose_eq(&Scalar::Null));
        assert!(!Scalar::Null.loose_eq(&Scalar::Str("x".into())));
        assert!(!Scalar::Int(0).loose_eq(&Scalar::Bool(false)));
    }
}
