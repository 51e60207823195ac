//! Contexto de variables de una corrida.
//!
//! Mapa ordenado nombre → escalar. Se siembra con los parámetros extraídos
//! por el matcher más los metadatos del upstream (el matcher gana en caso de
//! colisión) y sólo lo mutan los pasos QUERY exitosos al volcar sus
//! `output_fields`. El orden de inserción se conserva para el render legible
//! del snapshot; la búsqueda es por nombre exacto.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Scalar;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    inner: IndexMap<String, Scalar>,
}

impl Context {
    pub fn new() -> Self {
        Self { inner: IndexMap::new() }
    }

    /// Construye desde un objeto JSON plano; entradas no escalares se
    /// descartan devolviendo sus nombres para que el llamador decida.
    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> (Self, Vec<String>) {
        let mut ctx = Context::new();
        let mut rejected = Vec::new();
        for (k, v) in obj {
            match Scalar::from_json(v) {
                Some(s) => {
                    ctx.insert(k.clone(), s);
                }
                None => rejected.push(k.clone()),
            }
        }
        (ctx, rejected)
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.inner.get(name)
    }

    /// Inserta o sobrescribe. Devuelve el valor anterior si lo había.
    pub fn insert(&mut self, name: impl Into<String>, value: Scalar) -> Option<Scalar> {
        self.inner.insert(name.into(), value)
    }

    /// Mezcla `other` encima de `self` (las claves de `other` ganan).
    pub fn merge_over(&mut self, other: Context) {
        for (k, v) in other.inner {
            self.inner.insert(k, v);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.inner.iter()
    }
}

impl FromIterator<(String, Scalar)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Scalar)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conserva_orden_de_insercion_y_sobrescribe() {
        let mut ctx = Context::new();
        ctx.insert("b", Scalar::Int(1));
        ctx.insert("a", Scalar::Int(2));
        ctx.insert("b", Scalar::Int(3));
        let keys: Vec<&str> = ctx.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(ctx.get("b"), Some(&Scalar::Int(3)));
    }

    #[test]
    fn merge_over_da_prioridad_al_argumento() {
        let mut base: Context = [("x".to_string(), Scalar::Int(1)), ("y".to_string(), Scalar::Int(2))].into_iter().collect();
        let winner: Context = [("x".to_string(), Scalar::Str("m".into()))].into_iter().collect();
        base.merge_over(winner);
        assert_eq!(base.get("x"), Some(&Scalar::Str("m".into())));
        assert_eq!(base.get("y"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn from_json_object_separa_no_escalares() {
        let obj = serde_json::json!({"a": 1, "b": [1, 2], "c": "x"});
        let (ctx, rejected) = Context::from_json_object(obj.as_object().unwrap());
        assert_eq!(ctx.len(), 2);
        assert_eq!(rejected, vec!["b".to_string()]);
    }
}
