//! JSON canónico + hash de contenido para versionar recetas.
//!
//! Notas:
//! - Ordena claves de objetos (BTreeMap) y mantiene el orden de arrays.
//! - Usa la representación por defecto de serde_json para números; las
//!   recetas no contienen NaN/Inf.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", serde_json::to_string(&k).unwrap(), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// SHA-256 (hex) del JSON canónico de un valor.
pub fn hash_value(value: &Value) -> String {
    let canonical = to_canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orden_de_claves_no_cambia_el_hash() {
        let a = json!({"b": 1, "a": [1, 2], "c": {"y": null, "x": "s"}});
        let b = json!({"c": {"x": "s", "y": null}, "a": [1, 2], "b": 1});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn el_orden_de_arrays_si_importa() {
        assert_ne!(hash_value(&json!([1, 2])), hash_value(&json!([2, 1])));
    }
}
