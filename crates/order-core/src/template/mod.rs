//! Renderer de plantillas `{nombre}`.
//!
//! Es el ÚNICO camino por el que un dato externo entra a una cadena SQL.
//! Modo `SqlLiteral`: cadenas entre comillas simples con `'` duplicada,
//! números en decimal, booleanos `TRUE`/`FALSE`, `NULL` para nulo; los
//! caracteres de control (NUL, CR, LF) dentro de un valor se rechazan.
//! Los tokens ya presentes en la plantilla (p. ej. `NOW()`) no se tocan:
//! la sustitución opera sólo sobre ocurrencias `{nombre}`.
//!
//! Política de variable desconocida: fallo con `RenderError::MissingVar`,
//! salvo el render laxo reservado a mensajes RETURN_ERROR y descripciones
//! DML, donde el placeholder queda tal cual para que el operador reciba
//! algo legible.

use crate::errors::RenderError;
use crate::model::{Context, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Forma cruda del valor, sólo para mensajes y logs.
    Raw,
    /// Literal SQL citado/escapado.
    SqlLiteral,
}

/// Resultado de renderizar una plantilla SQL en ambas formas a la vez:
/// literal (para revisión) y parametrizada con `?` (para ejecución), junto
/// con los pares (nombre, valor) en orden de aparición.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub literal: String,
    pub template: String,
    pub params: Vec<(String, Scalar)>,
}

/// Trozo de plantilla visto por el escáner: texto plano o placeholder.
enum Piece<'a> {
    Text(&'a str),
    Var(&'a str),
}

/// Sustitución estricta en el modo indicado.
pub fn render(template: &str, ctx: &Context, mode: RenderMode) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    scan(template, |piece| {
        match piece {
            Piece::Text(chunk) => out.push_str(chunk),
            Piece::Var(name) => {
                let value = ctx.get(name).ok_or_else(|| RenderError::MissingVar { name: name.to_string() })?;
                match mode {
                    RenderMode::Raw => out.push_str(&value.to_string()),
                    RenderMode::SqlLiteral => out.push_str(&sql_literal(name, value)?),
                }
            }
        }
        Ok(())
    })?;
    Ok(out)
}

/// Render laxo: como `Raw`, pero una variable ausente conserva su
/// placeholder literal en vez de fallar.
pub fn render_lenient(template: &str, ctx: &Context) -> String {
    let mut out = String::with_capacity(template.len());
    let res: Result<(), RenderError> = scan(template, |piece| {
        match piece {
            Piece::Text(chunk) => out.push_str(chunk),
            Piece::Var(name) => match ctx.get(name) {
                Some(v) => out.push_str(&v.to_string()),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
        Ok(())
    });
    debug_assert!(res.is_ok());
    out
}

/// Render SQL doble: literal + plantilla `?` + parámetros ordenados.
pub fn render_sql_with_params(template: &str, ctx: &Context) -> Result<RenderedSql, RenderError> {
    let mut literal = String::with_capacity(template.len());
    let mut templ = String::with_capacity(template.len());
    let mut params = Vec::new();
    scan(template, |piece| {
        match piece {
            Piece::Text(chunk) => {
                literal.push_str(chunk);
                templ.push_str(chunk);
            }
            Piece::Var(name) => {
                let value = ctx.get(name).ok_or_else(|| RenderError::MissingVar { name: name.to_string() })?;
                literal.push_str(&sql_literal(name, value)?);
                templ.push('?');
                params.push((name.to_string(), value.clone()));
            }
        }
        Ok(())
    })?;
    Ok(RenderedSql { literal, template: templ, params })
}

/// Nombres `{placeholder}` presentes en una plantilla, en orden y sin
/// deduplicar.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let res: Result<(), RenderError> = scan(template, |piece| {
        if let Piece::Var(name) = piece {
            names.push(name.to_string());
        }
        Ok(())
    });
    debug_assert!(res.is_ok());
    names
}

/// Valida un identificador SQL: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn check_identifier(ident: &str) -> Result<(), RenderError> {
    let mut chars = ident.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(RenderError::BadIdentifier { ident: ident.to_string() })
    }
}

/// Literal SQL de un escalar. Las comillas simples se duplican; NUL/CR/LF
/// dentro del valor invalidan el render completo.
fn sql_literal(name: &str, value: &Scalar) -> Result<String, RenderError> {
    Ok(match value {
        Scalar::Null => "NULL".to_string(),
        Scalar::Bool(true) => "TRUE".to_string(),
        Scalar::Bool(false) => "FALSE".to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => {
            if s.contains(['\0', '\r', '\n']) {
                return Err(RenderError::ControlChar { name: name.to_string() });
            }
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                if c == '\'' {
                    out.push('\'');
                }
                out.push(c);
            }
            out.push('\'');
            out
        }
    })
}

/// Recorre la plantilla separando texto plano de placeholders. Una `{` que
/// no abre un nombre válido se copia tal cual como texto.
fn scan<'a, E>(template: &'a str, mut emit: impl FnMut(Piece<'a>) -> Result<(), E>) -> Result<(), E> {
    let bytes = template.as_bytes();
    let mut plain_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some((name_end, after)) = match_placeholder(template, i) {
                if plain_start < i {
                    emit(Piece::Text(&template[plain_start..i]))?;
                }
                emit(Piece::Var(&template[i + 1..name_end]))?;
                plain_start = after;
                i = after;
                continue;
            }
        }
        i += 1;
    }
    if plain_start < template.len() {
        emit(Piece::Text(&template[plain_start..]))?;
    }
    Ok(())
}

/// Si en `open` comienza `{nombre}` válido devuelve (fin del nombre,
/// posición tras la llave de cierre).
fn match_placeholder(template: &str, open: usize) -> Option<(usize, usize)> {
    let bytes = template.as_bytes();
    let mut i = open + 1;
    let start = i;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '}' {
            return if i > start { Some((i, i + 1)) } else { None };
        }
        let valid = if i == start { c.is_ascii_alphabetic() || c == '_' } else { c.is_ascii_alphanumeric() || c == '_' };
        if !valid {
            return None;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Scalar)]) -> Context {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn literal_sql_por_tipo() {
        let c = ctx(&[("s", Scalar::Str("abc".into())),
                      ("i", Scalar::Int(-7)),
                      ("f", Scalar::Float(2.5)),
                      ("b", Scalar::Bool(true)),
                      ("n", Scalar::Null)]);
        let out = render("{s},{i},{f},{b},{n}", &c, RenderMode::SqlLiteral).unwrap();
        assert_eq!(out, "'abc',-7,2.5,TRUE,NULL");
    }

    #[test]
    fn duplica_comillas_simples() {
        let c = ctx(&[("customerID", Scalar::Str("x'; DROP TABLE users;--".into()))]);
        let out = render("customerID = {customerID}", &c, RenderMode::SqlLiteral).unwrap();
        assert_eq!(out, "customerID = 'x''; DROP TABLE users;--'");
    }

    #[test]
    fn rechaza_caracteres_de_control() {
        let c = ctx(&[("v", Scalar::Str("a\nb".into()))]);
        assert!(matches!(render("{v}", &c, RenderMode::SqlLiteral),
                         Err(RenderError::ControlChar { .. })));
    }

    #[test]
    fn no_toca_tokens_de_funcion() {
        let c = ctx(&[("id", Scalar::Str("E1".into()))]);
        let out = render("update_time = NOW() WHERE id = {id}", &c, RenderMode::SqlLiteral).unwrap();
        assert_eq!(out, "update_time = NOW() WHERE id = 'E1'");
    }

    #[test]
    fn variable_ausente_falla_en_estricto_y_queda_en_laxo() {
        let c = Context::new();
        assert!(matches!(render("id = {nope}", &c, RenderMode::SqlLiteral),
                         Err(RenderError::MissingVar { .. })));
        assert_eq!(render_lenient("订单号: {nope}", &c), "订单号: {nope}");
    }

    #[test]
    fn doble_forma_con_parametros_ordenados() {
        let c = ctx(&[("a", Scalar::Int(1)), ("b", Scalar::Str("x".into()))]);
        let r = render_sql_with_params("c1 = {a} AND c2 = {b} AND c3 = {a}", &c).unwrap();
        assert_eq!(r.literal, "c1 = 1 AND c2 = 'x' AND c3 = 1");
        assert_eq!(r.template, "c1 = ? AND c2 = ? AND c3 = ?");
        assert_eq!(r.params,
                   vec![("a".to_string(), Scalar::Int(1)),
                        ("b".to_string(), Scalar::Str("x".into())),
                        ("a".to_string(), Scalar::Int(1))]);
    }

    #[test]
    fn llaves_que_no_son_placeholder_se_copian() {
        let c = ctx(&[("x", Scalar::Int(1))]);
        assert_eq!(render("json: {\"k\": {x}}", &c, RenderMode::Raw).unwrap(), "json: {\"k\": 1}");
    }

    #[test]
    fn identificadores() {
        assert!(check_identifier("telco_customer").is_ok());
        assert!(check_identifier("_c0l").is_ok());
        assert!(check_identifier("1bad").is_err());
        assert!(check_identifier("tabla; DROP").is_err());
        assert!(check_identifier("").is_err());
    }
}
