//! Evaluación de expresiones delimitadas (`#[...]`).

use indexmap::IndexMap;

use crate::config::SETTINGS;
use crate::errors::InvokeError;
use crate::model::{Event, PropertyScope, Value};

/// Colaborador que reconoce y evalúa expresiones.
pub trait ExpressionEvaluator: Send + Sync {
    /// Test de prefijo/sufijo.
    fn matches(&self, candidate: &str) -> bool;

    /// Envuelve `body` con los delimitadores del evaluador.
    fn delimit(&self, body: &str) -> String;

    /// Evalúa `expression` (con delimitadores) contra el evento actual.
    fn evaluate(&self, expression: &str, event: &Event) -> Result<Value, InvokeError>;
}

/// Evaluador sobre el mensaje del evento.
///
/// Lenguaje soportado (entre delimitadores):
/// - `payload`
/// - `header:SCOPE:name` (sin scope se asume `INBOUND`)
/// - `headers:SCOPE:a,b?` mapa nombre→valor; `*` toma el scope completo y
///   un `?` final marca el nombre como opcional
/// - `headers-list:SCOPE:a,b` igual pero devuelve una secuencia
/// - `string:literal`
/// - `variable:name` (propiedad de invocación)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExpressionEvaluator {
    prefix: String,
    suffix: String,
}

impl Default for MessageExpressionEvaluator {
    fn default() -> Self {
        Self::new(&SETTINGS.expression_prefix, &SETTINGS.expression_suffix)
    }
}

impl MessageExpressionEvaluator {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self { prefix: prefix.to_string(),
               suffix: suffix.to_string() }
    }

    fn strip<'a>(&self, expression: &'a str) -> Option<&'a str> {
        expression.strip_prefix(self.prefix.as_str())?.strip_suffix(self.suffix.as_str())
    }

    fn fail(expression: &str, reason: impl Into<String>) -> InvokeError {
        InvokeError::Expression { expression: expression.to_string(),
                                  reason: reason.into() }
    }

    fn split_scope<'a>(expression: &str, rest: &'a str) -> Result<(PropertyScope, &'a str), InvokeError> {
        match rest.split_once(':') {
            Some((scope, names)) => {
                let scope = PropertyScope::parse(scope).ok_or_else(|| Self::fail(expression, format!("unknown scope {scope}")))?;
                Ok((scope, names))
            }
            None => Ok((PropertyScope::Inbound, rest)),
        }
    }

    fn collect_headers(expression: &str, event: &Event, rest: &str) -> Result<IndexMap<String, Value>, InvokeError> {
        let (scope, names) = Self::split_scope(expression, rest)?;
        let props = event.message.properties(scope);
        let mut out = IndexMap::new();
        for raw in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if raw == "*" {
                out.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                continue;
            }
            let (name, optional) = match raw.strip_suffix('?') {
                Some(name) => (name, true),
                None => (raw, false),
            };
            match props.get(name) {
                Some(v) => {
                    out.insert(name.to_string(), v.clone());
                }
                None if optional => {}
                None => return Err(Self::fail(expression, format!("required header {name} not found"))),
            }
        }
        Ok(out)
    }
}

impl ExpressionEvaluator for MessageExpressionEvaluator {
    fn matches(&self, candidate: &str) -> bool {
        candidate.len() >= self.prefix.len() + self.suffix.len() && candidate.starts_with(&self.prefix) && candidate.ends_with(&self.suffix)
    }

    fn delimit(&self, body: &str) -> String {
        format!("{}{}{}", self.prefix, body, self.suffix)
    }

    fn evaluate(&self, expression: &str, event: &Event) -> Result<Value, InvokeError> {
        let body = self.strip(expression).ok_or_else(|| Self::fail(expression, "not a delimited expression"))?.trim();
        let (kind, rest) = body.split_once(':').unwrap_or((body, ""));
        match kind {
            "payload" => Ok(event.payload().clone()),
            "header" => {
                let (scope, name) = Self::split_scope(expression, rest)?;
                Ok(event.message.property(scope, name).cloned().unwrap_or(Value::Null))
            }
            "headers" => {
                let headers = Self::collect_headers(expression, event, rest)?;
                Ok(Value::Map(headers.into_iter().map(|(k, v)| (Value::Str(k), v)).collect()))
            }
            "headers-list" => {
                let headers = Self::collect_headers(expression, event, rest)?;
                Ok(Value::Seq(headers.into_values().collect()))
            }
            "string" => Ok(Value::Str(rest.to_string())),
            "variable" => Ok(event.message.property(PropertyScope::Invocation, rest).cloned().unwrap_or(Value::Null)),
            other => Err(Self::fail(expression, format!("unknown evaluator {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    fn event() -> Event {
        Event::new(Message::new(Value::from("body")).with_property(PropertyScope::Inbound, "a", 1)
                                                    .with_property(PropertyScope::Inbound, "b", "two")
                                                    .with_property(PropertyScope::Invocation, "flow", "main"))
    }

    #[test]
    fn matches_requires_both_delimiters() {
        let ev = MessageExpressionEvaluator::new("#[", "]");
        assert!(ev.matches("#[x]"));
        assert!(!ev.matches("plain"));
        assert!(!ev.matches("#[x"));
        assert!(!ev.matches("#]"));
    }

    #[test]
    fn header_and_payload_lookup() {
        let ev = MessageExpressionEvaluator::new("#[", "]");
        let e = event();
        assert_eq!(ev.evaluate("#[payload]", &e).unwrap(), Value::from("body"));
        assert_eq!(ev.evaluate("#[header:INBOUND:a]", &e).unwrap(), Value::from(1));
        assert_eq!(ev.evaluate("#[header:missing]", &e).unwrap(), Value::Null);
        assert_eq!(ev.evaluate("#[variable:flow]", &e).unwrap(), Value::from("main"));
        assert_eq!(ev.evaluate("#[string:hello]", &e).unwrap(), Value::from("hello"));
    }

    #[test]
    fn headers_map_and_list() {
        let ev = MessageExpressionEvaluator::new("#[", "]");
        let e = event();
        let map = ev.evaluate("#[headers:INBOUND:a,b]", &e).unwrap();
        assert_eq!(map.get(&Value::from("b")), Some(&Value::from("two")));
        let list = ev.evaluate("#[headers-list:INBOUND:b,a]", &e).unwrap();
        assert_eq!(list, Value::Seq(vec![Value::from("two"), Value::from(1)]));
        assert!(ev.evaluate("#[headers:INBOUND:a,zz]", &e).is_err());
        assert!(ev.evaluate("#[headers:INBOUND:a,zz?]", &e).is_ok());
    }

    #[test]
    fn unknown_evaluator_fails() {
        let ev = MessageExpressionEvaluator::new("#[", "]");
        let err = ev.evaluate("#[groovy:1+1]", &event()).unwrap_err();
        assert!(matches!(err, InvokeError::Expression { .. }));
    }
}
