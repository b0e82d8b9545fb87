//! Applies resolved binding sources to a fresh payload.
//!
//! The payload starts as `T::default()` serialized to a JSON object. Each
//! declared field is assigned in resolution order and the candidate object
//! is checked by deserializing it into `T`. A field that does not fit keeps
//! its previous value and the failure is reported, never propagated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{BindingSources, FieldBinding, Payload, Source};

/// Raw request data extracted by the router.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSources<'a> {
    /// Path parameters of the matched route.
    pub path: &'a [(String, String)],
    /// Request body; only read when `json` is bound, `None` if the read failed.
    pub body: Option<&'a [u8]>,
    /// Decoded query pairs, repeated keys preserved.
    pub query: &'a [(String, String)],
}

/// A recoverable binding failure.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("{origin} binding: field '{field}' rejected {value}: {reason}")]
    Field {
        origin: Source,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("json binding: malformed body: {0}")]
    Body(#[source] serde_json::Error),

    #[error("json binding: body is not a JSON object")]
    NotAnObject,

    #[error("payload does not serialize to an object")]
    Unsupported,
}

/// Bind `T` from the given sources.
///
/// Always yields a payload; the errors are for the caller to log.
pub fn bind<T: Payload>(sources: BindingSources, raw: &RawSources<'_>) -> (T, Vec<BindError>) {
    let mut errors = Vec::new();
    if sources.is_empty() {
        return (T::default(), errors);
    }

    let mut current = match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => map,
        _ => {
            errors.push(BindError::Unsupported);
            return (T::default(), errors);
        }
    };

    for source in sources.iter() {
        let fields = T::BINDINGS.iter().filter(|b| b.source == source);
        match source {
            Source::Uri => {
                for binding in fields {
                    let values = lookup(raw.path, binding.key);
                    assign_text::<T>(&mut current, binding, &values, &mut errors);
                }
            }
            Source::Form => {
                for binding in fields {
                    let values = lookup(raw.query, binding.key);
                    assign_text::<T>(&mut current, binding, &values, &mut errors);
                }
            }
            Source::Json => {
                // An unreadable body was already reported by the reader.
                let Some(raw_body) = raw.body else {
                    continue;
                };
                match json_object(raw_body) {
                    Ok(body) => {
                        for binding in fields {
                            if let Some(value) = body.get(binding.key) {
                                let shown = value.to_string();
                                let candidates = vec![value.clone()];
                                assign::<T>(&mut current, binding, candidates, shown, &mut errors);
                            }
                        }
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
    }

    let payload = serde_json::from_value(Value::Object(current)).unwrap_or_default();
    (payload, errors)
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn json_object(body: &[u8]) -> Result<Map<String, Value>, BindError> {
    match serde_json::from_slice(body).map_err(BindError::Body)? {
        Value::Object(map) => Ok(map),
        _ => Err(BindError::NotAnObject),
    }
}

/// Path and query values arrive as text; try the JSON kinds they could mean.
fn assign_text<T: Payload>(
    current: &mut Map<String, Value>,
    binding: &FieldBinding,
    values: &[&str],
    errors: &mut Vec<BindError>,
) {
    let Some(first) = values.first() else {
        return;
    };

    let scalars = scalar_candidates(first);
    let mut arrays = Vec::with_capacity(3);
    if let Some(numbers) = values.iter().map(|v| parse_number(v)).collect::<Option<Vec<_>>>() {
        arrays.push(Value::Array(numbers));
    }
    if let Some(flags) = values
        .iter()
        .map(|v| v.parse::<bool>().ok().map(Value::Bool))
        .collect::<Option<Vec<_>>>()
    {
        arrays.push(Value::Array(flags));
    }
    arrays.push(Value::Array(
        values.iter().map(|v| Value::String(v.to_string())).collect(),
    ));

    let wants_array =
        values.len() > 1 || matches!(current.get(binding.field), Some(Value::Array(_)));
    let candidates = if wants_array {
        arrays.into_iter().chain(scalars).collect()
    } else {
        scalars.into_iter().chain(arrays).collect()
    };
    assign::<T>(current, binding, candidates, values.join(","), errors);
}

fn scalar_candidates(raw: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(3);
    if let Some(n) = parse_number(raw) {
        out.push(n);
    }
    if let Ok(b) = raw.parse::<bool>() {
        out.push(Value::Bool(b));
    }
    out.push(Value::String(raw.to_string()));
    out
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(u) = raw.parse::<u64>() {
        return Some(Value::Number(u.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Keep the first candidate under which the whole payload still deserializes.
fn assign<T: Payload>(
    current: &mut Map<String, Value>,
    binding: &FieldBinding,
    candidates: Vec<Value>,
    shown: String,
    errors: &mut Vec<BindError>,
) {
    let mut reason = String::new();

    for candidate in candidates {
        let mut trial = current.clone();
        trial.insert(binding.field.to_string(), candidate);
        match serde_json::from_value::<T>(Value::Object(trial.clone())) {
            Ok(_) => {
                *current = trial;
                return;
            }
            Err(e) => reason = e.to_string(),
        }
    }

    errors.push(BindError::Field {
        origin: binding.source,
        field: binding.field,
        value: shown,
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct UpdateUser {
        id: u64,
        name: String,
        page: u32,
        active: bool,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    impl Payload for UpdateUser {
        const BINDINGS: &'static [FieldBinding] = &[
            FieldBinding::uri("id"),
            FieldBinding::json("name"),
            FieldBinding::json("nickname").key("nick"),
            FieldBinding::form("page"),
            FieldBinding::form("active"),
            FieldBinding::form("tags").key("tag"),
        ];
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bind_user(
        path: &[(&str, &str)],
        body: &[u8],
        query: &[(&str, &str)],
    ) -> (UpdateUser, Vec<BindError>) {
        let path = pairs(path);
        let query = pairs(query);
        let raw = RawSources {
            path: &path,
            body: Some(body),
            query: &query,
        };
        bind::<UpdateUser>(BindingSources::of::<UpdateUser>(), &raw)
    }

    #[test]
    fn test_all_sources_bound() {
        let (user, errors) = bind_user(
            &[("id", "7")],
            br#"{"name":"ada","nick":"countess"}"#,
            &[("page", "2"), ("active", "true"), ("tag", "a"), ("tag", "b")],
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            user,
            UpdateUser {
                id: 7,
                name: "ada".into(),
                page: 2,
                active: true,
                tags: vec!["a".into(), "b".into()],
                nickname: Some("countess".into()),
            }
        );
    }

    #[test]
    fn test_malformed_body_keeps_json_fields_default() {
        let (user, errors) = bind_user(&[("id", "3")], b"{not json", &[("page", "4")]);
        assert_eq!(user.id, 3);
        assert_eq!(user.page, 4);
        assert_eq!(user.name, "");
        assert_eq!(user.nickname, None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], BindError::Body(_)));
    }

    #[test]
    fn test_type_mismatch_only_affects_that_field() {
        let (user, errors) = bind_user(&[("id", "x")], br#"{"name":"bob"}"#, &[("page", "9")]);
        assert_eq!(user.id, 0);
        assert_eq!(user.name, "bob");
        assert_eq!(user.page, 9);
        assert!(matches!(
            errors.as_slice(),
            [BindError::Field { origin: Source::Uri, field: "id", .. }]
        ));
    }

    #[test]
    fn test_numeric_text_into_string_field() {
        let (user, errors) = bind_user(&[], br#"{"name":"n"}"#, &[("tag", "42")]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(user.tags, vec!["42".to_string()]);
    }

    #[test]
    fn test_json_array_body_is_rejected() {
        let (user, errors) = bind_user(&[], b"[1,2]", &[]);
        assert_eq!(user, UpdateUser::default());
        assert!(matches!(errors.as_slice(), [BindError::NotAnObject]));
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Overlap {
        id: u64,
    }

    impl Payload for Overlap {
        const BINDINGS: &'static [FieldBinding] =
            &[FieldBinding::form("id"), FieldBinding::uri("id")];
    }

    #[test]
    fn test_later_source_overwrites_earlier() {
        let path = pairs(&[("id", "1")]);
        let query = pairs(&[("id", "2")]);
        let raw = RawSources {
            path: &path,
            body: None,
            query: &query,
        };
        let (payload, errors) = bind::<Overlap>(BindingSources::of::<Overlap>(), &raw);
        assert!(errors.is_empty());
        assert_eq!(payload.id, 2);
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Flags {
        flags: Vec<bool>,
        ratios: Vec<f64>,
        limit: Option<u32>,
    }

    impl Payload for Flags {
        const BINDINGS: &'static [FieldBinding] = &[
            FieldBinding::form("flags").key("f"),
            FieldBinding::form("ratios").key("r"),
            FieldBinding::form("limit"),
        ];
    }

    fn bind_flags(query: &[(&str, &str)]) -> (Flags, Vec<BindError>) {
        let query = pairs(query);
        let raw = RawSources {
            query: &query,
            ..RawSources::default()
        };
        bind::<Flags>(BindingSources::of::<Flags>(), &raw)
    }

    #[test]
    fn test_bool_list_from_query() {
        let (flags, errors) = bind_flags(&[
            ("f", "true"),
            ("f", "false"),
            ("r", "0.5"),
            ("r", "2"),
            ("limit", "10"),
        ]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(flags.flags, vec![true, false]);
        assert_eq!(flags.ratios, vec![0.5, 2.0]);
        assert_eq!(flags.limit, Some(10));

        let (flags, errors) = bind_flags(&[("f", "true")]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(flags.flags, vec![true]);
    }

    #[test]
    fn test_bool_list_rejects_other_text() {
        let (flags, errors) = bind_flags(&[("f", "true"), ("f", "maybe")]);
        assert!(flags.flags.is_empty());
        assert!(matches!(
            errors.as_slice(),
            [BindError::Field { field: "flags", .. }]
        ));
    }

    #[test]
    fn test_unread_body_skips_json_fields() {
        let raw = RawSources::default();
        let (user, errors) = bind::<UpdateUser>(BindingSources::of::<UpdateUser>(), &raw);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(user, UpdateUser::default());
    }

    #[test]
    fn test_missing_keys_leave_defaults() {
        let (user, errors) = bind_user(&[], b"{}", &[]);
        assert!(errors.is_empty());
        assert_eq!(user, UpdateUser::default());
    }
}
