//! Request binding descriptors and source resolution.
//!
//! # Data Flow
//! ```text
//! Payload::BINDINGS   (static manifest of field/source/key triples)
//!     → BindingSources::of::<T>()   (resolved once per handler)
//!     → binder::bind()              (per request, on a fresh T::default())
//! ```
//!
//! # Design Decisions
//! - No runtime type introspection: each payload declares its manifest
//! - Resolution order is fixed: uri, then json, then form
//! - Later sources overwrite earlier ones when they name the same field

pub mod binder;

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

pub use binder::{bind, BindError, RawSources};

/// Where a field's value is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    /// Path parameters of the matched route.
    Uri,
    /// JSON request body.
    Json,
    /// Query string fields.
    Form,
}

impl Source {
    /// All sources in resolution order.
    pub const ALL: [Source; 3] = [Source::Uri, Source::Json, Source::Form];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Uri => "uri",
            Source::Json => "json",
            Source::Form => "form",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Source::Uri => 0b001,
            Source::Json => 0b010,
            Source::Form => 0b100,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a payload's binding manifest.
///
/// `field` is the payload field's serialized name; `key` is the name used
/// by the source (path parameter, JSON member or query key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub field: &'static str,
    pub source: Source,
    pub key: &'static str,
}

impl FieldBinding {
    pub const fn new(field: &'static str, source: Source) -> Self {
        Self {
            field,
            source,
            key: field,
        }
    }

    pub const fn uri(field: &'static str) -> Self {
        Self::new(field, Source::Uri)
    }

    pub const fn json(field: &'static str) -> Self {
        Self::new(field, Source::Json)
    }

    pub const fn form(field: &'static str) -> Self {
        Self::new(field, Source::Form)
    }

    /// Read the value under a different source key.
    pub const fn key(self, key: &'static str) -> Self {
        Self { key, ..self }
    }
}

/// A typed request payload.
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize)]
/// struct GetUser { id: u64, verbose: bool }
///
/// impl Payload for GetUser {
///     const BINDINGS: &'static [FieldBinding] =
///         &[FieldBinding::uri("id"), FieldBinding::form("verbose")];
/// }
/// ```
pub trait Payload: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Declared field sources. Empty means nothing is extracted.
    const BINDINGS: &'static [FieldBinding] = &[];
}

/// The empty payload used by middleware.
impl Payload for () {}

/// The set of sources a manifest names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingSources(u8);

impl BindingSources {
    pub fn resolve(bindings: &[FieldBinding]) -> Self {
        Self(bindings.iter().fold(0, |acc, b| acc | b.source.bit()))
    }

    pub fn of<T: Payload>() -> Self {
        Self::resolve(T::BINDINGS)
    }

    pub fn contains(&self, source: Source) -> bool {
        self.0 & source.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Sources in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = Source> {
        let set = *self;
        Source::ALL.into_iter().filter(move |s| set.contains(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Default, Serialize, Deserialize)]
    struct JsonOnly {
        name: String,
    }

    impl Payload for JsonOnly {
        const BINDINGS: &'static [FieldBinding] = &[FieldBinding::json("name")];
    }

    #[derive(Default, Serialize, Deserialize)]
    struct UriAndForm {
        id: u64,
        page: u32,
    }

    impl Payload for UriAndForm {
        // Declaration order does not imply resolution order.
        const BINDINGS: &'static [FieldBinding] =
            &[FieldBinding::form("page"), FieldBinding::uri("id")];
    }

    #[test]
    fn test_json_only_resolves_to_json() {
        let sources = BindingSources::of::<JsonOnly>();
        assert_eq!(sources.iter().collect::<Vec<_>>(), vec![Source::Json]);
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_uri_applied_before_form() {
        let sources = BindingSources::of::<UriAndForm>();
        assert_eq!(sources.iter().collect::<Vec<_>>(), vec![Source::Uri, Source::Form]);
        assert!(!sources.contains(Source::Json));
    }

    #[test]
    fn test_unit_payload_has_no_sources() {
        assert!(BindingSources::of::<()>().is_empty());
    }

    #[test]
    fn test_key_override() {
        let binding = FieldBinding::json("full_name").key("name");
        assert_eq!(binding.field, "full_name");
        assert_eq!(binding.key, "name");
        assert_eq!(binding.source, Source::Json);
    }
}
