use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys tried, in order, when resolving a record's site identity.
pub const DEFAULT_IDENTITY_KEYS: &[&str] = &["url", "pageUrl", "requestedUrl", "id"];

/// Keys that mark a record as carrying a URL at all.
pub const DEFAULT_URL_KEYS: &[&str] = &["url", "pageUrl", "requestedUrl"];

/// One crawled site: the raw JSON object plus its resolved identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    site: Option<String>,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a JSON object, resolving identity with the default keys.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self::with_identity_keys(fields, DEFAULT_IDENTITY_KEYS)
    }

    pub fn with_identity_keys<S: AsRef<str>>(fields: Map<String, Value>, keys: &[S]) -> Self {
        let site = keys
            .iter()
            .filter_map(|k| fields.get(k.as_ref()))
            .find_map(scalar_text);
        Self { site, fields }
    }

    /// Accepts only JSON objects; anything else is not a record.
    pub fn from_value<S: AsRef<str>>(value: Value, identity_keys: &[S]) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::with_identity_keys(fields, identity_keys)),
            _ => None,
        }
    }

    pub fn site(&self) -> Option<&str> { self.site.as_deref() }

    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    pub fn get(&self, key: &str) -> Option<&Value> { self.fields.get(key) }

    /// Gatherer name -> gatherer output.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.fields.get("data").and_then(Value::as_object)
    }

    /// Output of a single gatherer, if the crawl produced one.
    pub fn gatherer(&self, name: &str) -> Option<&Value> {
        self.data().and_then(|d| d.get(name))
    }

    pub fn has_any_key<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|k| self.fields.contains_key(k.as_ref()))
    }
}

// Empty strings, null and containers don't identify anything.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Semantic bucket for one option label.
///
/// Variants are declared in lexicographic order of their names so that the
/// derived `Ord` sorts summaries alphabetically. Resolution priority lives in
/// [`crate::categorize::PRIORITY`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accept,
    Confirm,
    Customize,
    Dismiss,
    Essential,
    Info,
    Other,
    Reject,
    RejectAll,
}

impl Category {
    /// Column order used by the wide table and when exploding it.
    pub const ALL: [Category; 9] = [
        Category::Accept,
        Category::Reject,
        Category::RejectAll,
        Category::Customize,
        Category::Info,
        Category::Confirm,
        Category::Essential,
        Category::Dismiss,
        Category::Other,
    ];

    /// Categories that get a short preview string in the wide table.
    pub const PREVIEWED: [Category; 5] = [
        Category::Accept,
        Category::Reject,
        Category::RejectAll,
        Category::Customize,
        Category::Essential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Accept => "accept",
            Category::Confirm => "confirm",
            Category::Customize => "customize",
            Category::Dismiss => "dismiss",
            Category::Essential => "essential",
            Category::Info => "info",
            Category::Other => "other",
            Category::Reject => "reject",
            Category::RejectAll => "reject_all",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| anyhow::anyhow!("unknown category `{}`", s))
    }
}
