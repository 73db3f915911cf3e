//! Flat tables built from the crawler's well-known gatherers (cookies,
//! detected buttons, consent management platforms).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::types::Record;

pub const COOKIE_GATHERER: &str = "CookieGatherer";
pub const BUTTON_GATHERER: &str = "ButtonGatherer";
pub const CMP_GATHERER: &str = "CMPGatherer";

const MAX_HTML_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRow {
    pub site: Option<String>,
    pub name: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    pub session: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonRow {
    pub site: Option<String>,
    pub text: String,
    pub html: String,
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmpRow {
    pub site: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    pub site: Option<String>,
    pub cookies_found: usize,
    pub buttons_found: usize,
    pub has_secure_cookies: bool,
    pub cmps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GathererTables {
    pub cookies: Vec<CookieRow>,
    pub buttons: Vec<ButtonRow>,
    pub cmps: Vec<CmpRow>,
    pub sites: Vec<SiteStats>,
}

// Raw shapes as emitted by the crawler; missing or null fields default.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawCookie {
    #[serde(deserialize_with = "null_default")]
    name: String,
    #[serde(deserialize_with = "null_default")]
    domain: String,
    #[serde(deserialize_with = "null_default")]
    path: String,
    #[serde(deserialize_with = "null_default")]
    secure: bool,
    #[serde(deserialize_with = "null_default")]
    http_only: bool,
    #[serde(deserialize_with = "null_default")]
    same_site: String,
    #[serde(deserialize_with = "null_default")]
    session: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawButton {
    #[serde(deserialize_with = "null_default")]
    text: String,
    #[serde(deserialize_with = "null_default")]
    html: String,
    visibility_analysis: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawCmp {
    #[serde(rename = "CMP_name", deserialize_with = "null_default")]
    name: String,
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn analyze(records: &[Record]) -> GathererTables {
    let mut tables = GathererTables::default();
    for record in records {
        let site = record.site().map(str::to_string);

        let raw_cookies = raw_list(record, COOKIE_GATHERER, "cookies");
        let raw_buttons = raw_list(record, BUTTON_GATHERER, "detectionsArray");
        let cookies: Vec<RawCookie> = entries(raw_cookies, COOKIE_GATHERER);
        let buttons: Vec<RawButton> = entries(raw_buttons, BUTTON_GATHERER);
        let cmps: Vec<RawCmp> = entries(raw_list(record, CMP_GATHERER, "CMPs"), CMP_GATHERER);

        // counts cover every raw entry, parseable or not
        tables.sites.push(SiteStats {
            site: site.clone(),
            cookies_found: raw_cookies.len(),
            buttons_found: raw_buttons.len(),
            has_secure_cookies: cookies.iter().any(|c| c.secure),
            cmps: cmps.iter().filter(|c| !c.name.is_empty()).map(|c| c.name.clone()).collect(),
        });

        tables.cookies.extend(cookies.into_iter().map(|c| CookieRow {
            site: site.clone(),
            name: c.name,
            domain: c.domain,
            path: c.path,
            secure: c.secure,
            http_only: c.http_only,
            same_site: c.same_site,
            session: c.session,
        }));

        for b in buttons {
            let text = b.text.trim();
            if text.is_empty() {
                continue;
            }
            tables.buttons.push(ButtonRow {
                site: site.clone(),
                text: text.to_string(),
                html: b.html.chars().take(MAX_HTML_CHARS).collect(),
                is_visible: b.visibility_analysis.is_some_and(|v| !v.is_null()),
            });
        }

        tables.cmps.extend(
            cmps.into_iter()
                .filter(|c| !c.name.is_empty())
                .map(|c| CmpRow { site: site.clone(), name: c.name }),
        );
    }
    tables
}

/// The raw `data.<gatherer>.<list>` array, empty when absent.
fn raw_list<'a>(record: &'a Record, gatherer: &str, list: &str) -> &'a [Value] {
    record
        .gatherer(gatherer)
        .and_then(|g| g.get(list))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Typed entries, skipping ones that don't deserialize.
fn entries<T: for<'de> Deserialize<'de>>(items: &[Value], gatherer: &str) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(gatherer, error = %e, "skipping malformed gatherer entry");
                None
            }
        })
        .collect()
}
