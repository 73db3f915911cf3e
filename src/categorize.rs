use std::collections::BTreeSet;

use crate::config::DictionaryOverrides;
use crate::types::Category;

/// Resolution order when a label matches more than one category.
pub const PRIORITY: [Category; 9] = [
    Category::RejectAll,
    Category::Essential,
    Category::Accept,
    Category::Reject,
    Category::Customize,
    Category::Confirm,
    Category::Info,
    Category::Dismiss,
    Category::Other,
];

// Curated phrases; a hit here short-circuits the keyword pass.
const PHRASES: &[(Category, &[&str])] = &[
    (Category::RejectAll, &[
        "reject all", "decline all", "deny all", "decline all cookies", "reject all cookies",
        "ablehnen alle", "rechazar todo", "rifiuta tutto",
    ]),
    (Category::Reject, &[
        "reject", "decline", "deny", "ablehnen", "rechazar", "refuser", "rifiuta", "weigeren",
    ]),
    (Category::Accept, &["accept all", "accept cookies", "agree and", "akzeptieren", "accepteren"]),
    (Category::Essential, &[
        "only necessary", "essential only", "necessary cookies", "only essential",
        "essential cookies", "nur notwendige", "solo los necesarios",
    ]),
    (Category::Dismiss, &["got it", "ok thanks", "weiter", "schliessen", "schließen", "cerrar", "chiudi"]),
    (Category::Confirm, &["save preferences", "save settings", "confirm selection", "guardar", "enregistrer", "salva"]),
];

// Broader single keywords, only consulted when no phrase matched.
const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Accept, &["accept", "agree", "allow", "consent", "accepter", "aceptar", "accetta"]),
    (Category::Reject, &["reject", "decline", "deny", "nein"]),
    (Category::Customize, &[
        "settings", "preferences", "manage", "customize", "configure", "cookie", "einstellungen",
        "paramètres", "configurar", "impostazioni", "instellingen",
    ]),
    (Category::Info, &["more", "details", "learn more", "about", "info", "why", "weitere informationen", "mehr erfahren"]),
    (Category::Confirm, &["save", "apply", "confirm", "speichern"]),
    (Category::Dismiss, &["close", "dismiss", "ok"]),
];

type Table = Vec<(Category, Vec<String>)>;

/// Phrase and keyword tables, fixed for the lifetime of a [`Categorizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionaries {
    phrases: Table,
    keywords: Table,
}

impl Default for Dictionaries {
    fn default() -> Self {
        Self { phrases: owned(PHRASES), keywords: owned(KEYWORDS) }
    }
}

impl Dictionaries {
    /// Entries are lower-cased so they line up with the normalized label.
    pub fn new(phrases: Table, keywords: Table) -> Self {
        Self { phrases: lowered(phrases), keywords: lowered(keywords) }
    }

    /// Built-in tables with per-category replacements applied. A category
    /// absent from the built-ins is appended after them.
    pub fn with_overrides(overrides: &DictionaryOverrides) -> Self {
        let mut dict = Self::default();
        for (cat, words) in &overrides.phrases {
            replace(&mut dict.phrases, *cat, words);
        }
        for (cat, words) in &overrides.keywords {
            replace(&mut dict.keywords, *cat, words);
        }
        Self::new(dict.phrases, dict.keywords)
    }

    pub fn phrases(&self) -> &[(Category, Vec<String>)] { &self.phrases }

    pub fn keywords(&self) -> &[(Category, Vec<String>)] { &self.keywords }
}

fn owned(table: &[(Category, &[&str])]) -> Table {
    table
        .iter()
        .map(|(cat, words)| (*cat, words.iter().map(|w| w.to_string()).collect()))
        .collect()
}

fn lowered(table: Table) -> Table {
    table
        .into_iter()
        .map(|(cat, words)| (cat, words.into_iter().map(|w| w.to_lowercase()).collect()))
        .collect()
}

fn replace(table: &mut Table, cat: Category, words: &[String]) {
    match table.iter_mut().find(|(c, _)| *c == cat) {
        Some((_, existing)) => *existing = words.to_vec(),
        None => table.push((cat, words.to_vec())),
    }
}

/// Lexical classifier for option labels.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    dict: Dictionaries,
}

impl Categorizer {
    pub fn new(dict: Dictionaries) -> Self { Self { dict } }

    pub fn dictionaries(&self) -> &Dictionaries { &self.dict }

    /// Every category the label matches. Never empty: no match yields `{Other}`.
    pub fn categorize(&self, text: &str) -> BTreeSet<Category> {
        let s = text.trim().to_lowercase();
        if s.is_empty() {
            return BTreeSet::from([Category::Other]);
        }

        let cats = matched_categories(&self.dict.phrases, &s);
        if !cats.is_empty() {
            return cats;
        }

        let cats = matched_categories(&self.dict.keywords, &s);
        if cats.is_empty() {
            BTreeSet::from([Category::Other])
        } else {
            cats
        }
    }

    /// Single category for a label after priority resolution.
    pub fn classify(&self, text: &str) -> Category {
        resolve(&self.categorize(text))
    }
}

fn matched_categories(table: &[(Category, Vec<String>)], s: &str) -> BTreeSet<Category> {
    table
        .iter()
        .filter(|(_, words)| words.iter().any(|w| s.contains(w.as_str())))
        .map(|(cat, _)| *cat)
        .collect()
}

/// First category in [`PRIORITY`] present in `matched`, `Other` if none.
pub fn resolve(matched: &BTreeSet<Category>) -> Category {
    PRIORITY
        .into_iter()
        .find(|c| matched.contains(c))
        .unwrap_or(Category::Other)
}
