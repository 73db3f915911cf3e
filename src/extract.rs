use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::config::ExtractorConfig;
use crate::noise::NoiseFilter;
use crate::types::Record;

/// Finds short strings in a record that look like consent-banner option labels.
///
/// Two passes are unioned: a targeted lookup of well-known button-ish fields
/// on the record itself, and a walk over every string value in the record
/// that keeps only label-sized text.
#[derive(Debug, Clone)]
pub struct Extractor {
    button_fields: Vec<String>,
    label_keys: Vec<String>,
    max_chars: usize,
    max_words: usize,
    noise: NoiseFilter,
}

impl Default for Extractor {
    fn default() -> Self { Self::new(&ExtractorConfig::default(), NoiseFilter::default()) }
}

impl Extractor {
    pub fn new(cfg: &ExtractorConfig, noise: NoiseFilter) -> Self {
        Self {
            button_fields: cfg.button_fields.clone(),
            label_keys: cfg.label_keys.clone(),
            max_chars: cfg.max_label_chars,
            max_words: cfg.max_label_words,
            noise,
        }
    }

    pub fn noise_filter(&self) -> &NoiseFilter { &self.noise }

    pub fn extract_candidates(&self, record: &Record) -> BTreeSet<String> {
        let mut opts = BTreeSet::new();
        self.targeted(record, &mut opts);

        let mut strings = Vec::new();
        for value in record.fields().values() {
            collect_strings(value, &mut strings);
        }
        for s in strings {
            let st = s.trim();
            if self.noise.is_noise(st) {
                continue;
            }
            if st.chars().count() <= self.max_chars && st.split_whitespace().count() <= self.max_words {
                opts.insert(st.to_string());
            }
        }
        opts
    }

    fn targeted(&self, record: &Record, opts: &mut BTreeSet<String>) {
        for key in &self.button_fields {
            match record.get(key) {
                Some(Value::String(s)) => self.push(s, opts),
                Some(Value::Array(items)) => {
                    for item in items {
                        match item {
                            Value::String(s) => self.push(s, opts),
                            Value::Object(map) => self.push_labels(map, opts),
                            _ => {}
                        }
                    }
                }
                Some(Value::Object(map)) => self.push_labels(map, opts),
                _ => {}
            }
        }
    }

    fn push_labels(&self, map: &Map<String, Value>, opts: &mut BTreeSet<String>) {
        for key in &self.label_keys {
            match map.get(key) {
                Some(Value::String(s)) if !s.is_empty() => self.push(s, opts),
                Some(Value::Number(n)) => self.push(&n.to_string(), opts),
                // rendered the way the crawler's Python tooling prints it
                Some(Value::Bool(true)) => self.push("True", opts),
                _ => {}
            }
        }
    }

    fn push(&self, raw: &str, opts: &mut BTreeSet<String>) {
        let st = raw.trim();
        if !self.noise.is_noise(st) {
            opts.insert(st.to_string());
        }
    }
}

/// Every string leaf under `value`; mapping keys are not visited.
pub fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
