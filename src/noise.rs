use std::collections::HashSet;

use crate::config::NoiseConfig;

/// Rejects strings that cannot plausibly be a button or option label.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    denylist: HashSet<String>,
    max_short_len: usize,
}

impl Default for NoiseFilter {
    fn default() -> Self { Self::from_config(&NoiseConfig::default()) }
}

impl NoiseFilter {
    pub fn from_config(cfg: &NoiseConfig) -> Self {
        Self {
            denylist: cfg.denylist.iter().cloned().collect(),
            max_short_len: cfg.max_short_len,
        }
    }

    pub fn is_noise(&self, text: &str) -> bool {
        let st = text.trim();
        if st.is_empty() || self.denylist.contains(st) {
            return true;
        }
        if st.contains("://") {
            return true;
        }
        // markup fragment
        if st.starts_with('<') || st.ends_with('>') {
            return true;
        }
        if is_zero_prefixed_length(st) {
            return true;
        }
        if st.chars().count() <= self.max_short_len {
            return true;
        }
        !st.chars().any(char::is_alphabetic)
    }
}

/// `0` followed by digits, optionally with `px` fragments: "010px", "00", "0px12".
fn is_zero_prefixed_length(st: &str) -> bool {
    let Some(rest) = st.strip_prefix('0') else {
        return false;
    };
    let digits = rest.replace("px", "");
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
