use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categorize::{resolve, Categorizer};
use crate::extract::Extractor;
use crate::types::{Category, Record};

const PREVIEW_LEN: usize = 3;
const PREVIEW_SEP: &str = ", ";

/// One row per record: its options split into category buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub site: Option<String>,
    pub options: Vec<String>,
    pub option_count: usize,
    /// All nine categories are present, possibly with empty lists.
    pub categories: BTreeMap<Category, Vec<String>>,
    pub flags: BTreeMap<Category, bool>,
    /// Only for [`Category::PREVIEWED`].
    pub previews: BTreeMap<Category, String>,
}

impl WideRow {
    fn new(site: Option<String>, options: Vec<String>, categories: BTreeMap<Category, Vec<String>>) -> Self {
        let flags = categories.iter().map(|(c, opts)| (*c, !opts.is_empty())).collect();
        let previews = Category::PREVIEWED
            .into_iter()
            .map(|c| {
                let head = categories.get(&c).map(|o| &o[..o.len().min(PREVIEW_LEN)]).unwrap_or(&[]);
                (c, head.join(PREVIEW_SEP))
            })
            .collect();
        Self { site, option_count: options.len(), options, categories, flags, previews }
    }

    pub fn options_in(&self, category: Category) -> &[String] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, category: Category) -> bool {
        self.flags.get(&category).copied().unwrap_or(false)
    }

    pub fn preview(&self, category: Category) -> Option<&str> {
        self.previews.get(&category).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRow {
    pub site: Option<String>,
    pub option: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCounts {
    pub site: Option<String>,
    /// One entry per column of the enclosing [`PerSiteSummary`].
    pub counts: BTreeMap<Category, usize>,
}

/// Site x category pivot of the long table, zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSiteSummary {
    pub columns: Vec<Category>,
    pub rows: Vec<SiteCounts>,
}

impl PerSiteSummary {
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn count(&self, site: Option<&str>, category: Category) -> usize {
        self.rows
            .iter()
            .find(|r| r.site.as_deref() == site)
            .and_then(|r| r.counts.get(&category).copied())
            .unwrap_or(0)
    }
}

/// Options per category over the whole corpus, in category name order.
pub type OverallSummary = BTreeMap<Category, usize>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionViews {
    pub wide: Vec<WideRow>,
    pub long: Vec<LongRow>,
    pub per_site: PerSiteSummary,
    pub overall: OverallSummary,
}

impl OptionViews {
    pub fn into_parts(self) -> (Vec<WideRow>, Vec<LongRow>, PerSiteSummary, OverallSummary) {
        (self.wide, self.long, self.per_site, self.overall)
    }
}

/// Runs extraction and categorization per record and aggregates the results.
pub struct ViewBuilder<'a> {
    extractor: &'a Extractor,
    categorizer: &'a Categorizer,
}

impl<'a> ViewBuilder<'a> {
    pub fn new(extractor: &'a Extractor, categorizer: &'a Categorizer) -> Self {
        Self { extractor, categorizer }
    }

    pub fn wide_row(&self, record: &Record) -> WideRow {
        let options: Vec<String> = self.extractor.extract_candidates(record).into_iter().collect();

        let mut buckets: BTreeMap<Category, Vec<String>> =
            Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
        let mut assigned: BTreeSet<&str> = BTreeSet::new();
        for opt in &options {
            if !assigned.insert(opt.as_str()) {
                continue;
            }
            let primary = resolve(&self.categorizer.categorize(opt));
            buckets.entry(primary).or_default().push(opt.clone());
        }

        debug!(site = record.site().unwrap_or("<unknown>"), options = options.len(), "categorized record");
        WideRow::new(record.site().map(str::to_string), options, buckets)
    }

    pub fn build(&self, records: &[Record]) -> OptionViews {
        if records.is_empty() {
            return OptionViews::default();
        }
        let wide: Vec<WideRow> = records.iter().map(|r| self.wide_row(r)).collect();
        let long = explode(&wide);
        let per_site = pivot(&long);
        let overall = overall(&long);
        OptionViews { wide, long, per_site, overall }
    }
}

/// One long row per (site, category, option) in wide-table column order.
pub fn explode(wide: &[WideRow]) -> Vec<LongRow> {
    let mut out = Vec::new();
    for row in wide {
        for category in Category::ALL {
            for option in row.options_in(category) {
                out.push(LongRow { site: row.site.clone(), option: option.clone(), category });
            }
        }
    }
    out
}

pub fn pivot(long: &[LongRow]) -> PerSiteSummary {
    if long.is_empty() {
        return PerSiteSummary::default();
    }
    let columns: BTreeSet<Category> = long.iter().map(|r| r.category).collect();
    let mut by_site: BTreeMap<Option<&str>, BTreeMap<Category, usize>> = BTreeMap::new();
    for row in long {
        let counts = by_site
            .entry(row.site.as_deref())
            .or_insert_with(|| columns.iter().map(|c| (*c, 0)).collect());
        *counts.entry(row.category).or_insert(0) += 1;
    }
    PerSiteSummary {
        columns: columns.into_iter().collect(),
        rows: by_site
            .into_iter()
            .map(|(site, counts)| SiteCounts { site: site.map(str::to_string), counts })
            .collect(),
    }
}

pub fn overall(long: &[LongRow]) -> OverallSummary {
    let mut totals = OverallSummary::new();
    for row in long {
        *totals.entry(row.category).or_insert(0) += 1;
    }
    totals
}
