pub mod categorize;
pub mod config;
pub mod extract;
pub mod gatherers;
pub mod loader;
pub mod noise;
pub mod types;
pub mod views;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::categorize::{Categorizer, Dictionaries, PRIORITY};
    pub use crate::config::Config;
    pub use crate::gatherers::GathererTables;
    pub use crate::loader::{LoadError, Loader};
    pub use crate::types::{Category, Record};
    pub use crate::views::{LongRow, OptionViews, OverallSummary, PerSiteSummary, WideRow};
    pub use crate::{build_views, load, Analyzer};
}

use std::path::Path;

use crate::categorize::{Categorizer, Dictionaries};
use crate::config::Config;
use crate::extract::Extractor;
use crate::gatherers::GathererTables;
use crate::loader::Loader;
use crate::noise::NoiseFilter;
use crate::types::Record;
use crate::views::{OptionViews, ViewBuilder};

/// Library entry point. Owns the configured loader, extractor and categorizer
/// for one analysis run.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: Config,
    loader: Loader,
    extractor: Extractor,
    categorizer: Categorizer,
}

impl Default for Analyzer {
    fn default() -> Self { Self::new(Config::default()) }
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let loader = Loader::new(config.loader.clone());
        let noise = NoiseFilter::from_config(&config.noise);
        let extractor = Extractor::new(&config.extractor, noise);
        let categorizer = Categorizer::new(Dictionaries::with_overrides(&config.dictionaries));
        Self { config, loader, extractor, categorizer }
    }

    /// Swap in different dictionaries, keeping everything else.
    pub fn with_dictionaries(mut self, dict: Dictionaries) -> Self {
        self.categorizer = Categorizer::new(dict);
        self
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn loader(&self) -> &Loader { &self.loader }
    pub fn extractor(&self) -> &Extractor { &self.extractor }
    pub fn categorizer(&self) -> &Categorizer { &self.categorizer }

    /// Load records, resolving relative sources against the configured search dir.
    pub fn load(&self, existing: Option<Vec<Record>>, source: Option<&Path>) -> Vec<Record> {
        self.loader.load(existing, source, &self.config.search_dir)
    }

    pub fn build_views(&self, records: &[Record]) -> OptionViews {
        ViewBuilder::new(&self.extractor, &self.categorizer).build(records)
    }

    pub fn gatherer_tables(&self, records: &[Record]) -> GathererTables {
        gatherers::analyze(records)
    }
}

/// Load records with default settings. See [`Loader::load`].
pub fn load(existing: Option<Vec<Record>>, source: Option<&Path>, search_dir: &Path) -> Vec<Record> {
    Loader::default().load(existing, source, search_dir)
}

/// Build all option views with the built-in dictionaries.
pub fn build_views(records: &[Record]) -> OptionViews {
    Analyzer::default().build_views(records)
}
