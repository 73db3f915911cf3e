use std::cmp::Reverse;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::types::Record;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("source not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to open archive {path}: {source}")]
    Archive { path: PathBuf, source: zip::result::ZipError },

    #[error("archive {path} has no member ending in `{suffix}`")]
    MissingMember { path: PathBuf, suffix: String },
}

/// Records parsed from one newline-delimited JSON source.
#[derive(Debug, Default)]
pub struct NdjsonBatch {
    pub records: Vec<Record>,
    /// Non-blank lines that were not a JSON object.
    pub skipped: usize,
}

/// Turns crawl exports (NDJSON files, zip archives, directories of exports)
/// into records. Public entry points never fail; they log and return nothing.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    cfg: LoaderConfig,
}

impl Loader {
    pub fn new(cfg: LoaderConfig) -> Self { Self { cfg } }

    /// Existing records win; otherwise an explicit source is loaded (no
    /// fallback), otherwise the newest usable file in `search_dir`.
    pub fn load(&self, existing: Option<Vec<Record>>, source: Option<&Path>, search_dir: &Path) -> Vec<Record> {
        if let Some(records) = existing.filter(|r| !r.is_empty()) {
            return records;
        }
        match source {
            Some(source) => {
                let path = resolve_source(source, search_dir);
                match self.try_load_source(&path) {
                    Ok(batch) => {
                        info!(path = %path.display(), records = batch.records.len(), skipped = batch.skipped, "loaded records");
                        batch.records
                    }
                    Err(e) => {
                        warn!(error = %e, "no records loaded");
                        Vec::new()
                    }
                }
            }
            None => self.scan_directory(search_dir),
        }
    }

    /// Load one explicit file, dispatching on its extension.
    pub fn try_load_source(&self, path: &Path) -> Result<NdjsonBatch, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let ext = extension(path);
        if ext.eq_ignore_ascii_case(&self.cfg.archive_extension) {
            self.read_archive(path)
        } else if self.is_data_extension(&ext) {
            self.read_ndjson_file(path)
        } else {
            Err(LoadError::UnsupportedFormat(path.to_path_buf()))
        }
    }

    pub fn read_ndjson_file(&self, path: &Path) -> Result<NdjsonBatch, LoadError> {
        let file = File::open(path).map_err(|source| io_err(path, source))?;
        self.parse_ndjson(BufReader::new(file), path)
    }

    /// Parses the first member whose name ends in the configured suffix.
    pub fn read_archive(&self, path: &Path) -> Result<NdjsonBatch, LoadError> {
        let file = File::open(path).map_err(|source| io_err(path, source))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|source| LoadError::Archive { path: path.to_path_buf(), source })?;

        let suffix = self.cfg.member_suffix.as_str();
        let members: Vec<usize> = (0..archive.len())
            .filter(|&i| archive.by_index(i).map(|m| m.name().ends_with(suffix)).unwrap_or(false))
            .collect();
        let Some(&index) = members.first() else {
            return Err(LoadError::MissingMember { path: path.to_path_buf(), suffix: suffix.to_string() });
        };
        if members.len() > 1 {
            warn!(path = %path.display(), candidates = members.len(), "several data members in archive, using the first");
        }

        let member = archive
            .by_index(index)
            .map_err(|source| LoadError::Archive { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), member = member.name(), "reading archive member");
        self.parse_ndjson(BufReader::new(member), path)
    }

    /// One JSON object per line. Bad lines are skipped and counted; an I/O
    /// failure aborts the whole source.
    pub fn parse_ndjson<R: BufRead>(&self, reader: R, origin: &Path) -> Result<NdjsonBatch, LoadError> {
        let mut batch = NdjsonBatch::default();
        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line.map_err(|source| io_err(origin, source))?;
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = serde_json::from_slice::<Value>(trimmed)
                .map_err(|e| e.to_string())
                .and_then(|v| {
                    Record::from_value(v, self.cfg.identity_keys.as_slice()).ok_or_else(|| "not a JSON object".to_string())
                });
            match parsed {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    warn!(path = %origin.display(), line = idx + 1, error = %e, "skipping malformed line");
                    batch.skipped += 1;
                }
            }
        }
        Ok(batch)
    }

    /// Newest data file whose records carry a URL-like key.
    pub fn scan_directory(&self, dir: &Path) -> Vec<Record> {
        let candidates = match self.list_data_files(dir) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "cannot scan for data files");
                return Vec::new();
            }
        };
        for path in candidates {
            match self.read_ndjson_file(&path) {
                Ok(batch) if batch.records.iter().any(|r| r.has_any_key(self.cfg.url_keys.as_slice())) => {
                    info!(path = %path.display(), records = batch.records.len(), "selected newest usable data file");
                    return batch.records;
                }
                Ok(_) => debug!(path = %path.display(), "no url-bearing records, trying next file"),
                Err(e) => warn!(error = %e, "skipping unreadable data file"),
            }
        }
        Vec::new()
    }

    /// Data files in `dir`, newest first (ties broken by path).
    pub fn list_data_files(&self, dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let entries = fs::read_dir(dir).map_err(|source| io_err(dir, source))?;
        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.is_data_extension(&extension(p)))
            .map(|p| {
                let mtime = fs::metadata(&p).and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
                (mtime, p)
            })
            .collect();
        files.sort_by(|a, b| (Reverse(a.0), &a.1).cmp(&(Reverse(b.0), &b.1)));
        Ok(files.into_iter().map(|(_, p)| p).collect())
    }

    fn is_data_extension(&self, ext: &str) -> bool {
        self.cfg.data_extensions.iter().any(|d| d.eq_ignore_ascii_case(ext))
    }
}

/// Absolute paths are used as given; relative ones live under `search_dir`.
pub fn resolve_source(source: &Path, search_dir: &Path) -> PathBuf {
    if source.is_absolute() { source.to_path_buf() } else { search_dir.join(source) }
}

fn extension(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_string()
}

fn io_err(path: &Path, source: std::io::Error) -> LoadError {
    LoadError::Io { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in members {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    const TWO_SITES: &str = "{\"url\": \"https://a.example\", \"data\": {}}\n\n{\"url\": \"https://b.example\", \"data\": {}}\n";

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let body = b"{\"url\": \"a\"}\nnot json\n   \n[1,2]\n\xff\xfe\n{\"url\": \"b\"}";
        let batch = Loader::default().parse_ndjson(&body[..], Path::new("inline")).unwrap();
        let sites: Vec<_> = batch.records.iter().map(|r| r.site().unwrap()).collect();
        assert_eq!(sites, vec!["a", "b"]);
        assert_eq!(batch.skipped, 3);
    }

    #[test]
    fn crlf_line_endings() {
        let body = "{\"url\": \"a\"}\r\n{\"url\": \"b\"}\r\n";
        let batch = Loader::default().parse_ndjson(body.as_bytes(), Path::new("inline")).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn missing_file_differs_from_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = Loader::default();

        let err = loader.try_load_source(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));

        let empty = tmp.path().join("empty.json");
        fs::write(&empty, "garbage\n\n").unwrap();
        let batch = loader.try_load_source(&empty).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn loads_archive_member_by_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("data-1.zip");
        write_zip(&zip_path, &[("readme.txt", "hello"), ("job/data.json", TWO_SITES)]);

        let records = Loader::default().load(None, Some(Path::new("data-1.zip")), tmp.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].site(), Some("https://b.example"));
    }

    #[test]
    fn first_of_several_data_members_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("data-2.zip");
        let later = "{\"url\": \"https://c.example\"}\n";
        write_zip(&zip_path, &[("a/data.json", TWO_SITES), ("b/data.json", later)]);

        let batch = Loader::default().read_archive(&zip_path).unwrap();
        let sites: Vec<_> = batch.records.iter().filter_map(Record::site).collect();
        assert_eq!(sites, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn archive_without_data_member() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("other.zip");
        write_zip(&zip_path, &[("notes.json", TWO_SITES)]);
        let err = Loader::default().try_load_source(&zip_path).unwrap_err();
        assert!(matches!(err, LoadError::MissingMember { .. }));
    }

    #[test]
    fn corrupt_archive_degrades_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("broken.zip");
        fs::write(&zip_path, b"definitely not a zip").unwrap();
        let loader = Loader::default();
        assert!(matches!(loader.try_load_source(&zip_path), Err(LoadError::Archive { .. })));
        assert!(loader.load(None, Some(&zip_path), tmp.path()).is_empty());
    }

    #[test]
    fn explicit_source_never_falls_back_to_scan() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("good.json"), TWO_SITES).unwrap();
        let loader = Loader::default();
        assert!(loader.load(None, Some(Path::new("missing.json")), tmp.path()).is_empty());
        fs::write(tmp.path().join("notes.txt"), TWO_SITES).unwrap();
        assert!(loader.load(None, Some(Path::new("notes.txt")), tmp.path()).is_empty());
        assert_eq!(loader.load(None, None, tmp.path()).len(), 2);
    }

    #[test]
    fn existing_records_pass_through() {
        let existing = vec![Record::new(serde_json::Map::new())];
        let got = Loader::default().load(Some(existing.clone()), Some(Path::new("ignored.json")), Path::new("/nowhere"));
        assert_eq!(got, existing);
        // empty existing does not short-circuit
        assert!(Loader::default().load(Some(Vec::new()), None, Path::new("/nowhere/at/all")).is_empty());
    }

    #[test]
    fn absolute_source_ignores_search_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("abs.ndjson");
        fs::write(&path, TWO_SITES).unwrap();
        assert_eq!(Loader::default().load(None, Some(&path), Path::new("/elsewhere")).len(), 2);
    }

    #[test]
    fn scan_prefers_newest_file_with_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let old = tmp.path().join("old.json");
        let legacy = tmp.path().join("legacy.json");
        let newest = tmp.path().join("newest.json");
        fs::write(&old, "{\"url\": \"https://old.example\"}\n").unwrap();
        fs::write(&legacy, "{\"site\": \"no url key here\"}\n").unwrap();
        fs::write(&newest, "not json at all\n").unwrap();
        set_mtime(&old, 1_000);
        set_mtime(&legacy, 2_000);
        set_mtime(&newest, 3_000);

        let loader = Loader::default();
        let order = loader.list_data_files(tmp.path()).unwrap();
        assert_eq!(order, vec![newest, legacy, old]);

        let records = loader.load(None, None, tmp.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].site(), Some("https://old.example"));
    }

    #[test]
    fn scan_accepts_alternate_url_keys_only() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("ids.json"), "{\"id\": 5}\n").unwrap();
        assert!(Loader::default().load(None, None, tmp.path()).is_empty());

        fs::write(tmp.path().join("ids.json"), "{\"requestedUrl\": \"https://r.example\"}\n").unwrap();
        assert_eq!(Loader::default().load(None, None, tmp.path()).len(), 1);
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        assert!(Loader::default().load(None, None, Path::new("/definitely/not/here")).is_empty());
    }
}
