use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use consent_options::prelude::*;
use consent_options::views::{explode, pivot};
use serde_json::json;

fn write_export(dir: &Path, name: &str, lines: &[String]) {
    let file = File::create(dir.join(name)).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("export/data.json", options).unwrap();
    for line in lines {
        writeln!(zip, "{line}").unwrap();
    }
    zip.finish().unwrap();
}

fn crawl_lines() -> Vec<String> {
    vec![
        json!({
            "url": "https://shop.example",
            "data": {
                "ButtonGatherer": {"detectionsArray": [
                    {"text": "Accept all cookies", "visibilityAnalysis": {"score": 0.9}},
                    {"text": "Reject all"},
                    {"text": "Customize"}
                ]},
                "CookieGatherer": {"cookies": [{"name": "sid", "secure": true}]},
                "CMPGatherer": {"CMPs": [{"CMP_name": "Cookiebot"}]},
                "Styles": {"padding": "0px", "weight": "400", "href": "https://cdn.example/x.css"}
            }
        })
        .to_string(),
        "{ this line is broken".to_string(),
        String::new(),
        json!({
            "requestedUrl": "https://news.example",
            "buttons": [{"text": "Only essential cookies"}, "Got it"],
            "data": {"ButtonGatherer": {"detectionsArray": [{"text": "Got it"}]}}
        })
        .to_string(),
        json!({"id": 17}).to_string(),
    ]
}

#[test]
fn archive_to_views() {
    let tmp = tempfile::tempdir().unwrap();
    write_export(tmp.path(), "data-2024.zip", &crawl_lines());

    let records = load(None, Some(Path::new("data-2024.zip")), tmp.path());
    assert_eq!(records.len(), 3);

    let views = build_views(&records);
    assert_eq!(views.wide.len(), 3);

    let shop = &views.wide[0];
    assert_eq!(shop.site.as_deref(), Some("https://shop.example"));
    assert_eq!(shop.options_in(Category::Accept), ["Accept all cookies"]);
    assert_eq!(shop.options_in(Category::RejectAll), ["Reject all"]);
    // gatherer payload strings are candidates too
    assert_eq!(shop.options_in(Category::Customize), ["Cookiebot", "Customize"]);
    assert_eq!(shop.options_in(Category::Other), ["sid"]);
    assert_eq!(shop.option_count, 5);

    let news = &views.wide[1];
    assert_eq!(news.site.as_deref(), Some("https://news.example"));
    assert_eq!(news.options_in(Category::Essential), ["Only essential cookies"]);
    assert_eq!(news.options_in(Category::Dismiss), ["Got it"]);

    let bare = &views.wide[2];
    assert_eq!(bare.site.as_deref(), Some("17"));
    assert_eq!(bare.option_count, 0);
    assert!(bare.flags.values().all(|f| !f));

    assert_eq!(views.long.len(), 7);
    assert_eq!(pivot(&explode(&views.wide)), views.per_site);
    assert_eq!(views.overall.values().sum::<usize>(), 7);
}

#[test]
fn noise_never_reaches_the_wide_table() {
    let tmp = tempfile::tempdir().unwrap();
    write_export(tmp.path(), "data.zip", &crawl_lines());
    let analyzer = Analyzer::default();
    let records = analyzer.load(None, Some(&tmp.path().join("data.zip")));
    let filter = analyzer.extractor().noise_filter();

    for row in analyzer.build_views(&records).wide {
        let mut seen = BTreeSet::new();
        for opts in row.categories.values() {
            for o in opts {
                assert!(!filter.is_noise(o), "noise `{o}` leaked into the table");
                assert!(seen.insert(o.as_str()), "`{o}` in two buckets");
            }
        }
        assert_eq!(seen.len(), row.option_count);
    }
}

#[test]
fn directory_scan_and_gatherers() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("crawl.json"), crawl_lines().join("\n")).unwrap();

    let records = load(None, None, tmp.path());
    assert_eq!(records.len(), 3);

    let tables = Analyzer::default().gatherer_tables(&records);
    assert_eq!(tables.sites.len(), 3);
    assert_eq!(tables.cookies.len(), 1);
    assert_eq!(tables.buttons.len(), 4);
    assert_eq!(tables.cmps[0].name, "Cookiebot");
    assert!(tables.sites[0].has_secure_cookies);
}

#[test]
fn configured_analyzer_uses_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    fs::write(
        &cfg_path,
        format!(
            "search_dir = {:?}\n\n[dictionaries.phrases]\ndismiss = [\"customize\"]\n",
            tmp.path().display().to_string()
        ),
    )
    .unwrap();
    write_export(tmp.path(), "data.zip", &crawl_lines());

    let analyzer = Analyzer::new(Config::load(Some(&cfg_path)).unwrap());
    let records = analyzer.load(None, Some(Path::new("data.zip")));
    let views = analyzer.build_views(&records);
    assert_eq!(views.wide[0].options_in(Category::Dismiss), ["Customize"]);
}

#[test]
fn empty_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let records = load(None, None, tmp.path());
    assert!(records.is_empty());
    let (wide, long, per_site, overall) = build_views(&records).into_parts();
    assert!(wide.is_empty() && long.is_empty() && per_site.is_empty() && overall.is_empty());
}
