use std::fs;
use std::io::Write;
use tempfile::TempDir;

use chrono::NaiveDate;
use newsrag_core::config::ChunkingConfig;
use newsrag_core::data_processor::{load_document, DataProcessor, IngestReport};
use newsrag_core::store::CorpusStore;

fn small_chunks() -> ChunkingConfig {
    ChunkingConfig { chunk_size_words: 4, overlap_words: 1 }
}

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("Daily_Worker_1945-06-01_p2.txt")).unwrap();
    writeln!(f, "  Short\n\ntext  ").unwrap();

    let processor = DataProcessor::new(small_chunks()).unwrap();
    let out = processor.process_directory(dir).expect("process");

    assert_eq!(out.chunks.len(), 1, "two words become one chunk");
    assert_eq!(out.chunks[0].text, "Short text");
    assert_eq!(out.chunks[0].id.to_string(), "Daily_Worker_1945-06-01_p2:0");
    assert_eq!(out.documents[0].metadata.source, "Daily Worker");
    assert_eq!(out.documents[0].metadata.page_number, Some(2));
    assert_eq!(out.report.total_words, 2);
    assert_eq!(out.report.sources, ["Daily Worker"]);
}

#[test]
fn process_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let processor = DataProcessor::new(small_chunks()).unwrap();
    let out = processor.process_directory_limited(dir, 1).expect("process limited");

    assert_eq!(out.documents.len(), 1, "limited to one source document");
    assert_eq!(out.documents[0].id, "a");
    assert_eq!(out.report.total_files, 1);
}

#[test]
fn bad_files_are_recorded_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("good.txt"), "one two three four five six").unwrap();
    fs::write(dir.join("blank.txt"), " \n\t ").unwrap();
    fs::write(dir.join("broken.txt"), "has a broken sidecar").unwrap();
    fs::write(dir.join("broken.json"), "{ not json").unwrap();

    let processor = DataProcessor::new(small_chunks()).unwrap();
    let out = processor.process_directory(dir).unwrap();

    assert_eq!(out.report.total_files, 3);
    assert_eq!(out.report.processed_files, 1);
    assert_eq!(out.report.failures.len(), 2);
    assert_eq!(out.report.total_chunks, out.chunks.len());
    assert_eq!(out.chunks.len(), 2);
    let failed: Vec<_> = out.report.failures.iter().map(|f| f.path.file_name().unwrap().to_owned()).collect();
    assert!(failed.contains(&"blank.txt".into()));
    assert!(failed.contains(&"broken.txt".into()));
}

#[test]
fn sidecar_json_wins_over_filename() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("Other_1930-01-01.txt"), "labor strike news").unwrap();
    fs::write(
        dir.join("Other_1930-01-01.json"),
        r#"{"newspaper_name": "The Worker", "publication_date": "1960-12-31", "page_number": 4, "language": "en"}"#,
    )
    .unwrap();

    let doc = load_document(&dir.join("Other_1930-01-01.txt"), dir).unwrap();
    assert_eq!(doc.metadata.source, "The Worker");
    assert_eq!(doc.metadata.publication_date, NaiveDate::from_ymd_opt(1960, 12, 31));
    assert_eq!(doc.metadata.page_number, Some(4));
    assert_eq!(doc.metadata.language.as_deref(), Some("en"));
}

#[test]
fn nested_issue_directories_get_unique_ids_and_dates() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    for issue in ["per_daily-worker_1945-06-01_22_130", "per_daily-worker_1945-06-02_22_131"] {
        fs::create_dir_all(root.join(issue)).unwrap();
        fs::write(root.join(issue).join("page.txt"), "war ends in europe").unwrap();
    }

    let processor = DataProcessor::new(small_chunks()).unwrap();
    let out = processor.process_directory(root).unwrap();

    let ids: Vec<_> = out.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["per_daily-worker_1945-06-01_22_130/page", "per_daily-worker_1945-06-02_22_131/page"]);
    assert_eq!(
        out.report.date_range,
        Some((NaiveDate::from_ymd_opt(1945, 6, 1).unwrap(), NaiveDate::from_ymd_opt(1945, 6, 2).unwrap()))
    );
    let store = CorpusStore::from_chunks(out.chunks).unwrap();
    assert_eq!(store.sources(), ["Daily Worker"]);
}

#[test]
fn report_saves_as_json() {
    let tmp = TempDir::new().unwrap();
    let report = IngestReport { total_files: 2, processed_files: 2, total_chunks: 7, ..Default::default() };
    let path = tmp.path().join("stats.json");
    report.save(&path).unwrap();
    let back: IngestReport = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(back, report);
}

#[test]
fn missing_directory_is_an_error() {
    let processor = DataProcessor::new(small_chunks()).unwrap();
    assert!(processor.process_directory(std::path::Path::new("/definitely/not/here")).is_err());
}
