//! CSV output across repeated runs.

mod common;

use bizcrawl::models::{BusinessRecord, COLUMNS};
use bizcrawl::runner::QueryRunner;
use bizcrawl::storage::{CsvSink, RecordSink};
use common::*;

fn header() -> String {
    COLUMNS.join(",")
}

#[test]
fn repeated_runs_write_one_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.csv");

    let runs = 3;
    let per_run = 4;
    for run in 0..runs {
        let mut sink = CsvSink::open(&path).unwrap();
        for i in 0..per_run {
            sink.write_record(&BusinessRecord {
                name: Some(format!("Business {run}-{i}")),
                ..Default::default()
            })
            .unwrap();
        }
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1 + runs * per_run);
    assert_eq!(lines.iter().filter(|l| **l == header()).count(), 1);
    assert_eq!(lines[0], header());
}

#[tokio::test(start_paused = true)]
async fn crawled_records_are_flushed_as_they_arrive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.csv");

    for _ in 0..2 {
        let (entries, details) = businesses(3);
        let mut session = ScriptedSession::new(entries, details).with_sentinel();
        let mut sink = CsvSink::open(&path).unwrap();

        let runner = QueryRunner::new(&test_config());
        runner
            .run(&mut session, &["cafe".to_string()], &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.written(), 3);
    }

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());

    let rows: Vec<BusinessRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].name.as_deref(), Some("Business 0"));
    assert_eq!(rows[0].rating.as_deref(), Some("4.5"));
    assert_eq!(
        rows[0].source_link.as_deref(),
        Some("https://maps.example/org/1000/")
    );
    assert_eq!(rows[0].website, None);
}
