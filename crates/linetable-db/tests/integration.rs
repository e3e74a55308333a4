//! Integration tests: LineTable through the `Database` trait.
//!
//! Each test seeds a fresh storage directory with the five-row template
//! table and drives insert/select/update the way a request handler would.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use linetable_db::{Config, Database, ErrorMessage, FileDatabase, RowId, Status};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Template rows, as packed on disk.
const TEMPLATE: &str = "1,2,3\n\"\",a,b,c,\"\"\n\n\"\"\n\"\",\"\",A\n";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn template_rows() -> Vec<Vec<String>> {
    vec![
        strings(&["1", "2", "3"]),
        strings(&["", "a", "b", "c", ""]),
        vec![],
        strings(&[""]),
        strings(&["", "", "A"]),
    ]
}

fn seed(dir: &Path, tables: &[&str]) {
    for table in tables {
        fs::write(dir.join(table), TEMPLATE).unwrap();
    }
}

fn test_db(max_rows_in_memory: u64) -> (FileDatabase, TempDir) {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), &["test", "test-insert", "test-update"]);
    let config = Config::new(dir.path()).with_max_rows_in_memory(max_rows_in_memory);
    let db = FileDatabase::open(config).unwrap();
    (db, dir)
}

fn status_of<T: std::fmt::Debug>(result: linetable_db::TableResult<T>) -> Status {
    Status::from(&result.unwrap_err())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test_log::test]
fn test_empty_database() {
    let (db, _dir) = test_db(1000);
    assert_eq!(status_of(db.select("empty", 0)), Status::NotFound);
}

#[test]
fn test_select() {
    let (db, _dir) = test_db(1000);
    for (id, row) in template_rows().iter().enumerate() {
        assert_eq!(&db.select("test", id as RowId).unwrap(), row, "row {}", id);
    }
    assert_eq!(status_of(db.select("test", 5)), Status::NotFound);
}

#[test]
fn test_update() {
    let (db, _dir) = test_db(1000);
    db.update("test-update", 0, &strings(&["3", "2", "1"])).unwrap();

    let mut expected = template_rows();
    expected[0] = strings(&["3", "2", "1"]);
    for (id, row) in expected.iter().enumerate() {
        assert_eq!(&db.select("test-update", id as RowId).unwrap(), row);
    }
    assert_eq!(status_of(db.select("test-update", 5)), Status::NotFound);
    assert_eq!(status_of(db.update("test-update", 5, &[])), Status::NotFound);
}

#[test]
fn test_insert() {
    let (db, _dir) = test_db(1000);

    let data = strings(&["sadsadgdf", "erwegwg", "1", "2", "3", "", "\n\r \t var\" , \\", ""]);
    let id = db.insert("test-insert", &data).unwrap();
    assert_eq!(id, 5);
    assert_eq!(db.select("test-insert", id).unwrap(), data);

    let id = db.insert("test-insert", &[]).unwrap();
    assert_eq!(id, 6);
    assert_eq!(db.select("test-insert", id).unwrap(), Vec::<String>::new());

    let id = db.insert("test-insert", &strings(&[""])).unwrap();
    assert_eq!(id, 7);
    assert_eq!(db.select("test-insert", id).unwrap(), strings(&[""]));

    let id = db.insert("test-insert", &strings(&["", ""])).unwrap();
    assert_eq!(id, 8);
    assert_eq!(db.select("test-insert", id).unwrap(), strings(&["", ""]));

    assert_eq!(status_of(db.select("test-insert", 9)), Status::NotFound);
}

#[test]
fn test_big_table_update() {
    // 20 rows against a threshold of 10 takes the rebuild path
    let (db, dir) = test_db(10);

    let mut rows = Vec::new();
    for i in 1..=20u64 {
        let data: Vec<String> = (1..=i).map(|n| n.to_string()).collect();
        assert_eq!(db.insert("bigtable", &data).unwrap(), i - 1);
        rows.push(data);
    }

    let new_data = strings(&["A", "B", "C", "D", "E", "F"]);
    db.update("bigtable", 10, &new_data).unwrap();
    rows[10] = new_data;

    for (id, row) in rows.iter().enumerate() {
        assert_eq!(&db.select("bigtable", id as RowId).unwrap(), row);
    }
    assert_eq!(status_of(db.select("bigtable", 20)), Status::NotFound);
    assert!(!dir.path().join("bigtable_$tmp").exists());
}

#[test]
fn test_strategy_equivalence() {
    let (in_memory, mem_dir) = test_db(1000);
    let (streaming, stream_dir) = test_db(0);

    for db in [&in_memory, &streaming] {
        db.update("test", 1, &strings(&["x,y", "", "\"q\""])).unwrap();
        db.update("test", 4, &[]).unwrap();
        db.insert("test", &strings(&["tail"])).unwrap();
        db.update("test", 5, &strings(&["", ""])).unwrap();
    }

    let a = fs::read(mem_dir.path().join("test")).unwrap();
    let b = fs::read(stream_dir.path().join("test")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_reopen_preserves_rows() {
    let dir = TempDir::new().unwrap();
    let config = Config::new(dir.path()).with_max_rows_in_memory(2);
    {
        let db = FileDatabase::open(config.clone()).unwrap();
        db.insert("persist", &strings(&["a"])).unwrap();
        db.insert("persist", &strings(&["b"])).unwrap();
        db.insert("persist", &strings(&["c"])).unwrap();
        db.update("persist", 1, &strings(&["B"])).unwrap();
    }
    let db = FileDatabase::open(config).unwrap();
    assert_eq!(db.insert("persist", &strings(&["d"])).unwrap(), 3);
    assert_eq!(db.select("persist", 1).unwrap(), strings(&["B"]));
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_table_name_is_bad_request() {
    let (db, _dir) = test_db(1000);
    assert_eq!(status_of(db.insert("bad name", &[])), Status::BadRequest);
    assert_eq!(status_of(db.select("..", 0)), Status::BadRequest);
    assert_eq!(status_of(db.update("test_$tmp", 0, &[])), Status::BadRequest);
}

#[test]
fn test_corruption_is_internal() {
    let (db, dir) = test_db(1000);
    assert!(db.select("test", 4).is_ok());

    fs::write(dir.path().join("test"), "1,2,3\n").unwrap();
    let err = db.select("test", 4).unwrap_err();
    assert!(err.is_corruption());

    let body = ErrorMessage::new(&err, "uri=/database/test/4");
    assert_eq!(body.status(), Status::Internal);
    assert_eq!(body.status_code, 500);
    assert!(body.message.contains("Corrupted table file: test"));
}

#[test]
fn test_error_message_json() {
    let (db, _dir) = test_db(1000);
    let err = db.select("test", 42).unwrap_err();
    let body = ErrorMessage::new(&err, "uri=/database/test/42");

    let json: serde_json::Value = serde_json::to_value(&body).unwrap();
    assert_eq!(json["statusCode"], 404);
    assert_eq!(json["message"], "Record with ID=42 not found in 'test'");
    assert_eq!(json["description"], "uri=/database/test/42");
    assert!(json["timestamp"].is_string());

    let back: ErrorMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, body);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_inserts_contiguous_ids() {
    let (db, _dir) = test_db(1000);
    let db = Arc::new(db);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let row = strings(&[&t.to_string(), &i.to_string()]);
                        (db.insert("test", &row).unwrap(), row)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut inserted: Vec<(RowId, Vec<String>)> =
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    inserted.sort_by_key(|(id, _)| *id);

    let ids: Vec<RowId> = inserted.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (5..205).collect::<Vec<_>>());
    for (id, row) in &inserted {
        assert_eq!(&db.select("test", *id).unwrap(), row);
    }
}

#[test]
fn test_concurrent_tables_independent() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(FileDatabase::open(Config::new(dir.path())).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                let table = format!("table-{}", t);
                for i in 0..30u64 {
                    assert_eq!(db.insert(&table, &strings(&[&i.to_string()])).unwrap(), i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(db.registry().table_names(), vec!["table-0", "table-1", "table-2", "table-3"]);
    for t in 0..4 {
        assert_eq!(db.select(&format!("table-{}", t), 29).unwrap(), strings(&["29"]));
    }
}
