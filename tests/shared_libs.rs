//! Shared-library index built from real directory trees.

mod support;

use shipyard::{SharedLibraryError, SharedLibraryIndex};
use support::{paths, Workspace};

#[test]
fn test_duplicate_name_across_roots_fails_naming_both() {
    let ws = Workspace::new();
    ws.remote_file("hdfs://nn/shared/one/x.jar", "1");
    ws.remote_file("hdfs://nn/shared/two/nested/x.jar", "2");

    let err = SharedLibraryIndex::build(
        &ws.storage,
        &paths(&["hdfs://nn/shared/one", "hdfs://nn/shared/two"]),
    )
    .unwrap_err();

    assert!(matches!(err, SharedLibraryError::DuplicateNames(_)));
    let message = err.to_string();
    assert!(message.contains("hdfs://nn/shared/one/x.jar"), "{}", message);
    assert!(message.contains("hdfs://nn/shared/two/nested/x.jar"), "{}", message);
    assert!(message.contains("Please deduplicate"));
}

#[test]
fn test_missing_and_file_roots_are_skipped() {
    let ws = Workspace::new();
    ws.remote_file("hdfs://nn/shared/libs/a.jar", "a");
    ws.remote_file("hdfs://nn/shared/not-a-dir.jar", "f");

    let index = SharedLibraryIndex::build(
        &ws.storage,
        &paths(&[
            "hdfs://nn/shared/missing",
            "hdfs://nn/shared/not-a-dir.jar",
            "hdfs://nn/shared/libs",
        ]),
    )
    .unwrap();

    let names: Vec<&str> = index.iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.jar"]);
}

#[test]
fn test_nested_files_indexed_by_name() {
    let ws = Workspace::new();
    ws.remote_file("hdfs://nn/shared/libs/b.jar", "bb");
    ws.remote_file("hdfs://nn/shared/libs/deep/er/a.jar", "a");
    ws.remote_file("hdfs://nn/plugins/p/metrics.jar", "m");

    let index = SharedLibraryIndex::build(
        &ws.storage,
        &paths(&["hdfs://nn/shared/libs", "hdfs://nn/plugins"]),
    )
    .unwrap();

    assert_eq!(index.len(), 3);
    let a = index.get("a.jar").unwrap();
    assert_eq!(a.status.path.to_string(), "hdfs://nn/shared/libs/deep/er/a.jar");
    assert_eq!(index.get("b.jar").unwrap().status.size, 2);
    let names: Vec<&str> = index.iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, vec!["b.jar", "a.jar", "metrics.jar"]);
}
