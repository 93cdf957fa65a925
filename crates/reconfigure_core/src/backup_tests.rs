use super::*;
use chrono::TimeZone;
use tempfile::TempDir;

const TIMESTAMP: &str = "2024.03.07-142501";

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

#[test]
fn test_run_timestamp_format() {
    let started = Local.with_ymd_and_hms(2024, 3, 7, 14, 25, 1).unwrap();
    assert_eq!(run_timestamp(started), TIMESTAMP);
}

#[test]
fn test_snapshot_copies_current_content() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let original = write_file(&temp_dir, "settings.xml", "<before/>");
    let mut manager = BackupManager::new(DryRunPolicy::Apply, TIMESTAMP);

    let record = manager.snapshot(&original).unwrap();

    assert_eq!(
        record.snapshot_path,
        temp_dir.path().join("settings.xml.2024.03.07-142501")
    );
    assert!(record.written);
    assert_eq!(fs::read_to_string(&record.snapshot_path).unwrap(), "<before/>");
}

#[test]
fn test_second_snapshot_of_same_file_is_not_taken() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let original = write_file(&temp_dir, "jdbc.properties", "first");
    let mut manager = BackupManager::new(DryRunPolicy::Apply, TIMESTAMP);

    let first = manager.snapshot(&original).unwrap();
    fs::write(&original, "second").unwrap();
    let again = manager.snapshot(&original).unwrap();

    assert_eq!(first, again);
    assert_eq!(manager.records().len(), 1);
    assert_eq!(fs::read_to_string(&first.snapshot_path).unwrap(), "first");
}

#[test]
fn test_existing_snapshot_is_never_overwritten() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let original = write_file(&temp_dir, "context.xml", "new");
    write_file(&temp_dir, "context.xml.2024.03.07-142501", "older backup");
    let mut manager = BackupManager::new(DryRunPolicy::Apply, TIMESTAMP);

    let result = manager.snapshot(&original);

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AlreadyExists);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("context.xml.2024.03.07-142501")).unwrap(),
        "older backup"
    );
    assert!(manager.records().is_empty());
}

#[test]
fn test_dry_run_records_without_writing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let original = write_file(&temp_dir, "settings.xml", "<before/>");
    let mut manager = BackupManager::new(DryRunPolicy::DryRun, TIMESTAMP);

    let record = manager.snapshot(&original).unwrap();

    assert!(!record.written);
    assert!(!record.snapshot_path.exists());
    assert_eq!(manager.into_records(), vec![record]);
}

#[test]
fn test_missing_original_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut manager = BackupManager::new(DryRunPolicy::Apply, TIMESTAMP);

    let result = manager.snapshot(&temp_dir.path().join("absent.xml"));

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
}

#[test]
fn test_directory_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut manager = BackupManager::new(DryRunPolicy::Apply, TIMESTAMP);

    let result = manager.snapshot(temp_dir.path());

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
}
