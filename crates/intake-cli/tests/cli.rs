use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn intake() -> Command {
    Command::cargo_bin("intake").unwrap()
}

/// Write a config whose folders all live under `dir`.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = serde_json::json!({
        "paths": {
            "pdf_dir": dir.join("pdf"),
            "history_dir": dir.join("history"),
            "output_dir": dir.join("output"),
            "config_dir": dir.join("config"),
            "rules_file": dir.join("config/fields.yaml"),
            "document_type": "invoice"
        }
    });
    let path = dir.join("intake.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn write_schema(dir: &Path) {
    fs::create_dir_all(dir.join("config")).unwrap();
    fs::write(
        dir.join("config/invoice_validation.json"),
        r#"{
            "required_fields": ["請求書番号", "請求日"],
            "field_types": {"請求金額": "number"}
        }"#,
    )
    .unwrap();
}

fn write_store(path: &Path, number: &str) {
    let store = serde_json::json!({
        "document_type": "invoice",
        "processed_at": "2024-03-01 10:00",
        "total_documents": 2,
        "documents": [
            {
                "請求書番号": number,
                "発行者名": "株式会社サンプル",
                "請求日": "2024/02/29",
                "請求金額": "¥50,000",
                "_metadata": {"ファイル名": "a.pdf", "ファイルパス": "pdf/a.pdf"}
            },
            {
                "請求書番号": "INV-900",
                "発行者名": "別会社",
                "請求日": "",
                "請求金額": "abc",
                "_metadata": {"ファイル名": "b.pdf", "ファイルパス": "pdf/b.pdf"}
            }
        ]
    });
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&store).unwrap()).unwrap();
}

#[test]
fn test_help_lists_commands() {
    intake()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("languages"));
}

#[test]
fn test_config_init_then_get() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/intake.json");

    intake()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    intake()
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "pdf.render_dpi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("300"));

    // A second init refuses to overwrite
    intake()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_set_updates_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    intake()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "pdf.min_text_chars", "80"])
        .assert()
        .success();

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["pdf"]["min_text_chars"], 80);

    intake()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "pdf.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_get_unknown_key() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    intake()
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "ocr.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_show_reports_effective_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    intake()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"document_type\": \"invoice\""))
        .stdout(predicate::str::contains("請求書番号"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();

    intake()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_check_validates_store_and_writes_report() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    write_schema(dir.path());

    let store = dir.path().join("output/invoice_data.json");
    write_store(&store, "INV-001");

    // History holds an earlier batch with the same invoice number
    write_store(&dir.path().join("history/2024-02/invoice_data.json"), "INV-001");

    intake()
        .arg("--config")
        .arg(&config)
        .args(["check", "--save"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Checked 2 records"))
        .stdout(predicate::str::contains("1 good, 1 needs review"));

    let report_path = dir.path().join("output/duplicate.errors.json");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["total_documents"], 2);
    assert!(report["error_count"].as_u64().unwrap() >= 1);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(saved["documents"][0]["_metadata"]["処理ステータス"], "良好");
    assert_eq!(saved["documents"][1]["_metadata"]["処理ステータス"], "要確認");
}

#[test]
fn test_check_missing_store_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    intake()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record store not found"));
}

#[test]
fn test_run_without_rules_fails_before_processing() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    fs::create_dir_all(dir.path().join("pdf")).unwrap();

    intake()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load field rules"));

    assert!(!dir.path().join("output").exists());
}

#[cfg(unix)]
const RULES: &str = r#"
invoice:
  fields:
    - name: 請求書番号
      pattern: '請求書番号[:：]\s*(\S+)'
    - name: 発行者名
      pattern: '発行者[:：]\s*(.+)$'
    - name: 請求日
      pattern: '請求日[:：]\s*(\S+)'
    - name: 請求金額
      pattern: '合計[:：]\s*(\S+)'
"#;

/// One blank page, so every run goes through recognition.
#[cfg(unix)]
fn write_blank_pdf(path: &Path) {
    use lopdf::{Document, Object, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    doc.save(path).unwrap();
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Fake `tesseract` and `pdftoppm` in `dir/bin`, returning a PATH that finds them first.
#[cfg(unix)]
fn fake_backend(dir: &Path, pdftoppm: &str) -> String {
    let bin = dir.join("bin");
    write_script(
        &bin,
        "tesseract",
        r#"if [ "$1" = "--list-langs" ]; then
  printf 'List of available languages (2):\neng\njpn\n'
  exit 0
fi
printf '請求書番号: INV-001\n発行者: 株式会社サンプル\n請求日: 2024/02/29\n合計: ¥50,000\n'
"#,
    );
    write_script(&bin, "pdftoppm", pdftoppm);
    format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    )
}

/// Config, rules and schema for a run over `dir/pdf`.
#[cfg(unix)]
fn write_run_setup(dir: &Path, timeout_secs: u64) -> std::path::PathBuf {
    let config = write_config(dir);
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config).unwrap()).unwrap();
    value["pdf"] = serde_json::json!({"document_timeout_secs": timeout_secs});
    fs::write(&config, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    write_schema(dir);
    fs::write(dir.join("config/fields.yaml"), RULES).unwrap();
    write_blank_pdf(&dir.join("pdf/scan.pdf"));
    config
}

#[cfg(unix)]
#[test]
fn test_run_recognizes_blank_page_and_writes_store() {
    let dir = TempDir::new().unwrap();
    let config = write_run_setup(dir.path(), 60);
    let path = fake_backend(dir.path(), "for last; do :; done\ntouch \"$last-1.png\"\n");

    intake()
        .env("PATH", path)
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 documents"))
        .stdout(predicate::str::contains("1 good"));

    let store: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("output/invoice_data.json")).unwrap(),
    )
    .unwrap();
    let record = &store["documents"][0];
    assert_eq!(record["請求書番号"], "INV-001");
    assert_eq!(record["発行者名"], "株式会社サンプル");
    assert_eq!(record["_metadata"]["処理ステータス"], "良好");
    assert_eq!(record["_metadata"]["ページ取得方法"][0], "recognized");
    assert!(dir.path().join("output/duplicate.errors.json").exists());
}

#[cfg(unix)]
#[test]
fn test_run_kills_hung_rasterizer_at_timeout() {
    let dir = TempDir::new().unwrap();
    let config = write_run_setup(dir.path(), 2);
    let path = fake_backend(dir.path(), "exec sleep 30\n");

    let start = std::time::Instant::now();
    intake()
        .env("PATH", path)
        .arg("--config")
        .arg(&config)
        .arg("run")
        .timeout(std::time::Duration::from_secs(25))
        .assert()
        .success()
        .stdout(predicate::str::contains("unprocessed: 1"))
        .stdout(predicate::str::contains("timed out after 2s"));
    assert!(start.elapsed() < std::time::Duration::from_secs(15));

    let store: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("output/invoice_data.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(store["total_documents"], 0);
}
