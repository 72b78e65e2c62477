use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn sample_dump(id: &str) -> String {
    serde_json::json!({
        "distribution": {
            "id": id,
            "domain_name": "d111.cdn.example.net",
            "status": "Deployed",
            "default_root_object": "index.html",
            "origins": [
                { "id": "assets-origin", "domain": "assets.storage.example.net" }
            ],
            "default_behavior": {
                "viewer_protocol_policy": "redirect-to-https",
                "compression_enabled": true
            },
            "behaviors": []
        },
        "origin_details": {
            "assets-origin": { "kind": "object-storage" }
        },
        "security": {},
        "logging": { "enabled": true, "bucket": "logs.storage.example.net" }
    })
    .to_string()
}

fn run_edgescope(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-p", "edgescope-cli", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_diagnose_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let dump_path = temp_dir.path().join("dump.json");
    fs::write(&dump_path, sample_dump("E2CLITEST")).unwrap();

    let output = run_edgescope(&[
        "diagnose",
        "--distribution-id",
        "E2CLITEST",
        "--config-dump",
        dump_path.to_str().unwrap(),
        "--error-code",
        "403",
        "--format",
        "json",
    ]);

    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON report");
    let entries = report["entries"].as_array().expect("entries array");
    assert!(!entries.is_empty());
    assert_eq!(
        entries[0]["finding"]["rule_id"].as_str(),
        Some("access-control-missing")
    );
    assert_eq!(entries[0]["finding"]["severity"].as_str(), Some("critical"));
}

#[test]
fn test_diagnose_writes_report_file() {
    let temp_dir = TempDir::new().unwrap();
    let dump_path = temp_dir.path().join("dump.json");
    let report_path = temp_dir.path().join("report.md");
    fs::write(&dump_path, sample_dump("E2CLITEST")).unwrap();

    let output = run_edgescope(&[
        "diagnose",
        "--distribution-id",
        "E2CLITEST",
        "--config-dump",
        dump_path.to_str().unwrap(),
        "--format",
        "markdown",
        "--output",
        report_path.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(report_path.exists(), "report file was not created");

    let content = fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("# Distribution Diagnostic Report"));
    assert!(content.contains("Prioritized Issues"));
}

#[test]
fn test_unknown_distribution_id_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dump_path = temp_dir.path().join("dump.json");
    fs::write(&dump_path, sample_dump("E2CLITEST")).unwrap();

    let output = run_edgescope(&[
        "diagnose",
        "--distribution-id",
        "E2DOESNOTEXIST",
        "--config-dump",
        dump_path.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "unresolvable id should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("does not resolve"),
        "unexpected error output: {stderr}"
    );
}

#[test]
fn test_rules_listing() {
    let output = run_edgescope(&["rules"]);

    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("access-control-missing"));
    assert!(stdout.contains("origin-read-timeout-low"));
    assert!(stdout.contains("16 rules registered"));
}
