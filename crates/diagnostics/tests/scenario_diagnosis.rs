//! End-to-end diagnosis scenarios through the full pipeline: config
//! source, normalizer, rule engine, correlator, ranker, planner, report.

use anyhow::Result;
use edgescope_diagnostics::snapshot::raw::{
    RawBucketPolicy, RawCacheBehavior, RawDistribution, RawLoggingDetail, RawOriginDetail,
    RawOriginRef, RawSecurityDetail,
};
use edgescope_diagnostics::{
    DiagnosticEngine, MemoryConfigSource, Severity, SymptomParams, Tier,
};

fn benign_behavior(pattern: Option<&str>) -> RawCacheBehavior {
    RawCacheBehavior {
        path_pattern: pattern.map(str::to_string),
        viewer_protocol_policy: Some("redirect-to-https".to_string()),
        compression_enabled: Some(true),
        ..Default::default()
    }
}

fn distribution(id: &str, origins: Vec<RawOriginRef>) -> RawDistribution {
    RawDistribution {
        id: id.to_string(),
        domain_name: "d111.cdn.example.net".to_string(),
        status: Some("Deployed".to_string()),
        last_modified: None,
        default_root_object: Some("index.html".to_string()),
        origins,
        default_behavior: Some(benign_behavior(None)),
        behaviors: Vec::new(),
    }
}

fn logging_enabled() -> RawLoggingDetail {
    RawLoggingDetail {
        enabled: true,
        bucket: Some("logs.storage.example.net".to_string()),
    }
}

#[tokio::test]
async fn object_storage_origin_without_access_control_and_403() -> Result<()> {
    let id = "E2SCENARIOA";
    let source = MemoryConfigSource::new()
        .with_distribution(distribution(
            id,
            vec![RawOriginRef {
                id: "assets-origin".to_string(),
                domain: "assets.storage.example.net".to_string(),
            }],
        ))
        .with_origin_detail(
            "assets-origin",
            RawOriginDetail {
                kind: Some("object-storage".to_string()),
                ..Default::default()
            },
        )
        .with_security_detail(id, RawSecurityDetail::default())
        .with_logging_detail(id, logging_enabled());

    let params = SymptomParams::new(id).with_error_code("403");
    let report = DiagnosticEngine::new().run(&source, &params).await?;

    let top = &report.entries[0];
    assert_eq!(top.finding.rule_id, "access-control-missing");
    assert_eq!(top.finding.severity, Severity::Critical);
    assert!(top.finding.confirmed);

    // The quick fix creates an access control and updates the bucket policy.
    let quick_fix = &top.actions[0];
    assert_eq!(quick_fix.tier, Tier::QuickFix);
    let commands = quick_fix.imperative_commands.join("\n");
    assert!(
        commands.contains("create-access-control"),
        "quick fix should create an access control: {commands}"
    );
    assert!(
        commands.contains("put-bucket-policy"),
        "quick fix should update the bucket policy: {commands}"
    );

    Ok(())
}

#[tokio::test]
async fn custom_origin_timeout_and_504() -> Result<()> {
    let id = "E2SCENARIOB";
    let source = MemoryConfigSource::new()
        .with_distribution(distribution(
            id,
            vec![RawOriginRef {
                id: "api-origin".to_string(),
                domain: "api.example.net".to_string(),
            }],
        ))
        .with_origin_detail(
            "api-origin",
            RawOriginDetail {
                kind: Some("custom".to_string()),
                read_timeout_secs: Some(30),
                ..Default::default()
            },
        )
        .with_security_detail(id, RawSecurityDetail::default())
        .with_logging_detail(id, logging_enabled());

    let params = SymptomParams::new(id).with_error_code("504");
    let report = DiagnosticEngine::new().run(&source, &params).await?;

    let top = &report.entries[0];
    assert_eq!(top.finding.rule_id, "origin-read-timeout-low");
    assert_eq!(top.finding.severity, Severity::High);

    let quick_fix = &top.actions[0];
    assert_eq!(quick_fix.tier, Tier::QuickFix);
    assert!(quick_fix
        .imperative_commands
        .iter()
        .any(|c| c.contains("--read-timeout 60")));

    // The deeper tier points at origin health metrics.
    let deeper = top
        .actions
        .iter()
        .find(|a| a.tier == Tier::Standard)
        .expect("standard-tier investigation");
    assert!(deeper.explanation.contains("origin health metrics"));

    Ok(())
}

#[tokio::test]
async fn uncovered_request_path_without_error_code() -> Result<()> {
    let id = "E2SCENARIOC";
    let mut dist = distribution(
        id,
        vec![RawOriginRef {
            id: "assets-origin".to_string(),
            domain: "assets.storage.example.net".to_string(),
        }],
    );
    dist.behaviors = vec![
        benign_behavior(Some("/")),
        benign_behavior(Some("/images/*")),
    ];

    let source = MemoryConfigSource::new()
        .with_distribution(dist)
        .with_origin_detail(
            "assets-origin",
            RawOriginDetail {
                kind: Some("object-storage".to_string()),
                access_control_ref: Some("oac-123".to_string()),
                ..Default::default()
            },
        )
        .with_security_detail(
            id,
            RawSecurityDetail {
                bucket_policy: Some(RawBucketPolicy {
                    public_read: false,
                    trusted_access_control: Some("oac-123".to_string()),
                }),
                ..Default::default()
            },
        )
        .with_logging_detail(id, logging_enabled());

    let params = SymptomParams::new(id).with_request_path("/docs/readme.html");
    let report = DiagnosticEngine::new().run(&source, &params).await?;

    let entry = report
        .entries
        .iter()
        .find(|e| e.finding.rule_id == "behavior-path-uncovered")
        .expect("uncovered-path finding");
    assert_eq!(entry.finding.severity, Severity::Medium);
    assert!(entry
        .finding
        .evidence
        .iter()
        .any(|e| e.matched_symptom && e.observed.contains("/docs/readme.html")));

    // Remediation offers both relying on the default and adding a behavior.
    let all_text: String = entry
        .actions
        .iter()
        .map(|a| a.explanation.clone())
        .collect::<Vec<_>>()
        .join(" ");
    assert!(all_text.contains("default behavior"));
    assert!(entry
        .actions
        .iter()
        .flat_map(|a| &a.imperative_commands)
        .any(|c| c.contains("create-cache-behavior")));

    // A covered path produces no such finding.
    let covered = SymptomParams::new(id).with_request_path("/images/logo.png");
    let report = DiagnosticEngine::new().run(&source, &covered).await?;
    assert!(report
        .entries
        .iter()
        .all(|e| e.finding.rule_id != "behavior-path-uncovered"));

    Ok(())
}

#[tokio::test]
async fn active_validation_unreachable_origin_is_reported() -> Result<()> {
    let id = "E2PROBED";
    let source = MemoryConfigSource::new()
        .with_distribution(distribution(
            id,
            vec![RawOriginRef {
                id: "api-origin".to_string(),
                domain: "api.example.net".to_string(),
            }],
        ))
        .with_origin_detail(
            "api-origin",
            RawOriginDetail {
                kind: Some("custom".to_string()),
                read_timeout_secs: Some(60),
                ..Default::default()
            },
        )
        .with_security_detail(id, RawSecurityDetail::default())
        .with_logging_detail(id, logging_enabled())
        .with_probe_outcome(
            "api.example.net",
            edgescope_diagnostics::snapshot::ProbeOutcome::Unreachable {
                detail: "connection refused".to_string(),
            },
        );

    let params = SymptomParams::new(id)
        .with_error_code("502")
        .with_active_validation(true);
    let report = DiagnosticEngine::new().run(&source, &params).await?;

    let top = &report.entries[0];
    assert_eq!(top.finding.rule_id, "origin-unreachable");
    assert_eq!(top.finding.severity, Severity::High);
    assert!(top.finding.confirmed);

    Ok(())
}
