//! The remediation table, keyed by rule id.
//!
//! Pure lookup: identical findings always produce identical action
//! lists, and actions are ordered by tier ascending.

use super::{RemediationAction, Tier};
use crate::core::finding::Finding;
use crate::core::report::ReportEntry;

pub struct RemediationPlanner;

impl RemediationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Map each finding to its tiered actions, preserving finding order.
    pub fn plan(&self, findings: &[Finding], distribution_id: &str) -> Vec<ReportEntry> {
        findings
            .iter()
            .map(|finding| {
                let mut actions = actions_for(finding, distribution_id);
                actions.sort_by_key(|a| a.tier);
                ReportEntry {
                    finding: finding.clone(),
                    actions,
                }
            })
            .collect()
    }
}

impl Default for RemediationPlanner {
    fn default() -> Self {
        Self::new()
    }
}

fn actions_for(finding: &Finding, dist: &str) -> Vec<RemediationAction> {
    match finding.rule_id.as_str() {
        "access-control-missing" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~10 minutes",
                "Create an access control, attach it to the origin, and grant it read \
                 access in the bucket policy so the distribution can sign its origin \
                 requests.",
            )
            .declarative("Open the distribution's origin settings and choose 'Create access control'")
            .declarative("Select 'Always sign origin requests' and attach the new access control to the origin")
            .declarative("Apply the generated trust statement to the origin bucket policy when prompted")
            .imperative(format!(
                "cloudctl cdn create-access-control --name {dist}-oac --signing-behavior always"
            ))
            .imperative(format!(
                "cloudctl cdn update-origin --distribution-id {dist} --origin-id <origin> --access-control-id <new-oac-id>"
            ))
            .imperative(
                "cloudctl storage put-bucket-policy --bucket <origin-bucket> --policy file://oac-trust.json",
            )
            .verify(format!(
                "cloudctl cdn get-distribution --id {dist}  # wait for status: deployed"
            ))
            .verify("Request an object through the distribution domain and confirm a 200")
            .warn(
                "Applying the trust policy replaces the bucket policy document; merge any \
                 existing statements first or they are lost.",
            )
            .warn(
                "Clients fetching objects directly from the bucket lose access once the \
                 policy restricts reads to the access control.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~30 minutes",
                "Audit the existing bucket policy before replacing it. Buckets shared by \
                 several consumers often carry statements the generated trust policy \
                 would silently drop.",
            )
            .declarative("Export the current bucket policy and diff it against the generated trust statement")
            .declarative("Merge the access-control trust statement into the existing document instead of replacing it")
            .imperative("cloudctl storage get-bucket-policy --bucket <origin-bucket> > current-policy.json")
            .verify("Re-run the diagnosis and confirm the finding clears without new access-denied reports from other consumers"),
            RemediationAction::new(
                Tier::Advanced,
                "~2 hours",
                "Move the origin wiring into your infrastructure-as-code so the access \
                 control and trust policy cannot drift from the distribution again.",
            )
            .declarative("Model the distribution, access control, and bucket policy in your IaC stack")
            .declarative("Import the live resources and reconcile the diff")
            .verify("A clean plan/apply cycle reproduces the working configuration from scratch"),
        ],

        "access-control-unattached" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Grant the existing access control read access in the bucket policy. The \
                 distribution half of the handshake is already in place.",
            )
            .declarative("Open the bucket's permissions tab and add the access-control trust statement")
            .imperative(
                "cloudctl storage put-bucket-policy --bucket <origin-bucket> --policy file://oac-trust.json",
            )
            .verify("Request an object through the distribution and confirm the 403 is gone")
            .warn(
                "Bucket policy changes apply immediately to every consumer of the bucket; \
                 verify no other reader depends on the statements you replace.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~20 minutes",
                "Confirm the access control actually signs requests. An association with \
                 signing disabled behaves exactly like a missing one.",
            )
            .declarative("Check the access control's signing behavior is 'always', not 'never' or 'no-override'")
            .imperative(format!(
                "cloudctl cdn get-access-control --id <oac-id>  # signing_behavior should be 'always'"
            ))
            .verify(format!(
                "cloudctl cdn get-distribution --id {dist}  # origin should reference the access control"
            )),
        ],

        "geo-restriction-active" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Check whether the requester's region is excluded by the active \
                 restriction, and adjust the list if the exclusion is unintended.",
            )
            .declarative("Compare the viewer's country against the restriction list in the distribution settings")
            .imperative(format!(
                "cloudctl cdn get-distribution-config --id {dist} --query geo_restriction"
            ))
            .imperative(format!(
                "cloudctl cdn update-distribution --id {dist} --geo-restriction <mode>:<country-list>"
            ))
            .verify("Re-test from the affected region (or a VPN exit there) and confirm a 200")
            .warn(
                "Widening the restriction list opens the content to regions it previously \
                 blocked; confirm licensing or compliance constraints first.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~30 minutes",
                "Reproduce the block deterministically before changing anything, so a \
                 regional network issue is not misdiagnosed as geo restriction.",
            )
            .declarative("Issue the failing request from inside and outside the suspect region and compare responses")
            .verify("The 403 appears only from excluded regions"),
        ],

        "waf-association" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~10 minutes",
                "Find the blocking rule in the WAF request log. A sampled block entry \
                 names the exact rule and match condition.",
            )
            .declarative("Open the WAF's sampled-requests view filtered to BLOCK actions")
            .imperative("cloudctl waf get-sampled-requests --scope cdn --rule-metric ALL --max-items 100")
            .verify("The blocked request entries match the failing path and method"),
            RemediationAction::new(
                Tier::Standard,
                "~20 minutes",
                "Add a scoped allow rule for the legitimate traffic the WAF is catching.",
            )
            .declarative("Create an allow rule matching the request path, placed above the blocking rule")
            .imperative("cloudctl waf update-rule-group --id <group> --insert-allow-rule path=<path>")
            .verify("The previously failing request returns 200 while the blocking rule still fires for hostile patterns")
            .warn(
                "Allow rules loosen the firewall for everything they match; scope them to \
                 the narrowest path and method that restores service.",
            ),
            RemediationAction::new(
                Tier::Advanced,
                "~1 hour",
                "Run the suspect rule in count mode and watch real traffic before \
                 changing enforcement.",
            )
            .declarative("Switch the rule action from BLOCK to COUNT and monitor matches for a representative window")
            .verify("Count-mode metrics show only the legitimate traffic matching the rule")
            .warn("While the rule counts instead of blocks, the traffic it guarded against is not being stopped."),
        ],

        "default-root-object-missing" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Set the default root object so bare-domain requests resolve to a real \
                 object key.",
            )
            .declarative("Set 'Default root object' to index.html (or your landing object) in the distribution settings")
            .imperative(format!(
                "cloudctl cdn update-distribution --id {dist} --default-root-object index.html"
            ))
            .verify("Request the bare distribution domain and confirm the landing page instead of a 404")
            .warn("Distribution updates take several minutes to propagate to all edge locations."),
            RemediationAction::new(
                Tier::Standard,
                "~15 minutes",
                "Confirm the object the root should serve actually exists at the bucket \
                 root, not under a prefix.",
            )
            .declarative("List the bucket root and confirm the landing object's exact key")
            .imperative("cloudctl storage list-objects --bucket <origin-bucket> --prefix '' --max-items 20")
            .verify("The configured default root object name matches an existing key exactly"),
        ],

        "behavior-path-uncovered" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Confirm the default behavior's origin actually holds the requested \
                 content; falling through to the default is fine when it routes \
                 correctly.",
            )
            .declarative("Check which origin the default behavior targets and whether the object exists there")
            .imperative("cloudctl storage head-object --bucket <default-origin-bucket> --key <request-path>")
            .verify("The object exists at the key the default behavior produces"),
            RemediationAction::new(
                Tier::Standard,
                "~15 minutes",
                "Add a cache behavior whose pattern covers the path, routed to the origin \
                 that holds the content.",
            )
            .declarative("Create a behavior with a pattern covering the path (e.g. /docs/*) ordered before broader patterns")
            .imperative(format!(
                "cloudctl cdn create-cache-behavior --distribution-id {dist} --path-pattern '/docs/*' --origin-id <origin>"
            ))
            .verify("Request the path again and confirm it is served from the intended origin")
            .warn(
                "Behavior patterns are evaluated in order; inserting a new behavior above \
                 an existing one changes routing for every path both patterns match.",
            ),
        ],

        "origin-path-prefix" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Verify the object layout matches the prefix the origin path prepends.",
            )
            .declarative("List the bucket under the configured prefix and compare against the failing request key")
            .imperative("cloudctl storage list-objects --bucket <origin-bucket> --prefix <origin-path> --max-items 20")
            .verify("The failing request's effective key (origin path + request path) names an existing object"),
            RemediationAction::new(
                Tier::Standard,
                "~10 minutes",
                "Remove or correct the origin path if the content lives at the bucket \
                 root.",
            )
            .declarative("Clear the origin path field, or set it to the prefix the objects actually live under")
            .imperative(format!(
                "cloudctl cdn update-origin --distribution-id {dist} --origin-id <origin> --origin-path ''"
            ))
            .verify("Previously failing keys resolve after propagation")
            .warn("Changing the origin path shifts every key the distribution requests, not just the failing ones."),
        ],

        "origin-read-timeout-low" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Raise the origin read timeout above the backend's slowest legitimate \
                 response; 60s covers most report-style endpoints.",
            )
            .declarative("Raise 'Origin read timeout' to 60 seconds in the origin settings")
            .imperative(format!(
                "cloudctl cdn update-origin --distribution-id {dist} --origin-id <origin> --read-timeout 60"
            ))
            .verify("Re-issue the request that returned 504 and confirm it completes")
            .warn(
                "A longer timeout holds edge connections open during genuine origin \
                 outages, which can amplify load while the backend is already struggling.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~30 minutes",
                "Investigate why the origin is slow before papering over it: check the \
                 origin health metrics for latency percentiles, saturation, and error \
                 rates over the affected window.",
            )
            .declarative("Review p95/p99 response-time metrics and connection counts on the origin for the incident window")
            .declarative("Correlate 504 spikes with deploys, cron load, or connection-pool exhaustion on the backend")
            .imperative("cloudctl monitor get-metrics --resource <origin> --metric latency-p99 --window 24h")
            .verify("Origin p99 latency sits comfortably below the configured read timeout"),
            RemediationAction::new(
                Tier::Advanced,
                "~2 hours",
                "Shield the origin: cache slow responses where semantics allow, or move \
                 long-running work behind an async job endpoint.",
            )
            .declarative("Add caching headers to slow-but-cacheable responses so the edge absorbs repeats")
            .declarative("Convert endpoints that legitimately exceed the timeout to a submit/poll pattern")
            .verify("Timeout-class errors stay absent under production load"),
        ],

        "origin-protocol-mismatch" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Switch the origin protocol policy to http-only; website endpoints do \
                 not terminate TLS.",
            )
            .declarative("Set the origin protocol policy to 'HTTP only' in the origin settings")
            .imperative(format!(
                "cloudctl cdn update-origin --distribution-id {dist} --origin-id <origin> --protocol-policy http-only"
            ))
            .verify("A cache-miss request through the distribution returns content instead of a 502")
            .warn(
                "The edge-to-origin hop is then unencrypted; viewer connections can stay \
                 HTTPS, but do not send sensitive payloads to a plaintext origin.",
            ),
            RemediationAction::new(
                Tier::Advanced,
                "~1 hour",
                "Move off the website endpoint to the bucket's TLS endpoint with an \
                 access control, restoring encryption end to end.",
            )
            .declarative("Point the origin at the bucket's standard endpoint instead of the website endpoint")
            .declarative("Attach an access control and update the bucket policy, since the standard endpoint supports signed requests")
            .imperative(format!(
                "cloudctl cdn update-origin --distribution-id {dist} --origin-id <origin> --domain <bucket>.storage.example.net --protocol-policy https-only"
            ))
            .verify("Cache misses succeed over HTTPS and direct website-endpoint URLs stop serving traffic")
            .warn(
                "The standard endpoint does not serve website features (index documents, \
                 redirects); replace them with distribution-side configuration first.",
            ),
        ],

        "origin-unreachable" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~10 minutes",
                "Check the origin from the outside: process up, port open, DNS \
                 resolving, firewall admitting the edge ranges.",
            )
            .declarative("Resolve the origin domain and connect to the expected port from a public network")
            .imperative("dig +short <origin-domain>")
            .imperative("curl -sv --max-time 10 https://<origin-domain>/ -o /dev/null")
            .verify("The origin answers a direct request within its timeout"),
            RemediationAction::new(
                Tier::Standard,
                "~45 minutes",
                "Stand up an origin failover group so a single unhealthy origin degrades \
                 to a secondary instead of erroring.",
            )
            .declarative("Create an origin group with the current origin as primary and a standby as secondary")
            .imperative(format!(
                "cloudctl cdn create-origin-group --distribution-id {dist} --members <primary>,<secondary> --failover-codes 502,503,504"
            ))
            .verify("Taking the primary offline serves traffic from the secondary")
            .warn("Failover retries add latency on every primary failure; size the failover codes list deliberately."),
        ],

        "distribution-not-deployed" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~15 minutes",
                "Wait for propagation to finish (or re-enable the distribution), then \
                 re-test; edge locations serve the previous configuration until \
                 deployment completes.",
            )
            .declarative("Watch the distribution status until it returns to 'deployed'")
            .imperative(format!("cloudctl cdn get-distribution --id {dist} --query status"))
            .imperative(format!(
                "cloudctl cdn update-distribution --id {dist} --enabled  # only if the distribution was disabled"
            ))
            .verify("Status reads 'deployed' and the failing request behaves consistently across repeated attempts")
            .warn("Re-enabling a deliberately disabled distribution resumes serving whatever its configuration allows."),
        ],

        "origin-publicly-exposed" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Block public access on the origin bucket so the distribution becomes \
                 the only read path.",
            )
            .declarative("Enable the bucket's public-access block and remove public-read statements from the policy")
            .imperative("cloudctl storage put-public-access-block --bucket <origin-bucket> --block-all")
            .verify("A direct object URL returns 403 while the same object through the distribution returns 200")
            .warn(
                "Anything currently fetching objects directly from the bucket breaks the \
                 moment public access is blocked; inventory direct consumers first.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~30 minutes",
                "Audit the bucket access logs for direct-access traffic before cutting \
                 over, so legitimate consumers can be migrated deliberately.",
            )
            .declarative("Enable or review bucket access logging and list principals reading objects directly")
            .imperative("cloudctl storage get-bucket-logging --bucket <origin-bucket>")
            .verify("No unexplained direct readers remain before the public policy is removed"),
        ],

        "viewer-protocol-plaintext" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Switch the behavior's viewer protocol policy to redirect-to-https; \
                 plaintext requests get a 301 instead of plaintext content.",
            )
            .declarative("Set the viewer protocol policy to 'Redirect HTTP to HTTPS' on the flagged behaviors")
            .imperative(format!(
                "cloudctl cdn update-cache-behavior --distribution-id {dist} --path-pattern <pattern> --viewer-protocol-policy redirect-to-https"
            ))
            .verify("An http:// request returns 301 to the https:// equivalent")
            .warn(
                "Clients that cannot follow redirects or speak TLS lose access; embedded \
                 devices calling plain HTTP endpoints are the usual casualty.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~20 minutes",
                "Tighten to https-only once redirect traffic trends to zero.",
            )
            .declarative("Monitor the share of redirected requests, then set the policy to 'HTTPS only'")
            .verify("Plain-HTTP request volume is negligible before and zero after the change")
            .warn("https-only rejects plaintext requests outright instead of redirecting them."),
        ],

        "tls-policy-outdated" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Raise the minimum viewer TLS version to 1.2.",
            )
            .declarative("Select the TLS 1.2 security policy in the distribution's viewer settings")
            .imperative(format!(
                "cloudctl cdn update-distribution --id {dist} --minimum-tls TLSv1.2"
            ))
            .verify("A TLS 1.2 handshake succeeds and a forced TLS 1.0 handshake is refused")
            .warn(
                "Clients limited to TLS 1.0/1.1 (very old browsers and OS stacks) can no \
                 longer connect; check viewer analytics for legacy share first.",
            ),
        ],

        "compression-disabled" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~5 minutes",
                "Enable compression on the flagged behaviors; text-like content \
                 typically shrinks 60-80%.",
            )
            .declarative("Toggle 'Compress objects automatically' on the flagged behaviors")
            .imperative(format!(
                "cloudctl cdn update-cache-behavior --distribution-id {dist} --path-pattern <pattern> --compress"
            ))
            .verify("Responses carry Content-Encoding: gzip or br for clients that accept it"),
        ],

        "forwarding-defeats-caching" => vec![
            RemediationAction::new(
                Tier::QuickFix,
                "~10 minutes",
                "Forward only the headers and cookies the origin actually varies on; \
                 every forwarded value multiplies the cache key space.",
            )
            .declarative("Replace 'all' forwarding with an explicit list of the headers/cookies the origin reads")
            .imperative(format!(
                "cloudctl cdn update-cache-behavior --distribution-id {dist} --path-pattern <pattern> --forward-headers Host,Accept-Language"
            ))
            .verify("Cache hit ratio climbs in the distribution metrics after propagation")
            .warn(
                "Headers no longer forwarded are invisible to the origin; confirm nothing \
                 server-side depends on them before narrowing the list.",
            ),
            RemediationAction::new(
                Tier::Standard,
                "~45 minutes",
                "Split behaviors by content class so static assets cache aggressively \
                 while dynamic routes keep the forwarding they need.",
            )
            .declarative("Add behaviors for static path patterns with minimal forwarding and long TTLs")
            .declarative("Keep permissive forwarding only on the dynamic path patterns that need it")
            .verify("Static asset requests show near-total cache hits; dynamic routes behave unchanged"),
        ],

        // Catalog extensions land here before they get a dedicated entry.
        _ => vec![RemediationAction::new(
            Tier::Standard,
            "~30 minutes",
            "No canned remediation for this finding; start from the evidence trail and \
             the configuration summary.",
        )
        .declarative("Review the finding's evidence against the distribution configuration")
        .imperative(format!("cloudctl cdn get-distribution-config --id {dist}"))
        .verify("Re-run the diagnosis and confirm the finding clears")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::finding::Facet;
    use crate::core::severity::{Likelihood, Severity};
    use crate::core::Rule;
    use crate::symptom::SymptomCategory;

    fn finding(rule_id: &str) -> Finding {
        Finding::new(
            rule_id,
            Facet::Distribution,
            SymptomCategory::General,
            Severity::Medium,
            Likelihood::Medium,
            "test",
            "test",
        )
    }

    #[test]
    fn actions_are_tier_ordered() {
        let planner = RemediationPlanner::new();
        let entries = planner.plan(&[finding("access-control-missing")], "E2EXAMPLE");
        let tiers: Vec<_> = entries[0].actions.iter().map(|a| a.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert_eq!(entries[0].actions[0].tier, Tier::QuickFix);
    }

    #[test]
    fn every_catalog_rule_has_actions_with_verification() {
        let planner = RemediationPlanner::new();
        for rule in crate::rules::default_catalog().all() {
            let entries = planner.plan(&[finding(rule.id())], "E2EXAMPLE");
            let actions = &entries[0].actions;
            assert!(!actions.is_empty(), "no actions for {}", rule.id());
            for action in actions {
                assert!(
                    !action.verification_steps.is_empty(),
                    "action without verification for {}",
                    rule.id()
                );
                assert!(
                    !action.imperative_commands.is_empty()
                        || !action.declarative_steps.is_empty(),
                    "action without execution path for {}",
                    rule.id()
                );
            }
        }
    }

    #[test]
    fn policy_touching_quick_fixes_carry_side_effect_warnings() {
        let planner = RemediationPlanner::new();
        for rule_id in [
            "access-control-missing",
            "origin-publicly-exposed",
            "viewer-protocol-plaintext",
            "tls-policy-outdated",
        ] {
            let entries = planner.plan(&[finding(rule_id)], "E2EXAMPLE");
            let quick_fix = &entries[0].actions[0];
            assert!(
                !quick_fix.side_effect_warnings.is_empty(),
                "missing side-effect warning for {rule_id}"
            );
        }
    }

    #[test]
    fn planning_is_idempotent() {
        let planner = RemediationPlanner::new();
        let findings = vec![finding("origin-read-timeout-low"), finding("waf-association")];
        let first = planner.plan(&findings, "E2EXAMPLE");
        let second = planner.plan(&findings, "E2EXAMPLE");
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn unknown_rule_gets_generic_investigation() {
        let planner = RemediationPlanner::new();
        let entries = planner.plan(&[finding("some-future-rule")], "E2EXAMPLE");
        assert_eq!(entries[0].actions.len(), 1);
        assert_eq!(entries[0].actions[0].tier, Tier::Standard);
    }
}
