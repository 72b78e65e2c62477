//! List the built-in rule catalog.

use anyhow::Result;
use colored::*;
use edgescope_diagnostics::{DiagnosticEngine, Severity};

pub fn execute() -> Result<()> {
    let engine = DiagnosticEngine::new();
    let rules = engine.list_rules();

    println!("{}", "Built-in diagnostic rules".bright_blue().bold());
    println!("{}", "=".repeat(72).bright_blue());

    for rule in &rules {
        let severity = match rule.base_severity {
            Severity::Critical => rule.base_severity.to_string().red().bold(),
            Severity::High => rule.base_severity.to_string().bright_red(),
            Severity::Medium => rule.base_severity.to_string().yellow(),
            Severity::Low => rule.base_severity.to_string().green(),
        };
        println!(
            "{:<30} {:<10} [{}]",
            rule.id.bold(),
            severity,
            rule.categories.join(", ")
        );
        println!("    {}", rule.description);
    }

    println!("\n{} rules registered", rules.len());
    Ok(())
}
