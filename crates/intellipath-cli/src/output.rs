//! Terminal output formatting.

use colored::{ColoredString, Colorize};

use intellipath_graph::{AnalysisReport, GraphCounts, StageStats, SyncReport};

fn count(n: usize, color: fn(&str) -> ColoredString) -> ColoredString {
    if n == 0 {
        n.to_string().dimmed()
    } else {
        color(&n.to_string())
    }
}

fn stats_row(name: &str, stats: &StageStats) {
    println!(
        "  {:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        name,
        count(stats.created, |s| s.green()),
        count(stats.updated, |s| s.cyan()),
        count(stats.skipped, |s| s.yellow()),
        count(stats.missing_endpoint, |s| s.yellow()),
        count(stats.errors, |s| s.red().bold()),
    );
}

/// Print the per-stage table, analysis summary and overall verdict.
pub fn print_sync_report(report: &SyncReport) {
    println!();
    println!("{}", "Sync Report".bold());
    println!("{}", "─".repeat(62));

    println!(
        "  {}: {} applied, {} already present",
        "Schema".bold(),
        report.schema.applied,
        report.schema.already_present
    );
    for warning in &report.schema.warnings {
        println!("    {} {}", "!".yellow(), warning.yellow());
    }
    if report.wiped {
        println!("  {}", "Existing graph data was cleared".yellow());
    }

    println!();
    println!(
        "  {:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "", "created", "updated", "skipped", "missing", "errors"
    );
    for (kind, stats) in &report.entities {
        stats_row(kind.label(), stats);
    }
    for (kind, stats) in &report.relationships {
        stats_row(kind.rel_type(), stats);
    }

    println!();
    print_analysis(&report.analysis);

    println!("{}", "─".repeat(62));
    let elapsed = format!("{:.2}s", report.elapsed.as_secs_f64());
    if report.is_success() {
        println!(
            "{} {} records written, {} missing endpoints ({})",
            "Sync complete:".green().bold(),
            report.created() + report.updated(),
            report.missing_endpoints(),
            elapsed.dimmed()
        );
    } else {
        println!(
            "{} {} record errors ({})",
            "Sync finished with errors:".red().bold(),
            report.errors(),
            elapsed.dimmed()
        );
    }
}

/// Print bottlenecks and critical path depths.
pub fn print_analysis(report: &AnalysisReport) {
    println!("{}", "Critical Path Analysis".bold());
    println!(
        "  Courses: {}   REQUIRES edges: {}",
        report.courses.to_string().cyan(),
        report.requires_edges.to_string().cyan()
    );

    if report.bottlenecks.is_empty() {
        println!("  {}", "No bottleneck courses.".dimmed());
    } else {
        println!("  {} ({})", "Bottlenecks".bold(), report.bottlenecks.len());
        for (code, dependents) in &report.bottlenecks {
            println!("    {:<12} {} dependents", code.yellow(), dependents);
        }
    }

    match (&report.cycle, report.max_depth) {
        (Some(cycle), _) => {
            println!("  {} {}", "Depths not computed:".red().bold(), cycle);
            println!("    {}", cycle.cycle.join(" -> ").red());
        }
        (None, Some(max_depth)) => {
            println!("  {} {}", "Max prerequisite depth:".bold(), max_depth.to_string().cyan());
            for (code, depth) in &report.deepest {
                println!("    {:<12} {}", code, depth.to_string().dimmed());
            }
        }
        (None, None) => println!("  {}", "No courses to analyze.".dimmed()),
    }
}

/// Print the transitive prerequisites of one course.
pub fn print_chain(code: &str, chain: &[(String, u32)]) {
    println!("{} {}", "Prerequisite chain for".bold(), code.cyan());
    println!("{}", "─".repeat(40));

    if chain.is_empty() {
        println!("{}", "No prerequisites.".dimmed());
        return;
    }

    for (prerequisite, distance) in chain {
        let indent = "  ".repeat(*distance as usize);
        println!("{}{} {}", indent, "→".dimmed(), prerequisite);
    }
    println!("\n{} courses required.", chain.len().to_string().bold());
}

/// Print node and relationship counts.
pub fn print_counts(counts: &GraphCounts) {
    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));

    println!("  Nodes:         {}", counts.total_nodes().to_string().cyan());
    for (label, n) in &counts.nodes {
        println!("    {:<16} {}", label, n);
    }
    println!("  Relationships: {}", counts.total_relationships().to_string().cyan());
    for (rel_type, n) in &counts.relationships {
        println!("    {:<16} {}", rel_type, n);
    }

    println!("{}", "─".repeat(40));
}
