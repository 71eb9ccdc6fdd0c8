//! Console output for the command-line tool.

use console::{style, Style};

use crate::config::MigrationConfig;
use crate::pipeline::{MigrationPlan, MigrationStats, PhaseStats, POST_MIGRATION_STEPS};

/// Prints the banner, the plan and the end-of-run summary.
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl ConsoleUi {
    /// Creates a new UI handler.
    pub fn new() -> Self {
        Self
    }

    /// Prints the tool header.
    pub fn print_header(&self) {
        let cyan = Style::new().cyan().bold();

        println!();
        println!(
            "{}",
            cyan.apply_to("╔═══════════════════════════════════════════════════════════════╗")
        );
        println!(
            "{}",
            cyan.apply_to("║         CKAN CATALOG MIGRATION                                ║")
        );
        println!(
            "{}",
            cyan.apply_to("║         Organizations, datasets and resources                 ║")
        );
        println!(
            "{}",
            cyan.apply_to("╚═══════════════════════════════════════════════════════════════╝")
        );
        println!();
    }

    /// Prints what is about to be migrated, and from where to where.
    pub fn print_plan(&self, config: &MigrationConfig, plan: &MigrationPlan) {
        let bold = Style::new().bold();

        println!("┌─────────────────────────────────────────────────────────────┐");
        println!("│ {} {}", bold.apply_to("Source CKAN:"), config.source_url);
        println!("│ {} {}", bold.apply_to("Target CKAN:"), config.target_url);
        println!("│ {} {}", bold.apply_to("Work dir:   "), config.work_dir.display());
        println!("├─────────────────────────────────────────────────────────────┤");
        println!(
            "│ {} {}",
            bold.apply_to("Components: "),
            plan.components().join(", ")
        );
        if !plan.organizations.is_empty() {
            println!(
                "│ {} {}",
                bold.apply_to("Organizations:"),
                plan.organizations.join(", ")
            );
        }
        if !plan.datasets.is_empty() {
            println!(
                "│ {} {}",
                bold.apply_to("Datasets:   "),
                plan.datasets.join(", ")
            );
        }
        println!("└─────────────────────────────────────────────────────────────┘");
        println!();
        println!(
            "{} This process may take a long time depending on the amount of data",
            style("⚠").yellow().bold()
        );
        println!();
    }

    /// Prints the tallies and the manual follow-up steps.
    pub fn print_summary(&self, stats: &MigrationStats) {
        let green = Style::new().green().bold();
        let bold = Style::new().bold();

        println!();
        println!("{}", green.apply_to("✅ Migration Complete!"));
        println!();
        if let Some(orgs) = &stats.organizations {
            print_phase("Organizations:", orgs);
        }
        if let Some(datasets) = &stats.datasets {
            print_phase("Datasets:     ", datasets);
            let res = &stats.resources;
            if res.total > 0 {
                println!(
                    "   {} {}/{} uploaded",
                    bold.apply_to("Resources:    "),
                    res.uploaded + res.placeholder,
                    res.total
                );
                if res.placeholder > 0 {
                    println!(
                        "   {} {} created without payload",
                        style("Placeholders:").yellow(),
                        res.placeholder
                    );
                }
            }
        }
        println!(
            "   {} {:.1}s",
            bold.apply_to("Duration:     "),
            stats.duration_secs
        );

        println!();
        println!("{}", bold.apply_to("💡 Post-migration steps:"));
        for (i, step) in POST_MIGRATION_STEPS.iter().enumerate() {
            println!("   {}. {}", i + 1, step);
        }
        println!();
    }

    /// Prints cancellation message.
    pub fn print_cancelled(&self) {
        println!();
        println!("{} Migration aborted.", style("ℹ").blue());
    }

    /// Prints error message.
    pub fn print_error(&self, message: &str) {
        println!();
        println!("{} {}", style("❌").red().bold(), message);
    }
}

fn print_phase(label: &str, phase: &PhaseStats) {
    println!(
        "   {} {}/{} ({} created, {} reused)",
        style(label).bold(),
        phase.succeeded(),
        phase.total,
        phase.created,
        phase.reused
    );
    if phase.failed > 0 {
        println!("   {} {} (skipped)", style("Failed:").yellow(), phase.failed);
    }
}
