use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::batch::BatchOutcome;
use crate::models::{RiskLevel, RiskProfile};
use crate::report::pdf::format_currency;

/// Print a colored summary of a scoring run.
///
/// `quiet` reduces the output to one line; `verbose` adds the recommendation list.
pub fn render(outcome: &BatchOutcome, store_path: &Path, verbose: bool, quiet: bool) {
    let scored = outcome.scored();
    let failed = outcome.failures.len();
    let high = outcome
        .store
        .iter()
        .filter(|(_, p)| worst_level(p) == RiskLevel::High)
        .count();

    if quiet {
        println!(
            "Scored: {}  Failed: {}  High risk: {}",
            scored.to_string().green(),
            failed.to_string().red(),
            high.to_string().yellow(),
        );
        return;
    }

    println!("\n {} v{}", "esg-reportr".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Record store: {}\n", store_path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Organizations      : {}", scored + failed));
    println!(
        " │  {:<48} │",
        format!("{}  Scored          : {:>4}", "✓".green(), scored)
    );
    println!(
        " │  {:<48} │",
        format!("{}  High risk       : {:>4}", "⚠".yellow(), high)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Failed          : {:>4}", "✗".red(), failed)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if scored > 0 {
        println!(" {} Risk profiles:\n", "[SCORED]".green().bold());
        render_profiles(outcome);
        println!();
    }

    if failed > 0 {
        println!(" {} Organizations skipped this run:\n", "[FAILED]".red().bold());
        render_failures(outcome);
        println!();
    }

    if verbose {
        for (company, profile) in outcome.store.iter() {
            println!(" {}", company.bold());
            for rec in &profile.recommendations {
                println!("   {} {}", "→".cyan(), rec);
            }
        }
        println!();
    }
}

fn render_profiles(outcome: &BatchOutcome) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Company").add_attribute(Attribute::Bold),
            Cell::new("Deforestation").add_attribute(Attribute::Bold),
            Cell::new("Water Pollution").add_attribute(Attribute::Bold),
            Cell::new("Biodiversity Loss").add_attribute(Attribute::Bold),
            Cell::new("Natural Capital").add_attribute(Attribute::Bold),
        ]);

    for (company, profile) in outcome.store.iter() {
        let mut row = vec![Cell::new(company)];
        for (_, score) in profile.bounded_scores() {
            row.push(
                Cell::new(format!("{:.3}", score))
                    .fg(level_color(RiskLevel::from_score(score)))
                    .set_alignment(CellAlignment::Right),
            );
        }
        row.push(
            Cell::new(format_currency(profile.natural_capital_value))
                .set_alignment(CellAlignment::Right),
        );
        table.add_row(row);
    }

    println!("{}", table);
}

fn render_failures(outcome: &BatchOutcome) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Company").add_attribute(Attribute::Bold),
            Cell::new("Reason").add_attribute(Attribute::Bold),
        ]);

    for failure in &outcome.failures {
        table.add_row(vec![
            Cell::new(&failure.company),
            Cell::new(failure.error.to_string()).fg(Color::Red),
        ]);
    }

    println!("{}", table);
}

fn level_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::Low => Color::Green,
        RiskLevel::Moderate => Color::Yellow,
        RiskLevel::High => Color::Red,
    }
}

fn worst_level(profile: &RiskProfile) -> RiskLevel {
    let worst = profile
        .bounded_scores()
        .iter()
        .map(|(_, s)| *s)
        .fold(0.0_f64, f64::max);
    RiskLevel::from_score(worst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(d: f64, w: f64, b: f64) -> RiskProfile {
        RiskProfile {
            deforestation_risk: d,
            water_pollution_score: w,
            biodiversity_loss_risk: b,
            natural_capital_value: 0.0,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_worst_level_takes_max_score() {
        assert_eq!(worst_level(&profile(0.1, 0.2, 0.1)), RiskLevel::Low);
        assert_eq!(worst_level(&profile(0.1, 0.7, 0.4)), RiskLevel::High);
        assert_eq!(worst_level(&profile(0.5, 0.1, 0.2)), RiskLevel::Moderate);
    }
}
