use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use colorin::config::Config;
use colorin::engine::report::EQUITABLE_SPREAD;
use colorin::models::DateRange;
use colorin::utils::reference_date;

use super::open_engine;

/// Print future load per active teacher and the fairness verdict
pub async fn report(config: &Config, data: &Path, as_of: Option<NaiveDate>) -> Result<()> {
    let (_, engine) = open_engine(config, data)?;
    let report = engine.equitable_report(reference_date(as_of)).await?;

    println!("Distribution as of {}", report.as_of);
    println!("{:-<48}", "");
    for load in &report.per_teacher {
        println!("  {:<36} {:>5}", load.name, load.future_load);
    }
    println!("{:-<48}", "");

    let analysis = report.analysis;
    println!(
        "min {} / max {} / spread {}",
        analysis.min, analysis.max, analysis.diff
    );
    if analysis.is_equitable {
        println!("Equitable (spread <= {EQUITABLE_SPREAD})");
    } else {
        println!("NOT equitable (spread > {EQUITABLE_SPREAD})");
    }
    Ok(())
}

/// Print assignment counts per teacher within an optional date range
pub async fn stats(
    config: &Config,
    data: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let (_, engine) = open_engine(config, data)?;
    let stats = engine.teacher_statistics(DateRange::new(from, to)).await?;

    println!("Teacher statistics");
    println!("{:-<48}", "");
    for teacher in &stats.teachers {
        let marker = if teacher.active { "" } else { " (inactive)" };
        println!(
            "  {:<36} {:>5}{marker}",
            teacher.name, teacher.total_events
        );
    }
    println!("{:-<48}", "");
    println!(
        "{} teachers, {} assignments, {:.2} per teacher",
        stats.summary.total_teachers,
        stats.summary.total_assignments,
        stats.summary.average_per_teacher
    );
    Ok(())
}
