use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use colorin::config::Config;
use colorin::models::EventId;
use colorin::utils::reference_date;

use super::open_engine;

/// Print the candidate ranking for an event
pub async fn rank(config: &Config, data: &Path, event: i64, as_of: Option<NaiveDate>) -> Result<()> {
    let (_, engine) = open_engine(config, data)?;
    let ranking = engine
        .rank_candidates(EventId(event), reference_date(as_of))
        .await?;

    println!(
        "Candidates for \"{}\" ({}) as of {}",
        ranking.event_name, ranking.event_date, ranking.as_of
    );
    println!("{:-<64}", "");
    println!("{:>4}  {:<32} {:>5}  {}", "#", "Teacher", "Load", "Status");

    for (position, candidate) in ranking.candidates.iter().enumerate() {
        let status = if !candidate.active {
            "inactive"
        } else if candidate.already_assigned {
            "assigned"
        } else if candidate.recommended {
            "recommended"
        } else {
            "available"
        };
        println!(
            "{:>4}  {:<32} {:>5}  {}",
            position + 1,
            candidate.name,
            candidate.future_load,
            status
        );
    }

    println!("{:-<64}", "");
    println!(
        "{} of {} teachers available",
        ranking.available, ranking.total_teachers
    );
    Ok(())
}

/// Assign the `count` least loaded teachers and optionally persist the result
pub async fn auto_assign(
    config: &Config,
    data: &Path,
    event: i64,
    count: usize,
    as_of: Option<NaiveDate>,
    save: bool,
) -> Result<()> {
    let (store, engine) = open_engine(config, data)?;
    let assignments = engine
        .auto_assign(EventId(event), count, reference_date(as_of))
        .await?;

    println!("Assigned {} teacher(s) to event {event}:", assignments.len());
    for assignment in &assignments {
        println!(
            "  assignment {} -> teacher {} ({})",
            assignment.id, assignment.teacher_id, assignment.role
        );
    }

    if save {
        store
            .save_json(data)
            .await
            .with_context(|| format!("Failed to save data file: {}", data.display()))?;
        println!("Saved snapshot to {}", data.display());
    }
    Ok(())
}
