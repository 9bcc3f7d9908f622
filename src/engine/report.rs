//! Distribution and statistics reports
//!
//! All reports are computed from a single snapshot and never fail on empty
//! data; they return zeroed results instead.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ranker::load_order_key;
use super::workload::WorkloadIndex;
use crate::models::{DateRange, EventId, Teacher, TeacherId};
use crate::storage::Snapshot;

/// Largest future-load spread across active teachers still considered fair
///
/// Fixed policy, not configurable.
pub const EQUITABLE_SPREAD: u32 = 1;

// ============================================================================
// Equitable Distribution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherLoad {
    pub teacher_id: TeacherId,
    pub name: String,
    pub future_load: u32,
}

/// Fleet-level fairness summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub min: u32,
    pub max: u32,
    pub diff: u32,
    pub is_equitable: bool,
}

impl Analysis {
    pub fn from_loads(loads: impl IntoIterator<Item = u32>) -> Self {
        let (min, max) = loads
            .into_iter()
            .fold(None, |acc: Option<(u32, u32)>, load| match acc {
                Some((lo, hi)) => Some((lo.min(load), hi.max(load))),
                None => Some((load, load)),
            })
            .unwrap_or((0, 0));

        let diff = max - min;
        Self {
            min,
            max,
            diff,
            is_equitable: diff <= EQUITABLE_SPREAD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub as_of: NaiveDate,
    pub per_teacher: Vec<TeacherLoad>,
    pub analysis: Analysis,
}

/// Future load of every active teacher and the spread between extremes
pub fn distribution(snapshot: &Snapshot, as_of: NaiveDate) -> DistributionReport {
    let index = WorkloadIndex::build(snapshot, as_of);

    let mut active: Vec<(&Teacher, u32)> = snapshot
        .teachers()
        .iter()
        .filter(|t| t.active)
        .map(|t| (t, index.future_load(t.id)))
        .collect();
    active.sort_by_cached_key(|(t, load)| load_order_key(t, *load));

    let analysis = Analysis::from_loads(active.iter().map(|(_, load)| *load));
    let per_teacher = active
        .into_iter()
        .map(|(t, load)| TeacherLoad {
            teacher_id: t.id,
            name: t.name.clone(),
            future_load: load,
        })
        .collect();

    DistributionReport {
        as_of,
        per_teacher,
        analysis,
    }
}

// ============================================================================
// Teacher Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherStat {
    pub teacher_id: TeacherId,
    pub name: String,
    pub active: bool,
    pub total_events: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_teachers: usize,
    pub total_assignments: u32,
    /// Rounded to two decimals
    pub average_per_teacher: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherStatistics {
    pub range: DateRange,
    pub teachers: Vec<TeacherStat>,
    pub summary: StatisticsSummary,
}

/// Assignment count per teacher for events inside `range`
///
/// Covers every teacher, active or not, ordered by name then id.
pub fn teacher_statistics(snapshot: &Snapshot, range: DateRange) -> TeacherStatistics {
    let mut teachers: Vec<TeacherStat> = snapshot
        .teachers()
        .iter()
        .map(|teacher| {
            let total_events = snapshot
                .assignments_of(teacher.id)
                .filter(|a| {
                    snapshot
                        .event(a.event_id)
                        .is_some_and(|event| range.contains(event.date))
                })
                .count() as u32;
            TeacherStat {
                teacher_id: teacher.id,
                name: teacher.name.clone(),
                active: teacher.active,
                total_events,
            }
        })
        .collect();
    teachers.sort_by_cached_key(|s| (s.name.trim().to_lowercase(), s.teacher_id));

    let total_assignments: u32 = teachers.iter().map(|s| s.total_events).sum();
    let average_per_teacher = if teachers.is_empty() {
        0.0
    } else {
        round2(f64::from(total_assignments) / teachers.len() as f64)
    };

    TeacherStatistics {
        range,
        summary: StatisticsSummary {
            total_teachers: teachers.len(),
            total_assignments,
            average_per_teacher,
        },
        teachers,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Events Per Teacher
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherEvent {
    pub event_id: EventId,
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherEvents {
    pub teacher_id: TeacherId,
    pub name: String,
    pub events: Vec<TeacherEvent>,
}

/// Events of one teacher inside `range`, by date then event id
///
/// Returns `None` when the teacher is not in the snapshot.
pub fn teacher_events(
    snapshot: &Snapshot,
    teacher_id: TeacherId,
    range: DateRange,
) -> Option<TeacherEvents> {
    let teacher = snapshot.teacher(teacher_id)?;

    let mut events: Vec<TeacherEvent> = snapshot
        .assignments_of(teacher_id)
        .filter_map(|assignment| {
            let event = snapshot.event(assignment.event_id)?;
            range.contains(event.date).then(|| TeacherEvent {
                event_id: event.id,
                name: event.name.clone(),
                date: event.date,
                kind: event.kind.clone(),
                location: event.location.clone(),
                role: assignment.role.clone(),
            })
        })
        .collect();
    events.sort_by_key(|e| (e.date, e.event_id));

    Some(TeacherEvents {
        teacher_id,
        name: teacher.name.clone(),
        events,
    })
}
