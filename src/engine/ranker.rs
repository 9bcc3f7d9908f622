//! Candidate ranking for an event
//!
//! Every teacher appears in the ranking, inactive ones included, ordered by
//! future load, then case-normalized name, then id. Only active teachers not
//! yet on the event at the minimum load among them are recommended.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::workload::WorkloadIndex;
use crate::models::{EventId, Teacher, TeacherId};
use crate::storage::Snapshot;

/// One row of a candidate ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub teacher_id: TeacherId,
    pub name: String,
    pub active: bool,
    pub future_load: u32,
    pub already_assigned: bool,
    pub recommended: bool,
}

impl Candidate {
    /// Active and not yet assigned to the event
    pub fn is_eligible(&self) -> bool {
        self.active && !self.already_assigned
    }
}

/// Ranked candidates for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRanking {
    pub event_id: EventId,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub as_of: NaiveDate,
    pub candidates: Vec<Candidate>,
    pub total_teachers: usize,
    /// Number of eligible candidates
    pub available: usize,
}

impl CandidateRanking {
    /// Eligible candidates in ranked order
    pub fn eligible(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.is_eligible())
    }

    pub fn recommended(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.recommended)
    }

    pub fn get(&self, teacher: TeacherId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.teacher_id == teacher)
    }
}

/// Ordering key shared by ranking and reports
pub(crate) fn load_order_key(teacher: &Teacher, load: u32) -> (u32, String, TeacherId) {
    (load, teacher.sort_key(), teacher.id)
}

/// Rank all teachers for `event_id`
///
/// Returns `None` when the event is not in the snapshot.
pub fn rank(snapshot: &Snapshot, event_id: EventId, as_of: NaiveDate) -> Option<CandidateRanking> {
    let event = snapshot.event(event_id)?;
    let index = WorkloadIndex::build(snapshot, as_of);
    let assigned = snapshot.assigned_to(event_id);

    let mut keyed: Vec<_> = snapshot
        .teachers()
        .iter()
        .map(|teacher| {
            let load = index.future_load(teacher.id);
            let candidate = Candidate {
                teacher_id: teacher.id,
                name: teacher.name.clone(),
                active: teacher.active,
                future_load: load,
                already_assigned: assigned.contains(&teacher.id),
                recommended: false,
            };
            (load_order_key(teacher, load), candidate)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut candidates: Vec<Candidate> = keyed.into_iter().map(|(_, c)| c).collect();

    let min_load = candidates
        .iter()
        .filter(|c| c.is_eligible())
        .map(|c| c.future_load)
        .min();
    if let Some(min_load) = min_load {
        for candidate in candidates.iter_mut() {
            candidate.recommended = candidate.is_eligible() && candidate.future_load == min_load;
        }
    }

    let available = candidates.iter().filter(|c| c.is_eligible()).count();

    Some(CandidateRanking {
        event_id,
        event_name: event.name.clone(),
        event_date: event.date,
        as_of,
        total_teachers: candidates.len(),
        available,
        candidates,
    })
}
