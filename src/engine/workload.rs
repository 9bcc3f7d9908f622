//! Workload index
//!
//! Future load of a teacher = number of its assignments whose event date is
//! on or after the reference date. Past-dated events never count.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::TeacherId;
use crate::storage::Snapshot;

/// Future loads computed from one snapshot
#[derive(Debug, Clone, Default)]
pub struct WorkloadIndex {
    as_of: NaiveDate,
    loads: HashMap<TeacherId, u32>,
}

impl WorkloadIndex {
    /// Count future assignments of every teacher in `snapshot`
    ///
    /// Assignments pointing at an event missing from the snapshot are
    /// ignored.
    pub fn build(snapshot: &Snapshot, as_of: NaiveDate) -> Self {
        let mut loads = HashMap::new();

        for assignment in snapshot.assignments() {
            let counts = snapshot
                .event(assignment.event_id)
                .is_some_and(|event| event.is_on_or_after(as_of));
            if counts {
                *loads.entry(assignment.teacher_id).or_insert(0) += 1;
            }
        }

        Self { as_of, loads }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Future load of one teacher; 0 when it has none
    pub fn future_load(&self, teacher: TeacherId) -> u32 {
        self.loads.get(&teacher).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, AssignmentId, Event, EventId, Teacher};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assignment(id: i64, teacher: i64, event: i64) -> Assignment {
        Assignment {
            id: AssignmentId(id),
            teacher_id: TeacherId(teacher),
            event_id: EventId(event),
            role: "Profesor".to_string(),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(
            vec![Teacher::new(1, "Ana"), Teacher::new(2, "Beto")],
            vec![
                Event::new(1, "Pasado", date(2024, 1, 10)),
                Event::new(2, "Hoy", date(2024, 2, 1)),
                Event::new(3, "Futuro", date(2024, 3, 15)),
            ],
            vec![
                assignment(1, 1, 1),
                assignment(2, 1, 2),
                assignment(3, 1, 3),
                assignment(4, 2, 1),
            ],
        )
    }

    #[test]
    fn test_future_load_counts_today_and_later() {
        let index = WorkloadIndex::build(&snapshot(), date(2024, 2, 1));
        assert_eq!(index.future_load(TeacherId(1)), 2);
        assert_eq!(index.future_load(TeacherId(2)), 0);
        assert_eq!(index.as_of(), date(2024, 2, 1));
    }

    #[test]
    fn test_load_drops_when_date_passes() {
        let snap = snapshot();
        let before = WorkloadIndex::build(&snap, date(2024, 2, 1)).future_load(TeacherId(1));
        let after = WorkloadIndex::build(&snap, date(2024, 2, 2)).future_load(TeacherId(1));
        assert_eq!(before - after, 1);
    }

    #[test]
    fn test_unknown_teacher_has_zero_load() {
        let index = WorkloadIndex::build(&snapshot(), date(2000, 1, 1));
        assert_eq!(index.future_load(TeacherId(99)), 0);
    }
}
