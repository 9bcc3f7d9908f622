//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use colorin::engine::StaffingEngine;
use colorin::models::{Assignment, AssignmentId, Event, EventId, Teacher, TeacherId};
use colorin::storage::{InMemoryStore, SeedData};

/// Event every fixture leaves unstaffed
pub const TARGET_EVENT: EventId = EventId(100);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Reference date used by the fixtures
pub fn today() -> NaiveDate {
    date(2024, 3, 1)
}

pub fn assignment(id: i64, teacher: i64, event: i64) -> Assignment {
    Assignment {
        id: AssignmentId(id),
        teacher_id: TeacherId(teacher),
        event_id: EventId(event),
        role: "Profesor".to_string(),
    }
}

/// Five teachers whose future loads are [0, 0, 1, 2, 3] on [`today`]
///
/// Ana and Beatriz also worked a past event that must not count.
pub fn staffed_seed() -> SeedData {
    SeedData {
        teachers: vec![
            Teacher::new(1, "Ana"),
            Teacher::new(2, "Beatriz"),
            Teacher::new(3, "Carlos"),
            Teacher::new(4, "Diego"),
            Teacher::new(5, "Elena"),
        ],
        events: vec![
            Event::new(1, "Jornada de bienvenida", date(2024, 2, 1)),
            Event::new(10, "Feria de ciencias", date(2024, 3, 5)),
            Event::new(11, "Olimpiada de matemáticas", date(2024, 3, 6)),
            Event::new(12, "Torneo de ajedrez", date(2024, 3, 7)),
            Event::new(TARGET_EVENT.get(), "Visita escolar", date(2024, 3, 20)),
        ],
        assignments: vec![
            assignment(1, 1, 1),
            assignment(2, 2, 1),
            assignment(3, 3, 10),
            assignment(4, 4, 10),
            assignment(5, 4, 11),
            assignment(6, 5, 10),
            assignment(7, 5, 11),
            assignment(8, 5, 12),
        ],
        tasks: Vec::new(),
    }
}

/// Teachers with the given future loads, named T0, T1, ...
pub fn seed_with_loads(loads: &[u32]) -> SeedData {
    let mut seed = SeedData {
        events: vec![Event::new(
            TARGET_EVENT.get(),
            "Visita escolar",
            date(2024, 3, 20),
        )],
        ..Default::default()
    };

    let max = loads.iter().copied().max().unwrap_or(0) as i64;
    for offset in 0..max {
        seed.events
            .push(Event::new(200 + offset, format!("Evento {offset}"), date(2024, 4, 1)));
    }

    let mut next_id = 1;
    for (index, load) in loads.iter().enumerate() {
        let teacher = index as i64 + 1;
        seed.teachers.push(Teacher::new(teacher, format!("T{index}")));
        for offset in 0..*load as i64 {
            seed.assignments.push(assignment(next_id, teacher, 200 + offset));
            next_id += 1;
        }
    }
    seed
}

pub fn store(seed: SeedData) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_seed(seed).expect("valid seed"))
}

pub fn engine(store: &Arc<InMemoryStore>) -> StaffingEngine {
    StaffingEngine::new(store.clone())
}
