//! Core data structures for colorin
//!
//! Records owned by the surrounding administration system (teachers, events,
//! event tasks) and the one record the engine writes (assignments).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw numeric value
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

record_id!(
    /// Teacher identifier
    TeacherId
);
record_id!(
    /// Event identifier
    EventId
);
record_id!(
    /// Assignment identifier
    AssignmentId
);
record_id!(
    /// Event task identifier
    TaskId
);

/// Role given to assignments when the caller does not name one
pub const DEFAULT_ROLE: &str = "Profesor";

// ============================================================================
// Teacher
// ============================================================================

/// A staffable person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Teacher {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: TeacherId(id),
            name: name.into(),
            active: true,
        }
    }

    /// Mark as inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Name used for ordering ties (case-normalized)
    pub fn sort_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

// ============================================================================
// Event
// ============================================================================

/// An activity offered at an event
///
/// Legacy records stored activities as plain strings, with custom ones
/// written `"Otros: <text>"`. Such strings still deserialize, through
/// [`Activity::parse_legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", from = "ActivityRecord")]
pub enum Activity {
    Predefined { name: String },
    Custom { text: String },
}

/// Accepted on-disk shapes of an activity
#[derive(Deserialize)]
#[serde(untagged)]
enum ActivityRecord {
    Legacy(String),
    Tagged(TaggedActivity),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedActivity {
    Predefined { name: String },
    Custom { text: String },
}

impl From<ActivityRecord> for Activity {
    fn from(record: ActivityRecord) -> Self {
        match record {
            ActivityRecord::Legacy(raw) => Self::parse_legacy(&raw),
            ActivityRecord::Tagged(TaggedActivity::Predefined { name }) => Self::Predefined { name },
            ActivityRecord::Tagged(TaggedActivity::Custom { text }) => Self::Custom { text },
        }
    }
}

impl Activity {
    const LEGACY_CUSTOM_PREFIX: &'static str = "Otros:";

    /// Convert a legacy activity string
    pub fn parse_legacy(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.strip_prefix(Self::LEGACY_CUSTOM_PREFIX) {
            Some(text) => Self::Custom {
                text: text.trim().to_string(),
            },
            None => Self::Predefined {
                name: trimmed.to_string(),
            },
        }
    }

    /// Display label
    pub fn label(&self) -> &str {
        match self {
            Self::Predefined { name } => name,
            Self::Custom { text } => text,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

/// A scheduled activity requiring staffing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Calendar date; compared by day, never by timestamp
    pub date: NaiveDate,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Event {
    pub fn new(id: i64, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: EventId(id),
            name: name.into(),
            date,
            kind: String::new(),
            location: None,
            activities: Vec::new(),
            notes: None,
        }
    }

    /// Set event type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Add an activity
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Whether the event counts as future workload on `as_of`
    pub fn is_on_or_after(&self, as_of: NaiveDate) -> bool {
        self.date >= as_of
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// Link between one teacher and one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub teacher_id: TeacherId,
    pub event_id: EventId,
    pub role: String,
}

impl Assignment {
    /// The uniqueness key of an assignment
    pub fn pair(&self) -> (TeacherId, EventId) {
        (self.teacher_id, self.event_id)
    }
}

/// Request to create one assignment
///
/// A request without a role takes the engine's configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub teacher_id: TeacherId,
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl NewAssignment {
    pub fn new(teacher_id: i64, event_id: i64, role: impl Into<String>) -> Self {
        Self {
            teacher_id: TeacherId(teacher_id),
            event_id: EventId(event_id),
            role: Some(role.into()),
        }
    }

    /// Request with no role of its own
    pub fn unnamed(teacher_id: i64, event_id: i64) -> Self {
        Self {
            teacher_id: TeacherId(teacher_id),
            event_id: EventId(event_id),
            role: None,
        }
    }

    /// The requested role, or `default` when none was given
    pub fn role_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.role.as_deref().unwrap_or(default)
    }

    pub fn pair(&self) -> (TeacherId, EventId) {
        (self.teacher_id, self.event_id)
    }
}

/// Optional filters for listing assignments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub event_id: Option<EventId>,
}

impl AssignmentFilter {
    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.teacher_id.map_or(true, |t| assignment.teacher_id == t)
            && self.event_id.map_or(true, |e| assignment.event_id == e)
    }
}

// ============================================================================
// Event Task
// ============================================================================

/// A to-do item scoped to one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTask {
    pub id: TaskId,
    pub event_id: EventId,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EventTask {
    pub fn new(id: TaskId, event_id: EventId, description: impl Into<String>) -> Self {
        Self {
            id,
            event_id,
            description: description.into(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Set the completed flag
    ///
    /// `completed_at` is stamped only on a false -> true transition and
    /// cleared on true -> false.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        match (self.completed, completed) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
        self.completed = completed;
    }

    /// Flip the completed flag
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.set_completed(!self.completed, now);
    }
}

/// Partial update of an event task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive calendar range; open on either side when `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }

    /// A range whose start is after its end
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(f), Some(t)) if f > t)
    }
}
