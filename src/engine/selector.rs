//! Auto-assignment selection step
//!
//! Pure: picks teachers from a ranking without touching the store. The
//! engine runs it under the event's write scope and commits the result.

use super::error::{EngineError, EngineResult};
use super::ranker::{Candidate, CandidateRanking};

/// Take the first `count` eligible candidates in ranked order
///
/// All-or-nothing: if fewer than `count` candidates are eligible nothing is
/// selected and the error reports how many were.
pub fn select(ranking: &CandidateRanking, count: usize) -> EngineResult<Vec<&Candidate>> {
    if count == 0 {
        return Err(EngineError::invalid("count", "must be at least 1"));
    }

    let eligible: Vec<&Candidate> = ranking.eligible().take(count).collect();
    if eligible.len() < count {
        return Err(EngineError::insufficient(
            ranking.event_id,
            count,
            ranking.available,
        ));
    }

    Ok(eligible)
}
