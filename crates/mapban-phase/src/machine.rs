//! Validating and applying choices.
//!
//! Both functions are meant to run inside
//! [`SessionRegistry::with_session`](mapban_session::SessionRegistry::with_session),
//! so the check and the write happen under the same session lock. Run
//! outside it, two racers could both pass [`validate`] for the same phase.

use mapban_protocol::{MapChoice, NextStep, Phase, Role, SessionStatus, Token};
use mapban_session::{Session, SessionEntry};

use crate::PhaseError;
use crate::table::{PLAYED, next_step, step_for};

/// What an accepted choice produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Phases 1 to 6: every map chosen so far, in order.
    Progress(Vec<String>),
    /// Phase 7: `[orange pick, blue pick, decider]`. The session and its
    /// three tokens are gone.
    Finished([String; 3]),
}

/// Checks a choice against the session without touching it.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. `phase` is the phase the session is waiting for
/// 2. `token` belongs to the role the phase table names
/// 3. `choice` is in the session's pool
/// 4. `choice` has not been banned or picked already
///
/// Returns the step being taken.
pub fn validate(
    session: &Session,
    phase: Phase,
    token: &Token,
    choice: &str,
) -> Result<NextStep, PhaseError> {
    let expected = session.current_phase();
    if phase != expected {
        return Err(PhaseError::OutOfSequence {
            expected,
            got: phase,
        });
    }
    let step = step_for(phase).ok_or_else(|| {
        PhaseError::Inconsistent(format!("session waits for phase {phase}"))
    })?;

    let presented = session.role_of(token).ok_or_else(|| {
        PhaseError::Inconsistent("token does not belong to this session".into())
    })?;
    if presented != step.actor {
        return Err(PhaseError::Unauthorized {
            phase,
            required: step.actor,
            presented,
        });
    }

    if !session.in_pool(choice) {
        return Err(PhaseError::MapNotInPool(choice.to_owned()));
    }
    if session.is_chosen(choice) {
        return Err(PhaseError::DuplicateMap(choice.to_owned()));
    }
    Ok(step)
}

/// Records an already validated choice.
///
/// Completing phase 7 computes the played maps and closes the session in
/// the same critical section. An error leaves the session untouched.
pub fn apply(
    entry: &mut SessionEntry<'_>,
    choice: String,
) -> Result<Applied, PhaseError> {
    if !entry.session().current_phase().is_final() {
        entry.session_mut().record_choice(choice);
        return Ok(Applied::Progress(entry.session().maps_chosen().to_vec()));
    }

    let chosen = entry.session().maps_chosen();
    let played = played_maps(chosen, &choice).ok_or_else(|| {
        PhaseError::Inconsistent(format!(
            "final phase reached with {} maps chosen",
            chosen.len()
        ))
    })?;
    entry.session_mut().record_choice(choice);
    entry.close();
    Ok(Applied::Finished(played))
}

/// `[orange pick, blue pick, decider]` from the six earlier choices and
/// the decider. `None` unless exactly six came before.
fn played_maps(chosen: &[String], decider: &str) -> Option<[String; 3]> {
    if chosen.len() + 1 != usize::from(Phase::FINAL.get()) {
        return None;
    }
    let [orange, blue, _] = PLAYED;
    Some([
        chosen.get(orange)?.clone(),
        chosen.get(blue)?.clone(),
        decider.to_owned(),
    ])
}

/// Validates then applies one choice. The usual entry point.
pub fn choose(
    entry: &mut SessionEntry<'_>,
    request: MapChoice,
) -> Result<Applied, PhaseError> {
    let MapChoice {
        phase,
        token,
        choice,
    } = request;
    let step = validate(entry.session(), phase, &token, &choice)?;

    tracing::info!(
        host = %entry.session().host_token().fingerprint(),
        phase = %phase,
        actor = %entry.session().display_name(step.actor),
        "{} {}",
        step.action.past_tense(),
        choice
    );
    apply(entry, choice)
}

/// The read-only view a participant gets when polling.
pub fn status(session: &Session, role: Role) -> SessionStatus {
    SessionStatus {
        role,
        current_phase: session.current_phase(),
        next: next_step(session),
        orange_team_name: session.orange_team_name().to_owned(),
        blue_team_name: session.blue_team_name().to_owned(),
        map_pool: session.map_pool().to_vec(),
        maps_chosen: session.maps_chosen().to_vec(),
        remaining: session.remaining(),
    }
}
