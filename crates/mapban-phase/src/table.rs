//! The phase table: who acts at each of the seven phases, and how.
//!
//! ```text
//! phase   1       2       3        4       5       6       7
//! actor   Orange  Blue    Orange   Blue    Orange  Blue    Host
//! action  ban     ban     pick     pick    ban     ban     pick (decider)
//! ```
//!
//! The map picked at phase 7 is the decider. The three maps actually
//! played are the picks at phases 3, 4 and 7.

use mapban_protocol::{Action, NextStep, Phase, Role};
use mapban_session::Session;

const STEPS: [(Role, Action); 7] = [
    (Role::Orange, Action::Ban),
    (Role::Blue, Action::Ban),
    (Role::Orange, Action::Pick),
    (Role::Blue, Action::Pick),
    (Role::Orange, Action::Ban),
    (Role::Blue, Action::Ban),
    (Role::Host, Action::Pick),
];

/// Positions in `maps_chosen` of the maps that get played: Orange's
/// pick, Blue's pick, the Host's decider.
pub(crate) const PLAYED: [usize; 3] = [2, 3, 6];

/// The step for `phase`, or `None` for phase 0 (creation has no actor
/// in the table).
pub fn step_for(phase: Phase) -> Option<NextStep> {
    let index = usize::from(phase.get()).checked_sub(1)?;
    STEPS.get(index).map(|&(actor, action)| NextStep {
        phase,
        actor,
        action,
    })
}

/// What the session is waiting for.
pub fn next_step(session: &Session) -> Option<NextStep> {
    step_for(session.current_phase())
}

/// Maps chosen at ban phases, in order.
pub fn bans(session: &Session) -> Vec<&str> {
    chosen_by(session, Action::Ban)
}

/// Maps chosen at pick phases (the decider included), in order.
pub fn picks(session: &Session) -> Vec<&str> {
    chosen_by(session, Action::Pick)
}

fn chosen_by(session: &Session, wanted: Action) -> Vec<&str> {
    STEPS
        .iter()
        .zip(session.maps_chosen())
        .filter(|((_, action), _)| *action == wanted)
        .map(|(_, map)| map.as_str())
        .collect()
}
