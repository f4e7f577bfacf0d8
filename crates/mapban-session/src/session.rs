//! The session record: one map-ban ritual between Orange and Blue.
//!
//! Fields are private. The registry owns the token index, so tokens must
//! never change after creation, and the chosen list may only grow through
//! [`Session::record_choice`].

use std::collections::HashSet;

use mapban_protocol::{Phase, Role, SessionView, Token};
use serde::{Deserialize, Serialize};

use crate::MIN_POOL_SIZE;

/// One live map-ban session.
///
/// `current_phase` is the phase the session is waiting for. Creation
/// completes phase 0, so a new session waits for phase 1, and while the
/// session is live `maps_chosen.len() == current_phase - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    host_token: Token,
    orange_token: Token,
    blue_token: Token,
    orange_team_name: String,
    blue_team_name: String,
    map_pool: Vec<String>,
    maps_chosen: Vec<String>,
    current_phase: Phase,
}

impl Session {
    /// Builds a fresh session waiting for phase 1.
    ///
    /// Does not validate names or the pool; the registry does that
    /// before calling this.
    pub fn new(
        host_token: Token,
        orange_token: Token,
        blue_token: Token,
        orange_team_name: String,
        blue_team_name: String,
        map_pool: Vec<String>,
    ) -> Self {
        Self {
            host_token,
            orange_token,
            blue_token,
            orange_team_name,
            blue_team_name,
            map_pool,
            maps_chosen: Vec::with_capacity(Phase::FINAL.get() as usize),
            current_phase: Phase::FIRST,
        }
    }

    pub fn host_token(&self) -> &Token {
        &self.host_token
    }

    pub fn orange_token(&self) -> &Token {
        &self.orange_token
    }

    pub fn blue_token(&self) -> &Token {
        &self.blue_token
    }

    /// All three tokens, host first.
    pub fn tokens(&self) -> [&Token; 3] {
        [&self.host_token, &self.orange_token, &self.blue_token]
    }

    pub fn token_of(&self, role: Role) -> &Token {
        match role {
            Role::Host => &self.host_token,
            Role::Orange => &self.orange_token,
            Role::Blue => &self.blue_token,
        }
    }

    /// Which role `token` was issued for in this session, if any.
    pub fn role_of(&self, token: &Token) -> Option<Role> {
        [Role::Host, Role::Orange, Role::Blue]
            .into_iter()
            .find(|role| self.token_of(*role) == token)
    }

    pub fn orange_team_name(&self) -> &str {
        &self.orange_team_name
    }

    pub fn blue_team_name(&self) -> &str {
        &self.blue_team_name
    }

    /// Display name for a role, for log lines.
    pub fn display_name(&self, role: Role) -> &str {
        match role {
            Role::Host => "Host",
            Role::Orange => &self.orange_team_name,
            Role::Blue => &self.blue_team_name,
        }
    }

    pub fn map_pool(&self) -> &[String] {
        &self.map_pool
    }

    pub fn maps_chosen(&self) -> &[String] {
        &self.maps_chosen
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn in_pool(&self, map: &str) -> bool {
        self.map_pool.iter().any(|m| m == map)
    }

    pub fn is_chosen(&self, map: &str) -> bool {
        self.maps_chosen.iter().any(|m| m == map)
    }

    /// Pool maps nobody has banned or picked yet, in pool order.
    pub fn remaining(&self) -> Vec<String> {
        self.map_pool
            .iter()
            .filter(|m| !self.is_chosen(m))
            .cloned()
            .collect()
    }

    /// Appends a choice and moves to the next phase.
    ///
    /// Returns the phase that was just completed. Completing the final
    /// phase leaves `current_phase` at 7; the caller closes the session
    /// in the same critical section, so that state is never observed.
    ///
    /// Checking that the choice is legal is the caller's job.
    pub fn record_choice(&mut self, choice: String) -> Phase {
        let completed = self.current_phase;
        self.maps_chosen.push(choice);
        if let Some(next) = completed.next() {
            self.current_phase = next;
        }
        completed
    }

    /// The public view returned to the Host on creation.
    pub fn view(&self) -> SessionView {
        SessionView {
            host_token: self.host_token.clone(),
            orange_token: self.orange_token.clone(),
            blue_token: self.blue_token.clone(),
            orange_team_name: self.orange_team_name.clone(),
            blue_team_name: self.blue_team_name.clone(),
            map_pool: self.map_pool.clone(),
            maps_chosen: self.maps_chosen.clone(),
            current_phase: self.current_phase,
        }
    }

    /// Verifies every invariant a live session must satisfy.
    ///
    /// Used when sessions come from outside the registry (a snapshot),
    /// where nothing guarantees they were produced by valid transitions.
    pub fn check_invariants(&self) -> Result<(), String> {
        let host = self.host_token.fingerprint();

        let [h, o, b] = self.tokens();
        if h == o || h == b || o == b {
            return Err(format!("session {host}: tokens are not distinct"));
        }
        if self.orange_team_name.trim().is_empty()
            || self.blue_team_name.trim().is_empty()
        {
            return Err(format!("session {host}: empty team name"));
        }

        let pool: HashSet<&str> =
            self.map_pool.iter().map(String::as_str).collect();
        if pool.len() != self.map_pool.len() || pool.len() < MIN_POOL_SIZE {
            return Err(format!(
                "session {host}: pool must hold {MIN_POOL_SIZE}+ distinct maps"
            ));
        }

        let phase = self.current_phase.get();
        if phase == Phase::CREATE.get() {
            return Err(format!("session {host}: phase 0 is never stored"));
        }
        if self.maps_chosen.len() != usize::from(phase - 1) {
            return Err(format!(
                "session {host}: phase {phase} with {} maps chosen",
                self.maps_chosen.len()
            ));
        }

        let mut seen = HashSet::new();
        for map in &self.maps_chosen {
            if !pool.contains(map.as_str()) {
                return Err(format!("session {host}: {map} is not in the pool"));
            }
            if !seen.insert(map.as_str()) {
                return Err(format!("session {host}: {map} chosen twice"));
            }
        }
        Ok(())
    }
}
