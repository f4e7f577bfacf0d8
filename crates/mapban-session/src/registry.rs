//! The session registry: every live session, reachable by any of its
//! three tokens.
//!
//! # Layout
//!
//! The index maps each token to an [`Entry`]. The Host token holds the
//! authoritative record; the Orange and Blue tokens hold only the Host
//! token, so there is one copy of the mutable state per session.
//!
//! ```text
//! host_token   ──→ Entry::Host(Arc<Mutex<Option<Session>>>)
//! orange_token ──→ Entry::Alias(host_token)
//! blue_token   ──→ Entry::Alias(host_token)
//! ```
//!
//! # Locking
//!
//! Two levels, always taken in the same order:
//!
//! 1. The index `RwLock`, held only long enough to look up or
//!    insert/remove entries. It is never held while waiting on a
//!    session lock.
//! 2. One `Mutex` per session. [`SessionRegistry::with_session`] runs its
//!    closure under it, so submissions to the same session serialize
//!    while different sessions proceed in parallel.
//!
//! Closing takes the session out of its slot (leaving `None`) before
//! removing the index entries. A reader that fetched the slot just before
//! the removal finds `None` once it gets the lock, so it sees `NotFound`,
//! never a half-closed session. The same holds if the closing task is
//! aborted while waiting for the index lock: the stale entries lead to
//! an empty slot, which every lookup, [`len`](SessionRegistry::len) and
//! [`sessions`](SessionRegistry::sessions) treat as gone.

use std::collections::HashMap;
use std::sync::Arc;

use mapban_protocol::{CreateSession, Role, Token, ValidationErrors};
use tokio::sync::{Mutex, RwLock};

use crate::{MapCatalog, RandomTokenIssuer, Session, SessionError, TokenIssuer};

type Slot = Arc<Mutex<Option<Session>>>;

enum Entry {
    /// The authoritative record. `None` once the session is closed.
    Host(Slot),
    /// Points at the Host token of the same session.
    Alias(Token),
}

/// Exclusive access to one session for the duration of a
/// [`SessionRegistry::with_session`] closure.
pub struct SessionEntry<'a> {
    session: &'a mut Session,
    close: bool,
}

impl SessionEntry<'_> {
    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        self.session
    }

    /// Removes the session and all three tokens when the closure returns,
    /// before the session lock is released.
    pub fn close(&mut self) {
        self.close = true;
    }
}

/// Concurrent-safe store of live sessions.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct SessionRegistry {
    entries: RwLock<HashMap<Token, Entry>>,
    issuer: Box<dyn TokenIssuer>,
}

impl SessionRegistry {
    /// Creates an empty registry that issues tokens from the OS CSPRNG.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            issuer: Box::new(RandomTokenIssuer),
        }
    }

    /// Replaces the token issuer.
    pub fn with_issuer(mut self, issuer: impl TokenIssuer) -> Self {
        self.issuer = Box::new(issuer);
        self
    }

    /// Rebuilds a registry from previously exported sessions.
    ///
    /// # Errors
    /// [`SessionError::Inconsistent`] if a session breaks an invariant or
    /// a token appears more than once across all sessions.
    pub fn from_sessions<I>(sessions: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = Session>,
    {
        let mut entries: HashMap<Token, Entry> = HashMap::new();
        for session in sessions {
            session
                .check_invariants()
                .map_err(SessionError::Inconsistent)?;
            if let Some(dup) =
                session.tokens().into_iter().find(|t| entries.contains_key(*t))
            {
                return Err(SessionError::Inconsistent(format!(
                    "token {} belongs to more than one session",
                    dup.fingerprint()
                )));
            }
            insert_session(&mut entries, session);
        }

        Ok(Self {
            entries: RwLock::new(entries),
            issuer: Box::new(RandomTokenIssuer),
        })
    }

    /// Validates a creation request and registers the new session under
    /// all three of its tokens at once.
    ///
    /// # Errors
    /// - [`SessionError::Invalid`]: empty team name or a bad pool; every
    ///   problem is listed
    /// - [`SessionError::TokenGeneration`]: no secure randomness
    /// - [`SessionError::TokenCollision`]: a fresh token is already taken
    pub async fn create(
        &self,
        catalog: &MapCatalog,
        request: CreateSession,
    ) -> Result<Session, SessionError> {
        let CreateSession {
            orange_team_name,
            blue_team_name,
            map_pool,
        } = request;

        let mut errors = ValidationErrors::new();
        if orange_team_name.trim().is_empty() {
            errors.push("orangeTeamName", "must not be empty");
        }
        if blue_team_name.trim().is_empty() {
            errors.push("blueTeamName", "must not be empty");
        }
        catalog.check_pool(&map_pool, &mut errors);
        errors.into_result().map_err(SessionError::Invalid)?;

        let session = Session::new(
            self.issuer.issue()?,
            self.issuer.issue()?,
            self.issuer.issue()?,
            orange_team_name,
            blue_team_name,
            map_pool,
        );
        let [host, orange, blue] = session.tokens();
        if host == orange || host == blue || orange == blue {
            return Err(SessionError::TokenCollision);
        }

        {
            let mut entries = self.entries.write().await;
            if session.tokens().into_iter().any(|t| entries.contains_key(t)) {
                return Err(SessionError::TokenCollision);
            }
            insert_session(&mut entries, session.clone());
        }

        tracing::info!(
            host = %session.host_token().fingerprint(),
            orange_team = %session.orange_team_name(),
            blue_team = %session.blue_team_name(),
            pool_size = session.map_pool().len(),
            "session created"
        );
        Ok(session)
    }

    /// Returns a copy of the session behind any of its three tokens.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the token is unknown or its session
    /// has been closed.
    pub async fn resolve_host(
        &self,
        token: &Token,
    ) -> Result<Session, SessionError> {
        let slot = self.slot(token).await?;
        let guard = slot.lock().await;
        guard.clone().ok_or_else(|| not_found(token))
    }

    /// Like [`resolve_host`](Self::resolve_host), also reporting which
    /// role `token` holds.
    pub async fn resolve(
        &self,
        token: &Token,
    ) -> Result<(Role, Session), SessionError> {
        let session = self.resolve_host(token).await?;
        let role = session.role_of(token).ok_or_else(|| not_found(token))?;
        Ok((role, session))
    }

    /// Runs `f` with exclusive access to the session behind `token`.
    ///
    /// Calls for the same session run one at a time, in the order they
    /// acquire the session lock. Calls for different sessions never wait
    /// on each other. If `f` calls [`SessionEntry::close`], the session
    /// and its three tokens are removed before the lock is released.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the token doesn't resolve; `f` is
    /// not called.
    pub async fn with_session<F, R>(
        &self,
        token: &Token,
        f: F,
    ) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SessionEntry<'_>) -> R,
    {
        let slot = self.slot(token).await?;
        let mut guard = slot.lock().await;
        let session = guard.as_mut().ok_or_else(|| not_found(token))?;

        let mut entry = SessionEntry {
            session,
            close: false,
        };
        let result = f(&mut entry);
        let close = entry.close;

        if close {
            // Emptied under the session lock, before the next await.
            if let Some(session) = guard.take() {
                self.remove_entries(&session).await;
            }
        }
        Ok(result)
    }

    /// Removes the session behind `token` and all three of its tokens.
    ///
    /// Returns the session as it was at closing time.
    pub async fn close(&self, token: &Token) -> Result<Session, SessionError> {
        self.with_session(token, |entry| {
            entry.close();
            entry.session().clone()
        })
        .await
    }

    /// Number of live sessions (not tokens).
    pub async fn len(&self) -> usize {
        let mut live = 0;
        for slot in self.host_slots().await {
            if slot.lock().await.is_some() {
                live += 1;
            }
        }
        live
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copies every live session, ordered by Host token.
    ///
    /// Each session is read under its own lock, so the copy is consistent
    /// per session but not across sessions. Snapshot only once mutation
    /// has stopped.
    pub async fn sessions(&self) -> Vec<Session> {
        let slots = self.host_slots().await;
        let mut sessions = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(session) = slot.lock().await.clone() {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| a.host_token().cmp(b.host_token()));
        sessions
    }

    /// Every Host slot, copied out so no session lock is awaited under
    /// the index lock.
    async fn host_slots(&self) -> Vec<Slot> {
        self.entries
            .read()
            .await
            .values()
            .filter_map(|e| match e {
                Entry::Host(slot) => Some(Arc::clone(slot)),
                Entry::Alias(_) => None,
            })
            .collect()
    }

    /// Finds the Host slot for any of a session's tokens.
    async fn slot(&self, token: &Token) -> Result<Slot, SessionError> {
        let entries = self.entries.read().await;
        let slot = match entries.get(token) {
            Some(Entry::Host(slot)) => Some(slot),
            Some(Entry::Alias(host)) => match entries.get(host) {
                Some(Entry::Host(slot)) => Some(slot),
                _ => {
                    tracing::error!(
                        token = %token.fingerprint(),
                        host = %host.fingerprint(),
                        "alias token has no host session"
                    );
                    None
                }
            },
            None => None,
        };
        slot.map(Arc::clone).ok_or_else(|| not_found(token))
    }

    async fn remove_entries(&self, session: &Session) {
        let mut entries = self.entries.write().await;
        for token in session.tokens() {
            entries.remove(token);
        }
        tracing::info!(
            host = %session.host_token().fingerprint(),
            "session closed"
        );
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_session(entries: &mut HashMap<Token, Entry>, session: Session) {
    let host = session.host_token().clone();
    entries.insert(
        session.orange_token().clone(),
        Entry::Alias(host.clone()),
    );
    entries.insert(session.blue_token().clone(), Entry::Alias(host.clone()));
    entries.insert(host, Entry::Host(Arc::new(Mutex::new(Some(session)))));
}

fn not_found(token: &Token) -> SessionError {
    SessionError::NotFound(token.fingerprint().to_owned())
}

// =========================================================================
// Tests
// =========================================================================
