//! Session state and auth event fan-out.
//!
//! The gateway consults this context for the bearer token and reports
//! global auth outcomes through it: a 401 forces a logout, a 403 becomes a
//! permission-denied event. Listeners register on an explicit list and
//! deregister with the returned id; there is no single overwritable
//! callback slot.

use std::{
  path::PathBuf,
  sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
  },
};

use serde::{Deserialize, Serialize};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Auth lifecycle notifications delivered to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
  LoggedIn,
  LoggedOut,
  PermissionDenied,
}

/// Handle for deregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(AuthEvent) + Send + Sync>;

// ─── Session ─────────────────────────────────────────────────────────────────

/// The two durable fields of a session. Persisted as a small JSON file when
/// a session store is configured; nothing else survives a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Session {
  token:    Option<String>,
  username: Option<String>,
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Shared authentication state, injected into the gateway and any component
/// that needs to react to login state changes.
pub struct AuthContext {
  session:   Mutex<Session>,
  listeners: Mutex<Vec<(u64, Listener)>>,
  next_id:   AtomicU64,
  store:     Option<PathBuf>,
}

impl AuthContext {
  /// A context with no durable storage; the session lives and dies with
  /// the process.
  pub fn in_memory() -> Self {
    Self {
      session:   Mutex::new(Session::default()),
      listeners: Mutex::new(Vec::new()),
      next_id:   AtomicU64::new(0),
      store:     None,
    }
  }

  /// A context backed by a JSON session file. A missing or unreadable file
  /// starts an empty session; persistence failures are logged, never
  /// surfaced.
  pub fn with_store(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let session = match std::fs::read_to_string(&path) {
      Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring malformed session file");
        Session::default()
      }),
      Err(_) => Session::default(),
    };
    Self {
      session:   Mutex::new(session),
      listeners: Mutex::new(Vec::new()),
      next_id:   AtomicU64::new(0),
      store:     Some(path),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn token(&self) -> Option<String> {
    self.session.lock().expect("session lock").token.clone()
  }

  pub fn username(&self) -> Option<String> {
    self.session.lock().expect("session lock").username.clone()
  }

  pub fn is_logged_in(&self) -> bool {
    self.token().is_some()
  }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Install a fresh session and announce the login.
  pub fn set_session(&self, token: String, username: String) {
    let session = Session { token: Some(token), username: Some(username) };
    self.persist(&session);
    *self.session.lock().expect("session lock") = session;
    self.emit(AuthEvent::LoggedIn);
  }

  /// Drop the session and announce the logout. Called both for explicit
  /// logouts and by the gateway's 401 policy.
  pub fn clear_session(&self) {
    let session = Session::default();
    if let Some(path) = &self.store {
      if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
          tracing::warn!(path = %path.display(), error = %e, "failed to remove session file");
        }
      }
    }
    *self.session.lock().expect("session lock") = session;
    self.emit(AuthEvent::LoggedOut);
  }

  /// Announce a server-side permission denial (gateway 403 policy).
  pub fn permission_denied(&self) {
    self.emit(AuthEvent::PermissionDenied);
  }

  // ── Listeners ─────────────────────────────────────────────────────────

  /// Register `listener` and return the id that deregisters it.
  pub fn listen(
    &self,
    listener: impl Fn(AuthEvent) + Send + Sync + 'static,
  ) -> ListenerId {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self
      .listeners
      .lock()
      .expect("listener lock")
      .push((id, Box::new(listener)));
    ListenerId(id)
  }

  /// Returns whether the id was registered.
  pub fn unlisten(&self, id: ListenerId) -> bool {
    let mut listeners = self.listeners.lock().expect("listener lock");
    let before = listeners.len();
    listeners.retain(|(entry_id, _)| *entry_id != id.0);
    listeners.len() != before
  }

  fn emit(&self, event: AuthEvent) {
    let listeners = self.listeners.lock().expect("listener lock");
    for (_, listener) in listeners.iter() {
      listener(event);
    }
  }

  fn persist(&self, session: &Session) {
    let Some(path) = &self.store else { return };
    if let Some(parent) = path.parent() {
      if let Err(e) = std::fs::create_dir_all(parent) {
        tracing::warn!(path = %path.display(), error = %e, "failed to create session directory");
        return;
      }
    }
    match serde_json::to_string_pretty(session) {
      Ok(raw) => {
        if let Err(e) = std::fs::write(path, raw) {
          tracing::warn!(path = %path.display(), error = %e, "failed to write session file");
        }
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to serialise session");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn login_and_logout_reach_listeners_in_order() {
    let context = AuthContext::in_memory();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for tag in ["a", "b"] {
      let seen = Arc::clone(&seen);
      context.listen(move |event| seen.lock().unwrap().push((tag, event)));
    }

    context.set_session("tok".into(), "alice".into());
    context.clear_session();

    assert_eq!(
      *seen.lock().unwrap(),
      vec![
        ("a", AuthEvent::LoggedIn),
        ("b", AuthEvent::LoggedIn),
        ("a", AuthEvent::LoggedOut),
        ("b", AuthEvent::LoggedOut),
      ]
    );
    assert!(!context.is_logged_in());
  }

  #[test]
  fn unlisten_stops_delivery() {
    let context = AuthContext::in_memory();
    let count = Arc::new(Mutex::new(0u32));

    let counter = Arc::clone(&count);
    let id = context.listen(move |_| *counter.lock().unwrap() += 1);

    context.permission_denied();
    assert!(context.unlisten(id));
    context.permission_denied();

    assert_eq!(*count.lock().unwrap(), 1);
  }

  #[test]
  fn session_file_round_trip() {
    let path = std::env::temp_dir().join(format!(
      "toolcrib-session-test-{}.json",
      uuid::Uuid::new_v4()
    ));

    let context = AuthContext::with_store(&path);
    assert!(!context.is_logged_in());
    context.set_session("tok".into(), "alice".into());

    let reloaded = AuthContext::with_store(&path);
    assert_eq!(reloaded.token().as_deref(), Some("tok"));
    assert_eq!(reloaded.username().as_deref(), Some("alice"));

    reloaded.clear_session();
    let empty = AuthContext::with_store(&path);
    assert!(!empty.is_logged_in());
  }
}
