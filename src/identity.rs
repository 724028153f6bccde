//! Identity boundary.
//!
//! The ledger store treats the authenticated user's stable identifier as
//! its partition key: every entry carries `created_by`, and every read path
//! filters on it before anything else. Any authentication service can sit
//! behind [`IdentityProvider`]; [`StaticIdentity`] is the shipped
//! implementation for embedded use and tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Stable user identifier (the ledger partition key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Callback invoked when the authenticated user changes.
///
/// `None` means signed out.
pub type AuthCallback = Arc<dyn Fn(Option<&UserId>) + Send + Sync>;

/// Trait for authentication services providing the current user.
///
/// Implementations must invoke the callback registered via
/// [`IdentityProvider::on_auth_state_changed`] once with the current state
/// at registration time, then again on every subsequent change.
pub trait IdentityProvider: Send + Sync {
    /// The currently authenticated user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// Register an auth-state listener. The returned id can be passed to
    /// [`IdentityProvider::remove_listener`].
    fn on_auth_state_changed(&self, callback: AuthCallback) -> usize;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn remove_listener(&self, listener: usize);
}

/// Fixed-user identity for embedded deployments and tests.
pub struct StaticIdentity {
    user: Mutex<Option<UserId>>,
    listeners: Mutex<Vec<(usize, AuthCallback)>>,
    next_listener: Mutex<usize>,
}

impl StaticIdentity {
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self {
            user: Mutex::new(Some(user.into())),
            listeners: Mutex::new(Vec::new()),
            next_listener: Mutex::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener: Mutex::new(0),
        }
    }

    /// Swap the signed-in user and notify listeners.
    ///
    /// Callbacks run with no lock held, so a listener may unsubscribe or
    /// register another listener from inside its callback.
    pub fn set_user(&self, user: Option<UserId>) {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = user.clone();
        let callbacks: Vec<AuthCallback> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in callbacks {
            callback(user.as_ref());
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn on_auth_state_changed(&self, callback: AuthCallback) -> usize {
        let id = {
            let mut next = self.next_listener.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        callback(self.current_user().as_ref());
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, callback));
        id
    }

    fn remove_listener(&self, listener: usize) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(id, _)| *id != listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listener_fires_immediately_and_on_change() {
        let identity = StaticIdentity::signed_in("u1");
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        identity.on_auth_state_changed(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        identity.set_user(None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(identity.current_user(), None);
    }

    #[test]
    fn test_listener_can_unsubscribe_from_inside_its_callback() {
        let identity = Arc::new(StaticIdentity::signed_in("u1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let listener_id = Arc::new(Mutex::new(None::<usize>));

        let seen = calls.clone();
        let provider = identity.clone();
        let own_id = listener_id.clone();
        let id = identity.on_auth_state_changed(Arc::new(move |user| {
            seen.fetch_add(1, Ordering::SeqCst);
            // Unsubscribe on sign-out, re-entering the provider.
            if user.is_none() {
                if let Some(id) = *own_id.lock().unwrap() {
                    provider.remove_listener(id);
                }
            }
        }));
        *listener_id.lock().unwrap() = Some(id);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        identity.set_user(None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The listener removed itself; further changes do not fire it.
        identity.set_user(Some(UserId::from("u2")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_removed_listener_stops_firing() {
        let identity = StaticIdentity::signed_out();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = identity.on_auth_state_changed(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        identity.remove_listener(id);
        identity.set_user(Some(UserId::from("u2")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
