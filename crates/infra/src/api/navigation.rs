//! Host navigation seam
//!
//! When a session cannot be restored the client sends the user to the auth
//! entry location. The host decides what "navigate" means (a router push, a
//! window reload, a UI event); [`BroadcastNavigator`] is the default and
//! publishes each navigation to subscribers.

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::info;

use encore_domain::constants::ROOT_LOCATION;

/// Capacity of the navigation event channel.
const EVENT_CAPACITY: usize = 16;

/// Current-location read plus navigate.
pub trait Navigator: Send + Sync {
    /// Path of the location the user is currently on.
    fn current_location(&self) -> String;

    /// Send the user to `path`.
    fn navigate(&self, path: &str);
}

/// A completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    /// Location before the navigation.
    pub from: String,
    /// Location navigated to.
    pub to: String,
}

/// Tracks the current location and broadcasts every navigation.
pub struct BroadcastNavigator {
    location: RwLock<String>,
    events: broadcast::Sender<NavigationEvent>,
}

impl BroadcastNavigator {
    /// Navigator starting at `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { location: RwLock::new(initial.into()), events }
    }

    /// Receive every navigation from now on. Slow receivers lag rather than
    /// block navigation.
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    /// Record a host-driven location change without emitting an event.
    pub fn set_location(&self, path: impl Into<String>) {
        *self.location.write() = path.into();
    }
}

impl Default for BroadcastNavigator {
    fn default() -> Self {
        Self::new(ROOT_LOCATION)
    }
}

impl Navigator for BroadcastNavigator {
    fn current_location(&self) -> String {
        self.location.read().clone()
    }

    fn navigate(&self, path: &str) {
        let from = std::mem::replace(&mut *self.location.write(), path.to_string());
        info!(from = %strip_query(&from), to = %path, "navigating");

        // No subscribers is fine.
        let _ = self.events.send(NavigationEvent { from, to: path.to_string() });
    }
}

/// True if `location` is `entry` or below it, comparing whole path segments.
///
/// `/login` and `/login/sso?next=/` are within `/login`; `/login2` is not.
pub fn is_within(location: &str, entry: &str) -> bool {
    let location = strip_query(location).trim_end_matches('/');
    let entry = entry.trim_end_matches('/');

    if entry.is_empty() {
        return true;
    }

    match location.strip_prefix(entry) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub(crate) fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
