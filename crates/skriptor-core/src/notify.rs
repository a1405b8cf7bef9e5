//! Blocking alerts and the shared busy indicator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct NotifierState {
    alerts: VecDeque<String>,
    // Live busy guards, oldest first.
    busy: Vec<(u64, String)>,
    next_guard: u64,
}

/// Cloneable handle; all clones share one alert queue and one busy indicator.
///
/// The busy indicator is reference counted: it stays visible while any
/// [`BusyGuard`] is alive and shows the label of the newest one.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<NotifierState>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, NotifierState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn alert(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "alert");
        self.state().alerts.push_back(message);
    }

    /// Alert shown to the user right now, if any.
    pub fn current_alert(&self) -> Option<String> {
        self.state().alerts.front().cloned()
    }

    pub fn dismiss_alert(&self) -> Option<String> {
        self.state().alerts.pop_front()
    }

    pub fn pending_alerts(&self) -> Vec<String> {
        self.state().alerts.iter().cloned().collect()
    }

    pub fn show_busy(&self, label: impl Into<String>) -> BusyGuard {
        let mut state = self.state();
        let id = state.next_guard;
        state.next_guard += 1;
        state.busy.push((id, label.into()));

        BusyGuard {
            notifier: self.clone(),
            id,
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.state().busy.is_empty()
    }

    pub fn busy_label(&self) -> Option<String> {
        self.state().busy.last().map(|(_, label)| label.clone())
    }

    fn release(&self, id: u64) {
        self.state().busy.retain(|(guard, _)| *guard != id);
    }
}

/// Hides its share of the busy indicator when dropped.
#[derive(Debug)]
pub struct BusyGuard {
    notifier: Notifier,
    id: u64,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.notifier.release(self.id);
    }
}
