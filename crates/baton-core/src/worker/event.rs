//! Event - ordered multi-listener callback list.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Handle returned by [`Event::add_listener`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut() + Send + 'static>;

/// Ordered list of zero-argument listeners.
///
/// Listeners are invoked synchronously in registration order. A listener
/// that panics is logged and skipped; the rest still run.
pub struct Event {
    name: &'static str,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl Event {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every listener in registration order.
    ///
    /// Returns the number of listeners that panicked.
    pub fn invoke(&mut self) -> usize {
        let mut panicked = 0;
        for (id, listener) in self.listeners.iter_mut() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener())) {
                panicked += 1;
                tracing::error!(
                    event = self.name,
                    listener = id.0,
                    panic = %panic_message(payload.as_ref()),
                    "hook listener panicked"
                );
            }
        }
        panicked
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// The four lifecycle hooks of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Start,
    Update,
    Close,
    Error,
}

/// The hook events of one worker.
#[derive(Debug)]
pub struct Hooks {
    start: Event,
    update: Event,
    close: Event,
    error: Event,
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            start: Event::new("start"),
            update: Event::new("update"),
            close: Event::new("close"),
            error: Event::new("error"),
        }
    }

    pub fn event(&self, kind: HookKind) -> &Event {
        match kind {
            HookKind::Start => &self.start,
            HookKind::Update => &self.update,
            HookKind::Close => &self.close,
            HookKind::Error => &self.error,
        }
    }

    pub fn event_mut(&mut self, kind: HookKind) -> &mut Event {
        match kind {
            HookKind::Start => &mut self.start,
            HookKind::Update => &mut self.update,
            HookKind::Close => &mut self.close,
            HookKind::Error => &mut self.error,
        }
    }

    pub(crate) fn fire(&mut self, kind: HookKind) -> usize {
        self.event_mut(kind).invoke()
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
