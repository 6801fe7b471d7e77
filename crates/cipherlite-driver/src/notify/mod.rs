//! Notification bridge: the engine's update hook feeding a subscriber set.
//!
//! The hook runs inside the engine while a statement is stepping. It checks
//! the subscribed set and enqueues `(table, row id)` for subscribed tables on
//! an unbounded crossbeam channel, nothing more. `drain` turns queued changes
//! into `Notification`s at a point the caller chooses. A change still queued
//! when its table is unsubscribed is discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cipherlite_core::{DriverError, DriverResult, Notification};
use crossbeam_channel::{Receiver, Sender};
use rusqlite::hooks::Action;
use tracing::debug;

/// Callback invoked for every delivered notification.
pub type Listener = Box<dyn FnMut(&Notification)>;

/// Subscribed table names, shared with the hook closure.
type SubscribedSet = Arc<Mutex<Vec<String>>>;

struct Change {
    table: String,
    row_id: i64,
}

pub(crate) struct NotificationBridge {
    subscribed: SubscribedSet,
    hook_installed: bool,
    tx: Sender<Change>,
    rx: Receiver<Change>,
    listeners: Vec<Listener>,
}

impl NotificationBridge {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            subscribed: Arc::new(Mutex::new(Vec::new())),
            hook_installed: false,
            tx,
            rx,
            listeners: Vec::new(),
        }
    }

    /// Add `table` to the subscribed set, installing the hook on the first one.
    pub(crate) fn subscribe(&mut self, conn: &rusqlite::Connection, table: &str) -> DriverResult<()> {
        if is_listed(&lock(&self.subscribed), table) {
            return Err(DriverError::AlreadySubscribed {
                table: table.to_string(),
            });
        }
        if !self.hook_installed {
            let tx = self.tx.clone();
            let subscribed = Arc::clone(&self.subscribed);
            conn.update_hook(Some(move |_action: Action, _db: &str, table: &str, row_id: i64| {
                if !is_listed(&lock(&subscribed), table) {
                    return;
                }
                // The receiver lives as long as the connection.
                let _ = tx.send(Change {
                    table: table.to_string(),
                    row_id,
                });
            }));
            self.hook_installed = true;
        }
        lock(&self.subscribed).push(table.to_string());
        debug!(table, "subscribed to changes");
        Ok(())
    }

    /// Remove `table`; the hook goes when the set becomes empty.
    pub(crate) fn unsubscribe(&mut self, conn: &rusqlite::Connection, table: &str) -> DriverResult<()> {
        let now_empty = {
            let mut subscribed = lock(&self.subscribed);
            let Some(position) = subscribed.iter().position(|t| t == table) else {
                return Err(DriverError::NotSubscribed {
                    table: table.to_string(),
                });
            };
            subscribed.remove(position);
            subscribed.is_empty()
        };
        debug!(table, "unsubscribed from changes");
        if now_empty {
            self.remove_hook(conn);
        }
        Ok(())
    }

    /// Subscribed table names in subscription order.
    pub(crate) fn subscribed(&self) -> Vec<String> {
        lock(&self.subscribed).clone()
    }

    pub(crate) fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Convert queued changes into notifications, in arrival order, and hand
    /// each to every listener.
    pub(crate) fn drain(&mut self) -> Vec<Notification> {
        let subscribed = self.subscribed();
        let mut delivered = Vec::new();
        for change in self.rx.try_iter() {
            if !is_listed(&subscribed, &change.table) {
                continue;
            }
            delivered.push(Notification::TableChanged {
                table: change.table.clone(),
            });
            delivered.push(Notification::RowChanged {
                table: change.table,
                row_id: change.row_id,
            });
        }
        for notification in &delivered {
            for listener in &mut self.listeners {
                listener(notification);
            }
        }
        delivered
    }

    /// Drop the hook, the subscribed set and anything still queued.
    pub(crate) fn detach(&mut self, conn: &rusqlite::Connection) {
        lock(&self.subscribed).clear();
        self.remove_hook(conn);
        while self.rx.try_recv().is_ok() {}
    }

    fn remove_hook(&mut self, conn: &rusqlite::Connection) {
        if self.hook_installed {
            conn.update_hook(None::<fn(Action, &str, &str, i64)>);
            self.hook_installed = false;
        }
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        self.rx.len()
    }
}

fn lock(set: &SubscribedSet) -> MutexGuard<'_, Vec<String>> {
    // The set is plain data; a panic elsewhere cannot leave it half-written.
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_listed(subscribed: &[String], table: &str) -> bool {
    subscribed.iter().any(|t| t == table)
}
