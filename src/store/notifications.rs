use std::{cell::RefCell, rc::Rc, time::Duration};

use indexmap::IndexMap;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use super::Clean;


/// Identifier of a notification. Never reused during the lifetime of a store.
pub type NotificationId = u64;

/// Largest integer a JavaScript UI can hold exactly. Ids wrap back to 1 after it.
const MAX_NOTIFICATION_ID: NotificationId = (1 << 53) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    /// How long a UI should show the notification. `None` uses the store default.
    pub timeout: Option<Duration>,
}

impl Notification {
    pub fn new(kind: NotificationType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timeout: None,
        }
    }
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Default)]
struct NotificationsState {
    items: IndexMap<NotificationId, Notification>,
    last_id: NotificationId,
    default_timeout: Option<Duration>,
}

impl NotificationsState {
    fn next_id(&mut self) -> NotificationId {
        if self.last_id == MAX_NOTIFICATION_ID {
            self.last_id = 0;
        }
        self.last_id += 1;
        self.last_id
    }
}

/// The list of notifications shown to the user.
///
/// Stores never expire entries themselves; a UI deletes a notification by id once its
/// timeout elapses.
#[derive(Clone, Debug, Default)]
pub struct NotificationsStore(Rc<RefCell<NotificationsState>>);

impl NotificationsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose notifications without a timeout get `timeout`.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        let store = Self::new();
        store.0.borrow_mut().default_timeout = Some(timeout);
        store
    }

    /// Appends a notification and returns its id.
    pub fn add(&self, notification: Notification) -> NotificationId {
        self.insert(notification, false)
    }

    /// Inserts a notification before all others and returns its id.
    pub fn prepend(&self, notification: Notification) -> NotificationId {
        self.insert(notification, true)
    }

    fn insert(&self, mut notification: Notification, prepend: bool) -> NotificationId {
        let mut s = self.0.borrow_mut();
        let id = s.next_id();
        if notification.timeout.is_none() {
            notification.timeout = s.default_timeout;
        }
        if prepend {
            s.items.shift_insert(0, id, notification);
        } else {
            s.items.insert(id, notification);
        }
        log::trace!("notification {id} added");
        id
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.0.borrow().items.get(&id).cloned()
    }

    pub fn delete(&self, id: NotificationId) -> Option<Notification> {
        self.0.borrow_mut().items.shift_remove(&id)
    }

    /// Deletes every notification, or only those of `kind`.
    pub fn delete_all(&self, kind: Option<NotificationType>) {
        self.0
            .borrow_mut()
            .items
            .retain(|_, n| kind.is_some_and(|kind| n.kind != kind));
    }

    /// `true` if any notification is an error.
    pub fn has_error(&self) -> bool {
        self.0
            .borrow()
            .items
            .values()
            .any(|n| n.kind == NotificationType::Error)
    }

    /// The current notifications, in display order.
    pub fn items(&self) -> Vec<(NotificationId, Notification)> {
        self.0
            .borrow()
            .items
            .iter()
            .map(|(id, n)| (*id, n.clone()))
            .collect()
    }
    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }
}

impl Clean for NotificationsStore {
    /// Deletes every notification. Ids keep increasing.
    fn clean(&self) {
        self.delete_all(None);
    }
}
