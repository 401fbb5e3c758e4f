use std::{cell::RefCell, collections::HashMap, rc::Rc};

use super::Clean;


#[derive(Debug, Default)]
struct WorkerState {
    pending: usize,
    tasks: HashMap<String, usize>,
}

/// Counts running requests on the default counter and per named task.
#[derive(Clone, Debug, Default)]
pub struct WorkerStore(Rc<RefCell<WorkerState>>);

impl WorkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a running request on the default counter, or on `task`.
    pub fn push(&self, task: Option<&str>) {
        let mut s = self.0.borrow_mut();
        match task {
            Some(task) => *s.tasks.entry(task.to_owned()).or_default() += 1,
            None => s.pending += 1,
        }
    }

    /// Unregisters a request. Counters never go below zero.
    pub fn pop(&self, task: Option<&str>) {
        let mut s = self.0.borrow_mut();
        match task {
            Some(task) => {
                if let Some(count) = s.tasks.get_mut(task) {
                    *count -= 1;
                    if *count == 0 {
                        s.tasks.remove(task);
                    }
                }
            }
            None => s.pending = s.pending.saturating_sub(1),
        }
    }

    /// `true` while a request holds the default counter.
    ///
    /// Named tasks are not included; use [`is_pending`](Self::is_pending) or
    /// [`any_pending`](Self::any_pending) for them.
    pub fn loading(&self) -> bool {
        self.0.borrow().pending > 0
    }
    pub fn is_pending(&self, task: &str) -> bool {
        self.0.borrow().tasks.contains_key(task)
    }
    pub fn any_pending(&self) -> bool {
        let s = self.0.borrow();
        s.pending > 0 || !s.tasks.is_empty()
    }

    /// Number of running requests on the default counter, or on `task`.
    pub fn pending_count(&self, task: Option<&str>) -> usize {
        let s = self.0.borrow();
        match task {
            Some(task) => s.tasks.get(task).copied().unwrap_or(0),
            None => s.pending,
        }
    }
}

impl Clean for WorkerStore {
    /// Resets every counter.
    fn clean(&self) {
        let mut s = self.0.borrow_mut();
        s.pending = 0;
        s.tasks.clear();
    }
}
