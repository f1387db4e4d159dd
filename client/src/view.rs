//! In-memory collections shown by a view.
//!
//! A [`ViewList`] belongs to one screen. When that screen goes away it is
//! disposed, and any request still in flight finishes without touching it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

#[derive(Debug)]
pub struct ViewList<T> {
    inner: Arc<ViewListInner<T>>,
}

impl<T> Clone for ViewList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct ViewListInner<T> {
    name: &'static str,
    items: RwLock<Vec<T>>,
    disposed: AtomicBool,
}

impl<T: Clone> ViewList<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(ViewListInner {
                name,
                items: RwLock::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.read().iter().find(|item| pred(item)).cloned()
    }

    /// Swap in a freshly loaded list. Returns false if the view is gone.
    pub fn replace(&self, items: Vec<T>) -> bool {
        if self.gone() {
            return false;
        }
        *self.write() = items;
        true
    }

    /// Edit the list in place. Returns false if the view is gone.
    pub fn update(&self, f: impl FnOnce(&mut Vec<T>)) -> bool {
        if self.gone() {
            return false;
        }
        f(&mut self.write());
        true
    }

    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn gone(&self) -> bool {
        let gone = self.is_disposed();
        if gone {
            debug!("Dropping late result for disposed {} view", self.inner.name);
        }
        gone
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.inner.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.inner.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_and_update() {
        let list = ViewList::new("numbers");
        assert!(list.replace(vec![1, 2, 3]));
        assert!(list.update(|v| v.retain(|n| *n != 2)));
        assert_eq!(list.snapshot(), vec![1, 3]);
        assert_eq!(list.find(|n| *n > 1), Some(3));
    }

    #[test]
    fn disposed_list_ignores_writes() {
        let list = ViewList::new("numbers");
        list.replace(vec![1]);
        let late = list.clone();
        list.dispose();

        assert!(!late.replace(vec![9, 9]));
        assert!(!late.update(|v| v.clear()));
        assert_eq!(list.snapshot(), vec![1]);
    }
}
