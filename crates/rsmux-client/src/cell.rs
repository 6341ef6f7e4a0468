//! Observable value cells.
//!
//! A [`ValueCell`] holds one value, replaced wholesale by `set`. Changes are
//! visible synchronously through [`ValueCell::subscribe`] listeners and
//! asynchronously through [`ValueCell::watch`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellInner<T> {
    value: watch::Sender<T>,
    listeners: Mutex<Listeners<T>>,
}

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

impl<T> CellInner<T> {
    fn listeners(&self) -> MutexGuard<'_, Listeners<T>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A shared, observable value. Clones refer to the same cell.
pub struct ValueCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for ValueCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueCell")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> ValueCell<T> {
    pub fn new(value: T) -> Self {
        let (value, _) = watch::channel(value);
        Self {
            inner: Arc::new(CellInner {
                value,
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify listeners.
    pub fn set(&self, value: T) {
        self.inner.value.send_replace(value.clone());
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Replace the value with one built from the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Call `listener` with every subsequent value until the returned handle
    /// is dropped or [`CellSubscription::unsubscribe`] is called.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> CellSubscription {
        let id = {
            let mut listeners = self.inner.listeners();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
            id
        };
        let cell: Weak<CellInner<T>> = Arc::downgrade(&self.inner);
        CellSubscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = cell.upgrade() {
                    inner.listeners().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// A receiver that observes the current value and every later change.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.value.subscribe()
    }

    /// Wait until the value satisfies `predicate`, then return it.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&T) -> bool) -> T {
        let mut rx = self.watch();
        let found = match rx.wait_for(|value| predicate(value)).await {
            Ok(value) => value.clone(),
            // unreachable while `self` holds the sender
            Err(_) => self.get(),
        };
        found
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().entries.len()
    }
}

/// Handle returned by [`ValueCell::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct CellSubscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CellSubscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for CellSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for CellSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellSubscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}
