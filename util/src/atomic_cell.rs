use parking_lot::Mutex;

/// A generic compare-and-set cell.
///
/// The executor mailbox needs to CAS an `Option<Arc<Call>>`, which is not
/// `Copy` and therefore cannot sit in a `std::sync::atomic` cell directly.
/// `AtomicCell` provides the same `value`/`set_value`/`compare_set_value`
/// surface backed by a short mutex hold, which is sufficient since callers
/// never hold the cell's lock across a blocking call.
#[derive(Debug)]
pub struct AtomicCell<T> {
    inner: Mutex<T>,
}

impl<T: Clone + PartialEq> AtomicCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn value(&self) -> T {
        self.inner.lock().clone()
    }

    pub fn set_value(&self, value: T) {
        *self.inner.lock() = value;
    }

    /// Replaces the held value with `new` iff it currently equals `expected`.
    pub fn compare_set_value(&self, expected: &T, new: T) -> bool {
        let mut guard = self.inner.lock();
        if *guard == *expected {
            *guard = new;
            true
        } else {
            false
        }
    }
}
