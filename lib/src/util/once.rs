use parking_lot::RwLock;

/// A cell computed at most once per reset, guarded by its own lock.
///
/// Readers never observe an uninitialized value: [`ComputeOnce::get_or_init`]
/// either returns the stored value or computes one and stores it. The
/// computation runs without holding the cell's lock, so it may itself take
/// other locks. When two readers race, the first store wins and both return
/// the stored value.
#[derive(Debug)]
pub struct ComputeOnce<T> {
    value: RwLock<Option<T>>,
}

impl<T: Copy> ComputeOnce<T> {
    pub fn new() -> Self {
        ComputeOnce { value: RwLock::new(None) }
    }

    #[inline]
    pub fn get(&self) -> Option<T> {
        *self.value.read()
    }

    pub fn get_or_init<F: FnOnce() -> T>(&self, init: F) -> T {
        if let Some(value) = *self.value.read() {
            return value;
        }

        let value = init();
        *self.value.write().get_or_insert(value)
    }

    /// Stores `value`, replacing any existing value.
    pub fn set(&self, value: T) {
        *self.value.write() = Some(value);
    }

    pub fn take(&self) -> Option<T> {
        self.value.write().take()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::ComputeOnce;

    #[test]
    fn computes_once_until_taken() {
        let calls = AtomicUsize::new(0);
        let cell = ComputeOnce::new();
        let init = || { calls.fetch_add(1, Ordering::SeqCst); 7u64 };

        assert_eq!(cell.get(), None);
        assert_eq!(cell.get_or_init(init), 7);
        assert_eq!(cell.get_or_init(init), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(cell.take(), Some(7));
        assert_eq!(cell.get_or_init(|| 9), 9);
    }

    #[test]
    fn concurrent_readers_agree() {
        let cell = ComputeOnce::<u64>::new();
        let values: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let cell = &cell;
                    s.spawn(move || cell.get_or_init(|| i))
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(values.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cell.get(), Some(values[0]));
    }
}
