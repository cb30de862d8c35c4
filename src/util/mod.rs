//! Small shared helpers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

static LAST_CLIENT_ID: AtomicU64 = AtomicU64::new(0);

/// Generate a monotonically-increasing numeric client order ID.
///
/// Millisecond timestamps are used directly; if more than one ID is
/// requested within the same millisecond the counter advances past it so
/// IDs stay unique within the process.
pub fn gen_client_id() -> u64 {
    let now = Utc::now().timestamp_millis() as u64;
    let prev = LAST_CLIENT_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(if last < now { now } else { last + 1 })
        })
        .unwrap_or(0);

    if prev < now {
        now
    } else {
        prev + 1
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ids_strictly_increase() {
        let ids: Vec<u64> = (0..100).map(|_| gen_client_id()).collect();

        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0], "ids not increasing: {pair:?}");
        }
    }

    #[test]
    fn test_lock_recovers_from_poison() {
        let mutex = std::sync::Arc::new(Mutex::new(1));

        let m = std::sync::Arc::clone(&mutex);
        let _ = std::thread::spawn(move || {
            let _guard = m.lock().unwrap();
            panic!("poison it");
        })
        .join();

        assert_eq!(*lock(&mutex), 1);
    }
}
