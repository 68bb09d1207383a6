//! Per-thread identifier used to key shared-memory segment names.
//!
//! `std::thread::ThreadId`'s `Display` impl is not guaranteed stable or
//! parseable, so segment names are keyed on a small counter assigned once
//! per thread on first use instead — unique across concurrently calling
//! threads in the same process, which is all the shared-memory segment
//! naming scheme requires.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static TID: Cell<u64> = const { Cell::new(0) };
}

/// Decimal string unique to the calling thread, stable for its lifetime.
#[must_use]
pub fn current() -> String {
    TID.with(|cell| {
        let mut value = cell.get();
        if value == 0 {
            value = NEXT_TID.fetch_add(1, Ordering::Relaxed);
            cell.set(value);
        }
        value.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_a_thread() {
        assert_eq!(current(), current());
    }

    #[test]
    fn distinct_across_threads() {
        let a = current();
        let b = std::thread::spawn(current).join().unwrap();
        assert_ne!(a, b);
    }
}
