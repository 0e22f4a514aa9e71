//! Round-robin selection of output destinations.
//!
//! One balancer lives for the whole run and is shared by every rule and every
//! worker thread. The cursor is not reset between rules, so destinations are
//! spread evenly across the run as a whole.

use std::sync::Mutex;
use thiserror::Error;

/// Errors raised by [`OutputBalancer::next`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalancerError {
    /// The rule has no output destinations configured.
    #[error("balancer: empty destination set")]
    EmptyDestinationSet,
}

/// Thread-safe round-robin cursor over a list of destinations.
#[derive(Debug, Default)]
pub struct OutputBalancer {
    cursor: Mutex<usize>,
}

impl OutputBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the destination under the cursor and advances it by one,
    /// wrapping at the end of `outputs`.
    ///
    /// If the cursor was left past the end by a longer list from an earlier
    /// rule it is first reduced modulo `outputs.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`BalancerError::EmptyDestinationSet`] when `outputs` is empty.
    pub fn next<'a, T>(&self, outputs: &'a [T]) -> Result<&'a T, BalancerError> {
        if outputs.is_empty() {
            return Err(BalancerError::EmptyDestinationSet);
        }

        // A poisoned lock still holds a valid index.
        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = *cursor % outputs.len();
        *cursor = (index + 1) % outputs.len();
        Ok(&outputs[index])
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_next_cycles_in_order() {
        let balancer = OutputBalancer::new();
        let outputs = ["a", "b", "c"];

        let picked: Vec<&str> = (0..7)
            .map(|_| *balancer.next(&outputs).expect("non-empty"))
            .collect();

        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_next_single_destination() {
        let balancer = OutputBalancer::new();
        let outputs = ["only"];

        for _ in 0..4 {
            assert_eq!(*balancer.next(&outputs).expect("non-empty"), "only");
        }
        // The cursor wrapped back to the start.
        assert_eq!(*balancer.next(&["a", "b"]).expect("non-empty"), "a");
    }

    #[test]
    fn test_next_empty_fails() {
        let balancer = OutputBalancer::new();
        let outputs: [String; 0] = [];

        for _ in 0..3 {
            assert_eq!(
                balancer.next(&outputs),
                Err(BalancerError::EmptyDestinationSet)
            );
        }
        // Failed calls never move the cursor.
        assert_eq!(*balancer.next(&["a", "b"]).expect("non-empty"), "a");
    }

    #[test]
    fn test_cursor_persists_across_lists() {
        let balancer = OutputBalancer::new();
        let first = ["a", "b", "c"];
        let second = ["x", "y"];

        assert_eq!(*balancer.next(&first).expect("non-empty"), "a");
        assert_eq!(*balancer.next(&first).expect("non-empty"), "b");
        // Cursor at 2 reduces to 0 for a two-element list.
        assert_eq!(*balancer.next(&second).expect("non-empty"), "x");
        assert_eq!(*balancer.next(&second).expect("non-empty"), "y");
        assert_eq!(*balancer.next(&first).expect("non-empty"), "a");
    }

    #[test]
    fn test_concurrent_callers_stay_balanced() {
        let balancer = Arc::new(OutputBalancer::new());
        let outputs: Arc<Vec<String>> =
            Arc::new(vec!["d0".into(), "d1".into(), "d2".into()]);
        let threads = 8;
        let per_thread = 125;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let balancer = Arc::clone(&balancer);
                let outputs = Arc::clone(&outputs);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| balancer.next(outputs.as_slice()).expect("non-empty").clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for dest in handle.join().expect("worker panicked") {
                *counts.entry(dest).or_insert(0) += 1;
            }
        }

        let total = threads * per_thread;
        let floor = total / outputs.len();
        let ceil = total.div_ceil(outputs.len());
        assert_eq!(counts.values().sum::<usize>(), total);
        for dest in outputs.iter() {
            let n = counts.get(dest).copied().unwrap_or(0);
            assert!(n == floor || n == ceil, "{dest} picked {n} times");
        }
    }
}
