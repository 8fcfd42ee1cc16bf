use std::cell::OnceCell;

use crate::error::{IndexError, IndexResult};

enum Computed<T> {
    Value(T),
    Failed(IndexError),
}

/// A derived value that is uncomputed until first use and fixed afterwards.
///
/// Backed by a `OnceCell`, so a store holding memos is not `Sync`: each
/// store instance belongs to a single thread.
pub(crate) struct Memo<T> {
    state: OnceCell<Computed<T>>,
}

impl<T> Memo<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// Whether a value (not a failure) has been computed.
    pub(crate) fn is_computed(&self) -> bool {
        matches!(self.state.get(), Some(Computed::Value(_)))
    }

    /// Return the memoized value, computing it with `init` on first use.
    ///
    /// A failure is memoized only when `cache_failures` is set; otherwise
    /// the next call runs `init` again.
    pub(crate) fn get_or_try_init(
        &self,
        cache_failures: bool,
        init: impl FnOnce() -> IndexResult<T>,
    ) -> IndexResult<&T> {
        let state = match self.state.get() {
            Some(state) => state,
            None => {
                let computed = match init() {
                    Ok(value) => Computed::Value(value),
                    Err(err) if !cache_failures => return Err(err),
                    Err(err) => Computed::Failed(err),
                };
                self.state.get_or_init(|| computed)
            }
        };
        match state {
            Computed::Value(value) => Ok(value),
            Computed::Failed(err) => Err(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use unique_codec::Key;

    use super::*;

    fn miss() -> IndexError {
        IndexError::KeyNotFound(Key::single("x"))
    }

    #[test]
    fn computes_once() {
        let calls = Cell::new(0);
        let memo = Memo::new();
        assert!(!memo.is_computed());
        for _ in 0..3 {
            let value = memo
                .get_or_try_init(true, || {
                    calls.set(calls.get() + 1);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.get(), 1);
        assert!(memo.is_computed());
    }

    #[test]
    fn cached_failure_is_replayed() {
        let calls = Cell::new(0);
        let memo: Memo<i32> = Memo::new();
        for _ in 0..2 {
            let err = memo
                .get_or_try_init(true, || {
                    calls.set(calls.get() + 1);
                    Err(miss())
                })
                .unwrap_err();
            assert!(err.is_not_found());
        }
        assert_eq!(calls.get(), 1);
        assert!(!memo.is_computed());
    }

    #[test]
    fn uncached_failure_is_retried() {
        let calls = Cell::new(0);
        let memo: Memo<i32> = Memo::new();
        assert!(memo.get_or_try_init(false, || Err(miss())).is_err());
        let value = memo
            .get_or_try_init(false, || {
                calls.set(calls.get() + 1);
                Ok(7)
            })
            .unwrap();
        assert_eq!(*value, 7);
        assert_eq!(calls.get(), 1);
    }
}
