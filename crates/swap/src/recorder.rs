// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

use crate::sidecar::{BufferId, Journaled};

/// The journaling surface a buffer talks to.
///
/// Rows and columns are byte positions in the buffer before the edit.
/// Every call is cheap for the caller: records are queued and written by a
/// background thread. Calls for a suspended buffer are dropped.
pub trait SwapRecorder {
    fn record_insert(&self, buf: &dyn Journaled, row: usize, col: usize, text: &[u8]);

    fn record_delete(&self, buf: &dyn Journaled, row: usize, col: usize, len: usize);

    fn record_split(&self, buf: &dyn Journaled, row: usize, col: usize);

    fn record_join(&self, buf: &dyn Journaled, row: usize);

    /// The buffer's filename changed; its journal moves to the new sidecar.
    fn notify_filename_changed(&self, buf: &dyn Journaled);

    /// Sets the suspended flag and returns its previous value.
    fn set_suspended(&self, buffer: BufferId, suspended: bool) -> bool;

    fn is_suspended(&self, buffer: BufferId) -> bool;
}

/// Suspends journaling for one buffer for the guard's lifetime.
///
/// Dropping the guard clears the flag unconditionally, including a
/// suspension that was set before the guard was created.
#[must_use = "journaling resumes as soon as the guard is dropped"]
pub struct SuspendGuard<'a, R: SwapRecorder + ?Sized> {
    recorder: &'a R,
    buffer: BufferId,
}

impl<'a, R: SwapRecorder + ?Sized> SuspendGuard<'a, R> {
    pub fn new(recorder: &'a R, buffer: BufferId) -> Self {
        recorder.set_suspended(buffer, true);
        Self { recorder, buffer }
    }
}

impl<R: SwapRecorder + ?Sized> Drop for SuspendGuard<'_, R> {
    fn drop(&mut self) {
        self.recorder.set_suspended(self.buffer, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Records flag changes in memory.
    #[derive(Default)]
    struct FlagRecorder {
        flags: RefCell<HashMap<BufferId, bool>>,
    }

    impl SwapRecorder for FlagRecorder {
        fn record_insert(&self, _: &dyn Journaled, _: usize, _: usize, _: &[u8]) {}
        fn record_delete(&self, _: &dyn Journaled, _: usize, _: usize, _: usize) {}
        fn record_split(&self, _: &dyn Journaled, _: usize, _: usize) {}
        fn record_join(&self, _: &dyn Journaled, _: usize) {}
        fn notify_filename_changed(&self, _: &dyn Journaled) {}

        fn set_suspended(&self, buffer: BufferId, suspended: bool) -> bool {
            self.flags
                .borrow_mut()
                .insert(buffer, suspended)
                .unwrap_or(false)
        }

        fn is_suspended(&self, buffer: BufferId) -> bool {
            self.flags.borrow().get(&buffer).copied().unwrap_or(false)
        }
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let recorder = FlagRecorder::default();
        let id = BufferId::next();
        {
            let _guard = SuspendGuard::new(&recorder, id);
            assert!(recorder.is_suspended(id));
        }
        assert!(!recorder.is_suspended(id));
    }

    #[test]
    fn test_inner_guard_drop_resumes_journaling() {
        let recorder = FlagRecorder::default();
        let id = BufferId::next();
        let outer = SuspendGuard::new(&recorder, id);
        {
            let _inner = SuspendGuard::new(&recorder, id);
        }
        assert!(!recorder.is_suspended(id));
        drop(outer);
        assert!(!recorder.is_suspended(id));
    }

    #[test]
    fn test_guard_clears_explicit_suspension() {
        let recorder = FlagRecorder::default();
        let id = BufferId::next();
        recorder.set_suspended(id, true);
        drop(SuspendGuard::new(&recorder, id));
        assert!(!recorder.is_suspended(id));
    }

    #[test]
    fn test_guard_over_trait_object() {
        let recorder = FlagRecorder::default();
        let dyn_recorder: &dyn SwapRecorder = &recorder;
        let id = BufferId::next();
        let guard = SuspendGuard::new(dyn_recorder, id);
        assert!(recorder.is_suspended(id));
        drop(guard);
        assert!(!recorder.is_suspended(id));
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn suspended_work(recorder: &FlagRecorder, id: BufferId) -> Result<(), ()> {
            let _guard = SuspendGuard::new(recorder, id);
            "not a number".parse::<u32>().map_err(|_| ())?;
            Ok(())
        }

        let recorder = FlagRecorder::default();
        let id = BufferId::next();
        assert!(suspended_work(&recorder, id).is_err());
        assert!(!recorder.is_suspended(id));
    }
}
