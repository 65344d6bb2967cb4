/// Runs a closure when dropped.
///
/// Used to release resources that live outside the ring (scratch files,
/// out-of-band handles) on every exit path of a program, including early
/// returns through `?`.
pub(crate) struct ScopeGuard<F: FnOnce()> {
    closure: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub(crate) fn new(closure: F) -> Self {
        ScopeGuard {
            closure: Some(closure),
        }
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        // `take()` guarantees the closure runs at most once.
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}
