pub(crate) mod io_uring;
pub use io_uring::CompletionFlags;

pub(crate) mod scope_guard;
pub(crate) use scope_guard::ScopeGuard;

pub(crate) mod sys;
