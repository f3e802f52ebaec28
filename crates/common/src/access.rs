//! Access filter seam.
//!
//! Paths handed to [`AccessCheck::check`] are always canonical, `/`-separated
//! and relative to the principal's filesystem root.

/// Answers whether the current principal may read `path`.
pub trait AccessCheck {
    fn check(&self, path: &str) -> bool;
}

impl<F> AccessCheck for F
where
    F: Fn(&str) -> bool,
{
    fn check(&self, path: &str) -> bool {
        self(path)
    }
}

/// Permits every path. Used by local exports where no principal applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessCheck for AllowAll {
    fn check(&self, _path: &str) -> bool {
        true
    }
}
