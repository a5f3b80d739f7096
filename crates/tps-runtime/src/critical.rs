//! Scoped interrupt masking.

use crate::platform::Platform;

/// RAII guard that keeps interrupts masked for its lifetime.
///
/// Interrupts are unmasked when the guard drops, on every exit path.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct CriticalSection<'a, P: Platform + ?Sized> {
    platform: &'a P,
}

impl<'a, P: Platform + ?Sized> CriticalSection<'a, P> {
    /// Mask interrupts until the returned guard is dropped.
    pub fn enter(platform: &'a P) -> Self {
        platform.disable_interrupts();
        Self { platform }
    }
}

impl<P: Platform + ?Sized> Drop for CriticalSection<'_, P> {
    fn drop(&mut self) {
        self.platform.enable_interrupts();
    }
}
