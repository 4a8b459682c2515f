use std::sync::Arc;

/// A platform-level pointer feed that keeps delivering moves and releases
/// after the pointer has left the canvas (window or document listeners).
pub trait PointerSource: Send + Sync {
    /// Start routing pointer events outside the canvas to the editor.
    fn capture(&self);

    /// Stop routing them.
    fn release(&self);
}

/// For headless use: there is nothing to capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPointerSource;

impl PointerSource for NoPointerSource {
    fn capture(&self) {}

    fn release(&self) {}
}

/// Scoped pointer capture. Held for the whole of a stroke and released
/// exactly once when dropped, whichever way the stroke ends.
pub struct PointerCapture {
    source: Arc<dyn PointerSource>,
}

impl PointerCapture {
    pub fn acquire(source: Arc<dyn PointerSource>) -> Self {
        source.capture();
        log::debug!("Pointer captured");
        Self { source }
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.source.release();
        log::debug!("Pointer released");
    }
}

impl std::fmt::Debug for PointerCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerCapture").finish_non_exhaustive()
    }
}
