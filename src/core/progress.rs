/// Progress reporting for long-running operations, implemented by the
/// embedding shell (CLI progress bar, GUI widget). Services call it without
/// knowing how progress is displayed.
pub trait ProgressSink: Send + Sync {
    /// Called once when an operation starts, with the total item count.
    fn on_start(&self, total: usize, description: &str);

    /// Called per processed item with a 1-based counter.
    fn on_progress(&self, current: usize, item_description: &str);

    fn on_complete(&self);

    /// Called when a single item fails without aborting the operation.
    fn on_error(&self, item_description: &str, error_message: &str);
}

/// Sink that discards everything, for callers that don't track progress.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_start(&self, _total: usize, _description: &str) {}

    fn on_progress(&self, _current: usize, _item_description: &str) {}

    fn on_complete(&self) {}

    fn on_error(&self, _item_description: &str, _error_message: &str) {}
}
