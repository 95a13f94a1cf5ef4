//! Events passed between components through the app channel

use crate::document::FetchError;
use crate::navigation::Activation;

/// Something happened that other components react to
#[derive(Debug)]
pub enum AppEvent {
    /// The document load finished
    DocumentFetched(Result<String, FetchError>),
    /// A document was rendered; emitted once per successful render
    ContentReady,
    /// The active section changed
    SectionActivated(Activation),
    /// The global copy counter moved to this value
    CopyCountChanged(u64),
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create the app event channel
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
