use serde::Serialize;
use tokio::sync::broadcast;

/// Stage a cue has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CueStatus {
    Queued,
    Extracting,
    Transcribing,
    Done,
    Failed,
}

impl CueStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CueStatus::Queued => "queued",
            CueStatus::Extracting => "extracting",
            CueStatus::Transcribing => "transcribing",
            CueStatus::Done => "done",
            CueStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-based position of the cue in the run
    pub current: usize,
    pub total: usize,
    pub cue_id: u32,
    /// Cue text shortened for display
    pub text: String,
    pub status: CueStatus,
}

/// Fire-and-forget fan-out of progress events.
///
/// Sending never waits: without subscribers the event is dropped, and a
/// subscriber that falls behind loses its oldest events.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ProgressEvent) {
        // No receivers is not an error for progress
        let _ = self.sender.send(event);
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
