//! Lifecycle events
//!
//! Executors publish start/end events for specs, scenarios, concepts and
//! steps. Publishing never blocks and never fails; within one stream events
//! arrive in the order they were published, and the stream id on each event
//! lets listeners separate lanes of a parallel run.

use tokio::sync::mpsc;

use crate::model::{ConceptResult, ExecutionInfo, ScenarioResult, SpecResult, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SpecStart,
    SpecEnd,
    ScenarioStart,
    ScenarioEnd,
    ConceptStart,
    ConceptEnd,
    StepStart,
    StepEnd,
}

/// Snapshot of the result node an event refers to
#[derive(Debug, Clone)]
pub enum EventResult {
    Spec(Box<SpecResult>),
    Scenario(Box<ScenarioResult>),
    Concept(ConceptResult),
    Step(StepResult),
}

#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub kind: EventKind,
    /// Text of the spec, scenario heading or step the event is about
    pub subject: Option<String>,
    pub result: Option<EventResult>,
    pub stream: usize,
    pub info: ExecutionInfo,
}

impl ExecutionEvent {
    pub fn new(
        kind: EventKind,
        subject: Option<String>,
        result: Option<EventResult>,
        stream: usize,
        info: &ExecutionInfo,
    ) -> Self {
        Self {
            kind,
            subject,
            result,
            stream,
            info: info.clone(),
        }
    }
}

/// Receives lifecycle events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: ExecutionEvent);
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: ExecutionEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: ExecutionEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_preserves_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let info = ExecutionInfo::default();
        notifier.notify(ExecutionEvent::new(EventKind::ScenarioStart, None, None, 2, &info));
        notifier.notify(ExecutionEvent::new(EventKind::ScenarioEnd, None, None, 2, &info));

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.kind, EventKind::ScenarioStart);
        assert_eq!(second.kind, EventKind::ScenarioEnd);
        assert_eq!(second.stream, 2);
    }

    #[test]
    fn test_notify_after_receiver_dropped_is_silent() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(ExecutionEvent::new(
            EventKind::StepStart,
            Some("step".to_string()),
            None,
            1,
            &ExecutionInfo::default(),
        ));
    }
}
