//! Event dispatcher
//!
//! Subscriptions emit events from whatever context drives them (the caller
//! for `start`, the transport pump for everything else). The dispatcher
//! funnels them through one unbounded queue into a single task, so
//! observers see a strictly ordered, non-concurrent stream of callbacks and
//! emitting never blocks the transport.
//!
//! The task also keeps a small gate per subscription and drops anything that
//! would break the event contract: nothing but `Failed` before `Connected`,
//! `Connected` at most once, nothing after a terminal event.

use std::collections::HashMap;
use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::subscriber::{SubscriberContext, SubscriptionId};

use super::event::SubscriberEvent;
use super::observer::SubscriberObserver;

enum Command {
    Deliver {
        ctx: SubscriberContext,
        observer: Weak<dyn SubscriberObserver>,
        event: SubscriberEvent,
    },
    Retire(SubscriptionId),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Pending,
    Connected,
    Done,
}

impl Gate {
    /// Whether `event` may be delivered, advancing the gate if so
    fn admit(&mut self, event: &SubscriberEvent) -> bool {
        match (*self, event) {
            (Gate::Done, _) => false,
            (Gate::Pending, SubscriberEvent::Connected) => {
                *self = Gate::Connected;
                true
            }
            (Gate::Pending, SubscriberEvent::Failed(_)) => {
                *self = Gate::Done;
                true
            }
            (Gate::Pending, _) => false,
            (Gate::Connected, SubscriberEvent::Connected | SubscriberEvent::Failed(_)) => false,
            (Gate::Connected, event) => {
                if event.is_terminal() {
                    *self = Gate::Done;
                }
                true
            }
        }
    }
}

/// Handle to a session's dispatch task
///
/// Cheap to clone. The task exits once every handle has been dropped.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::UnboundedSender<Command>,
}

impl EventDispatcher {
    /// Spawn the dispatch task on the current Tokio runtime
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(rx));
        (Self { tx }, handle)
    }

    /// Queue an event for delivery to `observer`
    pub(crate) fn emit(
        &self,
        ctx: SubscriberContext,
        observer: Weak<dyn SubscriberObserver>,
        event: SubscriberEvent,
    ) {
        tracing::debug!(
            subscription = %ctx.subscription_id,
            stream = %ctx.stream.id(),
            event = event.name(),
            "Event queued"
        );

        let command = Command::Deliver {
            ctx,
            observer,
            event,
        };
        if self.tx.send(command).is_err() {
            tracing::debug!("Dispatcher stopped, event discarded");
        }
    }

    /// Forget a subscription's ordering state
    pub(crate) fn retire(&self, id: SubscriptionId) {
        let _ = self.tx.send(Command::Retire(id));
    }

    /// Wait until every event queued before this call has been delivered
    ///
    /// Must not be awaited from inside an observer callback, which runs on
    /// the dispatch task itself.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Whether the dispatch task is still running
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut gates: HashMap<SubscriptionId, Gate> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Deliver {
                ctx,
                observer,
                event,
            } => {
                let gate = gates.entry(ctx.subscription_id).or_insert(Gate::Pending);
                if !gate.admit(&event) {
                    tracing::warn!(
                        subscription = %ctx.subscription_id,
                        event = event.name(),
                        gate = ?gate,
                        "Out-of-order event dropped"
                    );
                    continue;
                }

                match observer.upgrade() {
                    Some(observer) => event.notify(observer.as_ref(), &ctx),
                    None => tracing::debug!(
                        subscription = %ctx.subscription_id,
                        event = event.name(),
                        "Observer gone, event discarded"
                    ),
                }
            }
            Command::Retire(id) => {
                gates.remove(&id);
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::error::Error;
    use crate::stream::{StreamDescriptor, VideoDimensions};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, name: &str) {
            self.events.lock().unwrap().push(name.to_string());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl SubscriberObserver for Recorder {
        fn on_connected(&self, _ctx: &SubscriberContext) {
            self.push("connected");
        }

        fn on_failed(&self, _ctx: &SubscriberContext, _error: &Error) {
            self.push("failed");
        }

        fn on_first_video_frame(&self, _ctx: &SubscriberContext) {
            self.push("first_video_frame");
        }

        fn on_dimensions_changed(&self, _stream: &StreamDescriptor, dims: VideoDimensions) {
            self.push(&format!("dimensions {}", dims));
        }

        fn on_video_disabled(&self, _ctx: &SubscriberContext) {
            self.push("video_disabled");
        }
    }

    fn ctx(id: u64) -> SubscriberContext {
        let stream = Arc::new(StreamDescriptor::new("s1", true, true, VideoDimensions::new(640, 480)));
        SubscriberContext::new(SubscriptionId::from_raw(id), 1, stream)
    }

    fn weak(recorder: &Arc<Recorder>) -> Weak<dyn SubscriberObserver> {
        let weak: Weak<Recorder> = Arc::downgrade(recorder);
        weak
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let recorder = Arc::new(Recorder::default());

        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Connected);
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::FirstVideoFrame);
        dispatcher.emit(
            ctx(1),
            weak(&recorder),
            SubscriberEvent::DimensionsChanged(VideoDimensions::new(480, 640)),
        );
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::VideoDisabled);
        dispatcher.flush().await;

        assert_eq!(
            recorder.events(),
            vec![
                "connected",
                "first_video_frame",
                "dimensions 480x640",
                "video_disabled"
            ]
        );
    }

    #[tokio::test]
    async fn test_drops_events_before_connected() {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let recorder = Arc::new(Recorder::default());

        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::VideoDisabled);
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::FirstVideoFrame);
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Connected);
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Connected);
        dispatcher.flush().await;

        assert_eq!(recorder.events(), vec!["connected"]);
    }

    #[tokio::test]
    async fn test_failed_is_exclusive() {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let recorder = Arc::new(Recorder::default());

        let error = Error::ConnectionFailure("refused".into());
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Failed(error.clone()));
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Failed(error));
        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Connected);
        dispatcher.flush().await;

        assert_eq!(recorder.events(), vec!["failed"]);
    }

    #[tokio::test]
    async fn test_gates_are_per_subscription() {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let recorder = Arc::new(Recorder::default());

        dispatcher.emit(ctx(1), weak(&recorder), SubscriberEvent::Failed(Error::SessionClosed));
        dispatcher.emit(ctx(2), weak(&recorder), SubscriberEvent::Connected);
        dispatcher.flush().await;

        assert_eq!(recorder.events(), vec!["failed", "connected"]);
    }

    #[tokio::test]
    async fn test_dropped_observer_is_skipped() {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let recorder = Arc::new(Recorder::default());
        let observer = weak(&recorder);
        drop(recorder);

        dispatcher.emit(ctx(1), observer, SubscriberEvent::Connected);
        dispatcher.flush().await;

        assert!(dispatcher.is_running());
    }

    #[test]
    fn test_gate_transitions() {
        let mut gate = Gate::Pending;
        assert!(!gate.admit(&SubscriberEvent::VideoEnabled));
        assert!(gate.admit(&SubscriberEvent::Connected));
        assert!(gate.admit(&SubscriberEvent::VideoDisabled));
        assert!(gate.admit(&SubscriberEvent::VideoEnabled));
        assert!(gate.admit(&SubscriberEvent::Disconnected {
            reason: "bye".into()
        }));
        assert_eq!(gate, Gate::Done);
        assert!(!gate.admit(&SubscriberEvent::VideoDisabled));
    }
}
