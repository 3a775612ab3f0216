use crate::error::ClientError;
use model::job::metadata::JobMetadata;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The single terminal event published to completion listeners.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Complete(JobMetadata),
    Error(Arc<ClientError>),
}

impl JobEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, JobEvent::Complete(_))
    }

    pub fn into_result(self) -> Result<JobMetadata, Arc<ClientError>> {
        match self {
            JobEvent::Complete(metadata) => Ok(metadata),
            JobEvent::Error(err) => Err(err),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    // Subscriber ID -> Sender
    subscribers: HashMap<u64, mpsc::UnboundedSender<JobEvent>>,
    next_id: u64,
    terminal: Option<JobEvent>,
    poller: Option<CancellationToken>,
}

pub(crate) struct Registration {
    pub id: u64,
    /// Set when this subscription has to start the polling task.
    pub start_poller: Option<CancellationToken>,
}

/// Completion listeners of one job handle, plus the cancel token of the
/// polling task serving them.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    state: Mutex<RegistryState>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, sender: mpsc::UnboundedSender<JobEvent>) -> Registration {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        if let Some(event) = &state.terminal {
            // Late subscribers get the event that was already published.
            let _ = sender.send(event.clone());
            debug!(subscriber_id = id, "Replayed terminal event to late listener");
            return Registration {
                id,
                start_poller: None,
            };
        }

        state.subscribers.insert(id, sender);
        debug!(
            subscriber_id = id,
            subscriber_count = state.subscribers.len(),
            "Subscribed to job completion"
        );

        let start_poller = if state.poller.is_none() {
            let token = CancellationToken::new();
            state.poller = Some(token.clone());
            Some(token)
        } else {
            None
        };

        Registration { id, start_poller }
    }

    /// Removes a listener. When the last one leaves before the terminal
    /// event, the polling task is cancelled before this returns.
    pub fn unsubscribe(&self, id: u64) {
        let mut state = self.lock();
        if state.subscribers.remove(&id).is_none() {
            return;
        }

        debug!(
            subscriber_id = id,
            subscriber_count = state.subscribers.len(),
            "Unsubscribed from job completion"
        );

        if state.subscribers.is_empty()
            && let Some(token) = state.poller.take()
        {
            token.cancel();
            debug!("Last listener removed, polling stopped");
        }
    }

    /// Publishes the terminal event once. Events from a poller that was
    /// cancelled in the meantime are dropped.
    pub fn publish(&self, poller: &CancellationToken, event: JobEvent) -> bool {
        let mut state = self.lock();
        if poller.is_cancelled() || state.terminal.is_some() {
            return false;
        }

        let subscribers: Vec<_> = state.subscribers.drain().collect();
        debug!(
            subscriber_count = subscribers.len(),
            complete = event.is_complete(),
            "Publishing terminal job event"
        );
        for (_, sender) in subscribers {
            let _ = sender.send(event.clone());
        }

        state.terminal = Some(event);
        state.poller = None;
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_polling(&self) -> bool {
        self.lock().poller.is_some()
    }
}

/// A registered completion listener. Dropping it unsubscribes; dropping the
/// last one stops client-side polling.
pub struct CompletionListener {
    id: u64,
    registry: Arc<ListenerRegistry>,
    events: mpsc::UnboundedReceiver<JobEvent>,
}

impl CompletionListener {
    pub(crate) fn new(
        id: u64,
        registry: Arc<ListenerRegistry>,
        events: mpsc::UnboundedReceiver<JobEvent>,
    ) -> Self {
        CompletionListener {
            id,
            registry,
            events,
        }
    }

    /// Waits for the terminal event. Returns `None` after it has been
    /// received.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.events.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for CompletionListener {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(registry: &Arc<ListenerRegistry>) -> (CompletionListener, Option<CancellationToken>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = registry.subscribe(tx);
        (
            CompletionListener::new(registration.id, Arc::clone(registry), rx),
            registration.start_poller,
        )
    }

    #[test]
    fn only_first_listener_starts_polling() {
        let registry = Arc::new(ListenerRegistry::default());
        let (_a, first) = listener(&registry);
        let (_b, second) = listener(&registry);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(registry.subscriber_count(), 2);
    }

    #[test]
    fn dropping_last_listener_cancels_poller() {
        let registry = Arc::new(ListenerRegistry::default());
        let (a, token) = listener(&registry);
        let (b, _) = listener(&registry);
        let token = token.unwrap();

        drop(a);
        assert!(!token.is_cancelled());
        b.unsubscribe();
        assert!(token.is_cancelled());
        assert!(!registry.is_polling());

        // A cancelled poller can no longer publish.
        assert!(!registry.publish(&token, JobEvent::Complete(JobMetadata::default())));
    }

    #[tokio::test]
    async fn terminal_event_is_published_once_and_replayed() {
        let registry = Arc::new(ListenerRegistry::default());
        let (mut a, token) = listener(&registry);
        let token = token.unwrap();

        assert!(registry.publish(&token, JobEvent::Complete(JobMetadata::default())));
        assert!(!registry.publish(
            &token,
            JobEvent::Error(Arc::new(ClientError::Cancelled))
        ));

        assert!(a.recv().await.unwrap().is_complete());
        assert!(a.recv().await.is_none());

        let (mut late, start) = listener(&registry);
        assert!(start.is_none());
        assert!(late.try_recv().unwrap().is_complete());
        assert!(late.try_recv().is_none());
    }
}
