use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use factline_events::{DomainEventPublisher, EventEnvelope, MessageTransport, Subscription};

use crate::config::RouterConfig;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Transport-fed projection worker.
///
/// - Subscribes to a transport of envelopes
/// - Owns the [`DomainEventPublisher`] of its thread; `setup` registers the
///   subscribers (typically projection routers) on it
/// - Decodes and publishes every message; failures are logged, never fatal
/// - Polls for shutdown every [`RouterConfig::worker_poll_interval`]
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Spawn a worker thread processing envelopes published from now on.
    ///
    /// The subscription is taken before this returns, so messages published
    /// afterwards are never missed.
    pub fn spawn<T, F>(
        name: &'static str,
        transport: T,
        config: &RouterConfig,
        setup: F,
    ) -> WorkerHandle
    where
        T: MessageTransport<EventEnvelope>,
        F: FnOnce(&DomainEventPublisher) + Send + 'static,
    {
        Self::start(name, transport.subscribe(), config.worker_poll_interval(), setup)
    }

    /// Spawn a worker that first replays everything the transport retains.
    ///
    /// Used to rebuild a projection into an empty store; once the history is
    /// applied the worker keeps following live messages.
    pub fn rebuild<T, F>(
        name: &'static str,
        transport: T,
        config: &RouterConfig,
        setup: F,
    ) -> WorkerHandle
    where
        T: MessageTransport<EventEnvelope>,
        F: FnOnce(&DomainEventPublisher) + Send + 'static,
    {
        Self::start(
            name,
            transport.subscribe_from_start(),
            config.worker_poll_interval(),
            setup,
        )
    }

    fn start<F>(
        name: &'static str,
        sub: Subscription<EventEnvelope>,
        poll_interval: Duration,
        setup: F,
    ) -> WorkerHandle
    where
        F: FnOnce(&DomainEventPublisher) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let publisher = DomainEventPublisher::new();
                setup(&publisher);
                debug!(
                    worker = name,
                    subscribers = publisher.subscriber_count(),
                    poll_ms = poll_interval.as_millis() as u64,
                    "projection worker started"
                );
                worker_loop(name, sub, shutdown_rx, poll_interval, &publisher);
            })
            .expect("failed to spawn projection worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop(
    name: &'static str,
    sub: Subscription<EventEnvelope>,
    shutdown_rx: mpsc::Receiver<()>,
    tick: Duration,
    publisher: &DomainEventPublisher,
) {
    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                let message = match envelope.decode() {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(
                            worker = name,
                            message_id = %envelope.message_id(),
                            error = %err,
                            "projection worker dropped undecodable message"
                        );
                        continue;
                    }
                };
                if let Err(err) = publisher.publish(message.as_event()) {
                    warn!(
                        worker = name,
                        message_id = %envelope.message_id(),
                        error = %err,
                        "projection worker handler failed"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(worker = name, "projection worker stopped");
}
