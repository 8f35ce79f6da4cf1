//! Projection transaction router.
//!
//! A router owns one named projection: a write-handler table keyed by event
//! type and a read-handler table keyed by query type. Both tables are built
//! once in [`ProjectionRouter::new`] and read-only afterwards, so a router can
//! be shared across threads behind an `Arc` without locking.
//!
//! ## Dispatch rules
//!
//! - An event without the type attribute, or with a type no transaction
//!   observes, is ignored.
//! - A query without the type attribute, or with a type no read operation
//!   answers, yields [`QueryResponse::empty`].
//! - A read operation failure is re-signaled as
//!   [`ProjectionError::Unsupported`] with the failure as its source.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use factline_events::{
    Attribute, Command, DomainEvent, Event, EventSubscriber, Interest, ProjectionError,
    ProjectionRead, ProjectionTransaction, QueryResponse, TransactionStateObserver,
};

use crate::config::RouterConfig;
use crate::store::ProjectionStore;

/// Collaborators handed to a projection definition when its handlers are built.
#[derive(Clone)]
pub struct ProjectionContext {
    pub label: String,
    pub store: Arc<dyn ProjectionStore>,
    pub observer: Arc<dyn TransactionStateObserver>,
}

/// The set of handlers making up one projection.
pub trait ProjectionDefinition {
    /// Write-path handlers; each is registered under every type it observes.
    fn transactions(&self, ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionTransaction>>;

    /// Read-path handlers; each is registered under every type it observes.
    fn queries(&self, ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionRead>>;
}

pub struct ProjectionRouter {
    label: String,
    transactions: HashMap<String, Arc<dyn ProjectionTransaction>>,
    queries: HashMap<String, Arc<dyn ProjectionRead>>,
    observer: Arc<dyn TransactionStateObserver>,
    config: RouterConfig,
}

impl ProjectionRouter {
    /// Build the router and its handler tables.
    ///
    /// Fails with `InvalidArgument` when the label is blank or two handlers of
    /// the same path observe the same type.
    pub fn new<D>(
        label: impl Into<String>,
        definition: &D,
        store: Arc<dyn ProjectionStore>,
        observer: Arc<dyn TransactionStateObserver>,
        config: RouterConfig,
    ) -> Result<Self, ProjectionError>
    where
        D: ProjectionDefinition + ?Sized,
    {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ProjectionError::invalid_argument("projection label is required"));
        }
        let ctx = ProjectionContext {
            label: label.clone(),
            store,
            observer: Arc::clone(&observer),
        };
        let transactions = init_supported_transactions(&label, definition.transactions(&ctx))?;
        let queries = init_supported_queries(&label, definition.queries(&ctx))?;
        debug!(
            projection = %label,
            transactions = transactions.len(),
            queries = queries.len(),
            "projection router initialized"
        );

        Ok(Self {
            label,
            transactions,
            queries,
            observer,
            config,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Apply the transaction observing this event's type, if any.
    pub fn handle_event(&self, event: &DomainEvent) -> Result<(), ProjectionError> {
        let Some(event_type) = event.find_specification(&self.config.event_type_attribute) else {
            trace!(projection = %self.label, "event without type attribute ignored");
            return Ok(());
        };
        let Some(transaction) = self.transactions.get(event_type.value()) else {
            trace!(
                projection = %self.label,
                event_type = event_type.value(),
                "no transaction observes event type"
            );
            return Ok(());
        };

        debug!(
            projection = %self.label,
            event_type = event_type.value(),
            transaction = transaction.name(),
            "applying transaction"
        );
        transaction.when(event)
    }

    /// Run the read operation answering this query's type.
    pub fn when(&self, query: &Command) -> Result<QueryResponse, ProjectionError> {
        query
            .check_well_formed()
            .map_err(|err| ProjectionError::invalid_argument(err.to_string()))?;

        let name = self.query_name_based_on();
        let Some(query_type) = query.find_specification(name) else {
            debug!(projection = %self.label, attribute = name, "query without type attribute");
            return Ok(QueryResponse::empty());
        };
        let Some(operation) = self.queries.get(query_type.value()) else {
            debug!(
                projection = %self.label,
                query_type = query_type.value(),
                "no read operation answers query type"
            );
            return Ok(QueryResponse::empty());
        };

        operation.when(query).map_err(|err| {
            warn!(
                projection = %self.label,
                query_type = query_type.value(),
                operation = operation.name(),
                error = %err,
                "read operation failed"
            );
            ProjectionError::unsupported(
                format!("{} failed for query {}", operation.name(), query_type.value()),
                err,
            )
        })
    }

    /// Run [`when`](Self::when) on the blocking pool; the handle is the result slot.
    ///
    /// Dropping the handle discards the result without interrupting the read.
    /// Must be called from within a tokio runtime.
    pub fn spawn_query(
        self: Arc<Self>,
        query: Command,
    ) -> JoinHandle<Result<QueryResponse, ProjectionError>> {
        tokio::task::spawn_blocking(move || self.when(&query))
    }

    /// Run [`handle_event`](Self::handle_event) on the blocking pool.
    ///
    /// The handle resolves once the transaction has been applied (or the event
    /// ignored). Must be called from within a tokio runtime.
    pub fn spawn_event(
        self: Arc<Self>,
        event: DomainEvent,
    ) -> JoinHandle<Result<(), ProjectionError>> {
        tokio::task::spawn_blocking(move || ProjectionRouter::handle_event(&self, &event))
    }

    /// Event types with a registered transaction, sorted.
    pub fn supported_transactions(&self) -> Vec<&str> {
        sorted_keys(&self.transactions)
    }

    /// Query types with a registered read operation, sorted.
    pub fn supported_queries(&self) -> Vec<&str> {
        sorted_keys(&self.queries)
    }

    /// Attribute read from queries: observer override, else configuration.
    fn query_name_based_on(&self) -> &str {
        self.observer
            .query_name_based_on()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.config.query_type_attribute.as_str())
    }
}

impl core::fmt::Debug for ProjectionRouter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectionRouter")
            .field("label", &self.label)
            .field("transactions", &self.supported_transactions())
            .field("queries", &self.supported_queries())
            .field("config", &self.config)
            .finish()
    }
}

impl EventSubscriber for ProjectionRouter {
    fn interest(&self) -> Interest {
        Interest::DomainEvents
    }

    fn handle_event(&self, event: &dyn Event) -> anyhow::Result<()> {
        match event.as_domain_event() {
            Some(domain_event) => Ok(ProjectionRouter::handle_event(self, domain_event)?),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn init_supported_transactions(
    label: &str,
    handlers: Vec<Arc<dyn ProjectionTransaction>>,
) -> Result<HashMap<String, Arc<dyn ProjectionTransaction>>, ProjectionError> {
    let mut table = HashMap::new();
    for handler in handlers {
        for event_type in handler.observer_of() {
            register(label, &mut table, event_type, Arc::clone(&handler))?;
        }
    }
    Ok(table)
}

fn init_supported_queries(
    label: &str,
    handlers: Vec<Arc<dyn ProjectionRead>>,
) -> Result<HashMap<String, Arc<dyn ProjectionRead>>, ProjectionError> {
    let mut table = HashMap::new();
    for handler in handlers {
        for query_type in handler.observer_of() {
            register(label, &mut table, query_type, Arc::clone(&handler))?;
        }
    }
    Ok(table)
}

fn register<H: ?Sized>(
    label: &str,
    table: &mut HashMap<String, Arc<H>>,
    key: &str,
    handler: Arc<H>,
) -> Result<(), ProjectionError> {
    if key.trim().is_empty() {
        return Err(ProjectionError::invalid_argument(format!(
            "projection {label}: handler observes a blank type"
        )));
    }
    if table.insert(key.to_string(), handler).is_some() {
        return Err(ProjectionError::invalid_argument(format!(
            "projection {label}: type {key:?} is observed by more than one handler"
        )));
    }
    Ok(())
}

fn sorted_keys<V>(table: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = table.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Value of `name` in `specification`, for handlers reading their inputs.
pub(crate) fn required_attribute<'a>(
    specification: &'a [Attribute],
    name: &str,
) -> Result<&'a str, ProjectionError> {
    factline_events::attribute::find_by_name(name, specification)
        .map(Attribute::value)
        .ok_or_else(|| ProjectionError::invalid_argument(format!("attribute {name:?} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use factline_events::NoopObserver;
    use serde_json::json;

    use crate::store::InMemoryProjectionStore;

    struct CountingTransaction {
        observes: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ProjectionTransaction for CountingTransaction {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn observer_of(&self) -> &[&'static str] {
            &self.observes
        }

        fn when(&self, _event: &DomainEvent) -> Result<(), ProjectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct EchoRead {
        observes: Vec<&'static str>,
        fail: bool,
    }

    impl ProjectionRead for EchoRead {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn observer_of(&self) -> &[&'static str] {
            &self.observes
        }

        fn when(&self, query: &Command) -> Result<QueryResponse, ProjectionError> {
            if self.fail {
                return Err(ProjectionError::store("backend unavailable"));
            }
            let label = required_attribute(query.specification(), "label")?;
            Ok(QueryResponse::of(json!({ "label": label })))
        }
    }

    struct Fixture {
        transactions: Vec<Arc<dyn ProjectionTransaction>>,
        queries: Vec<Arc<dyn ProjectionRead>>,
    }

    impl ProjectionDefinition for Fixture {
        fn transactions(&self, _ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionTransaction>> {
            self.transactions.clone()
        }

        fn queries(&self, _ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionRead>> {
            self.queries.clone()
        }
    }

    /// Observer naming a custom query attribute and recording nothing else.
    struct KindObserver;

    impl TransactionStateObserver for KindObserver {
        fn query_name_based_on(&self) -> Option<&str> {
            Some("kind")
        }
    }

    fn router_with(
        fixture: &Fixture,
        observer: Arc<dyn TransactionStateObserver>,
    ) -> Result<ProjectionRouter, ProjectionError> {
        ProjectionRouter::new(
            "Sample",
            fixture,
            Arc::new(InMemoryProjectionStore::new()),
            observer,
            RouterConfig::default(),
        )
    }

    fn counting(observes: Vec<&'static str>) -> Arc<CountingTransaction> {
        Arc::new(CountingTransaction {
            observes,
            calls: AtomicUsize::new(0),
        })
    }

    fn echo(fail: bool) -> Arc<dyn ProjectionRead> {
        Arc::new(EchoRead {
            observes: vec!["FindByLabel"],
            fail,
        })
    }

    #[test]
    fn fan_in_registers_one_entry_per_observed_type() {
        let tx = counting(vec!["ViewCreated", "ViewRestored"]);
        let fixture = Fixture {
            transactions: vec![tx.clone()],
            queries: vec![echo(false)],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        assert_eq!(router.supported_transactions(), vec!["ViewCreated", "ViewRestored"]);
        assert_eq!(router.supported_queries(), vec!["FindByLabel"]);

        router.handle_event(&DomainEvent::of_type("ViewCreated").unwrap()).unwrap();
        router.handle_event(&DomainEvent::of_type("ViewRestored").unwrap()).unwrap();
        assert_eq!(tx.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unmatched_or_untyped_events_are_ignored() {
        let tx = counting(vec!["ViewCreated"]);
        let fixture = Fixture {
            transactions: vec![tx.clone()],
            queries: vec![],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        router.handle_event(&DomainEvent::new()).unwrap();
        router.handle_event(&DomainEvent::of_type("SomethingElse").unwrap()).unwrap();
        assert_eq!(tx.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn only_the_matching_transaction_runs() {
        let created = counting(vec!["ViewCreated"]);
        let upgraded = counting(vec!["ViewUpgraded"]);
        let fixture = Fixture {
            transactions: vec![created.clone(), upgraded.clone()],
            queries: vec![],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        router.handle_event(&DomainEvent::of_type("ViewCreated").unwrap()).unwrap();
        assert_eq!(created.calls.load(Ordering::SeqCst), 1);
        assert_eq!(upgraded.calls.load(Ordering::SeqCst), 0);

        router.handle_event(&DomainEvent::of_type("ViewUpgraded").unwrap()).unwrap();
        assert_eq!(created.calls.load(Ordering::SeqCst), 1);
        assert_eq!(upgraded.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let fixture = Fixture {
            transactions: vec![counting(vec!["ViewCreated"]), counting(vec!["ViewCreated"])],
            queries: vec![],
        };
        let err = router_with(&fixture, Arc::new(NoopObserver)).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidArgument(_)));
    }

    #[test]
    fn query_is_answered_by_matching_operation() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();
        let query = Command::of_type("FindByLabel")
            .unwrap()
            .with_attribute("label", "X")
            .unwrap();

        let response = router.when(&query).unwrap();
        assert_eq!(response.into_value(), Some(json!({"label": "X"})));
    }

    #[test]
    fn unmatched_query_yields_empty_response() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        assert!(router.when(&Command::new()).unwrap().is_empty());
        assert!(router.when(&Command::of_type("Unknown").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn operation_failure_is_wrapped_as_unsupported() {
        use std::error::Error as _;

        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(true)],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        let err = router.when(&Command::of_type("FindByLabel").unwrap()).unwrap_err();
        assert!(matches!(err, ProjectionError::Unsupported { .. }));
        assert!(err.source().unwrap().to_string().contains("backend unavailable"));
    }

    #[test]
    fn malformed_query_is_an_invalid_argument() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();
        let json = r#"{"identity":null,"occurred_on":"2024-01-01T00:00:00Z","specification":[{"name":"","value":"FindByLabel"}]}"#;
        let query: Command = serde_json::from_str(json).unwrap();

        let err = router.when(&query).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidArgument(_)));
    }

    #[test]
    fn observer_overrides_query_attribute() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = router_with(&fixture, Arc::new(KindObserver)).unwrap();

        let by_type = Command::of_type("FindByLabel")
            .unwrap()
            .with_attribute("label", "X")
            .unwrap();
        assert!(router.when(&by_type).unwrap().is_empty());

        let by_kind = Command::new()
            .with_attribute("kind", "FindByLabel")
            .unwrap()
            .with_attribute("label", "X")
            .unwrap();
        assert!(!router.when(&by_kind).unwrap().is_empty());
    }

    #[test]
    fn router_as_subscriber_ignores_non_domain_events() {
        let tx = counting(vec!["ViewCreated"]);
        let fixture = Fixture {
            transactions: vec![tx.clone()],
            queries: vec![],
        };
        let router = router_with(&fixture, Arc::new(NoopObserver)).unwrap();

        assert_eq!(router.interest(), Interest::DomainEvents);
        EventSubscriber::handle_event(&router, &Command::of_type("ViewCreated").unwrap()).unwrap();
        EventSubscriber::handle_event(&router, &DomainEvent::of_type("ViewCreated").unwrap())
            .unwrap();
        assert_eq!(tx.calls.load(Ordering::SeqCst), 1);
        assert_eq!(EventSubscriber::name(&router), "Sample");
    }

    #[test]
    fn blank_label_is_rejected() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![],
        };
        let err = ProjectionRouter::new(
            " ",
            &fixture,
            Arc::new(InMemoryProjectionStore::new()),
            Arc::new(NoopObserver),
            RouterConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn spawned_query_resolves_to_the_read_result() {
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = Arc::new(router_with(&fixture, Arc::new(NoopObserver)).unwrap());
        let query = Command::of_type("FindByLabel")
            .unwrap()
            .with_attribute("label", "Y")
            .unwrap();

        let response = router.spawn_query(query).await.unwrap().unwrap();
        assert_eq!(response.value().unwrap()["label"], "Y");
    }

    #[tokio::test]
    async fn spawned_event_resolves_after_the_transaction_ran() {
        let tx = counting(vec!["ViewCreated"]);
        let fixture = Fixture {
            transactions: vec![tx.clone()],
            queries: vec![],
        };
        let router = Arc::new(router_with(&fixture, Arc::new(NoopObserver)).unwrap());

        Arc::clone(&router)
            .spawn_event(DomainEvent::of_type("ViewCreated").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.calls.load(Ordering::SeqCst), 1);

        router
            .spawn_event(DomainEvent::of_type("Ignored").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_tables_are_shareable_across_threads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fixture = Fixture {
            transactions: vec![],
            queries: vec![echo(false)],
        };
        let router = Arc::new(router_with(&fixture, Arc::new(NoopObserver)).unwrap());

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let router = Arc::clone(&router);
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    let query = Command::of_type("FindByLabel")
                        .unwrap()
                        .with_attribute("label", format!("L{i}"))
                        .unwrap();
                    let response = router.when(&query).unwrap();
                    seen.lock().unwrap().push(response.into_value().unwrap());
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 4);
    }
}
