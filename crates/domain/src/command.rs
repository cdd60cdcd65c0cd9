//! Loading aggregates and running single-aggregate commands.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{EventStore, TransactionId, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::unit_of_work::UnitOfWork;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,

    /// The unit of work that committed the events, if any were produced.
    pub transaction_id: Option<TransactionId>,
}

/// Rebuilds aggregates from the store and runs commands against them.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for CommandHandler<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its events.
    ///
    /// If the aggregate has no events, returns a default instance.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.exists().then_some(aggregate))
    }

    /// Loads an aggregate that must exist.
    pub async fn get(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load_existing(aggregate_id)
            .await?
            .ok_or_else(|| DomainError::not_found::<A>(aggregate_id))
    }

    /// Runs a command against one aggregate and commits its events alone.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            let new_version = aggregate.version();
            return Ok(CommandResult {
                aggregate,
                events,
                new_version,
                transaction_id: None,
            });
        }

        let mut uow = UnitOfWork::begin(A::aggregate_type());
        uow.stage(aggregate_id, &mut aggregate, events.clone())?;
        let receipt = uow.commit(&self.store).await?;

        Ok(CommandResult {
            new_version: aggregate.version(),
            aggregate,
            events,
            transaction_id: Some(receipt.transaction_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created { id: AggregateId, name: String },
        Updated { value: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Updated { .. } => "TestUpdated",
            }
        }
    }

    #[derive(Debug, Default, Clone)]
    struct TestAggregate {
        id: Option<AggregateId>,
        name: String,
        value: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("invalid value: {0}")]
        InvalidValue(i32),
    }

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Created { id, name } => {
                    self.id = Some(id);
                    self.name = name;
                }
                TestEvent::Updated { value } => self.value = value,
            }
        }
    }

    impl From<TestError> for DomainError {
        fn from(e: TestError) -> Self {
            DomainError::AggregateNotFound {
                aggregate_type: "TestAggregate",
                aggregate_id: e.to_string(),
            }
        }
    }

    fn created(id: AggregateId) -> TestEvent {
        TestEvent::Created {
            id,
            name: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_execute_creates_aggregate() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(store);
        let aggregate_id = AggregateId::new();

        let result = handler
            .execute(aggregate_id, |_| Ok(vec![created(aggregate_id)]))
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.id(), Some(aggregate_id));
        assert!(result.transaction_id.is_some());
    }

    #[tokio::test]
    async fn test_execute_updates_aggregate() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(store);
        let aggregate_id = AggregateId::new();

        handler
            .execute(aggregate_id, |_| Ok(vec![created(aggregate_id)]))
            .await
            .unwrap();

        let result = handler
            .execute(aggregate_id, |_| Ok(vec![TestEvent::Updated { value: 42 }]))
            .await
            .unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.value, 42);

        let reloaded = handler.get(aggregate_id).await.unwrap();
        assert_eq!(reloaded.value, 42);
        assert_eq!(reloaded.version(), Version::new(2));
    }

    #[tokio::test]
    async fn test_execute_returns_error_on_invalid_command() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(store.clone());

        let result = handler
            .execute(AggregateId::new(), |_| Err(TestError::InvalidValue(-1)))
            .await;

        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let handler: CommandHandler<_, TestAggregate> =
            CommandHandler::new(InMemoryEventStore::new());

        assert!(handler.load_existing(AggregateId::new()).await.unwrap().is_none());
        let err = handler.get(AggregateId::new()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_events_returns_without_persisting() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(store.clone());

        let result = handler
            .execute(AggregateId::new(), |_| Ok(vec![]))
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::initial());
        assert!(result.transaction_id.is_none());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_aggregate_conflicts() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(store.clone());
        let aggregate_id = AggregateId::new();
        handler
            .execute(aggregate_id, |_| Ok(vec![created(aggregate_id)]))
            .await
            .unwrap();

        let mut first = handler.get(aggregate_id).await.unwrap();
        let mut second = handler.get(aggregate_id).await.unwrap();

        let mut uow = UnitOfWork::begin("first");
        uow.stage(aggregate_id, &mut first, vec![TestEvent::Updated { value: 1 }])
            .unwrap();
        uow.commit(&store).await.unwrap();

        let mut uow = UnitOfWork::begin("second");
        uow.stage(aggregate_id, &mut second, vec![TestEvent::Updated { value: 2 }])
            .unwrap();
        let err = uow.commit(&store).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(handler.get(aggregate_id).await.unwrap().value, 1);
    }
}
