use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, CommitReceipt, EventEnvelope, EventId, EventStoreError, Result, Transaction,
    TransactionId, UniqueKey, Version,
    store::{EventStore, check_staged_version},
};

const SELECT_EVENTS: &str = r#"
    SELECT id, transaction_id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
    FROM events
"#;

/// PostgreSQL-backed event store.
///
/// Each commit runs in one database transaction. Dropping the sqlx
/// transaction on an early return rolls everything back.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a default pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            transaction_id: TransactionId::from_uuid(row.try_get::<Uuid, _>("transaction_id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    async fn current_version(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        aggregate_id: AggregateId,
    ) -> Result<Version> {
        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut **tx)
                .await?;
        Ok(Version::new(current.unwrap_or(0)))
    }

    async fn insert_event(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event: &EventEnvelope,
        expected: Version,
    ) -> Result<()> {
        let metadata_json = serde_json::to_value(&event.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO events (id, transaction_id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(event.transaction_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.aggregate_id.as_uuid())
        .bind(&event.aggregate_type)
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.payload)
        .bind(metadata_json)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            // A concurrent writer got the same version in first.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_aggregate_version")
            {
                return EventStoreError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id,
                    expected,
                    actual: event.version,
                };
            }
            EventStoreError::Database(e)
        })?;

        Ok(())
    }

    async fn insert_claim(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        key: &UniqueKey,
        owner: AggregateId,
    ) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO unique_keys (scope, value, aggregate_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (scope, value) DO NOTHING
            "#,
        )
        .bind(key.scope())
        .bind(key.value())
        .bind(owner.as_uuid())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            let existing: Option<Uuid> = sqlx::query_scalar(
                "SELECT aggregate_id FROM unique_keys WHERE scope = $1 AND value = $2",
            )
            .bind(key.scope())
            .bind(key.value())
            .fetch_optional(&mut **tx)
            .await?;

            return Err(EventStoreError::UniqueViolation {
                key: key.clone(),
                existing: existing.map(AggregateId::from_uuid),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, transaction), fields(transaction_id = %transaction.id()))]
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt> {
        let (transaction_id, appends, claims) = transaction.into_parts();
        let mut tx = self.pool.begin().await?;

        let mut reached: HashMap<AggregateId, Version> = HashMap::new();
        for staged in &appends {
            let Some(aggregate_id) = staged.aggregate_id() else {
                return Err(EventStoreError::InvalidAppend(
                    "Cannot append empty event list".to_string(),
                ));
            };
            let current = match reached.get(&aggregate_id) {
                Some(version) => *version,
                None => Self::current_version(&mut tx, aggregate_id).await?,
            };
            let next = check_staged_version(staged, current)?;

            for event in &staged.events {
                Self::insert_event(&mut tx, event, current).await?;
            }
            reached.insert(aggregate_id, next);
        }

        for (key, owner) in &claims {
            Self::insert_claim(&mut tx, key, *owner).await?;
        }

        tx.commit().await?;
        tracing::debug!(aggregates = reached.len(), claims = claims.len(), "transaction committed");

        Ok(CommitReceipt {
            transaction_id,
            versions: reached,
        })
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE aggregate_id = $1 ORDER BY version ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_events_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE transaction_id = $1 ORDER BY timestamp ASC, version ASC"
        ))
        .bind(transaction_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn find_unique(&self, key: &UniqueKey) -> Result<Option<AggregateId>> {
        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT aggregate_id FROM unique_keys WHERE scope = $1 AND value = $2",
        )
        .bind(key.scope())
        .bind(key.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner.map(AggregateId::from_uuid))
    }
}
