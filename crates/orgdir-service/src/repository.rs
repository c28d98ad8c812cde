//! # Organization Repository
//!
//! The relational store is the source of truth for organizations and their
//! attribute values. Two implementations:
//!
//! - [`MemoryRepository`] for development, tests, and offline tooling.
//! - [`PgRepository`] over a `sqlx` Postgres pool. Nested data (address,
//!   schedules, service packs, transition log, raw values) is stored as JSONB.
//!   Attribute values and usage statistics live in their own tables and are
//!   deleted with their organization by `ON DELETE CASCADE`.
//!
//! A save replaces the organization row and its full set of value rows in
//! one transaction. Statistics are append-only and untouched by saves.
//!
//! [`connect_repository`] picks the backend from [`ServiceConfig`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use orgdir_core::{
    AttributeValueId, CategoryId, CityId, LifecycleState, OrganizationId, PropertyId, Timestamp,
    UserId,
};
use orgdir_schema::{AttributeValue, RawValue};
use orgdir_state::{Address, Organization, Schedule, ServicePack, Statistic, TransitionRecord};

use crate::config::ServiceConfig;
use crate::error::RepositoryError;

/// An organization with its attribute values, as persisted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub organization: Organization,
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

impl OrganizationRecord {
    pub fn new(organization: Organization, values: Vec<AttributeValue>) -> Self {
        Self {
            organization,
            values,
        }
    }

    pub fn id(&self) -> OrganizationId {
        self.organization.id
    }
}

/// Load/save/delete of organizations with their attribute values, plus
/// their usage statistics.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn load(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError>;

    /// Insert or replace the organization and all of its value rows.
    async fn save(&self, record: &OrganizationRecord) -> Result<(), RepositoryError>;

    /// Delete the organization, its values and its statistics, returning
    /// what was deleted.
    async fn delete(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError>;

    /// Append a usage event.
    ///
    /// # Errors
    ///
    /// `RepositoryError::UnknownOrganization` when the organization is not
    /// stored.
    async fn record_statistic(&self, statistic: &Statistic) -> Result<(), RepositoryError>;

    /// Usage events of an organization, oldest first.
    async fn statistics(&self, id: OrganizationId) -> Result<Vec<Statistic>, RepositoryError>;
}

/// Postgres when `database_url` is set, in-memory otherwise.
pub async fn connect_repository(
    config: &ServiceConfig,
) -> Result<Arc<dyn OrganizationRepository>, RepositoryError> {
    match &config.database_url {
        Some(url) => Ok(Arc::new(PgRepository::connect(url).await?)),
        None => {
            tracing::info!("using in-memory organization store");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

// ─── In-memory ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryTables {
    records: HashMap<OrganizationId, OrganizationRecord>,
    statistics: HashMap<OrganizationId, Vec<Statistic>>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<MemoryTables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().records.is_empty()
    }
}

#[async_trait]
impl OrganizationRepository for MemoryRepository {
    async fn load(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError> {
        Ok(self.tables.read().records.get(&id).cloned())
    }

    async fn save(&self, record: &OrganizationRecord) -> Result<(), RepositoryError> {
        self.tables.write().records.insert(record.id(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError> {
        let mut tables = self.tables.write();
        tables.statistics.remove(&id);
        Ok(tables.records.remove(&id))
    }

    async fn record_statistic(&self, statistic: &Statistic) -> Result<(), RepositoryError> {
        let id = statistic.organization_id;
        let mut tables = self.tables.write();
        if !tables.records.contains_key(&id) {
            return Err(RepositoryError::UnknownOrganization(id));
        }
        tables.statistics.entry(id).or_default().push(statistic.clone());
        Ok(())
    }

    async fn statistics(&self, id: OrganizationId) -> Result<Vec<Statistic>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .statistics
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}

// ─── Postgres ────────────────────────────────────────────────────────

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    id                 BIGINT PRIMARY KEY,
    category_id        BIGINT NOT NULL,
    user_id            BIGINT,
    city_id            BIGINT NOT NULL,
    parent_id          BIGINT,
    title              TEXT NOT NULL,
    slug               TEXT NOT NULL,
    state              TEXT NOT NULL,
    logotype_thumb_url TEXT,
    address            JSONB,
    schedules          JSONB NOT NULL DEFAULT '[]',
    service_packs      JSONB NOT NULL DEFAULT '[]',
    transitions        JSONB NOT NULL DEFAULT '[]',
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS organizations_user_id_idx ON organizations (user_id);
CREATE TABLE IF NOT EXISTS attribute_values (
    id              BIGINT PRIMARY KEY,
    organization_id BIGINT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    property_id     BIGINT NOT NULL,
    raw             JSONB,
    UNIQUE (organization_id, property_id)
);
CREATE TABLE IF NOT EXISTS statistics (
    id              BIGSERIAL PRIMARY KEY,
    organization_id BIGINT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    kind            TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS statistics_organization_id_idx ON statistics (organization_id);
";

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: i64,
    category_id: i64,
    user_id: Option<i64>,
    city_id: i64,
    parent_id: Option<i64>,
    title: String,
    slug: String,
    state: String,
    logotype_thumb_url: Option<String>,
    address: Option<Json<Address>>,
    schedules: Json<Vec<Schedule>>,
    service_packs: Json<Vec<ServicePack>>,
    transitions: Json<Vec<TransitionRecord>>,
}

impl OrganizationRow {
    fn into_organization(self) -> Result<Organization, RepositoryError> {
        let id = OrganizationId(self.id);
        let state = LifecycleState::from_str(&self.state).map_err(|e| RepositoryError::InvalidRow {
            id,
            reason: e.to_string(),
        })?;
        Ok(Organization {
            id,
            category_id: CategoryId(self.category_id),
            user_id: self.user_id.map(UserId),
            city_id: CityId(self.city_id),
            parent_id: self.parent_id.map(OrganizationId),
            title: self.title,
            slug: self.slug,
            state,
            logotype_thumb_url: self.logotype_thumb_url,
            address: self.address.map(|a| a.0),
            schedules: self.schedules.0,
            service_packs: self.service_packs.0,
            transitions: self.transitions.0,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ValueRow {
    id: i64,
    organization_id: i64,
    property_id: i64,
    raw: Option<Json<RawValue>>,
}

impl From<ValueRow> for AttributeValue {
    fn from(row: ValueRow) -> Self {
        AttributeValue::new(
            AttributeValueId(row.id),
            OrganizationId(row.organization_id),
            PropertyId(row.property_id),
            row.raw.map(|r| r.0),
        )
    }
}

#[derive(sqlx::FromRow)]
struct StatisticRow {
    organization_id: i64,
    kind: String,
    created_at: DateTime<Utc>,
}

impl From<StatisticRow> for Statistic {
    fn from(row: StatisticRow) -> Self {
        Statistic {
            organization_id: OrganizationId(row.organization_id),
            kind: row.kind,
            timestamp: Timestamp::from_utc(row.created_at),
        }
    }
}

/// Postgres-backed repository.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Connect and make sure the tables exist.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!("connected to PostgreSQL");
        let repo = Self::from_pool(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::info!("organization tables ready");
        Ok(())
    }
}

#[async_trait]
impl OrganizationRepository for PgRepository {
    #[tracing::instrument(skip(self))]
    async fn load(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, category_id, user_id, city_id, parent_id, title, slug, state,
             logotype_thumb_url, address, schedules, service_packs, transitions
             FROM organizations WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let organization = row.into_organization()?;

        let values = sqlx::query_as::<_, ValueRow>(
            "SELECT id, organization_id, property_id, raw
             FROM attribute_values WHERE organization_id = $1 ORDER BY id",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttributeValue::from)
        .collect();

        Ok(Some(OrganizationRecord::new(organization, values)))
    }

    #[tracing::instrument(skip_all, fields(org = %record.id()))]
    async fn save(&self, record: &OrganizationRecord) -> Result<(), RepositoryError> {
        let org = &record.organization;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO organizations (id, category_id, user_id, city_id, parent_id, title, slug,
             state, logotype_thumb_url, address, schedules, service_packs, transitions, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now())
             ON CONFLICT (id) DO UPDATE SET
                category_id = EXCLUDED.category_id,
                user_id = EXCLUDED.user_id,
                city_id = EXCLUDED.city_id,
                parent_id = EXCLUDED.parent_id,
                title = EXCLUDED.title,
                slug = EXCLUDED.slug,
                state = EXCLUDED.state,
                logotype_thumb_url = EXCLUDED.logotype_thumb_url,
                address = EXCLUDED.address,
                schedules = EXCLUDED.schedules,
                service_packs = EXCLUDED.service_packs,
                transitions = EXCLUDED.transitions,
                updated_at = now()",
        )
        .bind(org.id.get())
        .bind(org.category_id.get())
        .bind(org.user_id.map(|u| u.get()))
        .bind(org.city_id.get())
        .bind(org.parent_id.map(|p| p.get()))
        .bind(&org.title)
        .bind(&org.slug)
        .bind(org.state.as_str())
        .bind(&org.logotype_thumb_url)
        .bind(org.address.as_ref().map(Json))
        .bind(Json(&org.schedules))
        .bind(Json(&org.service_packs))
        .bind(Json(&org.transitions))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM attribute_values WHERE organization_id = $1")
            .bind(org.id.get())
            .execute(&mut *tx)
            .await?;

        for value in &record.values {
            sqlx::query(
                "INSERT INTO attribute_values (id, organization_id, property_id, raw)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(value.id.get())
            .bind(org.id.get())
            .bind(value.property_id.get())
            .bind(value.raw.as_ref().map(Json))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: OrganizationId) -> Result<Option<OrganizationRecord>, RepositoryError> {
        let existing = self.load(id).await?;
        if existing.is_some() {
            sqlx::query("DELETE FROM organizations WHERE id = $1")
                .bind(id.get())
                .execute(&self.pool)
                .await?;
        }
        Ok(existing)
    }

    #[tracing::instrument(skip_all, fields(org = %statistic.organization_id, kind = %statistic.kind))]
    async fn record_statistic(&self, statistic: &Statistic) -> Result<(), RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO statistics (organization_id, kind, created_at)
             SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM organizations WHERE id = $1)",
        )
        .bind(statistic.organization_id.get())
        .bind(&statistic.kind)
        .bind(*statistic.timestamp.as_datetime())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(RepositoryError::UnknownOrganization(statistic.organization_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn statistics(&self, id: OrganizationId) -> Result<Vec<Statistic>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatisticRow>(
            "SELECT organization_id, kind, created_at
             FROM statistics WHERE organization_id = $1 ORDER BY id",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Statistic::from).collect())
    }
}
