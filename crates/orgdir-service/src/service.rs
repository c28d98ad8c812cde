//! # Organization Write Path
//!
//! ## Save
//!
//! 1. Structural checks on the organization and the category's mandatory
//!    attribute check run together; any failure rejects the save with
//!    `ServiceError::Validation` and nothing is written anywhere.
//! 2. The record is persisted. This is the durable step.
//! 3. Derived cache records are published. Failures end up in the returned
//!    `SyncReport` and never undo step 2.
//! 4. The search document is handed to the index.
//!
//! ## Destroy
//!
//! The record is deleted (values and statistics cascade), its derived
//! records retracted, and its search document removed.
//!
//! Saves, transitions and destroys of one organization are serialized by a
//! per-organization lock so that cache publishes land in save order. A lock
//! is dropped from the table once nobody holds or awaits it.
//!
//! [`OrganizationService::from_config`] is the composition root: Postgres or
//! in-memory persistence per `DATABASE_URL`, Redis for derived records.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use orgdir_cache::{CacheError, CacheSynchronizer, DynamicFields, RedisCacheStore, SyncReport};
use orgdir_core::{LifecycleState, OrganizationId, ValidationError, ValidationFailures};
use orgdir_schema::{AttributeValidator, CategorySchema, CategorySchemaStore};
use orgdir_search::{SearchDocumentBuilder, SearchIndex, SearchPage, SearchParams, SearchQuery};
use orgdir_state::Statistic;

use crate::config::ServiceConfig;
use crate::error::{RepositoryError, ServiceError};
use crate::repository::{connect_repository, OrganizationRecord, OrganizationRepository};

type OrgLock = Arc<tokio::sync::Mutex<()>>;
type LockTable = Mutex<HashMap<OrganizationId, OrgLock>>;

/// Exclusive hold on one organization's writes.
struct OrgWriteGuard<'a> {
    locks: &'a LockTable,
    id: OrganizationId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrgWriteGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are only made under the table lock, so a count of one
        // means no holder and no waiter.
        let mut locks = self.locks.lock();
        if locks.get(&self.id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&self.id);
        }
    }
}

/// Structural failures of the organization, then properties with more than
/// one value row, then the category's mandatory-attribute failures.
pub fn validate_record(schema: &CategorySchema, record: &OrganizationRecord) -> ValidationFailures {
    let validator = AttributeValidator::new();
    let mut failures = record.organization.validate_structure();
    failures.extend(validator.duplicates(schema, &record.values));
    failures.extend(validator.validate(schema, &record.values));
    failures
}

/// Orchestrates validation, persistence, cache publication and indexing.
pub struct OrganizationService {
    schemas: Arc<dyn CategorySchemaStore>,
    repository: Arc<dyn OrganizationRepository>,
    sync: CacheSynchronizer,
    index: Arc<dyn SearchIndex>,
    documents: SearchDocumentBuilder,
    locks: LockTable,
}

impl OrganizationService {
    pub fn new(
        schemas: Arc<dyn CategorySchemaStore>,
        repository: Arc<dyn OrganizationRepository>,
        sync: CacheSynchronizer,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            schemas,
            repository,
            sync,
            index,
            documents: SearchDocumentBuilder::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Connect the repository chosen by `config` and a Redis cache store.
    ///
    /// # Errors
    ///
    /// `ServiceError::Repository` when Postgres is configured but cannot be
    /// reached, `ServiceError::Cache` when Redis cannot be reached.
    pub async fn from_config(
        config: &ServiceConfig,
        schemas: Arc<dyn CategorySchemaStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Result<Self, ServiceError> {
        let repository = connect_repository(config).await?;
        let store = RedisCacheStore::connect(&config.redis_url).await?;
        let sync = CacheSynchronizer::new(Arc::new(store), config.sync_config());
        Ok(Self::new(schemas, repository, sync, index))
    }

    pub fn synchronizer(&self) -> &CacheSynchronizer {
        &self.sync
    }

    async fn lock_org(&self, id: OrganizationId) -> OrgWriteGuard<'_> {
        let lock = self.locks.lock().entry(id).or_default().clone();
        let guard = lock.lock_owned().await;
        OrgWriteGuard {
            locks: &self.locks,
            id,
            guard: Some(guard),
        }
    }

    /// All failures that would reject a save of `record`.
    pub fn validate(&self, record: &OrganizationRecord) -> ValidationFailures {
        let schema = self.schemas.definitions_for(record.organization.category_id);
        validate_record(&schema, record)
    }

    pub async fn load(&self, id: OrganizationId) -> Result<OrganizationRecord, ServiceError> {
        self.repository
            .load(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Validate, persist, then publish and index.
    #[tracing::instrument(skip_all, fields(org = %record.id()))]
    pub async fn save(&self, record: &OrganizationRecord) -> Result<SyncReport, ServiceError> {
        let _guard = self.lock_org(record.id()).await;
        self.save_locked(record).await
    }

    async fn save_locked(&self, record: &OrganizationRecord) -> Result<SyncReport, ServiceError> {
        let failures = self.validate(record);
        if !failures.is_empty() {
            tracing::info!(failures = failures.len(), "save rejected by validation");
            return Err(ValidationError::new(failures).into());
        }

        self.repository.save(record).await?;

        let org = &record.organization;
        let schema = self.schemas.definitions_for(org.category_id);
        let report = self.sync.publish(org, &schema, &record.values).await;
        if !report.is_clean() {
            tracing::warn!(
                failures = report.failures.len(),
                "organization saved with stale derived records"
            );
        }

        self.index
            .index(self.documents.to_document(org, &record.values));
        Ok(report)
    }

    /// Move an organization along a lifecycle edge and save it.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        id: OrganizationId,
        target: LifecycleState,
        reason: &str,
    ) -> Result<SyncReport, ServiceError> {
        let _guard = self.lock_org(id).await;
        let mut record = self.load(id).await?;
        record.organization.transition_to(target, reason)?;
        self.save_locked(&record).await
    }

    /// Delete, retract derived records, and drop the search document.
    #[tracing::instrument(skip(self))]
    pub async fn destroy(&self, id: OrganizationId) -> Result<SyncReport, ServiceError> {
        let _guard = self.lock_org(id).await;
        let record = self
            .repository
            .delete(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        let report = self.sync.retract(&record.organization).await;
        self.index.remove(id);
        Ok(report)
    }

    /// Record a usage event; a blank `kind` records a page view.
    #[tracing::instrument(skip(self))]
    pub async fn record_statistic(&self, id: OrganizationId, kind: &str) -> Result<Statistic, ServiceError> {
        let statistic = Statistic::new(id, kind);
        match self.repository.record_statistic(&statistic).await {
            Ok(()) => Ok(statistic),
            Err(RepositoryError::UnknownOrganization(id)) => Err(ServiceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn statistics(&self, id: OrganizationId) -> Result<Vec<Statistic>, ServiceError> {
        Ok(self.repository.statistics(id).await?)
    }

    /// Dynamic fields from the cache, recomputed from the repository on a miss.
    pub async fn read_dynamic_fields(&self, id: OrganizationId) -> Result<DynamicFields, ServiceError> {
        let fields = self
            .sync
            .read_dynamic_fields(id, move || async move {
                let record = self
                    .repository
                    .load(id)
                    .await
                    .map_err(|e| CacheError::Recompute(e.to_string()))?
                    .ok_or_else(|| CacheError::Recompute(format!("organization {id} not found")))?;
                let schema = self.schemas.definitions_for(record.organization.category_id);
                Ok(self.sync.projector().dynamic_fields(&schema, &record.values))
            })
            .await?;
        Ok(fields)
    }

    /// Public search over published organizations.
    pub fn search(&self, params: &SearchParams) -> Result<SearchPage, ServiceError> {
        let query = SearchQuery::from_params(params)?;
        Ok(self.index.search(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveTime, Weekday};

    use orgdir_cache::{CacheStore, MemoryCacheStore, SyncConfig};
    use orgdir_core::{AttributeValueId, CategoryId, CityId, PropertyId};
    use orgdir_schema::{AttributeValue, MemorySchemaStore, PropertyDefinition, RawValue};
    use orgdir_search::MemorySearchIndex;
    use orgdir_state::{Organization, Schedule};

    use crate::repository::MemoryRepository;

    /// Holds back every string write whose value mentions `slow_marker`.
    struct SlowStore {
        inner: MemoryCacheStore,
        slow_marker: &'static str,
    }

    #[async_trait]
    impl CacheStore for SlowStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
            if value.contains(self.slow_marker) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.set(key, value).await
        }
        async fn del(&self, key: &str) -> Result<(), CacheError> {
            self.inner.del(key).await
        }
        async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
            self.inner.hset(key, field, value).await
        }
        async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<(), CacheError> {
            self.inner.hset_multiple(key, fields).await
        }
        async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError> {
            self.inner.hgetall(key).await
        }
        async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
            self.inner.hdel(key, field).await
        }
    }

    fn service(store: Arc<SlowStore>) -> OrganizationService {
        let schemas = MemorySchemaStore::new().with_category(
            CategoryId(1),
            [PropertyDefinition {
                id: PropertyId(1),
                category_id: CategoryId(1),
                title: "Name".into(),
                row_order: 1,
                show_on_public: true,
                mandatory: true,
            }],
        );
        OrganizationService::new(
            Arc::new(schemas),
            Arc::new(MemoryRepository::new()),
            CacheSynchronizer::new(store, SyncConfig::default()),
            Arc::new(MemorySearchIndex::new()),
        )
    }

    fn named(name: &str) -> OrganizationRecord {
        let mut org = Organization::new(OrganizationId(1), CategoryId(1), CityId(1), "Cafe", "cafe");
        org.schedules.push(Schedule::new(
            vec![Weekday::Mon],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        ));
        let value = AttributeValue::new(
            AttributeValueId(10),
            OrganizationId(1),
            PropertyId(1),
            Some(RawValue::text(name)),
        );
        OrganizationRecord::new(org, vec![value])
    }

    #[tokio::test]
    async fn test_concurrent_saves_publish_in_save_order() {
        let store = Arc::new(SlowStore {
            inner: MemoryCacheStore::new(),
            slow_marker: "First",
        });
        let service = service(store.clone());
        let (first, second) = (named("First"), named("Second"));

        let (a, b) = tokio::join!(service.save(&first), service.save(&second));
        assert!(a.unwrap().is_clean());
        assert!(b.unwrap().is_clean());

        let blob = store.inner.get("dynamicFields:1").await.unwrap().unwrap();
        assert!(blob.contains("Second"), "latest save lost: {blob}");
        assert!(service.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_locks_are_released_after_every_operation() {
        let store = Arc::new(SlowStore {
            inner: MemoryCacheStore::new(),
            slow_marker: "never",
        });
        let service = service(store);

        assert!(service.save(&named("")).await.is_err());
        assert!(service.locks.lock().is_empty());

        service.save(&named("Cafe")).await.unwrap();
        service
            .transition(OrganizationId(1), LifecycleState::Published, "seed")
            .await
            .unwrap();
        assert!(service.locks.lock().is_empty());

        service.destroy(OrganizationId(1)).await.unwrap();
        assert!(service.destroy(OrganizationId(1)).await.is_err());
        assert!(service.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_need_a_stored_organization() {
        let service = service(Arc::new(SlowStore {
            inner: MemoryCacheStore::new(),
            slow_marker: "never",
        }));
        assert!(matches!(
            service.record_statistic(OrganizationId(1), "").await,
            Err(ServiceError::NotFound(OrganizationId(1)))
        ));

        service.save(&named("Cafe")).await.unwrap();
        let stat = service.record_statistic(OrganizationId(1), "").await.unwrap();
        assert_eq!(stat.kind, "show");
        assert_eq!(service.statistics(OrganizationId(1)).await.unwrap(), [stat]);
    }
}
