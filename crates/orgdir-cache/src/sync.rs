//! # Cache Synchronizer
//!
//! Publishes and retracts the derived records of one organization.
//!
//! ## On save
//!
//! 1. `dynamicFields:{orgId}` is recomputed and written unconditionally.
//! 2. If the organization has an owner, its entry in `{userId}:listings` is
//!    merged in with a single-field `hset`.
//! 3. If it is published and has an address, `autocomplete:{orgId}` is
//!    written. Otherwise the record is deleted when
//!    `retract_ineligible_autocomplete` is set, and left alone when it is not.
//!
//! ## On destroy
//!
//! The listing field, the dynamic fields, and the autocomplete record are
//! deleted. Deleting something absent is fine.
//!
//! ## Failure policy
//!
//! The canonical write is already durable when publishing starts. Every
//! store call runs under `SyncConfig::timeout`; failures are logged, counted
//! in `orgdir_cache_failures_total`, collected in the `SyncReport`, and never
//! abort the remaining steps.
//!
//! Successive publishes for one organization are applied in call order. The
//! synchronizer does not serialize concurrent saves of the same organization;
//! callers that need that hold a per-organization lock.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use orgdir_core::{OrganizationId, UserId};
use orgdir_schema::{AttributeValue, CategorySchema};
use orgdir_state::Organization;

use crate::error::CacheError;
use crate::keys;
use crate::projector::{DenormalizedProjector, DynamicFields};
use crate::records::{AutocompletePlace, ListingEntry};
use crate::store::CacheStore;

/// Default per-operation store timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Synchronizer settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for each store call.
    pub timeout: Duration,
    /// Prefix for organization URLs in listing and autocomplete records.
    pub public_base_url: String,
    /// Delete `autocomplete:{orgId}` on a save that no longer qualifies.
    pub retract_ineligible_autocomplete: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            public_base_url: String::new(),
            retract_ineligible_autocomplete: true,
        }
    }
}

/// The three derived records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    DynamicFields,
    UserListing,
    Autocomplete,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicFields => write!(f, "dynamic_fields"),
            Self::UserListing => write!(f, "user_listing"),
            Self::Autocomplete => write!(f, "autocomplete"),
        }
    }
}

/// What a publish or retract pass did.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub written: Vec<RecordKind>,
    pub removed: Vec<RecordKind>,
    pub failures: Vec<(RecordKind, CacheError)>,
}

impl SyncReport {
    /// No store call failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, kind: RecordKind) -> bool {
        self.failures.iter().any(|(k, _)| *k == kind)
    }
}

enum Effect {
    Written,
    Removed,
}

/// Publishes and retracts derived records against an injected store.
pub struct CacheSynchronizer {
    store: Arc<dyn CacheStore>,
    projector: DenormalizedProjector,
    config: SyncConfig,
}

impl fmt::Debug for CacheSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSynchronizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheSynchronizer {
    pub fn new(store: Arc<dyn CacheStore>, config: SyncConfig) -> Self {
        Self {
            store,
            projector: DenormalizedProjector::new(),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn projector(&self) -> &DenormalizedProjector {
        &self.projector
    }

    // ── Write path ──────────────────────────────────────────────────

    /// Publish all derived records after a successful save.
    #[tracing::instrument(skip_all, fields(org = %org.id))]
    pub async fn publish(
        &self,
        org: &Organization,
        schema: &CategorySchema,
        values: &[AttributeValue],
    ) -> SyncReport {
        let mut report = SyncReport::default();

        let fields = self.projector.dynamic_fields(schema, values);
        let result = self.write_fields(org.id, &fields).await;
        self.note(&mut report, RecordKind::DynamicFields, Effect::Written, "set", result);

        if let Some(user) = org.user_id {
            let result = self.write_listing(user, org).await;
            self.note(&mut report, RecordKind::UserListing, Effect::Written, "hset", result);
        }

        let key = keys::autocomplete(org.id);
        match AutocompletePlace::for_organization(org, &self.config.public_base_url) {
            Some(place) => {
                let fields = place.to_fields();
                let result = self
                    .guarded("hset", &key, self.store.hset_multiple(&key, &fields))
                    .await;
                self.note(&mut report, RecordKind::Autocomplete, Effect::Written, "hset", result);
            }
            None if self.config.retract_ineligible_autocomplete => {
                let result = self.guarded("del", &key, self.store.del(&key)).await;
                self.note(&mut report, RecordKind::Autocomplete, Effect::Removed, "del", result);
            }
            None => {}
        }

        tracing::info!(
            written = report.written.len(),
            removed = report.removed.len(),
            failures = report.failures.len(),
            "published derived records"
        );
        report
    }

    /// Delete all derived records after the organization is destroyed.
    #[tracing::instrument(skip_all, fields(org = %org.id))]
    pub async fn retract(&self, org: &Organization) -> SyncReport {
        let mut report = SyncReport::default();

        if let Some(user) = org.user_id {
            let key = keys::user_listings(user);
            let field = org.id.to_string();
            let result = self.guarded("hdel", &key, self.store.hdel(&key, &field)).await;
            self.note(&mut report, RecordKind::UserListing, Effect::Removed, "hdel", result);
        }

        let key = keys::dynamic_fields(org.id);
        let result = self.guarded("del", &key, self.store.del(&key)).await;
        self.note(&mut report, RecordKind::DynamicFields, Effect::Removed, "del", result);

        let key = keys::autocomplete(org.id);
        let result = self.guarded("del", &key, self.store.del(&key)).await;
        self.note(&mut report, RecordKind::Autocomplete, Effect::Removed, "del", result);

        tracing::info!(
            removed = report.removed.len(),
            failures = report.failures.len(),
            "retracted derived records"
        );
        report
    }

    // ── Read path ───────────────────────────────────────────────────

    /// Read `dynamicFields:{orgId}`, healing a miss once.
    ///
    /// 1. Read the blob. A hit is returned as is.
    /// 2. On a miss, a store error, or an undecodable blob, call `recompute`
    ///    once and republish its result.
    /// 3. Read again. Anything but a hit is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns the error of `recompute`, the error of the second read, or
    /// `CacheError::Missing` if the second read finds nothing.
    #[tracing::instrument(skip(self, recompute))]
    pub async fn read_dynamic_fields<F, Fut>(
        &self,
        id: OrganizationId,
        recompute: F,
    ) -> Result<DynamicFields, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DynamicFields, CacheError>>,
    {
        let key = keys::dynamic_fields(id);
        match self.try_read_fields(&key).await {
            Ok(Some(fields)) => return Ok(fields),
            Ok(None) => tracing::debug!(%key, "dynamic fields missing, recomputing"),
            Err(e) => {
                tracing::warn!(%key, error = %e, "dynamic fields unreadable, recomputing");
                metrics::counter!("orgdir_cache_failures_total", "op" => "read").increment(1);
            }
        }

        metrics::counter!("orgdir_cache_self_heal_total").increment(1);
        let fields = recompute().await?;
        if let Err(e) = self.write_fields(id, &fields).await {
            tracing::warn!(%key, error = %e, "republishing dynamic fields failed");
            metrics::counter!("orgdir_cache_failures_total", "op" => "set").increment(1);
        }

        match self.try_read_fields(&key).await {
            Ok(Some(fields)) => Ok(fields),
            Ok(None) => Err(CacheError::Missing { key }),
            Err(e) => Err(e),
        }
    }

    /// Entries of a user's listing, by organization.
    pub async fn read_listing(
        &self,
        user: UserId,
    ) -> Result<BTreeMap<OrganizationId, ListingEntry>, CacheError> {
        let key = keys::user_listings(user);
        let raw = self.guarded("hgetall", &key, self.store.hgetall(&key)).await?;
        raw.into_iter()
            .map(|(field, json)| {
                let id = field.parse::<OrganizationId>().map_err(|e| CacheError::Corrupt {
                    key: key.clone(),
                    reason: format!("field {field:?}: {e}"),
                })?;
                let entry = serde_json::from_str(&json).map_err(|e| CacheError::Corrupt {
                    key: key.clone(),
                    reason: format!("field {field:?}: {e}"),
                })?;
                Ok((id, entry))
            })
            .collect()
    }

    /// The autocomplete record of an organization, if published.
    pub async fn read_autocomplete(
        &self,
        id: OrganizationId,
    ) -> Result<Option<AutocompletePlace>, CacheError> {
        let key = keys::autocomplete(id);
        let raw = self.guarded("hgetall", &key, self.store.hgetall(&key)).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        AutocompletePlace::from_fields(&key, &raw).map(Some)
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn write_fields(&self, id: OrganizationId, fields: &DynamicFields) -> Result<(), CacheError> {
        let key = keys::dynamic_fields(id);
        let blob = fields.to_json();
        self.guarded("set", &key, self.store.set(&key, &blob)).await
    }

    async fn write_listing(&self, user: UserId, org: &Organization) -> Result<(), CacheError> {
        let key = keys::user_listings(user);
        let entry = ListingEntry::for_organization(org, &self.config.public_base_url);
        let json = serde_json::to_string(&entry).map_err(|e| CacheError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let field = org.id.to_string();
        self.guarded("hset", &key, self.store.hset(&key, &field, &json))
            .await
    }

    async fn try_read_fields(&self, key: &str) -> Result<Option<DynamicFields>, CacheError> {
        let blob = self.guarded("get", key, self.store.get(key)).await?;
        blob.map(|b| {
            DynamicFields::from_json(&b).map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    async fn guarded<T>(
        &self,
        op: &'static str,
        key: &str,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                op,
                key: key.to_string(),
            }),
        }
    }

    fn note(
        &self,
        report: &mut SyncReport,
        kind: RecordKind,
        effect: Effect,
        op: &'static str,
        result: Result<(), CacheError>,
    ) {
        match result {
            Ok(()) => match effect {
                Effect::Written => report.written.push(kind),
                Effect::Removed => report.removed.push(kind),
            },
            Err(e) => {
                tracing::warn!(record = %kind, error = %e, "derived record not synchronized");
                metrics::counter!("orgdir_cache_failures_total", "op" => op).increment(1);
                report.failures.push((kind, e));
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCacheStore;
    use async_trait::async_trait;
    use chrono::{NaiveTime, Weekday};
    use orgdir_core::{AttributeValueId, CategoryId, CityId, PropertyId};
    use orgdir_schema::{PropertyDefinition, RawValue};
    use orgdir_state::{Address, Schedule};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store with switchable failures and delays.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryCacheStore,
        failing: Mutex<HashSet<&'static str>>,
        drop_sets: bool,
        delay: Option<Duration>,
    }

    impl FlakyStore {
        fn failing(ops: &[&'static str]) -> Self {
            Self {
                failing: Mutex::new(ops.iter().copied().collect()),
                ..Default::default()
            }
        }

        async fn gate(&self, op: &'static str, key: &str) -> Result<(), CacheError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().contains(op) {
                return Err(CacheError::backend(op, key, "connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.gate("get", key).await?;
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
            self.gate("set", key).await?;
            if self.drop_sets {
                return Ok(());
            }
            self.inner.set(key, value).await
        }
        async fn del(&self, key: &str) -> Result<(), CacheError> {
            self.gate("del", key).await?;
            self.inner.del(key).await
        }
        async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
            self.gate("hset", key).await?;
            self.inner.hset(key, field, value).await
        }
        async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<(), CacheError> {
            self.gate("hset", key).await?;
            self.inner.hset_multiple(key, fields).await
        }
        async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError> {
            self.gate("hgetall", key).await?;
            self.inner.hgetall(key).await
        }
        async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
            self.gate("hdel", key).await?;
            self.inner.hdel(key, field).await
        }
    }

    fn schema() -> CategorySchema {
        CategorySchema::new(
            CategoryId(1),
            vec![
                PropertyDefinition {
                    id: PropertyId(1),
                    category_id: CategoryId(1),
                    title: "Name".into(),
                    row_order: 1,
                    show_on_public: true,
                    mandatory: true,
                },
                PropertyDefinition {
                    id: PropertyId(2),
                    category_id: CategoryId(1),
                    title: "Color".into(),
                    row_order: 2,
                    show_on_public: true,
                    mandatory: false,
                },
            ],
        )
    }

    fn values(id: i64) -> Vec<AttributeValue> {
        vec![
            AttributeValue::new(AttributeValueId(10), OrganizationId(id), PropertyId(1), Some(RawValue::text("Cafe"))),
            AttributeValue::new(AttributeValueId(11), OrganizationId(id), PropertyId(2), Some(RawValue::text("Blue"))),
        ]
    }

    fn published_org(id: i64, user: i64) -> Organization {
        let mut org = Organization::new(
            OrganizationId(id),
            CategoryId(1),
            CityId(1),
            format!("Cafe {id}"),
            format!("cafe-{id}"),
        );
        org.user_id = Some(UserId(user));
        org.address = Some(Address::new("Main st. 1", 30.5, 50.4));
        org.schedules.push(Schedule::new(
            vec![Weekday::Mon],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        ));
        org.publish("test").unwrap();
        org
    }

    fn sync_over(store: Arc<dyn CacheStore>) -> CacheSynchronizer {
        CacheSynchronizer::new(store, SyncConfig::default())
    }

    #[tokio::test]
    async fn test_publish_writes_all_three_records() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let org = published_org(1, 7);

        let report = sync.publish(&org, &schema(), &values(1)).await;
        assert!(report.is_clean());
        assert_eq!(report.written.len(), 3);

        assert_eq!(
            store.get("dynamicFields:1").await.unwrap().as_deref(),
            Some(r#"{"Name":"Cafe","Color":"Blue"}"#)
        );
        let listing = sync.read_listing(UserId(7)).await.unwrap();
        assert_eq!(listing[&OrganizationId(1)].title, "Cafe 1");
        assert_eq!(listing[&OrganizationId(1)].state, "Published");
        let place = sync.read_autocomplete(OrganizationId(1)).await.unwrap().unwrap();
        assert_eq!((place.longitude, place.latitude), (30.5, 50.4));
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let org = published_org(1, 7);

        sync.publish(&org, &schema(), &values(1)).await;
        let once = store.snapshot();
        sync.publish(&org, &schema(), &values(1)).await;
        assert_eq!(store.snapshot(), once);
    }

    #[tokio::test]
    async fn test_listing_merges_organizations_of_one_user() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let a = published_org(1, 7);
        let b = published_org(2, 7);

        sync.publish(&a, &schema(), &values(1)).await;
        sync.publish(&b, &schema(), &values(2)).await;
        assert_eq!(sync.read_listing(UserId(7)).await.unwrap().len(), 2);

        sync.retract(&a).await;
        let listing = sync.read_listing(UserId(7)).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing.contains_key(&OrganizationId(2)));
    }

    #[tokio::test]
    async fn test_no_owner_skips_listing() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let mut org = published_org(1, 7);
        org.user_id = None;

        let report = sync.publish(&org, &schema(), &values(1)).await;
        assert!(!report.written.contains(&RecordKind::UserListing));
        assert!(!store.contains("7:listings"));
    }

    #[tokio::test]
    async fn test_unpublished_save_retracts_autocomplete_by_default() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let mut org = published_org(1, 7);
        sync.publish(&org, &schema(), &values(1)).await;

        org.unpublish("owner request").unwrap();
        let report = sync.publish(&org, &schema(), &values(1)).await;
        assert!(report.removed.contains(&RecordKind::Autocomplete));
        assert!(sync.read_autocomplete(org.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unpublished_save_can_leave_stale_autocomplete() {
        let store = Arc::new(MemoryCacheStore::new());
        let config = SyncConfig {
            retract_ineligible_autocomplete: false,
            ..SyncConfig::default()
        };
        let sync = CacheSynchronizer::new(store.clone(), config);
        let mut org = published_org(1, 7);
        sync.publish(&org, &schema(), &values(1)).await;

        org.unpublish("owner request").unwrap();
        let report = sync.publish(&org, &schema(), &values(1)).await;
        assert!(!report.removed.contains(&RecordKind::Autocomplete));
        assert!(sync.read_autocomplete(org.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_retract_removes_everything_and_is_idempotent() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let org = published_org(1, 7);
        sync.publish(&org, &schema(), &values(1)).await;

        let report = sync.retract(&org).await;
        assert!(report.is_clean());
        assert!(store.is_empty());

        let again = sync.retract(&org).await;
        assert!(again.is_clean());
    }

    #[tokio::test]
    async fn test_store_failure_is_tolerated_per_record() {
        let store = Arc::new(FlakyStore::failing(&["set"]));
        let sync = sync_over(store.clone());
        let org = published_org(1, 7);

        let report = sync.publish(&org, &schema(), &values(1)).await;
        assert!(report.failed(RecordKind::DynamicFields));
        assert!(report.written.contains(&RecordKind::UserListing));
        assert!(report.written.contains(&RecordKind::Autocomplete));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(FlakyStore {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let config = SyncConfig {
            timeout: Duration::from_millis(10),
            ..SyncConfig::default()
        };
        let sync = CacheSynchronizer::new(store, config);

        let report = sync.publish(&published_org(1, 7), &schema(), &values(1)).await;
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|(_, e)| matches!(e, CacheError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_read_after_publish_returns_published_fields() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store);
        let org = published_org(1, 7);
        sync.publish(&org, &schema(), &values(1)).await;

        let expected = sync.projector().dynamic_fields(&schema(), &values(1));
        let fields = sync
            .read_dynamic_fields(org.id, || async {
                Err(CacheError::Recompute("must not be called".into()))
            })
            .await
            .unwrap();
        assert_eq!(fields, expected);
    }

    #[tokio::test]
    async fn test_read_miss_heals_once() {
        let store = Arc::new(MemoryCacheStore::new());
        let sync = sync_over(store.clone());
        let calls = AtomicUsize::new(0);
        let expected = sync.projector().dynamic_fields(&schema(), &values(1));
        let (counter, published) = (&calls, &expected);

        let fields = sync
            .read_dynamic_fields(OrganizationId(1), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(published.clone())
            })
            .await
            .unwrap();
        assert_eq!(fields, expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.contains("dynamicFields:1"));
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_recomputed() {
        let store = Arc::new(MemoryCacheStore::new());
        store.set("dynamicFields:1", "not json").await.unwrap();
        let sync = sync_over(store.clone());
        let expected = sync.projector().dynamic_fields(&schema(), &values(1));
        let published = &expected;

        let fields = sync
            .read_dynamic_fields(OrganizationId(1), move || async move { Ok(published.clone()) })
            .await
            .unwrap();
        assert_eq!(fields, expected);
    }

    #[tokio::test]
    async fn test_read_gives_up_after_one_recompute() {
        let store = Arc::new(FlakyStore {
            drop_sets: true,
            ..Default::default()
        });
        let sync = sync_over(store);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let err = sync
            .read_dynamic_fields(OrganizationId(1), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(DynamicFields::new())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Missing { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_surfaces_second_store_error() {
        let store = Arc::new(FlakyStore::failing(&["get"]));
        let sync = sync_over(store);

        let err = sync
            .read_dynamic_fields(OrganizationId(1), || async { Ok(DynamicFields::new()) })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Backend { op: "get", .. }));
    }

    #[tokio::test]
    async fn test_recompute_error_propagates() {
        let sync = sync_over(Arc::new(MemoryCacheStore::new()));
        let err = sync
            .read_dynamic_fields(OrganizationId(1), || async {
                Err(CacheError::Recompute("organization 1 not found".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Recompute(_)));
    }
}
