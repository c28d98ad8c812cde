//! # Organization
//!
//! The directory entity. Owns its address, schedules and attribute values
//! (the latter live in `orgdir-schema` and are stored alongside).
//!
//! ## Lifecycle
//!
//! | From         | To           | Method       |
//! |--------------|--------------|--------------|
//! | `draft`      | `moderation` | `submit`     |
//! | `draft`      | `published`  | `publish`    |
//! | `moderation` | `published`  | `approve`    |
//! | `moderation` | `draft`      | `reject`     |
//! | `published`  | `draft`      | `unpublish`  |
//!
//! Every accepted move is appended to `transitions`.

use serde::{Deserialize, Serialize};

use orgdir_core::{
    CategoryId, CityId, LifecycleState, OrganizationId, StateError, Timestamp, UserId,
    ValidationFailure, ValidationFailures,
};

use crate::place::{Address, Schedule};
use crate::service_pack::{Capability, ServicePack};

/// Reason attached to an organization without any schedule.
pub const SCHEDULE_REQUIRED: &str = "at least one schedule is required";

/// Record of a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: LifecycleState,
    pub to_state: LifecycleState,
    pub timestamp: Timestamp,
    pub reason: String,
}

/// An organization listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub category_id: CategoryId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub city_id: CityId,
    #[serde(default)]
    pub parent_id: Option<OrganizationId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(default)]
    pub logotype_thumb_url: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub service_packs: Vec<ServicePack>,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl Organization {
    /// A new draft organization with no owner, address or schedules.
    pub fn new(
        id: OrganizationId,
        category_id: CategoryId,
        city_id: CityId,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            id,
            category_id,
            user_id: None,
            city_id,
            parent_id: None,
            title: title.into(),
            slug: slug.into(),
            state: LifecycleState::Draft,
            logotype_thumb_url: None,
            address: None,
            schedules: Vec::new(),
            service_packs: Vec::new(),
            transitions: Vec::new(),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Owner submits the draft for review (DRAFT → MODERATION).
    pub fn submit(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_state(LifecycleState::Draft, LifecycleState::Moderation)?;
        self.do_transition(LifecycleState::Moderation, reason);
        Ok(())
    }

    /// Moderator accepts the submission (MODERATION → PUBLISHED).
    pub fn approve(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_state(LifecycleState::Moderation, LifecycleState::Published)?;
        self.do_transition(LifecycleState::Published, reason);
        Ok(())
    }

    /// Moderator sends the submission back (MODERATION → DRAFT).
    pub fn reject(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_state(LifecycleState::Moderation, LifecycleState::Draft)?;
        self.do_transition(LifecycleState::Draft, reason);
        Ok(())
    }

    /// Privileged direct publication (DRAFT → PUBLISHED).
    pub fn publish(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_state(LifecycleState::Draft, LifecycleState::Published)?;
        self.do_transition(LifecycleState::Published, reason);
        Ok(())
    }

    /// Withdraw from the public directory (PUBLISHED → DRAFT).
    pub fn unpublish(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_state(LifecycleState::Published, LifecycleState::Draft)?;
        self.do_transition(LifecycleState::Draft, reason);
        Ok(())
    }

    /// Move to `target` along whichever single edge connects the states.
    pub fn transition_to(&mut self, target: LifecycleState, reason: &str) -> Result<(), StateError> {
        use LifecycleState::*;
        match (self.state, target) {
            (Draft, Moderation) => self.submit(reason),
            (Draft, Published) => self.publish(reason),
            (Moderation, Published) => self.approve(reason),
            (Moderation, Draft) => self.reject(reason),
            (Published, Draft) => self.unpublish(reason),
            (from, to) => Err(StateError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    fn require_state(
        &self,
        expected: LifecycleState,
        target: LifecycleState,
    ) -> Result<(), StateError> {
        if self.state != expected {
            return Err(StateError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: LifecycleState, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.state = to;
    }

    // ── Relations ───────────────────────────────────────────────────

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }

    /// Branch of another organization.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.service_packs.iter().any(|p| p.grants(capability))
    }

    /// Logotype thumbnail, only when a service pack unlocks it.
    pub fn thumbnail(&self) -> Option<&str> {
        if self.has_capability(Capability::Logotype) {
            self.logotype_thumb_url.as_deref()
        } else {
            None
        }
    }

    pub fn longitude(&self) -> Option<f64> {
        self.address.as_ref().map(|a| a.longitude)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.address.as_ref().map(|a| a.latitude)
    }

    /// Schedules the editor actually filled in.
    pub fn effective_schedules(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.iter().filter(|s| !s.is_blank())
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Checks on the organization's own columns: a non-blank title and at
    /// least one non-blank schedule. Category attributes are checked by
    /// `orgdir_schema::AttributeValidator`.
    pub fn validate_structure(&self) -> ValidationFailures {
        let mut failures = ValidationFailures::new();
        if self.title.trim().is_empty() {
            failures.push(ValidationFailure::empty("title"));
        }
        if self.effective_schedules().next().is_none() {
            failures.push(ValidationFailure::new("schedules", SCHEDULE_REQUIRED));
        }
        failures
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
