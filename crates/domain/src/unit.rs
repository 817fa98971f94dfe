//! Automation unit: one Action paired with one Reaction.
//!
//! A unit is the persisted description of what to watch, what to do when it
//! fires, how often to poll, and the opaque state the Action handler keeps
//! between cycles. The engine runs one poller per enabled unit.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityKey;
use crate::error::{RelayError, ValidationError};
use crate::id::{UnitId, UserId};
use crate::state::StateBlob;
use crate::time::{self, Timestamp};

/// Reference to a registered capability plus the options passed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRef {
    pub service: String,
    pub name: String,
    /// Interpreted only by the handler.
    pub options: serde_json::Value,
}

impl CapabilityRef {
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        options: serde_json::Value,
    ) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            options,
        }
    }

    #[must_use]
    pub fn key(&self) -> CapabilityKey {
        CapabilityKey::new(&self.service, &self.name)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.service.is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyCapabilityName);
        }
        Ok(())
    }
}

/// How the latest result came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOutcome {
    /// The Reaction handler returned a message.
    Success,
    /// The Reaction handler returned an error.
    Failure,
    /// The unit could not be started.
    ConfigurationError,
}

/// The latest user-visible result of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub outcome: ResultOutcome,
    pub message: String,
    pub at: Timestamp,
}

impl UnitResult {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResultOutcome::Success, message)
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ResultOutcome::Failure, message)
    }

    #[must_use]
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::new(ResultOutcome::ConfigurationError, message)
    }

    fn new(outcome: ResultOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
            at: time::now(),
        }
    }
}

/// A persisted Action→Reaction pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationUnit {
    pub id: UnitId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub action: CapabilityRef,
    pub reaction: CapabilityRef,
    pub enabled: bool,
    /// Requested poll interval in seconds; see
    /// [`effective_interval`](crate::schedule::effective_interval).
    pub refresh_rate: u64,
    pub state: StateBlob,
    pub last_result: Option<UnitResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AutomationUnit {
    /// Create a builder for constructing an [`AutomationUnit`].
    #[must_use]
    pub fn builder() -> AutomationUnitBuilder {
        AutomationUnitBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] when:
    /// - `title` is empty ([`ValidationError::EmptyTitle`])
    /// - a capability reference has an empty service or name
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        self.action.validate()?;
        self.reaction.validate()?;
        Ok(())
    }
}

/// Step-by-step builder for [`AutomationUnit`].
#[derive(Debug, Default)]
pub struct AutomationUnitBuilder {
    id: Option<UnitId>,
    owner: Option<UserId>,
    title: Option<String>,
    description: Option<String>,
    action: Option<CapabilityRef>,
    reaction: Option<CapabilityRef>,
    enabled: Option<bool>,
    refresh_rate: u64,
    state: StateBlob,
}

impl AutomationUnitBuilder {
    #[must_use]
    pub fn id(mut self, id: UnitId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn action(mut self, action: CapabilityRef) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn reaction(mut self, reaction: CapabilityRef) -> Self {
        self.reaction = Some(reaction);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn refresh_rate(mut self, seconds: u64) -> Self {
        self.refresh_rate = seconds;
        self
    }

    #[must_use]
    pub fn state(mut self, state: StateBlob) -> Self {
        self.state = state;
        self
    }

    /// Consume the builder, validate, and return an [`AutomationUnit`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<AutomationUnit, RelayError> {
        let now = time::now();
        let empty = || CapabilityRef::new("", "", serde_json::json!({}));
        let unit = AutomationUnit {
            id: self.id.unwrap_or_default(),
            owner: self.owner.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            action: self.action.unwrap_or_else(empty),
            reaction: self.reaction.unwrap_or_else(empty),
            enabled: self.enabled.unwrap_or(true),
            refresh_rate: self.refresh_rate,
            state: self.state,
            last_result: None,
            created_at: now,
            updated_at: now,
        };
        unit.validate()?;
        Ok(unit)
    }
}
