//! # relay-adapter-timer
//!
//! Time-of-day integration.
//!
//! ## Provided capabilities
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | Action | `SpecificTime` | Fires once when the local clock shows `hour:minute` |
//! | Reaction | `GiveTime` | Reports the current local time |
//!
//! The clock is a [`Clock`] trait object so tests can pin the time.

mod capabilities;
mod clock;

use std::sync::Arc;

use relay_app::ports::capability::{action, reaction};
use relay_app::ports::{ActionHandler, Integration, ReactionHandler};
use relay_domain::capability::ServiceInfo;

pub use capabilities::{GiveTime, SpecificTime};
pub use clock::{Clock, SystemClock};

/// Service name every timer capability is registered under.
pub const SERVICE: &str = "timer";

/// Timer integration bundling [`SpecificTime`] and [`GiveTime`].
#[derive(Clone)]
pub struct TimerIntegration {
    clock: Arc<dyn Clock>,
}

impl Default for TimerIntegration {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TimerIntegration {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Integration for TimerIntegration {
    fn service(&self) -> ServiceInfo {
        ServiceInfo::new(SERVICE, "Time of day")
    }

    fn actions(&self) -> Vec<Arc<dyn ActionHandler>> {
        vec![action(SpecificTime::new(Arc::clone(&self.clock)))]
    }

    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>> {
        vec![reaction(GiveTime::new(Arc::clone(&self.clock)))]
    }
}
