//! Counter: fires once after a fixed number of cycles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use relay_app::ports::{Evaluation, HandlerContext, JsonAction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

#[derive(Debug, Deserialize)]
pub struct CounterOptions {
    pub threshold: u32,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: u32,
}

/// Increments its count every cycle and fires with `counter=<n>` on the
/// cycle where the count reaches `threshold`. Keeps counting afterwards
/// without firing again.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counter;

#[async_trait]
impl JsonAction for Counter {
    type Options = CounterOptions;
    type State = CounterState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("Counter", "Fires once after `threshold` cycles")
            .with_minimum_refresh_rate(1)
            .with_default_options(serde_json::json!({"threshold": 3}))
    }

    fn default_state(&self) -> CounterState {
        CounterState::default()
    }

    async fn evaluate(
        &self,
        _ctx: &HandlerContext,
        options: CounterOptions,
        state: CounterState,
    ) -> Result<Evaluation<CounterState>, HandlerError> {
        let next = CounterState {
            count: state.count.saturating_add(1),
        };
        if next.count == options.threshold {
            Ok(Evaluation::fired(format!("counter={}", next.count), next))
        } else {
            Ok(Evaluation::idle(next))
        }
    }
}
