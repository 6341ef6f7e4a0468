//! Caller-facing interaction handles and the sinks that feed them.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cell::ValueCell;
use crate::decoder::decode;
use crate::serializer::DataValue;

/// Lifecycle of one interaction, as seen by its caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// Queued until the connection is up.
    #[default]
    Pending,
    /// Dispatched and receiving.
    Active,
    Completed,
    /// Dispatch failed or the responder sent an error.
    Failed(String),
    /// Cancelled locally, e.g. by a disconnect.
    Cancelled,
}

impl InteractionState {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            InteractionState::Completed | InteractionState::Failed(_) | InteractionState::Cancelled
        )
    }
}

/// Result of a request-response, stream or channel call.
///
/// `value` holds `Option<T>` for request-response and `Vec<T>` for streams
/// and channels.
pub struct Interaction<V> {
    value: ValueCell<V>,
    state: ValueCell<InteractionState>,
}

impl<V> Clone for Interaction<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            state: self.state.clone(),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for Interaction<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("value", &self.value)
            .field("state", &self.state)
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Interaction<V> {
    /// The current result.
    pub fn get(&self) -> V {
        self.value.get()
    }

    /// The live result cell.
    pub fn value(&self) -> &ValueCell<V> {
        &self.value
    }

    pub fn state(&self) -> InteractionState {
        self.state.get()
    }

    pub fn state_cell(&self) -> &ValueCell<InteractionState> {
        &self.state
    }

    /// Wait for completion, failure or cancellation.
    pub async fn settled(&self) -> InteractionState {
        self.state.wait_for(InteractionState::is_settled).await
    }
}

/// Receives the signals of one dispatched interaction.
pub(crate) trait InboundSink: Send {
    fn on_subscribe(&mut self);
    fn on_next(&mut self, value: DataValue);
    fn on_complete(&mut self);
    fn on_error(&mut self, message: &str);
    fn on_cancel(&mut self);
}

enum Target<T> {
    Single(ValueCell<Option<T>>),
    Sequence(ValueCell<Vec<T>>),
}

/// Decodes inbound values into an interaction's result cell.
pub(crate) struct ResultSink<T> {
    route: String,
    target: Target<T>,
    state: ValueCell<InteractionState>,
}

pub(crate) fn single<T>(route: &str) -> (Interaction<Option<T>>, Box<dyn InboundSink>)
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let value = ValueCell::new(None);
    let state = ValueCell::new(InteractionState::Pending);
    let sink = ResultSink {
        route: route.to_string(),
        target: Target::Single(value.clone()),
        state: state.clone(),
    };
    (Interaction { value, state }, Box::new(sink))
}

pub(crate) fn sequence<T>(route: &str) -> (Interaction<Vec<T>>, Box<dyn InboundSink>)
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let value = ValueCell::new(Vec::new());
    let state = ValueCell::new(InteractionState::Pending);
    let sink = ResultSink {
        route: route.to_string(),
        target: Target::Sequence(value.clone()),
        state: state.clone(),
    };
    (Interaction { value, state }, Box::new(sink))
}

impl<T> ResultSink<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn settle(&self, next: InteractionState) {
        if !self.state.with(InteractionState::is_settled) {
            self.state.set(next);
        }
    }
}

impl<T> InboundSink for ResultSink<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn on_subscribe(&mut self) {
        self.state.set(InteractionState::Active);
    }

    fn on_next(&mut self, value: DataValue) {
        let item = match decode::<T>(value) {
            Ok(item) => item,
            Err(err) => {
                warn!(route = %self.route, error = %err, "dropping undecodable payload");
                return;
            }
        };
        match &self.target {
            Target::Single(cell) => cell.set(Some(item)),
            Target::Sequence(cell) => cell.update(|items| {
                let mut next = Vec::with_capacity(items.len() + 1);
                next.extend(items.iter().cloned());
                next.push(item);
                next
            }),
        }
    }

    fn on_complete(&mut self) {
        debug!(route = %self.route, "interaction completed");
        self.settle(InteractionState::Completed);
    }

    fn on_error(&mut self, message: &str) {
        warn!(route = %self.route, error = message, "interaction failed");
        self.settle(InteractionState::Failed(message.to_string()));
    }

    fn on_cancel(&mut self) {
        debug!(route = %self.route, "interaction cancelled");
        self.settle(InteractionState::Cancelled);
    }
}
