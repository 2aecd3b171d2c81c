//! Fallback Engine
//!
//! Composition root of one fallback sensor. Every live notification and
//! every fired hysteresis timer goes through the same update path:
//! select the best source, feed it through the gate, and publish when the
//! gate confirms or applies.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, EngineConfig};
use crate::hysteresis::{GateDecision, HysteresisGate, Pending};
use crate::publish::{DescriptiveMetadata, OutputAttributes, Provenance, Publication, Publisher};
use crate::timer::{TimerHandle, TimerQueue};
use chrono::{DateTime, Utc};
use condition_validator::CompiledValidator;
use source_selector::{select_active, ListenerId, Notifier, Registry, Selection, SourceId, SubscriptionId};
use tracing::{debug, info, warn};

/// Confirmed output state of an engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    /// Active source
    pub active_source: Option<SourceId>,
    /// Index of the active source in the configured list
    pub active_index: Option<usize>,
    /// Value last taken from the active source
    pub published_value: Option<String>,
    /// Metadata last copied from a source
    pub metadata: DescriptiveMetadata,
    /// Applied source switches, including into and out of "no source"
    pub switch_count: u64,
    /// Time of the last applied switch
    pub last_switch_time: Option<DateTime<Utc>>,
}

impl EngineState {
    /// Whether a source is active
    pub fn is_available(&self) -> bool {
        self.active_source.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    TornDown,
}

/// One fallback sensor
pub struct FallbackEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    unique_id: String,
    validator: CompiledValidator,
    gate: HysteresisGate,
    timers: TimerQueue,
    state: EngineState,
    subscriptions: Vec<SubscriptionId>,
    lifecycle: Lifecycle,
    clock: C,
}

impl<C: Clock> FallbackEngine<C> {
    /// Validate `config` and build an engine with empty state
    pub fn new(config: EngineConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let delay = config
            .hysteresis()
            .ok_or(ConfigError::DelayOutOfRange(config.hysteresis_delay))?;

        debug!(
            "Creating fallback sensor '{}' with {} sources, delay {}s, {} conditions",
            config.name,
            config.entities.len(),
            config.hysteresis_delay,
            config.conditions.len()
        );

        Ok(Self {
            unique_id: config.resolved_unique_id(),
            validator: CompiledValidator::compile(&config.conditions),
            gate: HysteresisGate::new(delay),
            timers: TimerQueue::new(),
            state: EngineState::default(),
            subscriptions: Vec::new(),
            lifecycle: Lifecycle::Created,
            clock,
            config,
        })
    }

    /// Subscribe to every source and publish the initial selection
    pub fn start<H, P>(&mut self, listener: ListenerId, host: &mut H, sink: &mut P)
    where
        H: Registry + Notifier,
        P: Publisher,
    {
        if self.lifecycle != Lifecycle::Created {
            warn!("Fallback sensor '{}' already started", self.config.name);
            return;
        }

        for source in &self.config.entities {
            self.subscriptions.push(host.subscribe(source, listener));
        }
        self.lifecycle = Lifecycle::Running;

        let now = self.clock.now();
        self.update(now, &*host, sink);

        debug!(
            "Fallback sensor '{}' added with {} source entities",
            self.config.name,
            self.config.entities.len()
        );
    }

    /// Handle a change notification for `source`
    pub fn on_source_changed<R, P>(&mut self, source: &str, registry: &R, sink: &mut P)
    where
        R: Registry + ?Sized,
        P: Publisher,
    {
        if self.lifecycle != Lifecycle::Running {
            debug!(
                "Fallback sensor '{}' not running, ignoring change of '{}'",
                self.config.name, source
            );
            return;
        }
        if !self.config.entities.iter().any(|s| s == source) {
            debug!(
                "Fallback sensor '{}' does not track '{}'",
                self.config.name, source
            );
            return;
        }

        debug!(
            "Source entity '{}' changed for fallback sensor '{}'",
            source, self.config.name
        );
        let now = self.clock.now();
        self.update(now, registry, sink);
    }

    /// Fire every timer whose deadline has passed. Returns how many fired.
    pub fn fire_due_timers<R, P>(&mut self, registry: &R, sink: &mut P) -> usize
    where
        R: Registry + ?Sized,
        P: Publisher,
    {
        let mut fired = 0;
        while let Some((handle, deadline)) = self.timers.pop_due(self.clock.now()) {
            self.timer_fired(handle, deadline, registry, sink);
            fired += 1;
        }
        fired
    }

    /// Earliest outstanding timer deadline
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Cancel the pending timer and drop all subscriptions
    pub fn teardown<N: Notifier + ?Sized>(&mut self, notifier: &mut N) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        self.gate.clear(&mut self.timers);
        for subscription in self.subscriptions.drain(..) {
            notifier.unsubscribe(subscription);
        }
        self.lifecycle = Lifecycle::TornDown;
        debug!("Fallback sensor '{}' torn down", self.config.name);
    }

    /// Confirmed state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Candidate awaiting hysteresis confirmation
    pub fn pending(&self) -> Option<&Pending> {
        self.gate.pending()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolved unique id
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Whether the engine has been torn down
    pub fn is_torn_down(&self) -> bool {
        self.lifecycle == Lifecycle::TornDown
    }

    /// Build the publication for the current state
    pub fn publication(&self) -> Publication {
        Publication {
            unique_id: self.unique_id.clone(),
            name: self.config.name.clone(),
            state: self.state.published_value.clone(),
            available: self.state.is_available(),
            attributes: OutputAttributes {
                provenance: Provenance {
                    current_source: self.state.active_source.clone(),
                    source_entities: self.config.entities.clone(),
                    source_index: self.state.active_index,
                    fallback_count: self.state.switch_count,
                    last_fallback_time: self.state.last_switch_time,
                },
                metadata: self.state.metadata.clone(),
            },
        }
    }

    fn timer_fired<R, P>(
        &mut self,
        handle: TimerHandle,
        deadline: DateTime<Utc>,
        registry: &R,
        sink: &mut P,
    ) where
        R: Registry + ?Sized,
        P: Publisher,
    {
        if self.lifecycle != Lifecycle::Running || !self.gate.owns_timer(handle) {
            return;
        }
        debug!("Hysteresis timer fired for fallback sensor '{}'", self.config.name);
        // A timer may be serviced slightly before the wall clock reaches it
        let now = self.clock.now().max(deadline);
        self.update(now, registry, sink);
    }

    fn update<R, P>(&mut self, now: DateTime<Utc>, registry: &R, sink: &mut P)
    where
        R: Registry + ?Sized,
        P: Publisher,
    {
        let selection = select_active(&self.config.entities, registry, &self.validator);
        let proposed = selection.as_ref().map(|s| s.source.as_str());

        let decision = self.gate.evaluate(
            self.state.active_source.as_deref(),
            proposed,
            now,
            &mut self.timers,
        );

        match decision {
            GateDecision::Confirm => {
                if let Some(selection) = &selection {
                    self.refresh(selection);
                }
            }
            GateDecision::Apply => self.apply(selection, now),
            GateDecision::Defer { deadline } => {
                debug!(
                    "Fallback sensor '{}' deferring switch to {:?} until {}",
                    self.config.name, proposed, deadline
                );
                return;
            }
            GateDecision::Wait => return,
        }

        sink.publish(self.publication());
    }

    fn refresh(&mut self, selection: &Selection) {
        self.state.published_value = Some(selection.snapshot.value.clone());
        self.state.metadata = DescriptiveMetadata::from_metadata(&selection.snapshot.metadata);
    }

    fn apply(&mut self, selection: Option<Selection>, now: DateTime<Utc>) {
        let previous = self.state.active_source.take();

        match selection {
            Some(selection) => {
                self.refresh(&selection);
                self.state.active_index = Some(selection.index);
                self.state.active_source = Some(selection.source);
            }
            None => {
                self.state.published_value = None;
                self.state.active_index = None;
            }
        }

        if previous == self.state.active_source {
            return;
        }

        self.state.switch_count += 1;
        self.state.last_switch_time = Some(now);

        match (&previous, &self.state.active_source) {
            (Some(previous), None) => warn!(
                "No available source for fallback sensor '{}' (was '{}')",
                self.config.name, previous
            ),
            (previous, Some(current)) => info!(
                "Fallback sensor '{}' switched from {:?} to '{}'",
                self.config.name, previous, current
            ),
            (None, None) => {}
        }
    }
}
