//! Engine Host
//!
//! Owns the registry and every engine. All mutation happens through
//! `&mut self`, so notifications and timer firings are processed one at a
//! time in arrival order.

use crate::feed::FeedUpdate;
use crate::HostError;
use chrono::{DateTime, Utc};
use fallback::{Clock, EngineConfig, FallbackEngine, Publication};
use source_selector::{ListenerId, MemoryRegistry};
use tracing::{debug, info};

/// Registry plus the engines listening to it
pub struct FallbackHost<C: Clock + Clone> {
    registry: MemoryRegistry,
    engines: Vec<FallbackEngine<C>>,
    /// Publications not yet written out
    outbox: Vec<Publication>,
    clock: C,
}

impl<C: Clock + Clone> FallbackHost<C> {
    /// Build one engine per sensor config
    pub fn new(sensors: Vec<EngineConfig>, clock: C) -> Result<Self, HostError> {
        let mut engines = Vec::with_capacity(sensors.len());
        for sensor in sensors {
            let name = sensor.name.clone();
            let engine = FallbackEngine::new(sensor, clock.clone())
                .map_err(|source| HostError::Sensor { name, source })?;
            engines.push(engine);
        }

        info!("Created host with {} fallback sensors", engines.len());
        Ok(Self {
            registry: MemoryRegistry::new(),
            engines,
            outbox: Vec::new(),
            clock,
        })
    }

    /// Subscribe every engine and publish initial states
    pub fn start(&mut self) {
        for (index, engine) in self.engines.iter_mut().enumerate() {
            engine.start(ListenerId(index), &mut self.registry, &mut self.outbox);
        }
    }

    /// Apply a feed update and notify the engines tracking that source
    pub fn apply(&mut self, update: FeedUpdate) {
        let listeners = match update.record() {
            Some(record) => self.registry.set(&update.entity_id, record),
            None => self.registry.remove(&update.entity_id),
        };

        debug!(
            "Update of '{}' notifies {} sensors",
            update.entity_id,
            listeners.len()
        );
        for ListenerId(index) in listeners {
            if let Some(engine) = self.engines.get_mut(index) {
                engine.on_source_changed(&update.entity_id, &self.registry, &mut self.outbox);
            }
        }
    }

    /// Fire every due hysteresis timer. Returns how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        self.engines
            .iter_mut()
            .map(|engine| engine.fire_due_timers(&self.registry, &mut self.outbox))
            .sum()
    }

    /// Earliest timer deadline across all engines
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.engines
            .iter()
            .filter_map(|engine| engine.next_deadline())
            .min()
    }

    /// Take the publications produced since the last call
    pub fn drain_publications(&mut self) -> Vec<Publication> {
        std::mem::take(&mut self.outbox)
    }

    /// Tear down every engine
    pub fn shutdown(&mut self) {
        for engine in &mut self.engines {
            engine.teardown(&mut self.registry);
        }
        info!("Host shut down");
    }

    /// Source registry
    pub fn registry(&self) -> &MemoryRegistry {
        &self.registry
    }

    /// Hosted engines
    pub fn engines(&self) -> &[FallbackEngine<C>] {
        &self.engines
    }

    /// Host clock
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallback::ManualClock;

    fn update(entity_id: &str, state: Option<&str>) -> FeedUpdate {
        FeedUpdate {
            entity_id: entity_id.to_string(),
            state: state.map(|s| serde_json::Value::String(s.to_string())),
            attributes: Default::default(),
        }
    }

    fn host(delay: u64) -> (FallbackHost<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let sensors = vec![
            EngineConfig::new("Primary", ["sensor.a", "sensor.b"]).with_hysteresis_delay(delay),
            EngineConfig::new("Secondary", ["sensor.c", "sensor.a"]),
        ];
        (FallbackHost::new(sensors, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn test_new_rejects_invalid_sensor() {
        let sensors = vec![EngineConfig::new("Broken", ["sensor.a"])];
        let result = FallbackHost::new(sensors, ManualClock::default());
        assert!(matches!(result, Err(HostError::Sensor { name, .. }) if name == "Broken"));
    }

    #[test]
    fn test_start_publishes_every_sensor() {
        let (mut host, _) = host(0);
        host.start();

        let published = host.drain_publications();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|p| !p.available));
        assert_eq!(host.registry().subscription_count(), 4);
        assert!(host.drain_publications().is_empty());
    }

    #[test]
    fn test_shared_source_notifies_both_sensors() {
        let (mut host, _) = host(0);
        host.start();
        host.drain_publications();

        host.apply(update("sensor.a", Some("12")));
        let published = host.drain_publications();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].unique_id, "primary");
        assert_eq!(published[0].attributes.provenance.source_index, Some(0));
        assert_eq!(published[1].unique_id, "secondary");
        assert_eq!(published[1].attributes.provenance.source_index, Some(1));
    }

    #[test]
    fn test_untracked_source_publishes_nothing() {
        let (mut host, _) = host(0);
        host.start();
        host.drain_publications();

        host.apply(update("sensor.zzz", Some("1")));
        assert!(host.drain_publications().is_empty());
        assert_eq!(host.registry().len(), 1);
    }

    #[test]
    fn test_timers_fire_through_host() {
        let (mut host, clock) = host(5);
        host.start();
        host.apply(update("sensor.a", Some("1")));
        host.apply(update("sensor.b", Some("2")));
        host.apply(update("sensor.a", None));
        host.drain_publications();

        assert_eq!(
            host.next_deadline(),
            Some(DateTime::UNIX_EPOCH + chrono::TimeDelta::seconds(5))
        );

        clock.advance_secs(5);
        assert_eq!(host.fire_due_timers(), 1);
        let published = host.drain_publications();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].state.as_deref(), Some("2"));
        assert_eq!(host.next_deadline(), None);
    }

    #[test]
    fn test_shutdown_tears_down_engines() {
        let (mut host, _) = host(5);
        host.start();
        host.apply(update("sensor.a", Some("1")));
        host.apply(update("sensor.b", Some("2")));
        host.apply(update("sensor.a", Some("unavailable")));
        assert!(host.next_deadline().is_some());

        host.shutdown();
        assert_eq!(host.next_deadline(), None);
        assert_eq!(host.registry().subscription_count(), 0);
        assert!(host.engines().iter().all(|e| e.is_torn_down()));
    }
}
