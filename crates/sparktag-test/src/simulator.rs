//! Host Simulator - Randomized process variables under bulk reads
//!
//! Checks, every cycle:
//! - A tag reports a change exactly when its host value moved
//! - Changed tags carry the cycle timestamp
//! - The bulk signal matches the publishable changes
//! - Aliases stay unique under create/delete churn
//! - Buffered values never exceed tag capacity

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sparktag_core::{Alias, DataType, TagId, TagResult, Timestamp, Value};
use sparktag_registry::{ManualClock, RegistryConfig, TagRegistry};
use sparktag_tag::{HostBytes, HostCell, HostText, HostVariable, TagDefinition};
use thiserror::Error;
use tracing::{debug, info};

/// Simulator configuration
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Tags alive at any time
    pub tag_count: usize,
    /// Bulk read cycles to run
    pub cycles: usize,
    /// Probability a host variable is mutated before a cycle
    pub mutate_prob: f64,
    /// Probability a buffered mutation empties the host instead
    pub blank_prob: f64,
    /// Probability per cycle of replacing one tag with a colliding alias
    pub churn_prob: f64,
    /// Fraction of tags created below the publish threshold
    pub housekeeping_prob: f64,
    /// Buffer capacity for string and byte tags
    pub capacity: usize,
    /// Clock step per cycle, in milliseconds
    pub cycle_ms: u64,
    /// Random seed
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            tag_count: 20,
            cycles: 200,
            mutate_prob: 0.2,
            blank_prob: 0.1,
            churn_prob: 0.05,
            housekeeping_prob: 0.2,
            capacity: 16,
            cycle_ms: 100,
            seed: 42,
        }
    }
}

impl SimulatorConfig {
    /// Light run for quick tests
    pub fn light() -> Self {
        SimulatorConfig {
            tag_count: 8,
            cycles: 50,
            churn_prob: 0.1,
            ..SimulatorConfig::default()
        }
    }

    /// Nothing moves after the first read
    pub fn idle() -> Self {
        SimulatorConfig {
            mutate_prob: 0.0,
            churn_prob: 0.0,
            ..SimulatorConfig::light()
        }
    }
}

/// Invariant broken during a run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("cycle {cycle}: {tag} reported changed={reported}, host moved={expected}")]
    ChangeMismatch {
        cycle: usize,
        tag: String,
        reported: bool,
        expected: bool,
    },

    #[error("cycle {cycle}: {tag} carries stale timestamp {found:?}")]
    StaleTimestamp {
        cycle: usize,
        tag: String,
        found: Timestamp,
    },

    #[error("cycle {cycle}: bulk signal {reported}, expected {expected}")]
    PublishMismatch {
        cycle: usize,
        reported: bool,
        expected: bool,
    },

    #[error("cycle {cycle}: alias {alias} held by more than one tag")]
    DuplicateAlias { cycle: usize, alias: Alias },

    #[error("cycle {cycle}: {tag} holds {len} bytes, capacity {capacity}")]
    CapacityExceeded {
        cycle: usize,
        tag: String,
        len: usize,
        capacity: usize,
    },

    #[error("cycle {cycle}: {tag} missing from registry")]
    MissingTag { cycle: usize, tag: String },
}

/// Simulated host variable
#[derive(Clone, Debug)]
enum SimHost {
    Int(HostCell<i32>),
    Real(HostCell<f64>),
    Flag(HostCell<bool>),
    Text(HostText, DataType),
    Blob(HostBytes),
}

impl SimHost {
    fn random(rng: &mut StdRng, capacity: usize) -> TagResult<Self> {
        let host = match rng.gen_range(0..5) {
            0 => SimHost::Int(HostCell::new(rng.gen_range(-1000..1000))),
            1 => SimHost::Real(HostCell::new(rng.gen_range(-100.0..100.0))),
            2 => SimHost::Flag(HostCell::new(rng.gen())),
            3 => {
                let datatype = if rng.gen() {
                    DataType::String
                } else {
                    DataType::Text
                };
                let host = HostText::with_capacity(capacity)?;
                host.set(&random_text(rng, capacity))?;
                SimHost::Text(host, datatype)
            }
            _ => {
                let host = HostBytes::with_capacity(capacity)?;
                host.set(&random_bytes(rng, capacity))?;
                SimHost::Blob(host)
            }
        };
        Ok(host)
    }

    fn datatype(&self) -> DataType {
        match self {
            SimHost::Int(_) => DataType::Int32,
            SimHost::Real(_) => DataType::Double,
            SimHost::Flag(_) => DataType::Boolean,
            SimHost::Text(_, datatype) => *datatype,
            SimHost::Blob(_) => DataType::Bytes,
        }
    }

    fn definition(&self, name: String, alias: Alias, capacity: usize) -> TagDefinition {
        let def = match self {
            SimHost::Int(h) => TagDefinition::int32(name, h.clone()),
            SimHost::Real(h) => TagDefinition::double(name, h.clone()),
            SimHost::Flag(h) => TagDefinition::boolean(name, h.clone()),
            SimHost::Text(h, DataType::Text) => TagDefinition::text(name, h.clone(), capacity),
            SimHost::Text(h, _) => TagDefinition::string(name, h.clone(), capacity),
            SimHost::Blob(h) => TagDefinition::bytes(name, h.clone(), capacity),
        };
        def.alias(alias)
    }

    fn accessor(&self) -> &dyn HostVariable {
        match self {
            SimHost::Int(h) => h,
            SimHost::Real(h) => h,
            SimHost::Flag(h) => h,
            SimHost::Text(h, _) => h,
            SimHost::Blob(h) => h,
        }
    }

    /// What a tag bound to this host should observe
    fn observe(&self) -> Option<Value> {
        self.accessor()
            .read(self.datatype())
            .filter(|value| !value.is_empty())
    }

    fn mutate(&self, rng: &mut StdRng, config: &SimulatorConfig) -> TagResult<()> {
        let blank = rng.gen_bool(config.blank_prob);
        match self {
            SimHost::Int(h) => h.set(h.get().wrapping_add(rng.gen_range(1..50))),
            SimHost::Real(h) => h.set(h.get() + rng.gen_range(0.5..5.0)),
            SimHost::Flag(h) => h.set(!h.get()),
            SimHost::Text(h, _) if blank => {
                h.set("")?;
            }
            SimHost::Text(h, _) => {
                h.set(&random_text(rng, config.capacity))?;
            }
            SimHost::Blob(h) if blank => {
                h.set(&[])?;
            }
            SimHost::Blob(h) => {
                h.set(&random_bytes(rng, config.capacity))?;
            }
        }
        Ok(())
    }
}

fn random_text(rng: &mut StdRng, capacity: usize) -> String {
    let len = rng.gen_range(0..=capacity);
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

fn random_bytes(rng: &mut StdRng, capacity: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=capacity);
    (0..len).map(|_| rng.gen()).collect()
}

/// One simulated tag and what the simulator last saw behind it
struct SimTag {
    id: TagId,
    name: String,
    host: SimHost,
    seen: Option<Value>,
    fresh: bool,
}

/// Simulation outcome
#[derive(Debug, Default)]
pub struct SimResult {
    pub cycles: usize,
    pub reads: usize,
    pub changes: usize,
    pub publish_cycles: usize,
    pub created: usize,
    pub deleted: usize,
    pub violations: Vec<Violation>,
}

impl SimResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Drives a registry against randomly mutating host variables
pub struct HostSimulator {
    config: SimulatorConfig,
    registry: TagRegistry,
    clock: ManualClock,
    tags: Vec<SimTag>,
    rng: StdRng,
    created: usize,
}

impl HostSimulator {
    /// Create a simulator with `config.tag_count` live tags
    pub fn new(config: SimulatorConfig) -> TagResult<Self> {
        let clock = ManualClock::new(0);
        let mut registry = TagRegistry::with_config(RegistryConfig::default());
        registry.set_timestamp_source(clock.clone());

        let mut simulator = HostSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            registry,
            clock,
            tags: Vec::new(),
            created: 0,
        };

        for _ in 0..simulator.config.tag_count {
            let alias = if simulator.rng.gen_bool(simulator.config.housekeeping_prob) {
                -(simulator.created as Alias) - 1
            } else {
                simulator.created as Alias + 1
            };
            simulator.spawn(alias)?;
        }
        Ok(simulator)
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    fn spawn(&mut self, alias: Alias) -> TagResult<TagId> {
        let host = SimHost::random(&mut self.rng, self.config.capacity)?;
        let name = format!("sim{}", self.created);
        let id = self
            .registry
            .create(host.definition(name.clone(), alias, self.config.capacity))?;
        self.created += 1;
        self.tags.push(SimTag {
            id,
            name,
            host,
            seen: None,
            fresh: true,
        });
        Ok(id)
    }

    /// Replace a random tag with one requesting a live alias
    fn churn(&mut self) -> TagResult<()> {
        if self.tags.len() < 2 {
            return Ok(());
        }
        let victim = self.rng.gen_range(0..self.tags.len());
        let gone = self.tags.remove(victim);
        self.registry.delete(gone.id)?;

        let donor = &self.tags[self.rng.gen_range(0..self.tags.len())];
        let alias = self
            .registry
            .get(donor.id)
            .map_or(0, |tag| tag.alias());
        let id = self.spawn(alias)?;
        debug!(removed = %gone.name, %id, requested = alias, "churned tag");
        Ok(())
    }

    /// Run every configured cycle
    pub fn run(&mut self) -> TagResult<SimResult> {
        let mut result = SimResult::default();
        let base = self.created;

        for cycle in 0..self.config.cycles {
            if self.rng.gen_bool(self.config.churn_prob) {
                self.churn()?;
                result.deleted += 1;
            }
            for i in 0..self.tags.len() {
                if self.rng.gen_bool(self.config.mutate_prob) {
                    self.tags[i].host.mutate(&mut self.rng, &self.config)?;
                }
            }
            self.step(cycle, &mut result);
        }

        result.created = self.created - base;
        info!(
            cycles = result.cycles,
            changes = result.changes,
            publish_cycles = result.publish_cycles,
            violations = result.violations.len(),
            "simulation finished"
        );
        Ok(result)
    }

    /// One bulk read plus invariant checks
    fn step(&mut self, cycle: usize, result: &mut SimResult) {
        self.clock.set((cycle as u64 + 1) * self.config.cycle_ms);
        let now = self.clock.get();
        let reported = self.registry.read_all();
        result.cycles += 1;

        let config = self.registry.config().clone();
        let mut expected_signal = false;

        for sim in &mut self.tags {
            result.reads += 1;
            let observed = sim.host.observe();
            let expected = sim.fresh || observed != sim.seen;
            sim.fresh = false;
            sim.seen = observed;

            let Some(tag) = self.registry.get(sim.id) else {
                result.violations.push(Violation::MissingTag {
                    cycle,
                    tag: sim.name.clone(),
                });
                continue;
            };

            if tag.changed() != expected {
                result.violations.push(Violation::ChangeMismatch {
                    cycle,
                    tag: sim.name.clone(),
                    reported: tag.changed(),
                    expected,
                });
            }
            if tag.changed() {
                result.changes += 1;
                if config.publishes(tag.alias()) {
                    expected_signal = true;
                }
            }

            let stale = tag.last_read() != now || (tag.changed() && tag.current().timestamp != now);
            if stale {
                result.violations.push(Violation::StaleTimestamp {
                    cycle,
                    tag: sim.name.clone(),
                    found: tag.current().timestamp,
                });
            }

            let value = &tag.current().value;
            let len = value
                .as_str()
                .map(str::len)
                .or_else(|| value.as_bytes().map(<[u8]>::len))
                .unwrap_or(0);
            if len > tag.capacity() {
                result.violations.push(Violation::CapacityExceeded {
                    cycle,
                    tag: sim.name.clone(),
                    len,
                    capacity: tag.capacity(),
                });
            }
        }

        if reported {
            result.publish_cycles += 1;
        }
        if reported != expected_signal {
            result.violations.push(Violation::PublishMismatch {
                cycle,
                reported,
                expected: expected_signal,
            });
        }

        let mut aliases: Vec<Alias> = self.registry.tags().map(|tag| tag.alias()).collect();
        aliases.sort_unstable();
        for pair in aliases.windows(2) {
            if pair[0] == pair[1] {
                result.violations.push(Violation::DuplicateAlias {
                    cycle,
                    alias: pair[0],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::init_tracing;

    #[test]
    fn test_default_run_is_valid() {
        init_tracing();
        let mut sim = HostSimulator::new(SimulatorConfig::default()).unwrap();
        let result = sim.run().unwrap();
        assert!(result.is_valid(), "{:?}", result.violations);
        assert_eq!(result.cycles, 200);
        assert!(result.changes >= 20);
    }

    #[test]
    fn test_idle_run_changes_once() {
        let config = SimulatorConfig::idle();
        let mut sim = HostSimulator::new(config.clone()).unwrap();
        let result = sim.run().unwrap();
        assert!(result.is_valid(), "{:?}", result.violations);
        assert_eq!(result.changes, config.tag_count);
        assert!(result.publish_cycles <= 1);
        assert_eq!(result.deleted, 0);
    }

    #[test]
    fn test_churn_keeps_aliases_unique() {
        let config = SimulatorConfig {
            churn_prob: 1.0,
            ..SimulatorConfig::light()
        };
        let mut sim = HostSimulator::new(config.clone()).unwrap();
        let result = sim.run().unwrap();
        assert!(result.is_valid(), "{:?}", result.violations);
        assert_eq!(result.deleted, config.cycles);
        assert_eq!(result.created, config.cycles);
        assert_eq!(sim.registry().len(), config.tag_count);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut sim = HostSimulator::new(SimulatorConfig::light()).unwrap();
            let r = sim.run().unwrap();
            (r.changes, r.publish_cycles, r.deleted)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_housekeeping_only_never_publishes() {
        let config = SimulatorConfig {
            housekeeping_prob: 1.0,
            churn_prob: 0.0,
            ..SimulatorConfig::light()
        };
        let mut sim = HostSimulator::new(config).unwrap();
        let result = sim.run().unwrap();
        assert!(result.is_valid(), "{:?}", result.violations);
        assert!(result.changes > 0);
        assert_eq!(result.publish_cycles, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_any_seed_is_valid(seed in any::<u64>(), capacity in 1usize..24) {
            let config = SimulatorConfig {
                seed,
                capacity,
                ..SimulatorConfig::light()
            };
            let mut sim = HostSimulator::new(config).unwrap();
            let result = sim.run().unwrap();
            prop_assert!(result.is_valid(), "{:?}", result.violations);
        }
    }
}
