//! Plant fixture - one registry carrying every tag kind
//!
//! Used by the end-to-end tests below and by the registry benches.

use std::time::Duration;

use sparktag_core::{TagId, TagResult, UUID_CAPACITY};
use sparktag_registry::{ManualClock, TagRegistry};
use sparktag_tag::{Access, HostBytes, HostCell, HostText, TagDefinition};

/// Capacity of the plant's string tags
pub const PLANT_TEXT_CAPACITY: usize = 32;

/// Capacity of the plant's byte tag
pub const PLANT_BLOB_CAPACITY: usize = 64;

/// Host variables of the plant, shared with its tags
#[derive(Clone, Debug)]
pub struct PlantHost {
    pub temperature: HostCell<i32>,
    pub setpoint: HostCell<f32>,
    pub pressure: HostCell<f64>,
    pub running: HostCell<bool>,
    pub batch: HostCell<u32>,
    pub started_at: HostCell<u64>,
    pub uptime: HostCell<u64>,
    pub mode: HostText,
    pub serial: HostText,
    pub recipe: HostBytes,
}

/// A small process cell driven by a manual clock
#[derive(Debug)]
pub struct Plant {
    pub registry: TagRegistry,
    pub clock: ManualClock,
    pub host: PlantHost,
    pub temperature: TagId,
    pub setpoint: TagId,
    pub mode: TagId,
    pub recipe: TagId,
    pub uptime: TagId,
}

impl Plant {
    pub fn new() -> TagResult<Self> {
        let host = PlantHost {
            temperature: HostCell::default(),
            setpoint: HostCell::default(),
            pressure: HostCell::default(),
            running: HostCell::default(),
            batch: HostCell::default(),
            started_at: HostCell::default(),
            uptime: HostCell::default(),
            mode: HostText::with_capacity(PLANT_TEXT_CAPACITY)?,
            serial: HostText::with_capacity(UUID_CAPACITY)?,
            recipe: HostBytes::with_capacity(PLANT_BLOB_CAPACITY)?,
        };
        let clock = ManualClock::new(1000);
        let mut registry = TagRegistry::new();
        registry.set_timestamp_source(clock.clone());

        let temperature = registry.create(
            TagDefinition::int32("Temp", host.temperature.clone())
                .alias(1)
                .access(Access::READ_WRITE),
        )?;
        let setpoint = registry.create(
            TagDefinition::float("Setpoint", host.setpoint.clone())
                .alias(2)
                .access(Access::REMOTE),
        )?;
        registry.create(TagDefinition::double("Pressure", host.pressure.clone()).alias(3))?;
        registry.create(TagDefinition::boolean("Running", host.running.clone()).alias(4))?;
        registry.create(TagDefinition::uint32("Batch", host.batch.clone()).alias(5))?;
        registry.create(TagDefinition::date_time("StartedAt", host.started_at.clone()).alias(6))?;
        let mode = registry.create(
            TagDefinition::string("Mode", host.mode.clone(), PLANT_TEXT_CAPACITY)
                .alias(7)
                .access(Access::READ_WRITE),
        )?;
        registry.create(TagDefinition::uuid("Serial", host.serial.clone()).alias(8))?;
        let recipe = registry.create(
            TagDefinition::bytes("Recipe", host.recipe.clone(), PLANT_BLOB_CAPACITY)
                .alias(9)
                .access(Access::LOCAL),
        )?;
        let uptime = registry.create(
            TagDefinition::uint64("Uptime", host.uptime.clone()).alias(-1),
        )?;

        Ok(Plant {
            registry,
            clock,
            host,
            temperature,
            setpoint,
            mode,
            recipe,
            uptime,
        })
    }

    /// Advance the clock and bulk-read every tag
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.clock.advance(dt);
        self.registry.read_all()
    }
}
