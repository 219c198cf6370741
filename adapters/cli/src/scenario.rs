use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use harbor_core::{
    BargePart, ChunkCoord, Command, Event, Facing, Flat, ObjectId, ShapeInfo, TileCoord,
    TileRect, NUM_CHUNKS, TILES_PER_CHUNK,
};
use harbor_world::{self as world, World, WorldConfig};
use serde::Deserialize;

/// Voyage description loaded from a TOML file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// World settings, including vehicle rules.
    #[serde(default)]
    pub(crate) world: WorldConfig,
    /// Area whose chunks are loaded as open water.
    pub(crate) sea: TileRect,
    /// Terrain patches painted over the sea, in order.
    #[serde(default)]
    pub(crate) terrain: Vec<TerrainPatch>,
    /// The vehicle making the voyage.
    pub(crate) barge: BargePlan,
    /// Objects placed around the vehicle before it sets out.
    #[serde(default)]
    pub(crate) riders: Vec<RiderPlan>,
    /// Where and how fast the vehicle travels.
    pub(crate) voyage: VoyagePlan,
}

/// Rectangle repainted with a single terrain kind.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TerrainPatch {
    pub(crate) area: TileRect,
    pub(crate) flat: Option<Flat>,
}

/// Shape and placement of the vehicle.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BargePlan {
    #[serde(default = "default_barge_shape")]
    pub(crate) shape: u16,
    pub(crate) xtiles: u8,
    pub(crate) ytiles: u8,
    #[serde(default)]
    pub(crate) facing: Facing,
    pub(crate) tile: TileCoord,
}

/// A loose object, optionally made a permanent part of the vehicle.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RiderPlan {
    pub(crate) shape: u16,
    #[serde(default)]
    pub(crate) frame: u8,
    pub(crate) tile: TileCoord,
    #[serde(default = "one")]
    pub(crate) xtiles: u8,
    #[serde(default = "one")]
    pub(crate) ytiles: u8,
    #[serde(default = "one")]
    pub(crate) ztiles: u8,
    #[serde(default)]
    pub(crate) solid: bool,
    #[serde(default)]
    pub(crate) part: Option<BargePart>,
    #[serde(default)]
    pub(crate) permanent: bool,
}

impl RiderPlan {
    fn info(&self) -> ShapeInfo {
        let mut info = ShapeInfo::new(self.shape, self.xtiles, self.ytiles, self.ztiles);
        if self.solid {
            info = info.solid();
        }
        if let Some(part) = self.part {
            info = info.barge_part(part);
        }
        info
    }
}

/// Destination, pace and duration of the voyage.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct VoyagePlan {
    pub(crate) destination: TileCoord,
    #[serde(default = "default_speed_ms")]
    pub(crate) speed_ms: u64,
    #[serde(default = "default_ticks")]
    pub(crate) ticks: u32,
}

impl VoyagePlan {
    /// Delay between animation ticks.
    #[must_use]
    pub(crate) fn speed(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }
}

const fn default_barge_shape() -> u16 {
    harbor_world::studio::DEFAULT_BARGE_SHAPE
}

const fn one() -> u8 {
    1
}

const fn default_speed_ms() -> u64 {
    100
}

const fn default_ticks() -> u32 {
    64
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse scenario at {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents).context("invalid scenario toml")?;
        if scenario.sea.w() <= 0 || scenario.sea.h() <= 0 {
            bail!("scenario sea must cover at least one tile");
        }
        if scenario.barge.xtiles == 0 || scenario.barge.ytiles == 0 {
            bail!("vehicle footprint must be at least one tile");
        }
        if scenario.voyage.speed_ms == 0 {
            bail!("voyage speed must be positive");
        }
        Ok(scenario)
    }

    /// Chunks covered by the sea rectangle, wrapped onto the map.
    fn sea_chunks(&self) -> BTreeSet<ChunkCoord> {
        let chunk_span = |origin: i32, length: i32| {
            let first = origin.div_euclid(TILES_PER_CHUNK);
            let last = (origin + length - 1).div_euclid(TILES_PER_CHUNK);
            (first..=last).map(|chunk| chunk.rem_euclid(NUM_CHUNKS))
        };

        chunk_span(self.sea.x(), self.sea.w())
            .flat_map(|cx| chunk_span(self.sea.y(), self.sea.h()).map(move |cy| (cx, cy)))
            .map(|(cx, cy)| ChunkCoord::new(cx, cy))
            .collect()
    }

    /// Builds the scenario inside `world` and returns the vehicle's id.
    pub(crate) fn build(&self, world: &mut World, log: &mut Vec<Event>) -> Result<ObjectId> {
        for chunk in self.sea_chunks() {
            world::apply(
                world,
                Command::LoadChunk {
                    chunk,
                    flat: Some(Flat::Water),
                },
                log,
            );
        }
        for patch in &self.terrain {
            world::apply(
                world,
                Command::PaintTerrain {
                    area: patch.area,
                    flat: patch.flat,
                },
                log,
            );
        }

        let mut spawned = Vec::new();
        world::apply(
            world,
            Command::SpawnBarge {
                shape: self.barge.shape,
                xtiles: self.barge.xtiles,
                ytiles: self.barge.ytiles,
                facing: self.barge.facing,
                tile: self.barge.tile,
            },
            &mut spawned,
        );
        let barge = spawned
            .iter()
            .find_map(|event| match event {
                Event::BargeSpawned { barge, .. } => Some(*barge),
                _ => None,
            })
            .context("world did not report the spawned vehicle")?;
        log.append(&mut spawned);

        for rider in &self.riders {
            let mut events = Vec::new();
            world::apply(
                world,
                Command::SpawnObject {
                    shape: rider.info(),
                    frame: rider.frame,
                    tile: rider.tile,
                },
                &mut events,
            );
            let object = events
                .iter()
                .find_map(|event| match event {
                    Event::ObjectSpawned { object, .. } => Some(*object),
                    _ => None,
                })
                .with_context(|| format!("world did not report rider shape {}", rider.shape))?;
            log.append(&mut events);

            if rider.permanent {
                world::apply(world, Command::AddToBarge { barge, object }, log);
            }
        }

        world::apply(
            world,
            Command::SetMovingBarge {
                barge: Some(barge),
            },
            log,
        );
        Ok(barge)
    }
}
