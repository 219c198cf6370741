#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Harbor vehicle engine.
//!
//! The world owns every object, the resident terrain, the vehicles and the
//! time queue that animates them. All mutation flows through [`apply`];
//! adapters observe the outcome through the emitted events and the
//! [`query`] module.

mod barge;
pub mod ireg;
mod map;
pub mod navigation;
mod schedule;
pub mod studio;

use std::{collections::BTreeMap, time::Duration};

use harbor_core::{
    Command, Event, Facing, MoveClass, ObjectId, PathFinder, ShapeInfo, StudioRejection,
    TileCoord, TileRect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use barge::BargeRules;

use barge::{footprint_at, Barge};
use map::{GameMap, Viewport, WorldObject};
use schedule::TimeQueue;
use studio::{BargeUpdate, StudioLink, DEFAULT_BARGE_SHAPE, MAX_DROP_LIFT};

const DEFAULT_SCROLL_MARGIN: i32 = 4;

/// Settings applied when a world is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Behaviour shared by every vehicle.
    pub barge: BargeRules,
    /// Initial viewport, or `None` when nothing is displayed.
    pub view: Option<TileRect>,
    /// Tiles from the viewport edge at which the view recentres on the
    /// moving vehicle.
    pub scroll_margin: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            barge: BargeRules::default(),
            view: None,
            scroll_margin: DEFAULT_SCROLL_MARGIN,
        }
    }
}

/// Represents the authoritative Harbor world state.
#[derive(Debug)]
pub struct World {
    map: GameMap,
    barges: BTreeMap<ObjectId, Barge>,
    queue: TimeQueue,
    now: Duration,
    moving_barge: Option<ObjectId>,
    map_editing: bool,
    editing: Option<ObjectId>,
    studio: Option<Box<dyn StudioLink>>,
    config: WorldConfig,
}

impl World {
    /// Creates an empty world with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates an empty world with the provided settings.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            map: GameMap::new(Viewport::new(config.view, config.scroll_margin)),
            barges: BTreeMap::new(),
            queue: TimeQueue::default(),
            now: Duration::ZERO,
            moving_barge: None,
            map_editing: false,
            editing: None,
            studio: None,
            config,
        }
    }

    fn spawn_barge(
        &mut self,
        shape: u16,
        xtiles: u8,
        ytiles: u8,
        facing: Facing,
        tile: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> ObjectId {
        let id = self.map.allocate_id();
        let tile = tile.wrapped();
        self.map.attach(WorldObject {
            id,
            info: ShapeInfo::new(shape, xtiles, ytiles, 0),
            frame: 0,
            tile,
            owner: None,
        });
        let vehicle = Barge::new(
            id,
            tile,
            i32::from(xtiles),
            i32::from(ytiles),
            facing,
            self.config.barge,
        );
        let _ = self.barges.insert(id, vehicle);
        out_events.push(Event::BargeSpawned { barge: id, tile });
        id
    }

    fn remove_object(&mut self, object: ObjectId, out_events: &mut Vec<Event>) {
        if let Some(vehicle) = self.barges.remove(&object) {
            self.queue.cancel(object);
            if self.moving_barge == Some(object) {
                self.moving_barge = None;
            }
            if self.editing == Some(object) {
                self.editing = None;
            }
            for part in vehicle.riders().iter().take(vehicle.permanent()) {
                if let Some(part) = self.map.object_mut(*part) {
                    part.owner = None;
                }
            }
        } else {
            for vehicle in self.barges.values_mut() {
                let _ = vehicle.forget(object);
            }
        }

        if self.map.main_actor() == Some(object) {
            self.map.set_main_actor(None);
        }
        if self.map.detach(object).is_some() {
            out_events.push(Event::ObjectRemoved { object });
        }
    }

    fn set_moving_barge(&mut self, barge: Option<ObjectId>, out_events: &mut Vec<Event>) {
        if self.moving_barge == barge {
            return;
        }

        if let Some(previous) = self.moving_barge.take() {
            if let Some(vehicle) = self.barges.get_mut(&previous) {
                vehicle.done(&self.map, out_events);
            }
        }

        if let Some(next) = barge {
            if let Some(vehicle) = self.barges.get_mut(&next) {
                if !vehicle.is_gathered() {
                    vehicle.gather(&self.map, out_events);
                }
                self.moving_barge = Some(next);
            }
        }
    }

    fn tick(&mut self, now: Duration, out_events: &mut Vec<Event>) {
        self.now = now;
        out_events.push(Event::TimeAdvanced { now });

        while let Some(entry) = self.queue.pop_due(now) {
            let moving = self.moving_barge == Some(entry.target);
            if let Some(vehicle) = self.barges.get_mut(&entry.target) {
                vehicle.handle_event(
                    now,
                    entry.data,
                    moving,
                    &mut self.map,
                    &mut self.queue,
                    out_events,
                );
            }
        }
    }

    /// Hands a vehicle to the map editor. Returns `false` when the editor is
    /// unavailable.
    fn edit(&mut self, barge: ObjectId, out_events: &mut Vec<Event>) -> bool {
        let Some(vehicle) = self.barges.get(&barge) else {
            return false;
        };
        if !self.map_editing {
            out_events.push(Event::EditorUnavailable { barge });
            return false;
        }
        let Some(link) = self.studio.as_mut() else {
            out_events.push(Event::EditorUnavailable { barge });
            return false;
        };

        let own = self.map.object(barge);
        let (xtiles, ytiles) = vehicle.dimensions();
        let update = BargeUpdate {
            barge: Some(barge),
            tile: vehicle.tile(),
            shape: own.map(|object| object.info.shape),
            frame: own.map_or(0, |object| object.frame),
            xtiles: u8::try_from(xtiles).unwrap_or(u8::MAX),
            ytiles: u8::try_from(ytiles).unwrap_or(u8::MAX),
            facing: vehicle.facing(),
        };

        self.editing = None;
        match link.send_barge(&update) {
            Ok(()) => {
                info!(%barge, "sent barge data to studio");
                self.editing = Some(barge);
                out_events.push(Event::BargeSentToStudio { barge });
            }
            Err(error) => warn!(%barge, %error, "error sending barge data to studio"),
        }
        true
    }

    fn update_from_studio(&mut self, payload: &[u8], out_events: &mut Vec<Event>) {
        let update = match BargeUpdate::decode(payload) {
            Ok(update) => update,
            Err(error) => {
                warn!(%error, "error decoding barge");
                out_events.push(Event::StudioUpdateRejected {
                    reason: StudioRejection::Malformed,
                });
                return;
            }
        };

        let barge = match update.barge {
            Some(barge) if self.editing != Some(barge) => {
                warn!(%barge, "barge from studio is not being edited");
                out_events.push(Event::StudioUpdateRejected {
                    reason: StudioRejection::NotBeingEdited,
                });
                return;
            }
            Some(barge) => {
                self.editing = None;
                barge
            }
            None => match self.create_from_studio(&update, out_events) {
                Ok(barge) => barge,
                Err(reason) => {
                    out_events.push(Event::StudioUpdateRejected { reason });
                    return;
                }
            },
        };

        let Some(vehicle) = self.barges.get_mut(&barge) else {
            warn!(%barge, "edited barge no longer exists");
            return;
        };
        vehicle.reshape(
            i32::from(update.xtiles),
            i32::from(update.ytiles),
            update.facing,
        );
        let area = vehicle.dirty_area();
        if let (Some(shape), Some(object)) = (update.shape, self.map.object_mut(barge)) {
            object.info.shape = shape;
        }

        out_events.push(Event::RegionInvalidated { area });
        info!(%barge, "barge updated");
        out_events.push(Event::BargeUpdated { barge });
    }

    /// Drops a new vehicle where the user clicks, trying increasing lifts.
    fn create_from_studio(
        &mut self,
        update: &BargeUpdate,
        out_events: &mut Vec<Event>,
    ) -> Result<ObjectId, StudioRejection> {
        let Some(link) = self.studio.as_mut() else {
            return Err(StudioRejection::Cancelled);
        };
        let Some(spot) = link.pick_tile() else {
            link.cancel();
            return Err(StudioRejection::Cancelled);
        };

        let xtiles = i32::from(update.xtiles);
        let ytiles = i32::from(update.ytiles);
        let clearance = self.config.barge.clearance;
        let map = &self.map;
        let lift = (0..=MAX_DROP_LIFT).find(|&lift| {
            let area = footprint_at(spot.with_z(lift), xtiles, ytiles);
            map.blocked_lift(area, lift, clearance, MoveClass::AllTerrain, |_| false)
                == Some(lift)
        });
        let Some(lift) = lift else {
            link.cancel();
            debug!(?spot, "no room to drop barge");
            return Err(StudioRejection::NoRoom);
        };
        link.user_responded();

        let shape = update.shape.unwrap_or(DEFAULT_BARGE_SHAPE);
        Ok(self.spawn_barge(
            shape,
            update.xtiles,
            update.ytiles,
            update.facing,
            spot.with_z(lift),
            out_events,
        ))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Connects the map editor. Any previous link is dropped.
pub fn attach_studio(world: &mut World, link: Box<dyn StudioLink>) {
    world.studio = Some(link);
}

/// Replaces the pathfinder a vehicle uses for travel. Returns `false` when
/// the vehicle does not exist.
pub fn install_pathfinder(world: &mut World, barge: ObjectId, path: Box<dyn PathFinder>) -> bool {
    match world.barges.get_mut(&barge) {
        Some(vehicle) => {
            vehicle.set_path(path);
            true
        }
        None => false,
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadChunk { chunk, flat } => world.map.load_chunk(chunk, flat),
        Command::UnloadChunk { chunk } => world.map.unload_chunk(chunk),
        Command::PaintTerrain { area, flat } => {
            world.map.paint(area, flat);
            out_events.push(Event::RegionInvalidated { area });
        }
        Command::SpawnObject { shape, frame, tile } => {
            let object = world.map.allocate_id();
            let tile = tile.wrapped();
            world.map.attach(WorldObject {
                id: object,
                info: shape,
                frame,
                tile,
                owner: None,
            });
            out_events.push(Event::ObjectSpawned { object, tile });
        }
        Command::SpawnBarge {
            shape,
            xtiles,
            ytiles,
            facing,
            tile,
        } => {
            let _ = world.spawn_barge(shape, xtiles, ytiles, facing, tile, out_events);
        }
        Command::RemoveObject { object } => world.remove_object(object, out_events),
        Command::SetMainActor { actor } => world.map.set_main_actor(actor),
        Command::AddToBarge { barge, object } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                if vehicle.add(object, &mut world.map) {
                    out_events.push(Event::RiderAdded { barge, object });
                }
            }
        }
        Command::RemoveFromBarge { barge, object } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                if vehicle.remove(object, &mut world.map) {
                    out_events.push(Event::RiderReleased { barge, object });
                    out_events.push(Event::ObjectRemoved { object });
                }
            }
        }
        Command::Gather { barge } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                vehicle.gather(&world.map, out_events);
            }
        }
        Command::MoveBarge { barge, tile } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                vehicle.move_to(tile, &mut world.map, out_events);
            }
        }
        Command::StepBarge { barge, tile, force } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                let _ = vehicle.step(tile, force, &mut world.map, out_events);
            }
        }
        Command::TurnBarge { barge, turn } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                let _ = vehicle.turn(turn, &mut world.map, out_events);
            }
        }
        Command::FaceDirection { barge, facing } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                let _ = vehicle.face_direction(facing, &mut world.map, out_events);
            }
        }
        Command::TravelTo {
            barge,
            destination,
            speed,
        } => {
            if let Some(vehicle) = world.barges.get_mut(&barge) {
                let _ = vehicle.travel_to(
                    destination,
                    speed,
                    world.now,
                    &mut world.map,
                    &mut world.queue,
                    out_events,
                );
            }
        }
        Command::SetMovingBarge { barge } => world.set_moving_barge(barge, out_events),
        Command::Tick { now } => world.tick(now, out_events),
        Command::SetMapEditing { enabled } => world.map_editing = enabled,
        Command::EditBarge { barge } => {
            let _ = world.edit(barge, out_events);
        }
        Command::StudioUpdate { payload } => world.update_from_studio(&payload, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use crate::ireg::BargeRecord;
    use harbor_core::{Facing, Flat, ObjectId, ShapeInfo, TileCoord, TileRect};

    /// Current game time.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.now
    }

    /// Vehicle under player control, if any.
    #[must_use]
    pub fn moving_barge(world: &World) -> Option<ObjectId> {
        world.moving_barge
    }

    /// Vehicle currently open in the map editor, if any.
    #[must_use]
    pub fn editing(world: &World) -> Option<ObjectId> {
        world.editing
    }

    /// Identifiers of every vehicle in ascending order.
    #[must_use]
    pub fn barge_ids(world: &World) -> Vec<ObjectId> {
        world.barges.keys().copied().collect()
    }

    /// Captures the state of a single vehicle.
    #[must_use]
    pub fn barge(world: &World, barge: ObjectId) -> Option<BargeSnapshot> {
        let vehicle = world.barges.get(&barge)?;
        let (xtiles, ytiles) = vehicle.dimensions();
        Some(BargeSnapshot {
            id: barge,
            tile: vehicle.tile(),
            xtiles,
            ytiles,
            facing: vehicle.facing(),
            center: vehicle.center(),
            footprint: vehicle.footprint(),
            riders: vehicle.riders().to_vec(),
            permanent: vehicle.permanent(),
            gathered: vehicle.is_gathered(),
            ice_raft: vehicle.is_ice_raft(),
            boat: vehicle.boat(),
            frame_time: vehicle.frame_time(),
            first_step: vehicle.first_step(),
        })
    }

    /// Captures the state of a single object.
    #[must_use]
    pub fn object(world: &World, object: ObjectId) -> Option<ObjectSnapshot> {
        world.map.object(object).map(|entry| ObjectSnapshot {
            id: entry.id,
            shape: entry.info,
            frame: entry.frame,
            tile: entry.tile,
            owner: entry.owner,
        })
    }

    /// Reports whether the object currently rides the vehicle.
    #[must_use]
    pub fn contains(world: &World, barge: ObjectId, object: ObjectId) -> bool {
        world
            .barges
            .get(&barge)
            .is_some_and(|vehicle| vehicle.contains(object))
    }

    /// Reports whether the vehicle would accept the object dropped onto it as
    /// contents.
    #[must_use]
    pub fn accepts_drop(world: &World, barge: ObjectId, object: ObjectId) -> bool {
        world
            .barges
            .get(&barge)
            .is_some_and(|vehicle| vehicle.drop(object))
    }

    /// Reports whether the vehicle may land at its current position.
    #[must_use]
    pub fn okay_to_land(world: &World, barge: ObjectId) -> bool {
        world
            .barges
            .get(&barge)
            .is_some_and(|vehicle| vehicle.okay_to_land(&world.map))
    }

    /// Reports whether the vehicle could step onto `tile` right now.
    #[must_use]
    pub fn can_step(world: &World, barge: ObjectId, tile: TileCoord) -> bool {
        world.barges.get(&barge).is_some_and(|vehicle| {
            let to = tile.wrapped().with_z(vehicle.tile().z());
            vehicle.fits_at(to, vehicle.step_class(false), &world.map)
        })
    }

    /// Save record of the vehicle and its permanent parts.
    #[must_use]
    pub fn ireg_record(world: &World, barge: ObjectId) -> Option<BargeRecord> {
        let vehicle = world.barges.get(&barge)?;
        vehicle.record(&world.map, world.moving_barge == Some(barge))
    }

    /// Size of the save record, or `None` while the vehicle is the moving
    /// barge.
    #[must_use]
    pub fn ireg_size(world: &World, barge: ObjectId) -> Option<usize> {
        let vehicle = world.barges.get(&barge)?;
        vehicle.ireg_size(world.moving_barge == Some(barge))
    }

    /// Reports whether an animation tick is pending for the vehicle.
    #[must_use]
    pub fn in_queue(world: &World, barge: ObjectId) -> bool {
        world.queue.contains(barge)
    }

    /// Current viewport, if one is configured.
    #[must_use]
    pub fn view(world: &World) -> Option<TileRect> {
        world.map.viewport().view()
    }

    /// Terrain of a tile. The outer `None` means the tile is not resident.
    #[must_use]
    pub fn flat_at(world: &World, x: i32, y: i32) -> Option<Option<Flat>> {
        world.map.flat_at(x, y)
    }

    /// Immutable representation of a vehicle's state.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BargeSnapshot {
        /// Identifier of the vehicle.
        pub id: ObjectId,
        /// Anchor tile (lower-right corner).
        pub tile: TileCoord,
        /// Footprint width.
        pub xtiles: i32,
        /// Footprint height.
        pub ytiles: i32,
        /// Current facing.
        pub facing: Facing,
        /// Rotation pivot.
        pub center: TileCoord,
        /// Tiles covered by the vehicle.
        pub footprint: TileRect,
        /// Riders, permanent parts first.
        pub riders: Vec<ObjectId>,
        /// Number of permanent parts at the head of `riders`.
        pub permanent: usize,
        /// Whether the rider list is current.
        pub gathered: bool,
        /// Whether the vehicle carries an ice raft.
        pub ice_raft: bool,
        /// Whether the vehicle floats, once known.
        pub boat: Option<bool>,
        /// Interval between animation ticks; zero when idle.
        pub frame_time: Duration,
        /// Whether the next tick is the first of a journey.
        pub first_step: bool,
    }

    /// Immutable representation of an object's state.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ObjectSnapshot {
        /// Identifier of the object.
        pub id: ObjectId,
        /// Static shape description.
        pub shape: ShapeInfo,
        /// Current frame.
        pub frame: u8,
        /// Anchor tile.
        pub tile: TileCoord,
        /// Vehicle that owns the object as a permanent part.
        pub owner: Option<ObjectId>,
    }
}
