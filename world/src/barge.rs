//! Vehicles that carry the objects standing on them.
//!
//! A barge owns a rectangular footprint anchored at its lower-right tile.
//! Riders are the objects resting on that footprint; the first `permanent`
//! of them are structural parts that always travel with the vehicle, the
//! rest are gathered from the world whenever the vehicle is about to move.

use std::{mem, time::Duration};

use harbor_core::{
    delta, wrap, BargePart, Event, Facing, Flat, MoveClass, ObjectId, PathFinder, TileCoord,
    TileRect, Turn,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ireg::{BargeRecord, ObjectEntry, BARGE_RECORD_SIZE, PART_RECORD_SIZE},
    map::{ChunkIntersect, GameMap, WorldObject},
    navigation::DirectPath,
    schedule::TimeQueue,
};

/// Tunable constants of vehicle behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BargeRules {
    /// Footprint width forced on a vehicle that carries a turtle shell.
    pub turtle_xtiles: u8,
    /// Lifts above the deck within which loose objects count as riders.
    pub deck_reach: i32,
    /// Height of the band that must be clear when stepping or turning.
    pub clearance: i32,
}

impl Default for BargeRules {
    fn default() -> Self {
        Self {
            turtle_xtiles: 20,
            deck_reach: 5,
            clearance: 4,
        }
    }
}

/// A rider held outside the world while its vehicle moves.
#[derive(Debug)]
struct Relocation {
    index: usize,
    object: WorldObject,
    to: TileCoord,
}

/// State of a single vehicle.
#[derive(Debug)]
pub(crate) struct Barge {
    id: ObjectId,
    tile: TileCoord,
    xtiles: i32,
    ytiles: i32,
    facing: Facing,
    center: TileCoord,
    objects: Vec<ObjectId>,
    permanent: usize,
    gathered: bool,
    ice_raft: bool,
    boat: Option<bool>,
    path: Option<Box<dyn PathFinder>>,
    frame_time: Duration,
    first_step: bool,
    taking_second_step: bool,
    rules: BargeRules,
}

impl Barge {
    pub(crate) fn new(
        id: ObjectId,
        tile: TileCoord,
        xtiles: i32,
        ytiles: i32,
        facing: Facing,
        rules: BargeRules,
    ) -> Self {
        let mut barge = Self {
            id,
            tile: tile.wrapped(),
            xtiles,
            ytiles,
            facing,
            center: tile,
            objects: Vec::new(),
            permanent: 0,
            gathered: false,
            ice_raft: false,
            boat: None,
            path: None,
            frame_time: Duration::ZERO,
            first_step: true,
            taking_second_step: false,
            rules,
        };
        barge.set_center();
        barge
    }

    pub(crate) fn tile(&self) -> TileCoord {
        self.tile
    }

    pub(crate) fn dimensions(&self) -> (i32, i32) {
        (self.xtiles, self.ytiles)
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn center(&self) -> TileCoord {
        self.center
    }

    pub(crate) fn riders(&self) -> &[ObjectId] {
        &self.objects
    }

    pub(crate) fn permanent(&self) -> usize {
        self.permanent
    }

    pub(crate) fn is_gathered(&self) -> bool {
        self.gathered
    }

    pub(crate) fn is_ice_raft(&self) -> bool {
        self.ice_raft
    }

    pub(crate) fn boat(&self) -> Option<bool> {
        self.boat
    }

    pub(crate) fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub(crate) fn first_step(&self) -> bool {
        self.first_step
    }

    /// Tiles covered by the vehicle.
    pub(crate) fn footprint(&self) -> TileRect {
        footprint_at(self.tile, self.xtiles, self.ytiles)
    }

    /// Reports whether the object is the vehicle itself or one of its riders.
    pub(crate) fn carries(&self, object: ObjectId) -> bool {
        object == self.id || self.objects.contains(&object)
    }

    /// Reports whether the object is one of the riders.
    pub(crate) fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    /// Vehicles never accept objects dropped onto them as contents.
    pub(crate) fn drop(&self, _object: ObjectId) -> bool {
        false
    }

    pub(crate) fn set_path(&mut self, path: Box<dyn PathFinder>) {
        self.path = Some(path);
    }

    /// Changes the footprint and facing without moving any rider.
    pub(crate) fn reshape(&mut self, xtiles: i32, ytiles: i32, facing: Facing) {
        self.xtiles = xtiles;
        self.ytiles = ytiles;
        self.facing = facing;
        self.set_center();
    }

    fn set_center(&mut self) {
        self.center = TileCoord::new(
            wrap(self.tile.x() - self.xtiles / 2),
            wrap(self.tile.y() - self.ytiles / 2),
            self.tile.z(),
        );
    }

    fn place(&mut self, tile: TileCoord, map: &mut GameMap) {
        self.tile = tile.wrapped();
        map.relocate(self.id, self.tile);
    }

    /// Region to repaint around the vehicle, stretched along its heading to
    /// cover overhanging parts.
    pub(crate) fn dirty_area(&self) -> TileRect {
        let area = self.footprint().enlarge(1);
        if self.facing.index() % 2 == 1 {
            TileRect::new(area.x() - 2, area.y(), area.w() + 4, area.h())
        } else {
            TileRect::new(area.x(), area.y() - 2, area.w(), area.h() + 4)
        }
    }

    fn rides(&self, object: &WorldObject, lift: i32) -> bool {
        let z = object.tile.z();
        object.top() > lift
            && ((object.info.is_barge_part() && z >= lift - 1)
                || (z >= lift && z < lift + self.rules.deck_reach))
    }

    /// Rebuilds the rider list from the objects resting on the footprint.
    ///
    /// Does nothing while the vehicle's chunk is not resident.
    pub(crate) fn gather(&mut self, map: &GameMap, out: &mut Vec<Event>) {
        if !map.is_resident(self.tile.chunk()) {
            return;
        }

        self.ice_raft = false;
        self.objects.truncate(self.permanent);
        let footprint = self.footprint();
        let lift = self.tile.z();
        for (chunk, tiles) in ChunkIntersect::new(footprint) {
            for object in map.objects_in(chunk) {
                if object.id == self.id
                    || object.info.is_egg()
                    || object.owner == Some(self.id)
                    || !tiles.has_world_point(object.tile.x(), object.tile.y())
                    || !self.rides(object, lift)
                {
                    continue;
                }

                match object.info.barge_part {
                    Some(BargePart::Raft) => self.ice_raft = true,
                    Some(BargePart::Turtle) => self.xtiles = i32::from(self.rules.turtle_xtiles),
                    _ => {}
                }
                self.objects.push(object.id);
            }
        }

        self.set_center();
        if self.boat.is_none() {
            if let Some(flat) = map.flat_at(self.center.x(), self.center.y()) {
                self.boat = Some(flat.is_some_and(Flat::is_water));
            }
        }
        self.gathered = true;

        debug!(barge = %self.id, riders = self.objects.len(), "gathered riders");
        out.push(Event::RidersGathered {
            barge: self.id,
            riders: u32::try_from(self.objects.len()).unwrap_or(u32::MAX),
        });
    }

    fn finish_move(&mut self, held: Vec<Relocation>, map: &mut GameMap, out: &mut Vec<Event>) {
        self.set_center();
        for Relocation {
            index,
            mut object,
            to,
        } in held
        {
            if index < self.permanent {
                object.owner = Some(self.id);
            }
            object.tile = to;
            map.attach(object);
        }
        if let Some(view) = map.scroll_if_needed(self.center) {
            out.push(Event::ViewScrolled { view });
        }
    }

    /// Checks the strips swept by a rotation whose new anchor is `anchor`.
    fn okay_to_rotate(&self, turn: Turn, anchor: TileCoord, map: &GameMap) -> bool {
        let lift = self.tile.z();
        let class = if lift > 0 {
            MoveClass::Levitate
        } else {
            MoveClass::AllTerrain
        };
        let current = self.footprint();
        let (xtiles, ytiles) = if turn.swaps_axes() {
            (self.ytiles, self.xtiles)
        } else {
            (self.xtiles, self.ytiles)
        };
        // Laid out beside the current footprint so the edge comparisons
        // never straddle the world edge.
        let rotated = TileRect::new(
            current.x() + delta(current.x(), anchor.x() - xtiles + 1),
            current.y() + delta(current.y(), anchor.y() - ytiles + 1),
            xtiles,
            ytiles,
        );

        let swept = [
            (rotated.y() < current.y()).then(|| {
                TileRect::new(
                    rotated.x(),
                    rotated.y(),
                    rotated.w(),
                    current.y() - rotated.y(),
                )
            }),
            (current.bottom() < rotated.bottom()).then(|| {
                TileRect::new(
                    rotated.x(),
                    current.bottom(),
                    rotated.w(),
                    rotated.bottom() - current.bottom(),
                )
            }),
            (rotated.x() < current.x()).then(|| {
                TileRect::new(
                    rotated.x(),
                    rotated.y(),
                    current.x() - rotated.x(),
                    rotated.h(),
                )
            }),
            (current.right() < rotated.right()).then(|| {
                TileRect::new(
                    current.right(),
                    rotated.y(),
                    rotated.right() - current.right(),
                    rotated.h(),
                )
            }),
        ];

        swept.into_iter().flatten().all(|area| {
            map.blocked_lift(area, lift, self.rules.clearance, class, |id| {
                self.carries(id)
            }) == Some(lift)
        })
    }

    /// Rotates the vehicle and every rider around the vehicle's center.
    ///
    /// Either the whole rotation happens or nothing moves: when a swept
    /// strip is blocked the vehicle, its riders and its facing are left as
    /// they were and `false` is returned. Riders are the ones found by the
    /// last gather.
    pub(crate) fn turn(&mut self, turn: Turn, map: &mut GameMap, out: &mut Vec<Event>) -> bool {
        out.push(Event::RegionInvalidated {
            area: self.dirty_area(),
        });

        let anchor = turn.footprint(self.tile, self.xtiles, self.ytiles, self.center);
        if !self.okay_to_rotate(turn, anchor, map) {
            debug!(barge = %self.id, ?turn, "rotation blocked");
            out.push(Event::TurnRejected {
                barge: self.id,
                turn,
            });
            return false;
        }

        self.place(anchor, map);
        if turn.swaps_axes() {
            mem::swap(&mut self.xtiles, &mut self.ytiles);
        }
        if !self.ice_raft {
            self.facing = self.facing.turned(turn.quarters());
        }

        let pivot = self.center;
        let quarters = turn.quarters();
        let held = detach_all(map, &self.objects, |object| {
            let (xtiles, ytiles) = object.info.footprint(object.frame);
            object.frame = object.info.rotated_frame(object.frame, quarters);
            turn.footprint(object.tile, xtiles, ytiles, pivot)
        });
        self.finish_move(held, map, out);

        out.push(Event::BargeTurned {
            barge: self.id,
            turn,
            facing: self.facing,
        });
        true
    }

    /// Turns until the vehicle faces `facing`.
    pub(crate) fn face_direction(
        &mut self,
        facing: Facing,
        map: &mut GameMap,
        out: &mut Vec<Event>,
    ) -> bool {
        match Turn::from_quarters(self.facing.quarters_to(facing)) {
            Some(turn) => self.turn(turn, map, out),
            None => true,
        }
    }

    /// Moves the vehicle and its riders without any collision check.
    pub(crate) fn move_to(&mut self, tile: TileCoord, map: &mut GameMap, out: &mut Vec<Event>) {
        let from = self.tile;
        if !map.is_resident(from.chunk()) {
            self.place(tile, map);
            self.set_center();
            self.gathered = false;
            out.push(Event::BargeMoved {
                barge: self.id,
                from,
                to: self.tile,
            });
            return;
        }

        if !self.gathered {
            self.gather(map, out);
        }
        out.push(Event::RegionInvalidated {
            area: self.dirty_area(),
        });

        self.place(tile, map);
        let to = self.tile;
        let (dx, dy, dz) = (to.x() - from.x(), to.y() - from.y(), to.z() - from.z());
        let animate = !self.taking_second_step;
        let held = detach_all(map, &self.objects, |object| {
            if animate {
                if let Some(frame) = object
                    .info
                    .barge_part
                    .and_then(|part| part.animated_frame(object.frame))
                {
                    object.frame = frame;
                }
            }
            object.tile.offset(dx, dy, dz)
        });
        self.finish_move(held, map, out);

        out.push(Event::BargeMoved {
            barge: self.id,
            from,
            to,
        });
    }

    /// Movement class used when stepping. Airborne vehicles levitate; an
    /// undetermined vehicle is treated as a boat.
    pub(crate) fn step_class(&self, force: bool) -> MoveClass {
        if self.tile.z() > 0 {
            MoveClass::Levitate
        } else if force {
            MoveClass::Unrestricted
        } else if self.boat == Some(false) {
            MoveClass::Walk
        } else {
            MoveClass::Swim
        }
    }

    /// Reports whether the footprint anchored at `tile` is free at the
    /// vehicle's current lift.
    pub(crate) fn fits_at(&self, tile: TileCoord, class: MoveClass, map: &GameMap) -> bool {
        let lift = self.tile.z();
        let area = footprint_at(tile, self.xtiles, self.ytiles);
        map.blocked_lift(area, lift, self.rules.clearance, class, |id| {
            self.carries(id)
        }) == Some(lift)
    }

    /// Advances onto `tile` if the vehicle fits there at its current lift.
    pub(crate) fn step(
        &mut self,
        tile: TileCoord,
        force: bool,
        map: &mut GameMap,
        out: &mut Vec<Event>,
    ) -> bool {
        if !self.gathered {
            self.gather(map, out);
        }

        let from = self.tile;
        let to = tile.wrapped().with_z(from.z());
        let class = self.step_class(force);
        if !self.fits_at(to, class, map) {
            debug!(barge = %self.id, ?to, ?class, "step blocked");
            out.push(Event::StepBlocked {
                barge: self.id,
                toward: to,
            });
            return false;
        }

        self.move_to(to, map, out);

        if let Some(actor) = map.main_actor() {
            for egg in map.eggs_triggered(to.chunk(), to, from) {
                out.push(Event::EggActivated { egg, actor });
            }
        }
        true
    }

    /// Plans a path to `destination` and schedules the first animation tick.
    pub(crate) fn travel_to(
        &mut self,
        destination: TileCoord,
        speed: Duration,
        now: Duration,
        map: &mut GameMap,
        queue: &mut TimeQueue,
        out: &mut Vec<Event>,
    ) -> bool {
        if !self.gathered {
            self.gather(map, out);
        }

        let from = self.tile;
        let path = self
            .path
            .get_or_insert_with(|| Box::new(DirectPath::new()));
        if !path.compute_path(from, destination) {
            self.frame_time = Duration::ZERO;
            debug!(barge = %self.id, ?destination, "no path");
            out.push(Event::TravelRejected {
                barge: self.id,
                destination,
            });
            return false;
        }

        self.frame_time = speed;
        self.first_step = true;
        if !self.ice_raft {
            let heading = Facing::toward(
                delta(from.x(), destination.x()),
                delta(from.y(), destination.y()),
            );
            if !self.face_direction(heading, map, out) {
                debug!(barge = %self.id, ?heading, "could not turn toward destination");
            }
        }
        if !queue.contains(self.id) {
            queue.enqueue(now, self.id, 0);
        }

        out.push(Event::TravelStarted {
            barge: self.id,
            destination,
        });
        true
    }

    /// Runs one animation tick: a single step on the first tick of a
    /// journey, two steps on every later one.
    pub(crate) fn handle_event(
        &mut self,
        now: Duration,
        data: u64,
        moving: bool,
        map: &mut GameMap,
        queue: &mut TimeQueue,
        out: &mut Vec<Event>,
    ) {
        if self.path.is_none() || self.frame_time.is_zero() || !moving {
            return;
        }

        if !self.advance(map, out) {
            self.halt(out);
        } else if !self.first_step {
            self.taking_second_step = true;
            if !self.advance(map, out) {
                self.halt(out);
            }
            self.taking_second_step = false;
        }

        if !self.frame_time.is_zero() {
            queue.enqueue(now + self.frame_time, self.id, data);
        }
        self.first_step = false;
    }

    fn advance(&mut self, map: &mut GameMap, out: &mut Vec<Event>) -> bool {
        let Some(tile) = self.path.as_mut().and_then(|path| path.next_step()) else {
            return false;
        };
        self.step(tile, false, map, out)
    }

    fn halt(&mut self, out: &mut Vec<Event>) {
        self.frame_time = Duration::ZERO;
        out.push(Event::BargeHalted { barge: self.id });
    }

    /// Leaves barge mode. Boats use their first open sail on the way out.
    pub(crate) fn done(&mut self, map: &GameMap, out: &mut Vec<Event>) {
        self.gathered = false;
        if self.boat == Some(true) {
            let sail = self.objects.iter().copied().find(|id| {
                map.object(*id).is_some_and(|object| {
                    object.info.barge_part == Some(BargePart::Sails)
                        && BargePart::sail_is_open(object.frame)
                })
            });
            if let Some(sail) = sail {
                debug!(barge = %self.id, %sail, "activating sails");
                out.push(Event::SailsActivated {
                    barge: self.id,
                    sail,
                });
            }
        }

        out.push(Event::BargeModeEnded { barge: self.id });
    }

    /// Reports whether the vehicle may set down where it hovers: no water
    /// and nothing solid beneath its footprint.
    pub(crate) fn okay_to_land(&self, map: &GameMap) -> bool {
        let footprint = self.footprint();
        let dry = footprint.tiles().all(|(x, y)| {
            matches!(map.flat_at(x, y), Some(flat) if !flat.is_some_and(Flat::is_water))
        });
        dry && !map.solid_below(footprint, self.tile.z(), |id| self.carries(id))
    }

    /// Makes an object a permanent part of the vehicle.
    pub(crate) fn add(&mut self, object: ObjectId, map: &mut GameMap) -> bool {
        if object == self.id || self.objects.iter().take(self.permanent).any(|id| *id == object) {
            return false;
        }
        let Some(entry) = map.object_mut(object) else {
            return false;
        };
        entry.owner = Some(self.id);

        self.objects.retain(|id| *id != object);
        self.objects.insert(self.permanent, object);
        self.permanent += 1;
        true
    }

    /// Drops an object from the rider list without touching the world.
    pub(crate) fn forget(&mut self, object: ObjectId) -> bool {
        let Some(index) = self.objects.iter().position(|id| *id == object) else {
            return false;
        };
        let _ = self.objects.remove(index);
        if index < self.permanent {
            self.permanent -= 1;
        }
        true
    }

    /// Releases a rider and takes it out of the world.
    pub(crate) fn remove(&mut self, object: ObjectId, map: &mut GameMap) -> bool {
        if !self.forget(object) {
            return false;
        }
        if let Some(mut released) = map.detach(object) {
            released.owner = None;
        }
        true
    }

    /// Save record of the vehicle and its permanent parts.
    pub(crate) fn record(&self, map: &GameMap, moving: bool) -> Option<BargeRecord> {
        let own = map.object(self.id)?;
        let parts = self
            .objects
            .iter()
            .take(self.permanent)
            .filter_map(|id| map.object(*id))
            .map(|part| ObjectEntry::new(part.tile, part.info.shape, part.frame))
            .collect();

        Some(BargeRecord {
            barge: ObjectEntry::new(self.tile, own.info.shape, own.frame),
            xtiles: u8::try_from(self.xtiles).unwrap_or(u8::MAX),
            ytiles: u8::try_from(self.ytiles).unwrap_or(u8::MAX),
            facing: self.facing,
            moving,
            parts,
        })
    }

    /// Size of the save record, or `None` while the vehicle is under player
    /// control and therefore saved elsewhere.
    pub(crate) fn ireg_size(&self, moving: bool) -> Option<usize> {
        (!moving).then(|| BARGE_RECORD_SIZE + self.permanent * PART_RECORD_SIZE + 1)
    }
}

/// Tiles covered by an `xtiles` by `ytiles` object anchored at `anchor`.
pub(crate) fn footprint_at(anchor: TileCoord, xtiles: i32, ytiles: i32) -> TileRect {
    TileRect::new(
        wrap(anchor.x() - xtiles + 1),
        wrap(anchor.y() - ytiles + 1),
        xtiles,
        ytiles,
    )
}

/// Takes every rider out of the world, letting `plan` adjust it and choose
/// its destination. The riders stay owned by the returned batch until
/// [`Barge::finish_move`] hands them back.
fn detach_all<F>(map: &mut GameMap, riders: &[ObjectId], mut plan: F) -> Vec<Relocation>
where
    F: FnMut(&mut WorldObject) -> TileCoord,
{
    riders
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let mut object = map.detach(*id)?;
            let to = plan(&mut object);
            Some(Relocation { index, object, to })
        })
        .collect()
}
