#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Harbor vehicle engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! actually happened. Blocked moves are ordinary outcomes and are reported as
//! events rather than errors.

pub mod rotation;
pub mod tiles;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub use rotation::Turn;
pub use tiles::{
    delta, wrap, ChunkCoord, TileCoord, TileRect, NUM_CHUNKS, NUM_TILES, TILES_PER_CHUNK,
};

/// Frame bit marking the rotated (axis-swapped) variant of a shape.
pub const ROTATED_FRAME_BIT: u8 = 32;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Makes a chunk resident, filling every tile with the provided flat.
    LoadChunk {
        /// Chunk that becomes resident.
        chunk: ChunkCoord,
        /// Terrain laid on every tile, or `None` for invalid terrain.
        flat: Option<Flat>,
    },
    /// Evicts a chunk's terrain. Objects placed there stay registered.
    UnloadChunk {
        /// Chunk that stops being resident.
        chunk: ChunkCoord,
    },
    /// Overwrites the terrain of every resident tile inside the area.
    PaintTerrain {
        /// Tiles to repaint.
        area: TileRect,
        /// Terrain laid on each tile, or `None` for invalid terrain.
        flat: Option<Flat>,
    },
    /// Places a plain object into the world.
    SpawnObject {
        /// Static description of the object's shape.
        shape: ShapeInfo,
        /// Initial frame.
        frame: u8,
        /// Anchor tile (lower-right corner).
        tile: TileCoord,
    },
    /// Places a vehicle into the world. Its riders are gathered lazily.
    SpawnBarge {
        /// Shape number of the vehicle.
        shape: u16,
        /// Footprint width in tiles for the given facing.
        xtiles: u8,
        /// Footprint height in tiles for the given facing.
        ytiles: u8,
        /// Initial facing.
        facing: Facing,
        /// Anchor tile (lower-right corner).
        tile: TileCoord,
    },
    /// Removes an object from the world.
    RemoveObject {
        /// Object to remove.
        object: ObjectId,
    },
    /// Designates the actor whose crossings trigger eggs.
    SetMainActor {
        /// Actor to designate, or `None` to clear.
        actor: Option<ObjectId>,
    },
    /// Attaches an object to a vehicle as a permanently owned part.
    AddToBarge {
        /// Vehicle receiving the object.
        barge: ObjectId,
        /// Object that becomes a permanent part.
        object: ObjectId,
    },
    /// Releases an object from a vehicle and removes it from the world.
    RemoveFromBarge {
        /// Vehicle that held the object.
        barge: ObjectId,
        /// Object to release.
        object: ObjectId,
    },
    /// Rebuilds the set of riders carried by a vehicle.
    Gather {
        /// Vehicle to refresh.
        barge: ObjectId,
    },
    /// Relocates a vehicle and its riders without collision checks.
    MoveBarge {
        /// Vehicle to move.
        barge: ObjectId,
        /// New anchor tile.
        tile: TileCoord,
    },
    /// Attempts to advance a vehicle onto an adjacent tile.
    StepBarge {
        /// Vehicle to step.
        barge: ObjectId,
        /// Tile to step onto.
        tile: TileCoord,
        /// Ignores terrain restrictions when set.
        force: bool,
    },
    /// Rotates a vehicle and its riders around the vehicle's center.
    TurnBarge {
        /// Vehicle to rotate.
        barge: ObjectId,
        /// Rotation to perform.
        turn: Turn,
    },
    /// Rotates a vehicle until it faces the provided direction.
    FaceDirection {
        /// Vehicle to rotate.
        barge: ObjectId,
        /// Desired facing.
        facing: Facing,
    },
    /// Plans a path and starts animating a vehicle toward a destination.
    TravelTo {
        /// Vehicle to drive.
        barge: ObjectId,
        /// Destination anchor tile.
        destination: TileCoord,
        /// Interval between animation ticks.
        speed: Duration,
    },
    /// Selects the vehicle under player control, ending the previous one's
    /// barge mode.
    SetMovingBarge {
        /// Vehicle to control, or `None` to leave barge mode.
        barge: Option<ObjectId>,
    },
    /// Advances the clock and runs every due time-queue entry.
    Tick {
        /// Absolute game time after the tick.
        now: Duration,
    },
    /// Enables or disables map-editing mode.
    SetMapEditing {
        /// Whether the editor is active.
        enabled: bool,
    },
    /// Opens a vehicle in the external map editor.
    EditBarge {
        /// Vehicle to edit.
        barge: ObjectId,
    },
    /// Applies an encoded vehicle update received from the map editor.
    StudioUpdate {
        /// Raw payload received from the editor.
        payload: Vec<u8>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Absolute game time after the tick.
        now: Duration,
    },
    /// Confirms that a plain object entered the world.
    ObjectSpawned {
        /// Identifier assigned to the object.
        object: ObjectId,
        /// Anchor tile of the object.
        tile: TileCoord,
    },
    /// Confirms that a vehicle entered the world.
    BargeSpawned {
        /// Identifier assigned to the vehicle.
        barge: ObjectId,
        /// Anchor tile of the vehicle.
        tile: TileCoord,
    },
    /// Confirms that an object left the world.
    ObjectRemoved {
        /// Identifier of the removed object.
        object: ObjectId,
    },
    /// Confirms that an object became a permanent part of a vehicle.
    RiderAdded {
        /// Vehicle that owns the object.
        barge: ObjectId,
        /// Object that was attached.
        object: ObjectId,
    },
    /// Confirms that an object was released from a vehicle.
    RiderReleased {
        /// Vehicle that held the object.
        barge: ObjectId,
        /// Object that was released.
        object: ObjectId,
    },
    /// Reports the result of recomputing a vehicle's riders.
    RidersGathered {
        /// Vehicle that gathered.
        barge: ObjectId,
        /// Number of riders, permanent parts included.
        riders: u32,
    },
    /// Confirms that a vehicle and its riders moved.
    BargeMoved {
        /// Vehicle that moved.
        barge: ObjectId,
        /// Anchor tile before the move.
        from: TileCoord,
        /// Anchor tile after the move.
        to: TileCoord,
    },
    /// Confirms that a vehicle and its riders rotated.
    BargeTurned {
        /// Vehicle that rotated.
        barge: ObjectId,
        /// Rotation that was performed.
        turn: Turn,
        /// Facing after the rotation.
        facing: Facing,
    },
    /// Reports that a rotation was refused because the swept area is blocked.
    TurnRejected {
        /// Vehicle that attempted the rotation.
        barge: ObjectId,
        /// Rotation that was refused.
        turn: Turn,
    },
    /// Reports that a step was refused because the destination is blocked.
    StepBlocked {
        /// Vehicle that attempted the step.
        barge: ObjectId,
        /// Tile the vehicle tried to reach.
        toward: TileCoord,
    },
    /// Reports that a vehicle's step carried the main actor onto an egg.
    EggActivated {
        /// Egg that fired.
        egg: ObjectId,
        /// Actor credited with the activation.
        actor: ObjectId,
    },
    /// Confirms that a vehicle found a path and started travelling.
    TravelStarted {
        /// Vehicle that is travelling.
        barge: ObjectId,
        /// Destination of the journey.
        destination: TileCoord,
    },
    /// Reports that no path to the destination could be found.
    TravelRejected {
        /// Vehicle that was asked to travel.
        barge: ObjectId,
        /// Unreachable destination.
        destination: TileCoord,
    },
    /// Reports that a vehicle stopped animating.
    BargeHalted {
        /// Vehicle that stopped.
        barge: ObjectId,
    },
    /// Reports that a vehicle left barge mode.
    BargeModeEnded {
        /// Vehicle that is no longer under control.
        barge: ObjectId,
    },
    /// Reports that the sails of a boat were used while leaving barge mode.
    SailsActivated {
        /// Vehicle carrying the sails.
        barge: ObjectId,
        /// Sail object that was activated.
        sail: ObjectId,
    },
    /// Requests a repaint of a region of tiles.
    RegionInvalidated {
        /// Tiles that need repainting.
        area: TileRect,
    },
    /// Reports that the viewport scrolled to keep a vehicle visible.
    ViewScrolled {
        /// Viewport after scrolling.
        view: TileRect,
    },
    /// Confirms that a vehicle was handed to the map editor.
    BargeSentToStudio {
        /// Vehicle being edited.
        barge: ObjectId,
    },
    /// Reports that the map editor could not be used.
    EditorUnavailable {
        /// Vehicle that was meant to be edited.
        barge: ObjectId,
    },
    /// Confirms that an editor update was applied.
    BargeUpdated {
        /// Vehicle that changed.
        barge: ObjectId,
    },
    /// Reports that an editor update was ignored.
    StudioUpdateRejected {
        /// Why the update was ignored.
        reason: StudioRejection,
    },
}

/// Reasons an editor update may be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudioRejection {
    /// The payload could not be decoded.
    Malformed,
    /// The update names a vehicle other than the one being edited.
    NotBeingEdited,
    /// The user cancelled picking a spot for a new vehicle.
    Cancelled,
    /// No lift was free for a new vehicle at the chosen spot.
    NoRoom,
}

/// Unique identifier assigned to a world object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cardinal facing of a vehicle. Indices run clockwise from north.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Toward decreasing rows.
    #[default]
    North,
    /// Toward increasing columns.
    East,
    /// Toward increasing rows.
    South,
    /// Toward decreasing columns.
    West,
}

impl Facing {
    /// Index of the facing in `0..4`.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Facing for an index, taken modulo four.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Self::North,
            1 => Self::East,
            2 => Self::South,
            _ => Self::West,
        }
    }

    /// Facing after the provided number of clockwise quarter turns.
    #[must_use]
    pub const fn turned(self, quarters: u8) -> Self {
        Self::from_index(self.index() + quarters % 4)
    }

    /// Clockwise quarter turns needed to reach `target`.
    #[must_use]
    pub const fn quarters_to(self, target: Facing) -> u8 {
        (4 + target.index() - self.index()) % 4
    }

    /// Facing closest to the direction vector `(dx, dy)`, with rows growing
    /// southward. Diagonals resolve toward north or south.
    #[must_use]
    pub const fn toward(dx: i32, dy: i32) -> Self {
        let north = -dy;
        if dx >= 0 {
            if north > dx {
                Self::North
            } else if north < -dx {
                Self::South
            } else {
                Self::East
            }
        } else if north > -dx {
            Self::North
        } else if north < dx {
            Self::South
        } else {
            Self::West
        }
    }
}

/// Policies that decide which terrain blocks a mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveClass {
    /// Land only.
    Walk,
    /// Water only.
    Swim,
    /// Flies over any terrain; cannot climb.
    Levitate,
    /// Any terrain, still blocked by obstacles.
    AllTerrain,
    /// Forced movement that ignores terrain and obstacles. Only unloaded
    /// regions block it.
    Unrestricted,
}

impl MoveClass {
    /// Reports whether the mover may enter a tile with the given terrain.
    #[must_use]
    pub const fn accepts(self, flat: Option<Flat>) -> bool {
        match self {
            Self::Walk => !matches!(flat, Some(Flat::Water)),
            Self::Swim => matches!(flat, Some(Flat::Water)),
            Self::Levitate | Self::AllTerrain | Self::Unrestricted => true,
        }
    }

    /// Reports whether obstacles stop the mover.
    #[must_use]
    pub const fn collides(self) -> bool {
        !matches!(self, Self::Unrestricted)
    }

    /// Reports whether the mover may climb onto a low obstacle.
    #[must_use]
    pub const fn climbs(self) -> bool {
        !matches!(self, Self::Levitate)
    }
}

/// Ground terrain of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flat {
    /// Walkable ground.
    Land,
    /// Navigable water.
    Water,
}

impl Flat {
    /// Reports whether the terrain is water.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }
}

/// Roles a shape can play as part of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BargePart {
    /// Structural piece with no special behaviour.
    Generic,
    /// Ice raft piece. Vehicles carrying one never change facing.
    Raft,
    /// Cart wheel, cycled while moving.
    Wheel,
    /// Animal pulling the vehicle, cycled while moving.
    DraftAnimal,
    /// Sails of a ship, used when leaving barge mode.
    Sails,
    /// Giant turtle shell. Forces a wide vehicle footprint.
    Turtle,
}

impl BargePart {
    /// Frame shown after one movement step, for parts that animate.
    #[must_use]
    pub const fn animated_frame(self, frame: u8) -> Option<u8> {
        match self {
            Self::Wheel => Some((frame.wrapping_add(1) & 3) | (frame & ROTATED_FRAME_BIT)),
            Self::DraftAnimal => Some((frame.wrapping_add(4) & 15) | (frame & ROTATED_FRAME_BIT)),
            Self::Generic | Self::Raft | Self::Sails | Self::Turtle => None,
        }
    }

    /// Reports whether a sail frame shows the sails unfurled.
    #[must_use]
    pub const fn sail_is_open(frame: u8) -> bool {
        (frame & 7) < 4
    }
}

/// Static description of a shape shared by every object that uses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeInfo {
    /// Shape number.
    pub shape: u16,
    /// Width in tiles of the unrotated frames.
    pub xtiles: u8,
    /// Depth in tiles of the unrotated frames.
    pub ytiles: u8,
    /// Height in lifts.
    pub ztiles: u8,
    /// Whether the object blocks movement.
    pub solid: bool,
    /// Trigger radius when the object is an egg.
    pub egg: Option<u8>,
    /// Role of the shape when it is part of a vehicle.
    pub barge_part: Option<BargePart>,
}

impl ShapeInfo {
    /// Describes a non-solid, non-egg shape with the given dimensions.
    #[must_use]
    pub const fn new(shape: u16, xtiles: u8, ytiles: u8, ztiles: u8) -> Self {
        Self {
            shape,
            xtiles,
            ytiles,
            ztiles,
            solid: false,
            egg: None,
            barge_part: None,
        }
    }

    /// Marks the shape as blocking movement.
    #[must_use]
    pub const fn solid(mut self) -> Self {
        self.solid = true;
        self
    }

    /// Marks the shape as an egg with the given trigger radius.
    #[must_use]
    pub const fn egg(mut self, radius: u8) -> Self {
        self.egg = Some(radius);
        self.solid = false;
        self
    }

    /// Marks the shape as a vehicle part.
    #[must_use]
    pub const fn barge_part(mut self, part: BargePart) -> Self {
        self.barge_part = Some(part);
        self
    }

    /// Reports whether the shape is an egg.
    #[must_use]
    pub const fn is_egg(&self) -> bool {
        self.egg.is_some()
    }

    /// Reports whether the shape belongs to a vehicle's structure.
    #[must_use]
    pub const fn is_barge_part(&self) -> bool {
        self.barge_part.is_some()
    }

    /// Footprint in tiles for a frame; rotated frames swap the axes.
    #[must_use]
    pub const fn footprint(&self, frame: u8) -> (i32, i32) {
        if frame & ROTATED_FRAME_BIT != 0 {
            (self.ytiles as i32, self.xtiles as i32)
        } else {
            (self.xtiles as i32, self.ytiles as i32)
        }
    }

    /// Frame to show after rotating an object clockwise by `quarters`.
    ///
    /// Vehicle parts carry dedicated frames per facing; other shapes are
    /// reflected by toggling the rotated bit.
    #[must_use]
    pub const fn rotated_frame(&self, frame: u8, quarters: u8) -> u8 {
        let rotated = frame & ROTATED_FRAME_BIT != 0;
        if self.is_barge_part() {
            match quarters % 4 {
                1 => (frame ^ ROTATED_FRAME_BIT) ^ if rotated { 3 } else { 1 },
                2 => frame ^ 2,
                3 => (frame ^ ROTATED_FRAME_BIT) ^ if rotated { 1 } else { 3 },
                _ => frame,
            }
        } else {
            frame ^ ((quarters % 2) << 5)
        }
    }
}

/// Source of waypoints for a travelling vehicle.
pub trait PathFinder: fmt::Debug {
    /// Plans a new path, discarding the old one. Returns `false` when no
    /// path exists.
    fn compute_path(&mut self, from: TileCoord, to: TileCoord) -> bool;

    /// Pops the next waypoint, or `None` once the path is exhausted.
    fn next_step(&mut self) -> Option<TileCoord>;
}
