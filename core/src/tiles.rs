//! Tile-space coordinates on the toroidal world grid.

use serde::{Deserialize, Serialize};

/// Number of tiles along one edge of a map chunk.
pub const TILES_PER_CHUNK: i32 = 16;

/// Number of chunks along one edge of the world.
pub const NUM_CHUNKS: i32 = 192;

/// Number of tiles along one edge of the world. Horizontal coordinates wrap
/// modulo this value.
pub const NUM_TILES: i32 = TILES_PER_CHUNK * NUM_CHUNKS;

/// Normalises a horizontal tile coordinate into `[0, NUM_TILES)`.
#[must_use]
pub const fn wrap(value: i32) -> i32 {
    value.rem_euclid(NUM_TILES)
}

/// Shortest signed distance from `from` to `to` on the wrapped axis.
#[must_use]
pub const fn delta(from: i32, to: i32) -> i32 {
    let diff = to - from;
    if diff >= NUM_TILES / 2 {
        diff - NUM_TILES
    } else if diff < -NUM_TILES / 2 {
        diff + NUM_TILES
    } else {
        diff
    }
}

/// Position of a single tile: horizontal coordinates plus lift.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    x: i32,
    y: i32,
    z: i32,
}

impl TileCoord {
    /// Creates a tile coordinate without normalising it.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile. Rows grow southward.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Lift of the tile.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the coordinate with both horizontal axes wrapped onto the grid.
    #[must_use]
    pub const fn wrapped(self) -> Self {
        Self::new(wrap(self.x), wrap(self.y), self.z)
    }

    /// Translates the coordinate and wraps the result.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(wrap(self.x + dx), wrap(self.y + dy), self.z + dz)
    }

    /// Returns the same tile at a different lift.
    #[must_use]
    pub const fn with_z(self, z: i32) -> Self {
        Self::new(self.x, self.y, z)
    }

    /// Chunk containing the tile.
    #[must_use]
    pub const fn chunk(&self) -> ChunkCoord {
        ChunkCoord::new(
            wrap(self.x) / TILES_PER_CHUNK,
            wrap(self.y) / TILES_PER_CHUNK,
        )
    }
}

/// Axis-aligned rectangle of tiles, anchored at its upper-left tile.
///
/// The origin may lie anywhere; containment checks treat the rectangle as
/// wrapping around the world edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl TileRect {
    /// Creates a rectangle from its origin and dimensions.
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Left column.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top row.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Width in tiles.
    #[must_use]
    pub const fn w(&self) -> i32 {
        self.w
    }

    /// Height in tiles.
    #[must_use]
    pub const fn h(&self) -> i32 {
        self.h
    }

    /// Column one past the right edge.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Row one past the bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Reports whether the point lies inside the rectangle without wrapping.
    #[must_use]
    pub const fn has_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }

    /// Reports whether the world point lies inside the rectangle, allowing the
    /// rectangle to wrap around the world edge.
    #[must_use]
    pub const fn has_world_point(&self, x: i32, y: i32) -> bool {
        wrap(x - self.x) < self.w && wrap(y - self.y) < self.h
    }

    /// Grows the rectangle by `by` tiles on every side.
    #[must_use]
    pub const fn enlarge(self, by: i32) -> Self {
        Self::new(self.x - by, self.y - by, self.w + 2 * by, self.h + 2 * by)
    }

    /// Number of tiles covered.
    #[must_use]
    pub const fn area(&self) -> i32 {
        if self.w <= 0 || self.h <= 0 {
            0
        } else {
            self.w * self.h
        }
    }

    /// Iterates every tile of the rectangle in row-major order, wrapped onto
    /// the grid.
    pub fn tiles(self) -> impl Iterator<Item = (i32, i32)> {
        (self.y..self.y + self.h.max(0))
            .flat_map(move |y| (self.x..self.x + self.w.max(0)).map(move |x| (wrap(x), wrap(y))))
    }
}

/// Location of a map chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    cx: i32,
    cy: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate, wrapping it onto the chunk grid.
    #[must_use]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self {
            cx: cx.rem_euclid(NUM_CHUNKS),
            cy: cy.rem_euclid(NUM_CHUNKS),
        }
    }

    /// Chunk column.
    #[must_use]
    pub const fn cx(&self) -> i32 {
        self.cx
    }

    /// Chunk row.
    #[must_use]
    pub const fn cy(&self) -> i32 {
        self.cy
    }

    /// Tile rectangle covered by the chunk.
    #[must_use]
    pub const fn tiles(&self) -> TileRect {
        TileRect::new(
            self.cx * TILES_PER_CHUNK,
            self.cy * TILES_PER_CHUNK,
            TILES_PER_CHUNK,
            TILES_PER_CHUNK,
        )
    }
}
