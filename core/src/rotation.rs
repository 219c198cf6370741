//! Quarter-turn rotations of tiles around a pivot.
//!
//! The point forms treat `pivot` as the origin of a cartesian plane whose
//! y axis points north, so a right turn maps `(x, y)` to `(y, -x)`. Lift is
//! never changed.
//!
//! The footprint forms rotate an object whose anchor tile is its lower-right
//! corner and return the anchor of the rotated object, wrapped onto the grid.

use crate::tiles::{wrap, TileCoord};

/// Rotates `tile` 90 degrees clockwise around `pivot`.
#[must_use]
pub const fn rotate_right(tile: TileCoord, pivot: TileCoord) -> TileCoord {
    let rx = tile.x() - pivot.x();
    let ry = pivot.y() - tile.y();
    TileCoord::new(pivot.x() + ry, pivot.y() + rx, tile.z())
}

/// Rotates `tile` 90 degrees counter-clockwise around `pivot`.
#[must_use]
pub const fn rotate_left(tile: TileCoord, pivot: TileCoord) -> TileCoord {
    let rx = tile.x() - pivot.x();
    let ry = pivot.y() - tile.y();
    TileCoord::new(pivot.x() - ry, pivot.y() - rx, tile.z())
}

/// Rotates `tile` 180 degrees around `pivot`.
#[must_use]
pub const fn rotate_180(tile: TileCoord, pivot: TileCoord) -> TileCoord {
    let rx = tile.x() - pivot.x();
    let ry = pivot.y() - tile.y();
    TileCoord::new(pivot.x() - rx, pivot.y() + ry, tile.z())
}

/// Anchor of an `xtiles` by `ytiles` object after turning it right around
/// `pivot`. The new anchor is the old upper-right corner.
#[must_use]
pub const fn rotate_right_footprint(
    anchor: TileCoord,
    _xtiles: i32,
    ytiles: i32,
    pivot: TileCoord,
) -> TileCoord {
    let r = rotate_right(anchor, pivot);
    TileCoord::new(wrap(r.x() + ytiles), wrap(r.y()), r.z())
}

/// Anchor of an `xtiles` by `ytiles` object after turning it left around
/// `pivot`. The new anchor is the old lower-left corner.
#[must_use]
pub const fn rotate_left_footprint(
    anchor: TileCoord,
    xtiles: i32,
    _ytiles: i32,
    pivot: TileCoord,
) -> TileCoord {
    let r = rotate_left(anchor, pivot);
    TileCoord::new(wrap(r.x()), wrap(r.y() + xtiles), r.z())
}

/// Anchor of an `xtiles` by `ytiles` object after turning it around `pivot`.
/// The new anchor is the old upper-left corner.
#[must_use]
pub const fn rotate_180_footprint(
    anchor: TileCoord,
    xtiles: i32,
    ytiles: i32,
    pivot: TileCoord,
) -> TileCoord {
    let r = rotate_180(anchor, pivot);
    TileCoord::new(wrap(r.x() + xtiles), wrap(r.y() + ytiles), r.z())
}

/// The three rotations a vehicle can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Turn {
    /// Quarter turn clockwise.
    Right,
    /// Half turn.
    Around,
    /// Quarter turn counter-clockwise.
    Left,
}

impl Turn {
    /// Number of clockwise quarter turns the rotation represents.
    #[must_use]
    pub const fn quarters(self) -> u8 {
        match self {
            Self::Right => 1,
            Self::Around => 2,
            Self::Left => 3,
        }
    }

    /// Maps a clockwise quarter-turn count onto a rotation, if any.
    #[must_use]
    pub const fn from_quarters(quarters: u8) -> Option<Self> {
        match quarters % 4 {
            1 => Some(Self::Right),
            2 => Some(Self::Around),
            3 => Some(Self::Left),
            _ => None,
        }
    }

    /// Reports whether the rotation exchanges the footprint axes.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        !matches!(self, Self::Around)
    }

    /// Rotates a point around `pivot`.
    #[must_use]
    pub const fn point(self, tile: TileCoord, pivot: TileCoord) -> TileCoord {
        match self {
            Self::Right => rotate_right(tile, pivot),
            Self::Around => rotate_180(tile, pivot),
            Self::Left => rotate_left(tile, pivot),
        }
    }

    /// Rotates the anchor of an object with the given footprint around `pivot`.
    #[must_use]
    pub const fn footprint(
        self,
        anchor: TileCoord,
        xtiles: i32,
        ytiles: i32,
        pivot: TileCoord,
    ) -> TileCoord {
        match self {
            Self::Right => rotate_right_footprint(anchor, xtiles, ytiles, pivot),
            Self::Around => rotate_180_footprint(anchor, xtiles, ytiles, pivot),
            Self::Left => rotate_left_footprint(anchor, xtiles, ytiles, pivot),
        }
    }
}
