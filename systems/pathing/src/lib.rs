#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Charted pathfinder that plans vehicle voyages with A*.
//!
//! A [`SeaChart`] records which anchor tiles a vehicle could step onto
//! inside a rectangular window of the map. [`ChartedPath`] searches that
//! chart with eight-way moves and hands the result to the world one
//! waypoint at a time through the [`PathFinder`] contract. The window may
//! straddle the seam of the wrapping map.

use std::collections::VecDeque;

use harbor_core::{delta, wrap, ObjectId, PathFinder, TileCoord, TileRect};
use harbor_world::{query, World};
use pathfinding::prelude::astar;
use tracing::debug;

const NEIGHBOURS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Passability of vehicle anchor tiles within a window of the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeaChart {
    window: TileRect,
    lift: i32,
    open: Vec<bool>,
}

impl SeaChart {
    /// Charts `window` at `lift`, asking `is_open` about every tile once.
    pub fn capture<F>(window: TileRect, lift: i32, is_open: F) -> Self
    where
        F: Fn(TileCoord) -> bool,
    {
        let open = (0..window.h().max(0))
            .flat_map(|row| (0..window.w().max(0)).map(move |column| (column, row)))
            .map(|(column, row)| {
                is_open(TileCoord::new(
                    wrap(window.x() + column),
                    wrap(window.y() + row),
                    lift,
                ))
            })
            .collect();

        Self { window, lift, open }
    }

    /// Charts the tiles the vehicle could currently step onto. Returns
    /// `None` when the vehicle does not exist.
    #[must_use]
    pub fn of_barge(world: &World, barge: ObjectId, window: TileRect) -> Option<Self> {
        let snapshot = query::barge(world, barge)?;
        Some(Self::capture(window, snapshot.tile.z(), |tile| {
            query::can_step(world, barge, tile)
        }))
    }

    /// Area covered by the chart.
    #[must_use]
    pub const fn window(&self) -> TileRect {
        self.window
    }

    /// Lift the chart was captured at.
    #[must_use]
    pub const fn lift(&self) -> i32 {
        self.lift
    }

    /// Reports whether the chart marks the tile as passable. Tiles outside
    /// the window are closed.
    #[must_use]
    pub fn is_open(&self, tile: TileCoord) -> bool {
        self.index(tile)
            .and_then(|index| self.open.get(index))
            .copied()
            .unwrap_or(false)
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        let column = wrap(tile.x() - self.window.x());
        let row = wrap(tile.y() - self.window.y());
        if column >= self.window.w() || row >= self.window.h() {
            return None;
        }
        usize::try_from(row * self.window.w() + column).ok()
    }

    fn neighbours(&self, tile: TileCoord) -> impl Iterator<Item = (TileCoord, u32)> + '_ {
        NEIGHBOURS
            .iter()
            .map(move |&(dx, dy)| tile.offset(dx, dy, 0).wrapped())
            .filter(|next| self.is_open(*next))
            .map(|next| (next, 1))
    }
}

/// Pathfinder that searches a [`SeaChart`] with A*.
#[derive(Debug)]
pub struct ChartedPath {
    chart: SeaChart,
    steps: VecDeque<TileCoord>,
}

impl ChartedPath {
    /// Creates a pathfinder over the provided chart.
    #[must_use]
    pub fn new(chart: SeaChart) -> Self {
        Self {
            chart,
            steps: VecDeque::new(),
        }
    }

    /// Chart the pathfinder plans over.
    #[must_use]
    pub fn chart(&self) -> &SeaChart {
        &self.chart
    }

    /// Number of waypoints not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl PathFinder for ChartedPath {
    fn compute_path(&mut self, from: TileCoord, to: TileCoord) -> bool {
        self.steps.clear();

        let start = from.with_z(self.chart.lift()).wrapped();
        let goal = to.with_z(self.chart.lift()).wrapped();
        if start == goal {
            return false;
        }
        if !self.chart.is_open(goal) {
            debug!(?goal, "destination is not charted as open");
            return false;
        }

        let chart = &self.chart;
        let Some((path, cost)) = astar(
            &start,
            |tile| chart.neighbours(*tile),
            |tile| distance(*tile, goal),
            |tile| *tile == goal,
        ) else {
            debug!(?start, ?goal, "no charted route");
            return false;
        };

        debug!(?start, ?goal, cost, "charted route");
        self.steps.extend(path.into_iter().skip(1));
        true
    }

    fn next_step(&mut self) -> Option<TileCoord> {
        self.steps.pop_front()
    }
}

/// Chebyshev distance over the wrapping map.
fn distance(from: TileCoord, to: TileCoord) -> u32 {
    delta(from.x(), to.x())
        .unsigned_abs()
        .max(delta(from.y(), to.y()).unsigned_abs())
}
