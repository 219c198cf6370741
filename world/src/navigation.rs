//! Straight-line waypoint planner used when a vehicle has no chart.

use std::collections::VecDeque;

use harbor_core::{delta, PathFinder, TileCoord};

/// Walks the straight line toward the destination, one tile per step along
/// the dominant axis.
///
/// The planner never consults the map, so every destination other than the
/// starting tile is reachable. Blocking is discovered one step at a time when
/// the vehicle tries to advance. Lift stays at the starting lift, and the
/// line takes the short way around the world edge.
#[derive(Clone, Debug, Default)]
pub struct DirectPath {
    steps: VecDeque<TileCoord>,
}

impl DirectPath {
    /// Creates a planner with no pending waypoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of waypoints not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl PathFinder for DirectPath {
    fn compute_path(&mut self, from: TileCoord, to: TileCoord) -> bool {
        self.steps.clear();
        let dx = delta(from.x(), to.x());
        let dy = delta(from.y(), to.y());
        let count = dx.abs().max(dy.abs());
        if count == 0 {
            return false;
        }

        for step in 1..=count {
            self.steps.push_back(from.offset(
                scaled(dx, step, count),
                scaled(dy, step, count),
                0,
            ));
        }
        true
    }

    fn next_step(&mut self) -> Option<TileCoord> {
        self.steps.pop_front()
    }
}

/// `span * step / count`, rounded half away from zero.
fn scaled(span: i32, step: i32, count: i32) -> i32 {
    (2 * span * step + count * span.signum()) / (2 * count)
}
