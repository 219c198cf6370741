//! Link to the external map editor.

use std::fmt;

use harbor_core::{Facing, ObjectId, TileCoord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape given to vehicles created from the editor without one.
pub const DEFAULT_BARGE_SHAPE: u16 = 961;

/// Highest lift tried when dropping a new vehicle.
pub const MAX_DROP_LIFT: i32 = 11;

/// Failures raised while exchanging vehicle data with the editor.
#[derive(Debug, Error)]
pub enum StudioError {
    /// The update could not be serialised.
    #[error("failed to encode barge update")]
    Encode(#[source] bincode::Error),
    /// The payload received from the editor is malformed.
    #[error("failed to decode barge update")]
    Decode(#[source] bincode::Error),
    /// The editor went away.
    #[error("editor link is closed")]
    Disconnected,
}

/// Vehicle description exchanged with the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BargeUpdate {
    /// Vehicle being edited, or `None` when the editor asks for a new one.
    pub barge: Option<ObjectId>,
    /// Anchor tile of the vehicle.
    pub tile: TileCoord,
    /// Shape number, or `None` for the default vehicle shape.
    pub shape: Option<u16>,
    /// Frame of the vehicle object.
    pub frame: u8,
    /// Footprint width.
    pub xtiles: u8,
    /// Footprint height.
    pub ytiles: u8,
    /// Facing.
    pub facing: Facing,
}

impl BargeUpdate {
    /// Serialises the update for the editor link.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Encode`] when serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, StudioError> {
        bincode::serialize(self).map_err(StudioError::Encode)
    }

    /// Parses an update received from the editor.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Decode`] when the payload is malformed.
    pub fn decode(payload: &[u8]) -> Result<Self, StudioError> {
        bincode::deserialize(payload).map_err(StudioError::Decode)
    }
}

/// Messages the world exchanges with a connected editor.
pub trait StudioLink: fmt::Debug {
    /// Sends the current state of a vehicle to the editor.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError`] when the update cannot be delivered.
    fn send_barge(&mut self, update: &BargeUpdate) -> Result<(), StudioError>;

    /// Asks the user to click where a new vehicle should go. Returns `None`
    /// when the user cancels.
    fn pick_tile(&mut self) -> Option<TileCoord>;

    /// Tells the editor that its request was abandoned.
    fn cancel(&mut self);

    /// Tells the editor that its request was carried out.
    fn user_responded(&mut self);
}
