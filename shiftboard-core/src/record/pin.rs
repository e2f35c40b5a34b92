use serde::{Deserialize, Serialize};

use super::{Mutable, Payload, RecordKind};
use crate::error::{ShiftboardError, ShiftboardResult};

/// A draggable icon on a map. Position is normalised to the image size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    #[serde(rename = "type")]
    pub icon: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// In-place change to a pin's position or display size.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PinPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

impl PinPatch {
    pub fn position(x: f64, y: f64) -> Self {
        PinPatch {
            x: Some(x),
            y: Some(y),
            size: None,
        }
    }

    pub fn size(size: f64) -> Self {
        PinPatch {
            size: Some(size),
            ..Default::default()
        }
    }
}

pub(crate) fn check_normalised(what: &str, value: f64) -> ShiftboardResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ShiftboardError::InvalidInput(format!(
            "{what} {value} is outside 0..1"
        )))
    }
}

impl Payload for Pin {
    const KIND: RecordKind = RecordKind::Pin;
    const DEFAULT_COLLECTION: &'static str = "map_pins";
    const PARTITION_FIELD: &'static str = "map";

    fn validate(&self) -> ShiftboardResult<()> {
        if self.icon.trim().is_empty() {
            return Err(ShiftboardError::InvalidInput("pin needs an icon type".into()));
        }
        check_normalised("x", self.x)?;
        check_normalised("y", self.y)?;
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ShiftboardError::InvalidInput(format!(
                "pin size {} must be positive",
                self.size
            )));
        }
        Ok(())
    }
}

impl Mutable for Pin {
    type Patch = PinPatch;

    fn apply(&mut self, patch: &PinPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
    }
}
