use serde::{Deserialize, Serialize};

use super::pin::check_normalised;
use super::{Payload, RecordKind};
use crate::error::{ShiftboardError, ShiftboardResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A freehand polyline. Immutable once drawn; erase and redraw instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
}

impl Payload for Stroke {
    const KIND: RecordKind = RecordKind::Stroke;
    const DEFAULT_COLLECTION: &'static str = "map_strokes";
    const PARTITION_FIELD: &'static str = "map";

    fn validate(&self) -> ShiftboardResult<()> {
        if self.points.is_empty() {
            return Err(ShiftboardError::InvalidInput("stroke has no points".into()));
        }
        for point in &self.points {
            check_normalised("x", point.x)?;
            check_normalised("y", point.y)?;
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(ShiftboardError::InvalidInput(format!(
                "stroke width {} must be positive",
                self.width
            )));
        }
        Ok(())
    }
}
