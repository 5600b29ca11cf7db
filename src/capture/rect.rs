use serde::{Deserialize, Serialize};

use super::CaptureError;

/// Rectangle dragged on the selection overlay, in primary-display pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A validated selection with integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SelectionRect {
    /// Normalizes a drag from `start` to `end` in either direction.
    pub fn from_drag(start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            x: start.0.min(end.0),
            y: start.1.min(end.1),
            width: (end.0 - start.0).abs(),
            height: (end.1 - start.1).abs(),
        }
    }

    /// Floors every coordinate and rejects rectangles that would crop nothing.
    pub fn to_pixels(&self) -> Result<PixelRect, CaptureError> {
        let invalid = |reason: &str| CaptureError::InvalidSelection(format!("{reason} ({self:?})"));

        let x = floor_to_u32(self.x).ok_or_else(|| invalid("origin must be on screen"))?;
        let y = floor_to_u32(self.y).ok_or_else(|| invalid("origin must be on screen"))?;
        let width = floor_to_u32(self.width).ok_or_else(|| invalid("width must be positive"))?;
        let height = floor_to_u32(self.height).ok_or_else(|| invalid("height must be positive"))?;

        if width == 0 || height == 0 {
            return Err(invalid("selection has no area"));
        }

        Ok(PixelRect {
            x,
            y,
            width,
            height,
        })
    }
}

fn floor_to_u32(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let floored = value.floor();
    (floored <= u32::MAX as f64).then_some(floored as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> SelectionRect {
        SelectionRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn floors_fractional_coordinates() {
        assert_eq!(
            rect(10.9, 20.2, 100.7, 50.01).to_pixels().unwrap(),
            PixelRect {
                x: 10,
                y: 20,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn rejects_degenerate_and_negative_rects() {
        for bad in [
            rect(0.0, 0.0, 0.0, 10.0),
            rect(0.0, 0.0, 10.0, 0.0),
            rect(0.0, 0.0, 0.6, 10.0),
            rect(-1.0, 0.0, 10.0, 10.0),
            rect(0.0, 0.0, -5.0, 10.0),
            rect(f64::NAN, 0.0, 10.0, 10.0),
            rect(0.0, 0.0, f64::INFINITY, 10.0),
        ] {
            assert!(
                matches!(bad.to_pixels(), Err(CaptureError::InvalidSelection(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn drag_in_any_direction_normalizes() {
        assert_eq!(
            SelectionRect::from_drag((110.0, 70.0), (10.0, 20.0)),
            rect(10.0, 20.0, 100.0, 50.0)
        );
        assert_eq!(
            SelectionRect::from_drag((10.0, 20.0), (110.0, 70.0)),
            rect(10.0, 20.0, 100.0, 50.0)
        );
    }

    #[test]
    fn deserializes_overlay_payload() {
        let parsed: SelectionRect =
            serde_json::from_str(r#"{"x": 3, "y": 4.5, "width": 20, "height": 10}"#).unwrap();
        assert_eq!(parsed, rect(3.0, 4.5, 20.0, 10.0));
    }
}
