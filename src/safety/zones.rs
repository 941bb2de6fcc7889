//! Declarative anatomical danger zones
//!
//! Zones are configuration data. Each one carries a region described in
//! normalized face coordinates (0-100 on both axes), so adjusting or adding a
//! zone is a catalog edit rather than a code change.

use crate::types::NormalizedPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneClassification {
    Vascular,
    Neural,
}

impl ZoneClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneClassification::Vascular => "vascular",
            ZoneClassification::Neural => "neural",
        }
    }
}

impl fmt::Display for ZoneClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open interval on one axis. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisBounds {
    /// Coordinate must be strictly greater than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<f32>,
    /// Coordinate must be strictly less than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f32>,
}

impl AxisBounds {
    pub fn below(limit: f32) -> Self {
        Self {
            above: None,
            below: Some(limit),
        }
    }

    pub fn between(above: f32, below: f32) -> Self {
        Self {
            above: Some(above),
            below: Some(below),
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        self.above.map_or(true, |a| value > a) && self.below.map_or(true, |b| value < b)
    }

    fn validate(&self, axis: &str) -> Result<(), String> {
        for bound in [self.above, self.below].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(format!("{} bound must be finite", axis));
            }
        }
        if let (Some(a), Some(b)) = (self.above, self.below) {
            if a >= b {
                return Err(format!("{} bounds are empty ({} >= {})", axis, a, b));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ZoneRegion {
    Rect {
        #[serde(default)]
        x: AxisBounds,
        #[serde(default)]
        y: AxisBounds,
    },
    /// Strict interior of an axis-aligned ellipse
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
}

impl ZoneRegion {
    pub fn contains(&self, point: NormalizedPoint) -> bool {
        match *self {
            ZoneRegion::Rect { x, y } => x.contains(point.x) && y.contains(point.y),
            ZoneRegion::Ellipse { cx, cy, rx, ry } => {
                let dx = (point.x - cx) / rx;
                let dy = (point.y - cy) / ry;
                dx * dx + dy * dy < 1.0
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ZoneRegion::Rect { x, y } => {
                x.validate("x")?;
                y.validate("y")
            }
            ZoneRegion::Ellipse { cx, cy, rx, ry } => {
                if ![cx, cy, rx, ry].iter().all(|v| v.is_finite()) {
                    return Err("ellipse parameters must be finite".to_string());
                }
                if rx <= 0.0 || ry <= 0.0 {
                    return Err("ellipse radii must be positive".to_string());
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    pub name: String,
    pub classification: ZoneClassification,
    pub region: ZoneRegion,
}

impl DangerZone {
    pub fn new(name: impl Into<String>, classification: ZoneClassification, region: ZoneRegion) -> Self {
        Self {
            name: name.into(),
            classification,
            region,
        }
    }
}

/// Read-only zone catalog, loaded once at startup
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DangerZoneCatalog {
    zones: Vec<DangerZone>,
}

impl DangerZoneCatalog {
    pub fn new(zones: Vec<DangerZone>) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &[DangerZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone whose region contains the point, in catalog order
    pub fn first_match(&self, point: NormalizedPoint) -> Option<&DangerZone> {
        self.zones.iter().find(|zone| zone.region.contains(point))
    }
}

/// Zones enforced by default
pub fn default_zones() -> Vec<DangerZone> {
    vec![
        DangerZone::new(
            "Temporal Artery",
            ZoneClassification::Vascular,
            ZoneRegion::Rect {
                x: AxisBounds::below(20.0),
                y: AxisBounds::below(30.0),
            },
        ),
        DangerZone::new(
            "Infraorbital Nerve",
            ZoneClassification::Neural,
            ZoneRegion::Rect {
                x: AxisBounds::between(30.0, 70.0),
                y: AxisBounds::between(20.0, 35.0),
            },
        ),
    ]
}
