use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Closed-bounds containment: points on the edge are inside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Rock,
    Grass,
    Tree,
    BlockingRegion,
}

/// One placed world feature.
///
/// Serialized with an internal `type` tag so the browser client can switch on
/// `obj.type` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvironmentObject {
    Rock {
        x: f32,
        y: f32,
        size: f32,
    },
    Grass {
        x: f32,
        y: f32,
        size: f32,
    },
    Tree {
        x: f32,
        y: f32,
        size: f32,
        #[serde(rename = "imageIndex")]
        image_index: u8,
    },
    BlockingRegion {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl EnvironmentObject {
    pub fn position(&self) -> (f32, f32) {
        match *self {
            EnvironmentObject::Rock { x, y, .. }
            | EnvironmentObject::Grass { x, y, .. }
            | EnvironmentObject::Tree { x, y, .. }
            | EnvironmentObject::BlockingRegion { x, y, .. } => (x, y),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            EnvironmentObject::Rock { .. } => ObjectKind::Rock,
            EnvironmentObject::Grass { .. } => ObjectKind::Grass,
            EnvironmentObject::Tree { .. } => ObjectKind::Tree,
            EnvironmentObject::BlockingRegion { .. } => ObjectKind::BlockingRegion,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, EnvironmentObject::BlockingRegion { .. })
    }

    pub fn from_region(rect: Rect) -> Self {
        EnvironmentObject::BlockingRegion {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Output of one generation pass. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentSet {
    /// Regions first, then rocks, trees and grass, in draw order.
    pub objects: Vec<EnvironmentObject>,
    /// The blocking rectangles again, for placement and spawn checks.
    pub regions: Vec<Rect>,
}

impl EnvironmentSet {
    /// Builds a set from arbitrary objects, deriving the region list.
    pub fn from_objects(objects: Vec<EnvironmentObject>) -> Self {
        let regions = objects
            .iter()
            .filter_map(|obj| match *obj {
                EnvironmentObject::BlockingRegion {
                    x,
                    y,
                    width,
                    height,
                } => Some(Rect::new(x, y, width, height)),
                _ => None,
            })
            .collect();

        Self { objects, regions }
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|obj| obj.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
