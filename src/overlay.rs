use crate::types::{Allocation, AllocationsMap};
use log::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// Markers to draw over the camera feed. An empty overlay shows the "no allocations" indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub markers: Vec<Marker>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Places one marker per `spot_<x>_<y>` key. Malformed keys are skipped.
pub fn layout(allocations: &AllocationsMap) -> Overlay {
    let markers = allocations
        .iter()
        .filter_map(|(key, plate)| match Allocation::from_spot_key(key, plate) {
            Some(allocation) => Some(Marker {
                x: allocation.position.x,
                y: allocation.position.y,
                label: allocation.plate_text,
            }),
            None => {
                warn!("Skipping allocation with malformed spot key {:?}", key);
                None
            }
        })
        .collect();
    Overlay { markers }
}
