use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spot key (`spot_<x>_<y>`) to the plate parked there, as served by `/allocations`.
pub type AllocationsMap = BTreeMap<String, String>;

/// A plate the backend read off an uploaded image. `image` is base-64 JPEG.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DetectedPlate {
    pub text: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Entry,
    Exit,
}

/// Entry/exit event derived by the backend for one upload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Notification {
    pub plate: String,
    pub status: PresenceStatus,
    #[serde(default)]
    pub duration: Option<String>,
}

impl Notification {
    pub fn message(&self) -> String {
        match self.status {
            PresenceStatus::Entry => format!("Plate {} has entered", self.plate),
            PresenceStatus::Exit => format!(
                "Plate {} has exited after {}",
                self.plate,
                self.duration.as_deref().unwrap_or("unknown duration")
            ),
        }
    }
}

/// Spot coordinates exactly as the upload and assignment endpoints send them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Coordinates {
    Rect([f64; 4]),
    Point { x: f64, y: f64 },
}

/// Allocation record on the wire. Converted to [`Allocation`] as soon as it is received.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AllocationRecord {
    #[serde(default)]
    pub plate_text: String,
    #[serde(default, alias = "spot")]
    pub spot_id: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotPosition {
    pub x: f64,
    pub y: f64,
    /// Width and height, when the source reported a rectangle.
    pub size: Option<(f64, f64)>,
}

/// A plate parked in a spot, whichever endpoint reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub plate_text: String,
    pub spot_id: String,
    pub position: SpotPosition,
    pub image: Option<String>,
}

impl From<AllocationRecord> for Allocation {
    fn from(record: AllocationRecord) -> Self {
        let position = match record.coordinates {
            Coordinates::Rect([x, y, w, h]) => SpotPosition {
                x,
                y,
                size: Some((w, h)),
            },
            Coordinates::Point { x, y } => SpotPosition { x, y, size: None },
        };
        Allocation {
            plate_text: record.plate_text,
            spot_id: record.spot_id,
            position,
            image: record.image,
        }
    }
}

impl Allocation {
    /// Builds an allocation from a `spot_<x>_<y>` key. Returns `None` for any other key.
    pub fn from_spot_key(key: &str, plate_text: &str) -> Option<Allocation> {
        let mut fields = key.split('_');
        if fields.next()? != "spot" {
            return None;
        }
        let x = parse_pixel(fields.next()?)?;
        let y = parse_pixel(fields.next()?)?;
        if fields.next().is_some() {
            return None;
        }
        Some(Allocation {
            plate_text: plate_text.to_string(),
            spot_id: key.to_string(),
            position: SpotPosition { x, y, size: None },
            image: None,
        })
    }
}

fn parse_pixel(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParkingSpot {
    #[serde(alias = "id")]
    pub spot_id: String,
    pub status: String,
    #[serde(default)]
    pub assigned_plate: Option<String>,
}

/// Stored plate as listed by `/plates`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredPlate {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub parking_spot: Option<String>,
    /// Shown as-is; the listing never places it, so any shape is accepted.
    #[serde(default)]
    pub spot_coordinates: Option<serde_json::Value>,
}

/// Entry/exit log entry as listed by `/history`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryRecord {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub plates: Vec<DetectedPlate>,
    #[serde(default)]
    pub allocations: Vec<AllocationRecord>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AllocationsResponse {
    #[serde(default)]
    pub allocations: AllocationsMap,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredPlatesResponse<T> {
    #[serde(default = "Vec::new")]
    pub stored_plates: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParkingStatusResponse {
    #[serde(default)]
    pub parking_spots: Vec<ParkingSpot>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AssignResponse {
    #[serde(default)]
    pub assigned_spot: Option<AllocationRecord>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
