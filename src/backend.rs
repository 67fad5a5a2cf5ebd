use crate::config::Config;
use crate::error::ClientError;
use crate::types::{
    AllocationsMap, AllocationsResponse, AssignResponse, HistoryRecord, ParkingSpot,
    ParkingStatusResponse, StoredPlate, StoredPlatesResponse, UploadResponse,
};
use bytes::Bytes;
use image::ImageFormat;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

/// One image picked by the operator for upload.
#[derive(Debug, Clone)]
pub struct ImageSelection {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageSelection {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        ImageSelection {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match image::guess_format(&self.bytes) {
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Gif) => "image/gif",
            Ok(ImageFormat::WebP) => "image/webp",
            Ok(ImageFormat::Bmp) => "image/bmp",
            Ok(ImageFormat::Tiff) => "image/tiff",
            Ok(format) => {
                warn!("Uploading {} as untyped {:?} data", self.file_name, format);
                "application/octet-stream"
            }
            Err(e) => {
                warn!("Unrecognised image {}: {}", self.file_name, e);
                "application/octet-stream"
            }
        }
    }
}

/// HTTP client for the recognition backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(BackendClient {
            http,
            base: config.backend_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Malformed(format!("Bad endpoint {}: {}", path, e)))
    }

    /// Camera stream; handed to the browser as-is, never fetched here.
    pub fn video_feed_url(&self) -> String {
        self.endpoint("video_feed")
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}video_feed", self.base))
    }

    pub async fn upload(&self, selection: &ImageSelection) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(selection.bytes.to_vec())
            .file_name(selection.file_name.clone())
            .mime_str(selection.mime_type())?;
        let form = Form::new().part("image", part);
        debug!(
            "Uploading {} ({} bytes)",
            selection.file_name,
            selection.bytes.len()
        );
        let response = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn allocations(&self) -> Result<AllocationsMap, ClientError> {
        let body: AllocationsResponse = self.get_json("allocations").await?;
        Ok(body.allocations)
    }

    pub async fn stored_plates(&self) -> Result<Vec<StoredPlate>, ClientError> {
        let body: StoredPlatesResponse<StoredPlate> = self.get_json("plates").await?;
        Ok(body.stored_plates)
    }

    pub async fn history(&self) -> Result<Vec<HistoryRecord>, ClientError> {
        let body: StoredPlatesResponse<HistoryRecord> = self.get_json("history").await?;
        Ok(body.stored_plates)
    }

    pub async fn parking_status(&self) -> Result<Vec<ParkingSpot>, ClientError> {
        let body: ParkingStatusResponse = self.get_json("parking-status").await?;
        Ok(body.parking_spots)
    }

    pub async fn assign_parking(&self, plate_text: &str) -> Result<AssignResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint("assign-parking")?)
            .json(&json!({ "plate_text": plate_text }))
            .send()
            .await?;
        let body: AssignResponse = read_json(response).await?;
        match body.error {
            Some(error) => Err(ClientError::Rejected { status: 200, error }),
            None => Ok(body),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.endpoint(path)?).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let error = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string));
        return Err(match error {
            Some(error) => ClientError::Rejected {
                status: status.as_u16(),
                error,
            },
            None => ClientError::Status(status.as_u16()),
        });
    }
    serde_json::from_slice(&body).map_err(|e| ClientError::Malformed(e.to_string()))
}
