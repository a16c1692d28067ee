//! Cloudinary upload API client
//!
//! Signed uploads: the request parameters (minus `file`, `api_key` and the
//! signature itself) are sorted, joined as `k=v&k=v`, suffixed with the API
//! secret and hashed with SHA-1.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use url::Url;

use super::MediaError;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Account credentials parsed from a `cloudinary://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn parse(cloudinary_url: &str) -> Result<Self, MediaError> {
        let invalid = || MediaError::InvalidUrl(mask(cloudinary_url));

        let url = Url::parse(cloudinary_url.trim()).map_err(|_| invalid())?;
        if url.scheme() != "cloudinary" {
            return Err(invalid());
        }

        let cloud_name = url.host_str().unwrap_or_default().to_string();
        let api_key = url.username().to_string();
        let api_secret = url.password().unwrap_or_default().to_string();

        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
        })
    }
}

/// Hides everything but the scheme and cloud name
fn mask(cloudinary_url: &str) -> String {
    match cloudinary_url.rsplit_once('@') {
        Some((_, cloud)) => format!("cloudinary://***@{}", cloud),
        None => "***".to_string(),
    }
}

/// Computes the hex SHA-1 request signature
///
/// Empty values are not signed.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub folder: String,
    pub public_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// HTTPS delivery URL
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    #[serde(default)]
    public_id: String,
    error: Option<ApiError>,
}

impl UploadResponse {
    fn into_result(self) -> Result<UploadedImage, MediaError> {
        if let Some(error) = self.error {
            return Err(MediaError::Rejected(error.message));
        }

        match self.secure_url {
            Some(url) => Ok(UploadedImage {
                url,
                public_id: self.public_id,
            }),
            None => Err(MediaError::Rejected(
                "Response carried no secure_url".to_string(),
            )),
        }
    }
}

pub struct CloudinaryClient {
    http: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
}

impl CloudinaryClient {
    pub fn new(credentials: Credentials) -> Self {
        let endpoint = format!("{}/{}/image/upload", API_BASE, credentials.cloud_name);
        Self {
            http: reqwest::Client::new(),
            credentials,
            endpoint,
        }
    }

    /// Signed parameters of an upload at `timestamp`
    fn params(&self, options: &UploadOptions, timestamp: i64) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("timestamp", timestamp.to_string());
        params.insert("folder", options.folder.clone());
        if let Some(id) = &options.public_id {
            params.insert("public_id", id.clone());
        }
        params
    }

    /// Uploads an image file
    pub async fn upload(
        &self,
        path: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedImage, MediaError> {
        let bytes = fs::read(path).map_err(|source| MediaError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let params = self.params(options, Utc::now().timestamp());
        let signature = sign(&params, &self.credentials.api_secret);

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(mime.essence_str())?,
            )
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            if !value.is_empty() {
                form = form.text(key, value);
            }
        }

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = response.json().await?;
        body.into_result()
    }
}
