//! Blocking client for the DashScope text-to-image API.
//!
//! One synchronous call turns a prompt into an image URL; [`download`] then
//! fetches that URL to disk. Model behaviour is entirely the service's
//! business, this module only shapes the request and reads the answer.

use crate::{Error, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default service endpoint
pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";
/// Default model
pub const DEFAULT_MODEL: &str = "wan2.6-t2i";
/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "BAILIAN_KEY";

/// Sizes the service is tuned for, as `(width, height)`
pub const RECOMMENDED_SIZES: [(u32, u32); 8] = [
    (1024, 1024),
    (720, 1280),
    (1280, 720),
    (1280, 1280),
    (1104, 1472),
    (1472, 1104),
    (960, 1696),
    (1696, 960),
];

/// Output size in pixels, written `W*H` on the wire and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self { width: 1280, height: 1280 }
    }
}

impl ImageSize {
    pub fn is_recommended(&self) -> bool {
        RECOMMENDED_SIZES.contains(&(self.width, self.height))
    }

    pub fn recommended_list() -> String {
        RECOMMENDED_SIZES
            .iter()
            .map(|(w, h)| format!("{}*{}", w, h))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("size must look like WIDTH*HEIGHT, got '{}'", s));
        let (w, h) = s.trim().split_once('*').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ImageGenConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// Timeout for the generation call and the download, in milliseconds
    pub timeout_ms: u64,
}

impl ImageGenConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout_ms: 300_000,
        }
    }

    /// Build a config from `BAILIAN_KEY`
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(Error::ConfigError(format!(
                "environment variable {} is not set\nSet it with: export {}='your_api_key'",
                API_KEY_ENV, API_KEY_ENV
            ))),
        }
    }
}

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }
}

// Request and response bodies of the generation endpoint

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: ApiInput<'a>,
    parameters: ApiParameters,
}

#[derive(Debug, Serialize)]
struct ApiInput<'a> {
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: Vec<ApiText<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiText<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiParameters {
    negative_prompt: String,
    prompt_extend: bool,
    watermark: bool,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    output: Option<ApiOutput>,
}

#[derive(Debug, Deserialize)]
struct ApiOutput {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Vec<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn build_body<'a>(model: &'a str, request: &'a GenerationRequest) -> ApiRequest<'a> {
    ApiRequest {
        model,
        input: ApiInput {
            messages: vec![ApiMessage {
                role: "user",
                content: vec![ApiText { text: &request.prompt }],
            }],
        },
        parameters: ApiParameters {
            negative_prompt: String::new(),
            prompt_extend: true,
            watermark: false,
            n: 1,
            size: request.size.to_string(),
        },
    }
}

fn first_image_url(response: ApiResponse) -> Option<String> {
    response
        .output?
        .choices
        .into_iter()
        .next()?
        .message
        .content
        .into_iter()
        .find_map(|c| c.image)
}

/// Blocking text-to-image client
pub struct ImageGenClient {
    client: Client,
    config: ImageGenConfig,
    endpoint: Url,
}

impl ImageGenClient {
    pub fn new(config: ImageGenConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::ConfigError(format!("invalid endpoint '{}': {}", config.endpoint, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config, endpoint })
    }

    /// Ask the service for one image and return its URL
    pub fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if !request.size.is_recommended() {
            warn!(
                "size {} is not a recommended size (supported: {})",
                request.size,
                ImageSize::recommended_list()
            );
        }

        let body = build_body(&self.config.model, request);
        debug!("POST {} model={} size={}", self.endpoint, self.config.model, request.size);

        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()?;

        let status = res.status();
        let text = res.text()?;

        if !status.is_success() {
            let err: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(Error::Api {
                code: err.code.unwrap_or_else(|| status.as_u16().to_string()),
                message: err
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Other(format!("Unexpected response body: {}", e)))?;
        first_image_url(parsed).ok_or(Error::EmptyResponse)
    }

    /// Fetch `image_url` into `output`, creating parent directories. Returns
    /// the number of bytes written.
    pub fn download(&self, image_url: &str, output: &Path) -> Result<u64> {
        download(&self.client, image_url, output)
    }
}

/// Fetch `image_url` with `client` and write the body to `output`
pub fn download(client: &Client, image_url: &str, output: &Path) -> Result<u64> {
    let url = Url::parse(image_url)
        .map_err(|e| Error::InvalidInput(format!("invalid image URL '{}': {}", image_url, e)))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let res = client.get(url).send()?;
    if !res.status().is_success() {
        return Err(Error::NetworkError(format!(
            "download failed with HTTP {}",
            res.status()
        )));
    }
    let bytes = res.bytes()?;
    fs::write(output, &bytes).map_err(|e| Error::io(output, e))?;
    Ok(bytes.len() as u64)
}

/// Shorten `prompt` to `max` characters for display, appending `...` when cut
pub fn preview(prompt: &str, max: usize) -> String {
    match prompt.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}
