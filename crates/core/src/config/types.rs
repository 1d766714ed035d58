use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::converter::{ConverterConfig, PreviewFormat};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served verbatim at the web root, if any.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Largest accepted request body for uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024 // 1 GiB
}

/// Scratch storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding uploads and conversion outputs.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("previewer")
}

/// How a finished preview reaches the client.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The upload response body is the preview itself.
    #[default]
    Inline,
    /// The upload response is JSON pointing at `/stream/{fileName}`.
    Url,
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: DeliveryMode,
    /// Overrides the preview format implied by `mode`.
    #[serde(default)]
    pub preview_format: Option<PreviewFormat>,
}

impl PipelineConfig {
    /// Preview format in effect: the configured one, else WebP for inline
    /// delivery and WebM for URL delivery.
    pub fn effective_preview_format(&self) -> PreviewFormat {
        self.preview_format.unwrap_or(match self.mode {
            DeliveryMode::Inline => PreviewFormat::WebP,
            DeliveryMode::Url => PreviewFormat::WebM,
        })
    }
}

/// Sanitized config for API responses (tool paths and arguments hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub pipeline: SanitizedPipelineConfig,
    pub converter: SanitizedConverterConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub serves_static: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPipelineConfig {
    pub mode: DeliveryMode,
    pub preview_format: PreviewFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConverterConfig {
    pub timeout_secs: u64,
    pub max_parallel_conversions: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                host: config.server.host,
                port: config.server.port,
                max_upload_bytes: config.server.max_upload_bytes,
                serves_static: config.server.static_dir.is_some(),
            },
            pipeline: SanitizedPipelineConfig {
                mode: config.pipeline.mode,
                preview_format: config.pipeline.effective_preview_format(),
            },
            converter: SanitizedConverterConfig {
                timeout_secs: config.converter.timeout_secs,
                max_parallel_conversions: config.converter.max_parallel_conversions,
            },
        }
    }
}
