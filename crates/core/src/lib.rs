pub mod config;
pub mod converter;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DeliveryMode,
    PipelineConfig, SanitizedConfig, ServerConfig, StorageConfig,
};
pub use converter::{
    ConversionJob, ConversionResult, ConversionTarget, Converter, ConverterConfig,
    ConverterError, FfmpegConverter, PreviewFormat,
};
pub use media::content_type_for;
pub use pipeline::{
    PipelineError, PipelineOutput, PipelineStage, RequestState, RequestTrace, TranscodePipeline,
};
pub use registry::{ArtifactRegistry, RegistryError};
pub use storage::{cleanup, ArtifactSet, IngestedFile, ScratchDir, StorageError};
