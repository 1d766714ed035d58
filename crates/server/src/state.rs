use previewer_core::{
    ArtifactRegistry, Config, DeliveryMode, SanitizedConfig, ScratchDir, TranscodePipeline,
};

/// Shared application state
pub struct AppState {
    config: Config,
    scratch: ScratchDir,
    pipeline: TranscodePipeline,
    registry: ArtifactRegistry,
}

impl AppState {
    /// Builds the state around an already constructed pipeline.
    ///
    /// Uploads and conversion outputs live in `config.storage.scratch_dir`,
    /// which is also the only directory previews are served from.
    pub fn new(config: Config, pipeline: TranscodePipeline) -> Self {
        let scratch = ScratchDir::new(&config.storage.scratch_dir);
        let registry = ArtifactRegistry::new(&config.storage.scratch_dir);
        Self {
            config,
            scratch,
            pipeline,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn mode(&self) -> DeliveryMode {
        self.config.pipeline.mode
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    pub fn pipeline(&self) -> &TranscodePipeline {
        &self.pipeline
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }
}
