use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    analysis::{
        extract::default_schema,
        mapper::Mapper,
        schema::{Schema, validate_schema},
    },
    composition::{coder::code, model::Composition},
    director::synth::{Director, MotionIr},
    foundation::core::artifact_name,
    foundation::error::{StillmotionError, StillmotionResult},
    pipeline::{
        config::PipelineConfig,
        outcome::{
            ComponentHealth, GenerationRequest, GenerationResult, HealthReport, PipelineError,
            PipelineStats, Stage, VideoMetadata,
        },
        retry::{RetryPolicy, with_retry},
    },
    render::process::{CommandRenderer, RenderJob, Renderer, verify_output},
};

/// Sequences Mapper → Director → Coder → Renderer → Publish for one request at a time.
///
/// A `Pipeline` holds no per-request state; concurrent [`Pipeline::run`] calls are independent.
pub struct Pipeline {
    config: PipelineConfig,
    mapper: Mapper,
    director: Director,
    renderer: Arc<dyn Renderer>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        mapper: Mapper,
        renderer: Arc<dyn Renderer>,
    ) -> StillmotionResult<Self> {
        config.validate()?;
        Ok(Self {
            director: Director::new(config.director.clone()),
            config,
            mapper,
            renderer,
        })
    }

    /// Build from the environment: [`PipelineConfig::from_env`], a Gemini client when
    /// credentials are present, and [`CommandRenderer::from_env`].
    pub fn from_env() -> StillmotionResult<Self> {
        Self::new(
            PipelineConfig::from_env(),
            Mapper::from_env()?,
            Arc::new(CommandRenderer::from_env()),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for `request`. Either a complete result or a single categorized error.
    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationResult, PipelineError> {
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span = info_span!("pipeline", request_id = %request_id);
        self.run_stages(&request, &request_id).instrument(span).await
    }

    async fn run_stages(
        &self,
        request: &GenerationRequest,
        request_id: &str,
    ) -> Result<GenerationResult, PipelineError> {
        let started = tokio::time::Instant::now();
        let image = request.image_path.as_path();
        let prompt = request.prompt.as_str();

        let schema = self
            .stage(request_id, Stage::Analyze, |_| self.analyze(image))
            .await?;

        let schema = &schema;
        let ir = self
            .stage(request_id, Stage::Direct, |_| async move {
                self.direct(schema, prompt, image)
            })
            .await?;

        let ir_ref = &ir;
        let composition = self
            .stage(request_id, Stage::Compose, |_| async move { code(ir_ref) })
            .await?;

        let job = RenderJob {
            source_image: Some(image.to_path_buf()),
            output_path: self.output_path(),
            config: self.config.render.clone(),
            timeout: self.config.timeout,
            composition,
        };
        let job = &job;
        self.stage(request_id, Stage::Render, |_| self.render(job))
            .await?;

        let (url, file_size) = self
            .stage(request_id, Stage::Publish, |_| self.publish(&job.output_path))
            .await?;

        let md = &ir.timeline.metadata;
        let result = GenerationResult {
            request_id: request_id.to_string(),
            video_url: url,
            output_path: job.output_path.clone(),
            metadata: VideoMetadata {
                duration: md.duration,
                width: md.width,
                height: md.height,
                fps: md.fps,
                file_size,
            },
            processing_time_ms: started.elapsed().as_millis() as u64,
            motion_ir: Some(ir),
        };
        info!(
            video_url = %result.video_url,
            file_size,
            processing_time_ms = result.processing_time_ms,
            "generation finished"
        );
        Ok(result)
    }

    async fn stage<T, F, Fut>(
        &self,
        request_id: &str,
        stage: Stage,
        op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = StillmotionResult<T>>,
    {
        let policy = RetryPolicy::from_config(&self.config);
        match with_retry(&policy, stage.as_str(), op).await {
            Ok(value) => {
                info!(%stage, "stage complete");
                Ok(value)
            }
            Err(exhausted) => {
                let err =
                    PipelineError::new(request_id, Some(stage), exhausted.attempts, exhausted.error);
                error!(
                    %stage,
                    category = %err.category,
                    attempts = err.attempts,
                    error = %err,
                    "pipeline failed"
                );
                Err(err)
            }
        }
    }

    async fn analyze(&self, image: &Path) -> StillmotionResult<Schema> {
        match tokio::fs::metadata(image).await {
            Ok(md) if md.is_file() => {}
            _ => {
                return Err(StillmotionError::validation(format!(
                    "image '{}' not found",
                    image.display()
                )));
            }
        }
        let schema = self.mapper.map(image).await;
        let report = validate_schema(&schema);
        if !report.is_valid {
            if self.config.enable_validation {
                return Err(StillmotionError::validation(format!("schema: {report}")));
            }
            warn!(%report, "schema failed validation, continuing");
        }
        Ok(schema)
    }

    fn direct(&self, schema: &Schema, prompt: &str, image: &Path) -> StillmotionResult<MotionIr> {
        let asset = image.to_string_lossy();
        let ir = self.director.direct(schema, prompt, Some(asset.as_ref()));
        if !ir.validation.is_valid {
            if self.config.enable_validation {
                return Err(StillmotionError::validation(format!(
                    "timeline: {}",
                    ir.validation
                )));
            }
            warn!(report = %ir.validation, "timeline failed validation, continuing");
        }
        Ok(ir)
    }

    async fn render(&self, job: &RenderJob) -> StillmotionResult<()> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let video = self.renderer.render(job).await?;
        info!(renderer = self.renderer.name(), file_size = video.file_size, "video rendered");
        Ok(())
    }

    async fn publish(&self, output: &Path) -> StillmotionResult<(String, u64)> {
        let file_size = verify_output(output).await?;
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                StillmotionError::validation(format!(
                    "output path '{}' has no file name",
                    output.display()
                ))
            })?;
        let url = format!(
            "{}/{name}",
            self.config.public_base_url.trim_end_matches('/')
        );
        Ok((url, file_size))
    }

    fn output_path(&self) -> PathBuf {
        self.config.output_dir.join(artifact_name(
            "video",
            self.config.render.container.extension(),
        ))
    }

    /// Check that every component can be constructed. Does not run a generation.
    pub async fn health_check(&self) -> HealthReport {
        let mut errors = Vec::new();
        let mut components = ComponentHealth {
            mapper: true,
            ..ComponentHealth::default()
        };

        match self.config.director.validate() {
            Ok(()) => components.director = true,
            Err(e) => errors.push(format!("director: {e}")),
        }

        let coded: StillmotionResult<Composition> =
            code(&self.director.direct(&default_schema(), "", None));
        match coded {
            Ok(_) => components.coder = true,
            Err(e) => errors.push(format!("coder: {e}")),
        }

        match self.renderer.check().await {
            Ok(()) => components.renderer = true,
            Err(e) => errors.push(format!("renderer: {e}")),
        }

        let healthy = components.all();
        if !healthy {
            warn!(?errors, "health check failed");
        }
        HealthReport {
            healthy,
            components,
            errors,
        }
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.config;
        PipelineStats {
            version: env!("CARGO_PKG_VERSION").to_string(),
            stages: Stage::ALL.to_vec(),
            analysis_backend: self.mapper.client_name().map(str::to_string),
            renderer: self.renderer.name().to_string(),
            enable_validation: c.enable_validation,
            enable_fallbacks: c.enable_fallbacks,
            max_retries: c.max_retries,
            retry_base_delay_ms: c.retry_base_delay.as_millis() as u64,
            timeout_secs: c.timeout.as_secs(),
            output_dir: c.output_dir.clone(),
            public_base_url: c.public_base_url.clone(),
            render: c.render.clone(),
            director: c.director.clone(),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("mapper", &self.mapper)
            .field("renderer", &self.renderer.name())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
