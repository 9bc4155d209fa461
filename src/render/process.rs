use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{
    composition::model::Composition, foundation::core::artifact_name,
    render::config::RenderConfig,
};

/// Default renderer executable, looked up on `PATH`.
pub const DEFAULT_RENDERER_BIN: &str = "stillmotion-render";

const STDERR_TAIL_LINES: usize = 40;

/// Renderer failures. "The process failed" and "the process succeeded without a usable file"
/// are distinct variants.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("renderer binary '{0}' not found")]
    BinaryNotFound(String),

    #[error("failed to run renderer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("composition artifact: {0}")]
    Artifact(String),

    #[error("renderer exited with {}: {stderr}", exit_label(*.code))]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("renderer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("renderer reported success but '{}' does not exist", .0.display())]
    MissingOutput(PathBuf),

    #[error("renderer reported success but '{}' is empty", .0.display())]
    EmptyOutput(PathBuf),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// One render request.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub composition: Composition,
    /// Source image the composition animates.
    pub source_image: Option<PathBuf>,
    /// Where the video must be written.
    pub output_path: PathBuf,
    pub config: RenderConfig,
    /// Hard deadline; the process is killed when it expires.
    pub timeout: Duration,
}

/// A finished render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub file_size: u64,
}

/// External engine turning a [`Composition`] into a video file.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap availability probe used by health checks.
    async fn check(&self) -> Result<(), RenderError>;

    async fn render(&self, job: &RenderJob) -> Result<RenderedVideo, RenderError>;
}

/// Runs an external renderer executable as a cancellable child process.
///
/// The composition is written to a uniquely named JSON artifact in `work_dir` and passed as
/// `--composition <file>` after `base_args`.
#[derive(Clone, Debug)]
pub struct CommandRenderer {
    program: String,
    base_args: Vec<String>,
    work_dir: PathBuf,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: vec!["render".to_string()],
            work_dir: std::env::temp_dir().join("stillmotion"),
        }
    }

    /// Read `STILLMOTION_RENDERER_BIN` and `STILLMOTION_WORK_DIR`.
    pub fn from_env() -> Self {
        let mut r = Self::new(
            std::env::var("STILLMOTION_RENDERER_BIN")
                .unwrap_or_else(|_| DEFAULT_RENDERER_BIN.to_string()),
        );
        if let Ok(dir) = std::env::var("STILLMOTION_WORK_DIR") {
            r.work_dir = PathBuf::from(dir);
        }
        r
    }

    /// Replace the arguments placed before the generated flags.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolve(&self) -> Result<PathBuf, RenderError> {
        which::which(&self.program).map_err(|_| RenderError::BinaryNotFound(self.program.clone()))
    }

    /// Full argument list for `job` with the composition at `artifact`.
    pub fn build_args(&self, job: &RenderJob, artifact: &Path) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend([
            "--composition".to_string(),
            artifact.to_string_lossy().to_string(),
            "--output".to_string(),
            job.output_path.to_string_lossy().to_string(),
            "--codec".to_string(),
            job.config.codec.to_string(),
            "--crf".to_string(),
            job.config.crf.to_string(),
            "--pixel-format".to_string(),
            job.config.pixel_format.clone(),
            "--concurrency".to_string(),
            job.config.concurrency.to_string(),
        ]);
        if let Some(image) = &job.source_image {
            args.push("--image".to_string());
            args.push(image.to_string_lossy().to_string());
        }
        args
    }

    async fn write_artifact(&self, composition: &Composition) -> Result<PathBuf, RenderError> {
        tokio::fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            RenderError::Artifact(format!("create '{}': {e}", self.work_dir.display()))
        })?;
        let path = self.work_dir.join(artifact_name(&composition.id, "json"));
        let json = composition
            .to_json_pretty()
            .map_err(|e| RenderError::Artifact(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| RenderError::Artifact(format!("write '{}': {e}", path.display())))?;
        Ok(path)
    }

    async fn run(&self, binary: &Path, job: &RenderJob, artifact: &Path) -> Result<(), RenderError> {
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(RenderError::Spawn)?;
        }
        let args = self.build_args(job, artifact);
        debug!(program = %binary.display(), args = %args.join(" "), "spawning renderer");

        let deadline = Instant::now() + job.timeout;
        let mut command = Command::new(binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Helpers the renderer forks join its group so a deadline kill reaches them too.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(RenderError::Spawn)?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::Spawn(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::Spawn(std::io::Error::other("stderr not captured")))?;
        let mut stdout_task = tokio::spawn(drain_lines(stdout, "stdout", 0));
        let mut stderr_task = tokio::spawn(drain_lines(stderr, "stderr", STDERR_TAIL_LINES));

        // The pipes close only when every holder exits, so draining shares the deadline.
        let supervised = async {
            let status = child.wait().await.map_err(RenderError::Spawn)?;
            let _ = (&mut stdout_task).await;
            let tail = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, RenderError>((status, tail))
        };
        let outcome = tokio::time::timeout_at(deadline, supervised).await;

        let (status, tail) = match outcome {
            Ok(finished) => finished?,
            Err(_) => {
                warn!(timeout = ?job.timeout, "renderer timed out, killing process group");
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "renderer already exited");
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(RenderError::TimedOut(job.timeout));
            }
        };

        if !status.success() {
            return Err(RenderError::ProcessFailed {
                code: status.code(),
                stderr: tail.join("\n"),
            });
        }
        Ok(())
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!(pgid, error = %e, "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Log every line of a child stream; keep the last `keep` lines.
async fn drain_lines<R>(reader: R, stream: &'static str, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::with_capacity(keep);
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }
        debug!(stream, "{line}");
        if keep > 0 {
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
    tail.into()
}

/// Size of the produced file, rejecting missing and empty outputs.
pub async fn verify_output(path: &Path) -> Result<u64, RenderError> {
    match tokio::fs::metadata(path).await {
        Ok(md) if md.is_file() && md.len() > 0 => Ok(md.len()),
        Ok(md) if md.is_file() => Err(RenderError::EmptyOutput(path.to_path_buf())),
        _ => Err(RenderError::MissingOutput(path.to_path_buf())),
    }
}

#[async_trait::async_trait]
impl Renderer for CommandRenderer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn check(&self) -> Result<(), RenderError> {
        self.resolve().map(|_| ())
    }

    #[instrument(skip_all, fields(composition = %job.composition.id, output = %job.output_path.display()))]
    async fn render(&self, job: &RenderJob) -> Result<RenderedVideo, RenderError> {
        let binary = self.resolve()?;
        let artifact = self.write_artifact(&job.composition).await?;

        let result = self.run(&binary, job, &artifact).await;
        if let Err(e) = tokio::fs::remove_file(&artifact).await {
            warn!(artifact = %artifact.display(), error = %e, "failed to remove composition artifact");
        }
        result?;

        let file_size = verify_output(&job.output_path).await?;
        info!(file_size, "render finished");
        Ok(RenderedVideo {
            path: job.output_path.clone(),
            file_size,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/process.rs"]
mod tests;
