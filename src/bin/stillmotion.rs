use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stillmotion::{
    CommandRenderer, Director, GenerationRequest, Mapper, MotionIr, Pipeline, PipelineConfig,
    Schema, code,
};

#[derive(Parser, Debug)]
#[command(name = "stillmotion", version, about = "Still image + prompt to motion video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and print the result as JSON.
    Generate(GenerateArgs),
    /// Analyze an image and synthesize its Motion-IR.
    Direct(DirectArgs),
    /// Turn a Motion-IR file into a renderer composition.
    Compose(ComposeArgs),
    /// Check that every pipeline component can be constructed.
    Health,
    /// Print the effective pipeline configuration.
    Stats,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Creative prompt.
    #[arg(long)]
    prompt: String,

    /// Directory receiving the video (overrides STILLMOTION_OUTPUT_DIR).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Renderer executable (overrides STILLMOTION_RENDERER_BIN).
    #[arg(long)]
    renderer: Option<String>,

    /// Report validation failures instead of failing the run.
    #[arg(long, default_value_t = false)]
    no_validation: bool,

    /// Attempts per stage.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Render deadline in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Include the Motion-IR in the printed result.
    #[arg(long, default_value_t = false)]
    include_motion_ir: bool,
}

#[derive(Parser, Debug)]
struct DirectArgs {
    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Creative prompt.
    #[arg(long)]
    prompt: String,

    /// Use this schema JSON instead of analyzing the image.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Output path; stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Motion-IR JSON written by `direct`.
    #[arg(long)]
    motion_ir: PathBuf,

    /// Output path; stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Direct(args) => cmd_direct(args).await,
        Command::Compose(args) => cmd_compose(args),
        Command::Health => cmd_health().await,
        Command::Stats => {
            let pipeline = Pipeline::from_env()?;
            println!("{}", serde_json::to_string_pretty(&pipeline.stats())?);
            Ok(())
        }
    }
}

async fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }
    if args.no_validation {
        config.enable_validation = false;
    }
    if let Some(n) = args.max_retries {
        config.max_retries = n;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }

    let mut renderer = CommandRenderer::from_env();
    if let Some(program) = args.renderer {
        renderer = renderer.with_program(program);
    }
    let pipeline = Pipeline::new(config, Mapper::from_env()?, Arc::new(renderer))
        .context("invalid pipeline configuration")?;

    match pipeline
        .run(GenerationRequest::new(args.image, args.prompt))
        .await
    {
        Ok(mut result) => {
            if !args.include_motion_ir {
                result.motion_ir = None;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            Err(e.into())
        }
    }
}

async fn cmd_direct(args: DirectArgs) -> anyhow::Result<()> {
    let schema = match &args.schema {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read schema '{}'", path.display()))?;
            Schema::from_json(&text)?
        }
        None => Mapper::from_env()?.map(&args.image).await,
    };

    let config = PipelineConfig::from_env();
    config.director.validate()?;
    let ir = Director::new(config.director).direct(
        &schema,
        &args.prompt,
        Some(args.image.to_string_lossy().as_ref()),
    );
    if !ir.validation.is_valid {
        tracing::warn!(report = %ir.validation, "generated timeline failed validation");
    }
    write_output(args.out.as_deref(), &ir.to_json_pretty()?)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.motion_ir)
        .with_context(|| format!("read motion-ir '{}'", args.motion_ir.display()))?;
    let ir = MotionIr::from_json(&text)?;
    let composition = code(&ir)?;
    write_output(args.out.as_deref(), &composition.to_json_pretty()?)
}

async fn cmd_health() -> anyhow::Result<()> {
    let pipeline = Pipeline::from_env()?;
    let report = pipeline.health_check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.healthy {
        anyhow::bail!("unhealthy: {}", report.errors.join("; "));
    }
    Ok(())
}

fn write_output(out: Option<&Path>, json: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, json).with_context(|| format!("write '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
