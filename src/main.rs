use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gapwatch::config::{JobConfig, PipelineConfig, ResultPattern};
use gapwatch::orchestrator::Orchestrator;
use gapwatch::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "gapwatch")]
#[command(version)]
#[command(about = "Watches a job records file and republishes gap analysis results on change")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Watch the input file and run the pipeline on every settled change
    Watch(PipelineArgs),

    /// Run a single pipeline cycle immediately, without watching
    Once {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output format for the cycle outcome
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Pipeline Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct PipelineArgs {
    /// Load the full pipeline configuration from a JSON file
    /// (all other flags are ignored when this is set)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record file whose changes trigger analysis runs
    #[arg(long, default_value = "data/jobs.json")]
    input: PathBuf,

    /// Directory the analysis job runs in and writes result files to
    #[arg(long, default_value = ".")]
    working_dir: PathBuf,

    /// Directory consumers poll for the published artifact
    #[arg(long, default_value = "public")]
    publish_dir: PathBuf,

    /// File name of the published artifact inside the publish directory
    #[arg(long, default_value = "gap_analysis.json")]
    artifact: String,

    /// Prefix of candidate result file names
    #[arg(long, default_value = "gap_analysis_")]
    result_prefix: String,

    /// Extension of candidate result file names (without the dot)
    #[arg(long, default_value = "json")]
    result_extension: String,

    /// Quiet period in milliseconds before a change counts as settled
    #[arg(long, default_value = "2000")]
    stability_ms: u64,

    /// Interval in milliseconds between stability probes
    #[arg(long, default_value = "100")]
    recheck_ms: u64,

    /// Program that runs the analysis
    #[arg(long, default_value = "python")]
    job_command: String,

    /// Argument passed to the analysis program (repeatable)
    #[arg(long = "job-arg", default_value = "main.py")]
    job_args: Vec<String>,
}

impl PipelineArgs {
    fn into_config(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        if let Some(path) = self.config {
            return Ok(PipelineConfig::load(&path)?);
        }

        let config = PipelineConfig {
            watched_input: self.input,
            working_dir: self.working_dir,
            publish_dir: self.publish_dir,
            artifact_name: self.artifact,
            pattern: ResultPattern {
                prefix: self.result_prefix,
                extension: self.result_extension,
            },
            stability_window_ms: self.stability_ms,
            recheck_interval_ms: self.recheck_ms,
            job: JobConfig {
                command: self.job_command,
                args: self.job_args,
                ..JobConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn run_watch(args: PipelineArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let config = args.into_config()?;
    let shutdown = install_shutdown_handler();
    Orchestrator::new(config).run(shutdown).await?;
    Ok(())
}

async fn run_once(args: PipelineArgs, output: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let config = args.into_config()?;
    let orchestrator = Orchestrator::new(config);
    let outcome = orchestrator.run_once().await?;

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Table => {
            println!("Run ID:       {}", outcome.run_id);
            println!("Status:       {}", outcome.status);
            match outcome.exit_code {
                Some(code) => println!("Exit code:    {}", code),
                None => println!("Exit code:    -"),
            }
            println!("Job duration: {} ms", outcome.job_duration_ms);
            match outcome.published {
                Some(path) => println!("Published:    {}", path.display()),
                None => println!("Published:    -"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Watch(pipeline) => {
            run_watch(pipeline).await?;
        }
        Commands::Once { pipeline, output } => {
            run_once(pipeline, output).await?;
        }
    }

    Ok(())
}
