use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use framemark::{
    Config,
    startup_checks::{self, StartupCheckError},
    watermark::{
        self, BatchDriver, Compositor, RecolorOptions, RenderRequest, RgbaColor,
        TemplateRegistry, batch::requests_for,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

/// Per-request border overrides shared by render and preview.
#[derive(clap::Args, Debug)]
struct Overrides {
    /// Border color as R,G,B,A
    #[arg(long)]
    border_color: Option<String>,

    /// Keep only the bottom border
    #[arg(long)]
    only_bottom: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark one photo
    Render {
        /// Template id
        #[arg(short, long)]
        template: String,
        source: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Replace a metadata field, e.g. --text Model="My Camera"
        #[arg(long = "text", value_parser = parse_key_value)]
        texts: Vec<(String, String)>,
    },

    /// Render into the preview directory under the source's file name
    Preview {
        source: PathBuf,
        /// Template id; defaults to the first configured template
        #[arg(short, long)]
        template: Option<String>,
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Write reduced-size copies into the small preview directory
    Thumbnail {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        #[arg(long)]
        divisor: Option<u32>,
    },

    /// Watermark every JPEG and PNG under the given files and directories
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Template id; defaults to the first configured template
        #[arg(short, long)]
        template: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List the configured templates
    Templates,

    /// Swap one color of a logo for another
    Recolor {
        source: PathBuf,
        output: PathBuf,
        /// Color to replace, as R,G,B,A
        #[arg(long)]
        old: String,
        /// Replacement color, as R,G,B,A
        #[arg(long)]
        new: String,
        #[arg(long, default_value_t = 30)]
        tolerance: u8,
        #[arg(long, default_value_t = 2)]
        anti_alias: u32,
    },

    /// Run the startup checks and exit
    Check,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))
}

impl Overrides {
    fn apply(&self, request: &mut RenderRequest) -> Result<(), Box<dyn std::error::Error>> {
        request.border_color = self
            .border_color
            .as_deref()
            .map(str::parse::<RgbaColor>)
            .transpose()?;
        if self.only_bottom {
            request.only_bottom_border = Some(true);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;
    info!("{} using configuration {:?}", config.app.name, cli.config);

    match cli.command {
        Commands::Render {
            template,
            source,
            output,
            overrides,
            texts,
        } => {
            let mut request = RenderRequest::new(source, output, template);
            overrides.apply(&mut request)?;
            request.text_overrides = texts.into_iter().collect();
            render_one(&config, request).await
        }
        Commands::Preview {
            source,
            template,
            overrides,
        } => {
            let compositor = prepare(&config).await?;
            let template = pick_template(&compositor, template)?;
            let mut request =
                RenderRequest::preview(source, &config.paths.preview_directory, template)?;
            overrides.apply(&mut request)?;
            run_render(compositor, request).await
        }
        Commands::Thumbnail { sources, divisor } => {
            let compositor = Arc::new(watermark::compositor_from_config(&config)?);
            let divisor = divisor.unwrap_or(config.output.small_preview_divisor);
            for source in sources {
                let file_name = source
                    .file_name()
                    .ok_or("source path has no file name")?
                    .to_owned();
                let target = config.paths.small_preview_directory.join(file_name);
                let compositor = compositor.clone();
                let written = tokio::task::spawn_blocking(move || {
                    compositor.small_preview(&source, &target, divisor)
                })
                .await??;
                println!("{}", written.display());
            }
            Ok(())
        }
        Commands::Batch {
            inputs,
            template,
            output_dir,
            workers,
        } => {
            let compositor = prepare(&config).await?;
            let template = pick_template(&compositor, template)?;
            let sources = watermark::collect_images(&inputs);
            if sources.is_empty() {
                return Err("no JPEG or PNG files found in the given inputs".into());
            }
            let output_dir = output_dir.unwrap_or_else(|| config.paths.output_directory.clone());
            let requests = requests_for(&sources, &output_dir, &template)?;

            let driver = BatchDriver::new(
                Arc::new(compositor),
                workers.unwrap_or(config.batch.max_workers),
            );
            let report = driver.run(requests).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            println!(
                "{} succeeded, {} failed in {:.2}s",
                report.succeeded,
                report.failed,
                report.elapsed.as_secs_f64()
            );
            if report.failed > 0 {
                return Err(format!(
                    "{} of {} images failed",
                    report.failed,
                    report.results.len()
                )
                .into());
            }
            Ok(())
        }
        Commands::Templates => {
            let registry = TemplateRegistry::from_file(&config.paths.templates_file)?;
            println!("{}", serde_json::to_string_pretty(&registry.summaries())?);
            Ok(())
        }
        Commands::Recolor {
            source,
            output,
            old,
            new,
            tolerance,
            anti_alias,
        } => {
            let mut options = RecolorOptions::new(old.parse()?, new.parse()?);
            options.tolerance = tolerance;
            options.anti_alias = anti_alias;
            watermark::recolor_file(&source, &output, &options)?;
            Ok(())
        }
        Commands::Check => match startup_checks::perform_startup_checks(&config).await {
            Ok(()) => Ok(()),
            Err(errors) => {
                for error in &errors {
                    tracing::error!("Startup check failed: {}", error);
                }
                Err(format!("{} startup checks failed", errors.len()).into())
            }
        },
    }
}

/// Run the startup checks, then build the compositor. Only a missing
/// templates file stops the command.
async fn prepare(config: &Config) -> Result<Compositor, Box<dyn std::error::Error>> {
    if let Err(errors) = startup_checks::perform_startup_checks(config).await {
        for error in &errors {
            tracing::warn!("Startup check failed: {}", error);
        }
        let critical = errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::TemplatesFileMissing(_)));
        if critical {
            tracing::error!("Critical startup check failed, exiting");
            return Err("Critical startup check failed".into());
        }
        tracing::warn!("Non-critical startup checks failed, continuing");
    }
    Ok(watermark::compositor_from_config(config)?)
}

fn pick_template(
    compositor: &Compositor,
    template: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match template {
        Some(id) => Ok(id),
        None => compositor
            .registry()
            .list()
            .first()
            .map(|t| t.id.clone())
            .ok_or_else(|| "no templates configured".into()),
    }
}

async fn render_one(
    config: &Config,
    request: RenderRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let compositor = prepare(config).await?;
    run_render(compositor, request).await
}

async fn run_render(
    compositor: Compositor,
    request: RenderRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = tokio::task::spawn_blocking(move || compositor.render(&request)).await?;
    println!("{}", serde_json::to_string_pretty(&result.to_map())?);
    match result.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
