use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use events::{EventBus, Ui};
use orchestrator::post;
use orchestrator::{BuildEnv, Builder, ExecConnector, BUILDER_ID};
use runtime::{Driver, PodmanDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config_file;
mod render;

use config_file::FileConfig;

const DEFAULT_RUNTIME: &str = "podman";

#[derive(Parser)]
#[command(name = "podbake")]
#[command(about = "Build machine images from podman containers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a build
    Build {
        /// Path to the TOML config file
        config: PathBuf,
    },
    /// Check a config file without running anything
    Validate { config: PathBuf },
    /// Show the version of the container runtime
    Version {
        #[arg(long, default_value = DEFAULT_RUNTIME)]
        runtime: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config } => build(&config).await,
        Commands::Validate { config } => validate(&config).await,
        Commands::Version { runtime } => version(runtime).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podbake=info,orchestrator=info,runtime=info".into()),
        )
        .init();
}

async fn build(path: &Path) -> Result<()> {
    let file = FileConfig::load(path).await?;
    let (builder, _) = Builder::prepare(file.build).context("Invalid build configuration")?;

    let bus = EventBus::new();
    let ui = Ui::new(bus.clone());
    let renderer = render::spawn_renderer(&bus, BUILDER_ID);

    let binary = file
        .runtime_binary
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNTIME));
    let driver: Arc<dyn Driver> = Arc::new(PodmanDriver::with_binary(binary.clone(), ui.clone()));

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        let ui = ui.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current step");
                ui.error("Interrupted; cleaning up...");
                cancel.cancel();
            }
        }
    });

    let env = BuildEnv::new(driver.clone(), ui.clone())
        .with_hook(Arc::new(file.provision))
        .with_connector(Arc::new(ExecConnector::new(binary)))
        .with_cancel(cancel);

    let result = match builder.run(env).await.context("Build failed") {
        Ok(artifact) => {
            let processors = file.post.processors();
            post::run_all(&processors, artifact, driver.as_ref(), &ui)
                .await
                .context("Post-processing failed")
        }
        Err(e) => Err(e),
    };

    // The renderer stops once every handle on the bus is gone
    interrupt.abort();
    let _ = interrupt.await;
    drop(ui);
    drop(driver);
    drop(bus);
    let _ = renderer.await;

    let artifact = result?;
    println!();
    println!(
        "{} {}",
        format!("==> Build '{}' finished.", BUILDER_ID).green().bold(),
        artifact
    );
    for (key, value) in artifact.generated_data().iter() {
        println!("    {}: {}", key, value);
    }
    Ok(())
}

async fn validate(path: &Path) -> Result<()> {
    let file = FileConfig::load(path).await?;
    let (builder, keys) = Builder::prepare(file.build).context("Invalid build configuration")?;

    println!("{}", "The configuration is valid.".green());
    println!("  Image:      {}", builder.config().image);
    println!("  Finalize:   {}", builder.mode().as_str());
    println!("  Generated:  {}", keys.join(", "));
    Ok(())
}

async fn version(binary: PathBuf) -> Result<()> {
    let driver = PodmanDriver::with_binary(binary, Ui::default());
    driver.verify()?;
    let running = driver
        .version()
        .await
        .context("Failed to query runtime version")?;

    println!("podbake {}", env!("CARGO_PKG_VERSION"));
    println!("{} {}", driver.binary().display(), running);
    Ok(())
}
