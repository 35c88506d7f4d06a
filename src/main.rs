/// Stratus command line
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stratus::aws::FunctionArtifact;
use stratus::config::StackConfig;
use stratus::engine::{Operation, PulumiEngine};
use stratus::handler::HandlerVariant;
use stratus::scenario::Scenario;
use stratus::utils::polling::PollingConfig;
use stratus::{gcp, render, serve, smoke};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Declare cloud stacks and apply them with Pulumi", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "stratus.yaml")]
    config: PathBuf,

    /// Output directory for rendered programs
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init {
        /// Pin a freshly generated cluster name suffix in the config
        #[arg(long)]
        pin_suffix: bool,
    },

    /// Render a scenario to a Pulumi YAML program
    Render { scenario: Scenario },

    /// Show what the engine would change
    Preview { scenario: Scenario },

    /// Create or update the declared resources
    Up { scenario: Scenario },

    /// Tear down the declared resources
    Destroy { scenario: Scenario },

    /// Print the values a deployed scenario exports
    Outputs { scenario: Scenario },

    /// Run the function handler once and print its response
    Invoke {
        /// Handler to run (defaults to the configured one)
        #[arg(long, value_enum)]
        variant: Option<HandlerVariant>,
    },

    /// Serve the API locally
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Handler to run (defaults to the configured one)
        #[arg(long, value_enum)]
        variant: Option<HandlerVariant>,
    },

    /// Check the deployed API answers on /source
    Smoke {
        /// Base URL (defaults to the deployed stack's `url` output)
        #[arg(long)]
        url: Option<String>,

        /// Seconds to keep retrying
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stratus={},tower_http={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Init { pin_suffix } => init_config(&cli, pin_suffix).await,
        Commands::Render { scenario } => render_scenario(&cli, scenario).await.map(|_| ()),
        Commands::Preview { scenario } => run_engine(&cli, scenario, Operation::Preview).await,
        Commands::Up { scenario } => run_engine(&cli, scenario, Operation::Up).await,
        Commands::Destroy { scenario } => run_engine(&cli, scenario, Operation::Destroy).await,
        Commands::Outputs { scenario } => show_outputs(&cli, scenario).await,
        Commands::Invoke { variant } => invoke_handler(&cli, variant),
        Commands::Serve { addr, variant } => serve_locally(&cli, addr, variant).await,
        Commands::Smoke { ref url, timeout } => smoke_check(&cli, url.clone(), timeout).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Directory relative config paths are anchored at
fn config_dir(config_path: &Path) -> Result<PathBuf> {
    match config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Load configuration with paths anchored at the config file's directory
fn load_config(cli: &Cli) -> Result<StackConfig> {
    let mut config =
        StackConfig::from_file(&cli.config).context("Failed to load configuration")?;
    config.resolve_paths(&config_dir(&cli.config)?);
    Ok(config)
}

/// Function archive declared by the api scenario, buildable from the config's project
fn function_artifact(cli: &Cli, config: &StackConfig) -> Result<FunctionArtifact> {
    Ok(FunctionArtifact::new(
        config.api.artifact.clone(),
        config_dir(&cli.config)?,
    ))
}

fn program_dir(cli: &Cli, scenario: Scenario) -> PathBuf {
    cli.output.join(scenario.dir_name())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli, pin_suffix: bool) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let mut example_config = StackConfig::example();
    if pin_suffix {
        let suffix = gcp::naming::generate_suffix();
        info!(
            "Pinned cluster name: {}",
            gcp::naming::derive_cluster_name(&suffix)?
        );
        example_config.cluster.suffix = Some(suffix);
    }
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your requirements");
    info!("  2. Set your GCP project for the cluster scenario:");
    info!("     export GOOGLE_CLOUD_PROJECT=your-project-id");
    info!("  3. Render and apply a scenario:");
    info!("     stratus up api");

    Ok(())
}

/// Render one scenario's program to the output directory
async fn render_scenario(cli: &Cli, scenario: Scenario) -> Result<render::RenderedProgram> {
    let config = load_config(cli)?;
    let stack = scenario
        .build(&config)
        .with_context(|| format!("Failed to declare {} stack", scenario))?;

    let rendered = render::write(&stack, &config.stack, &program_dir(cli, scenario)).await?;

    if scenario == Scenario::Api {
        let artifact = function_artifact(cli, &config)?;
        if !artifact.exists() {
            warn!(
                "Function archive {} does not exist yet; `preview`/`up` will build it",
                artifact.path().display()
            );
        }
    }

    info!("Program: {}", rendered.program.display());
    info!("Stack settings: {}", rendered.settings.display());
    Ok(rendered)
}

/// Render then hand the program to the engine
async fn run_engine(cli: &Cli, scenario: Scenario, operation: Operation) -> Result<()> {
    PulumiEngine::check_installed()
        .await
        .context("pulumi is required")?;

    let rendered = render_scenario(cli, scenario).await?;
    let config = load_config(cli)?;
    if scenario == Scenario::Api && operation != Operation::Destroy {
        function_artifact(cli, &config)?.ensure().await?;
    }
    let engine = PulumiEngine::new(rendered.dir, config.stack);
    engine.run(operation).await?;

    info!("✓ pulumi {} finished for {} scenario", operation, scenario);
    Ok(())
}

/// Print exported values
async fn show_outputs(cli: &Cli, scenario: Scenario) -> Result<()> {
    let config = load_config(cli)?;
    let engine = PulumiEngine::new(program_dir(cli, scenario), config.stack);
    let outputs = engine.outputs().await?;

    if outputs.is_empty() {
        info!("No outputs recorded for {} scenario", scenario);
        return Ok(());
    }

    for (key, value) in outputs {
        match value.as_str() {
            Some(s) => info!("{}: {}", key, s),
            None => info!("{}: {}", key, value),
        }
        if key == "clusterName" {
            if let Some(name) = value.as_str().filter(|n| !gcp::naming::is_cluster_name(n)) {
                warn!("Cluster name {} does not follow the pytorch-cluster-<suffix> scheme", name);
            }
        }
    }
    Ok(())
}

fn configured_variant(cli: &Cli, variant: Option<HandlerVariant>) -> Result<HandlerVariant> {
    match variant {
        Some(v) => Ok(v),
        None if cli.config.exists() => Ok(load_config(cli)?.api.variant),
        None => Ok(HandlerVariant::default()),
    }
}

/// Run the handler once
fn invoke_handler(cli: &Cli, variant: Option<HandlerVariant>) -> Result<()> {
    let variant = configured_variant(cli, variant)?;
    let response = variant.invoke(&serde_json::Value::Null);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Serve the API's route table locally
async fn serve_locally(cli: &Cli, addr: SocketAddr, variant: Option<HandlerVariant>) -> Result<()> {
    let variant = configured_variant(cli, variant)?;
    let static_dir = if cli.config.exists() {
        load_config(cli)?.api.static_dir
    } else {
        PathBuf::from("www")
    };
    serve::serve(addr, variant, &static_dir).await
}

/// Poll the deployed API until /source answers
async fn smoke_check(cli: &Cli, url: Option<String>, timeout: u64) -> Result<()> {
    let url = match url {
        Some(url) => url,
        None => {
            let config = load_config(cli)?;
            let engine = PulumiEngine::new(program_dir(cli, Scenario::Api), config.stack);
            let outputs = engine.outputs().await?;
            outputs
                .get("url")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .context("Stack has no 'url' output. Deploy the api scenario first")?
        }
    };

    let polling = PollingConfig::from_secs(timeout, 5, format!("Waiting for {}", url));
    let variant = smoke::check(&url, &polling).await?;
    info!("✓ {} handler is answering at {}", variant, url);

    let polling = PollingConfig::from_secs(timeout, 5, format!("Waiting for static site at {}", url));
    smoke::check_static(&url, &polling).await?;
    Ok(())
}
