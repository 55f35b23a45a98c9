//! Seedbed - renders OperatingSystemConfig resources into node bootstrap scripts

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kube::{Client, CustomResourceExt, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seedbed_common::crd::OperatingSystemConfig;
use seedbed_common::telemetry::{init_telemetry, TelemetryConfig};
use seedbed_osc::{render_spec, KubeSecretGetter, RenderedConfig, StaticSecretGetter};

/// Seedbed - node bootstrap script compiler
#[derive(Parser, Debug)]
#[command(name = "seedbed", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render an OperatingSystemConfig manifest into a shell script
    ///
    /// Secrets are read from the cluster unless a secrets file is given.
    Render(RenderArgs),

    /// Print the OperatingSystemConfig CRD and exit
    Crd,
}

/// Render mode arguments
#[derive(Parser, Debug)]
struct RenderArgs {
    /// Path to the OperatingSystemConfig YAML manifest
    #[arg(short = 'f', long = "file")]
    manifest: PathBuf,

    /// YAML stream of v1/Secret objects to resolve references from, instead
    /// of the cluster
    #[arg(long, env = "SEEDBED_SECRETS_FILE")]
    secrets: Option<PathBuf>,

    /// Namespace holding the referenced Secrets (defaults to the manifest's)
    #[arg(short = 'n', long, env = "SEEDBED_NAMESPACE")]
    namespace: Option<String>,

    /// Which part of the rendering to print
    #[arg(long, value_enum, default_value_t = Part::All)]
    part: Part,

    /// Write the script to this file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

/// Selectable script output
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Part {
    /// Raw files script
    Files,
    /// Raw units script
    Units,
    /// Executable boot script with files and units
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig::default())?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => run_render(args).await,
        Commands::Crd => {
            let crd = serde_yaml::to_string(&OperatingSystemConfig::crd())
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("{crd}");
            Ok(())
        }
    }
}

/// Render the manifest and write the selected part
async fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let manifest = tokio::fs::read_to_string(&args.manifest)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read manifest {:?}: {}", args.manifest, e))?;
    let osc: OperatingSystemConfig = serde_yaml::from_str(&manifest)
        .map_err(|e| anyhow::anyhow!("Failed to parse OperatingSystemConfig: {}", e))?;

    let namespace = resolve_namespace(args.namespace.as_deref(), &osc)?;
    info!(name = %osc.name_any(), %namespace, "rendering OperatingSystemConfig");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling render");
            on_interrupt.cancel();
        }
    });

    let rendered = match &args.secrets {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read secrets file {:?}: {}", path, e))?;
            let secrets = StaticSecretGetter::from_yaml(&contents, &namespace)?;
            info!(secrets = secrets.len(), "loaded secrets file");
            render_spec(&cancel, &secrets, &namespace, &osc.spec).await?
        }
        None => {
            let client = Client::try_default().await?;
            let secrets = KubeSecretGetter::new(client);
            render_spec(&cancel, &secrets, &namespace, &osc.spec).await?
        }
    };

    let script = select_output(&rendered, args.part);
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, script.as_bytes())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
            info!(path = %path.display(), bytes = script.len(), "wrote script");
        }
        None => print!("{script}"),
    }
    Ok(())
}

/// Namespace flag wins over the manifest's own namespace
fn resolve_namespace(flag: Option<&str>, osc: &OperatingSystemConfig) -> anyhow::Result<String> {
    flag.map(str::to_string)
        .or_else(|| osc.namespace())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "OperatingSystemConfig {} has no namespace; pass --namespace",
                osc.name_any()
            )
        })
}

fn select_output(rendered: &RenderedConfig, part: Part) -> String {
    match part {
        Part::Files => rendered.files_script.clone(),
        Part::Units => rendered.units_script.clone(),
        Part::All => rendered.boot_script(),
    }
}
