use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use webmirrord::config::{CONFIG_FILE_NAME, MirrorConfig};
use webmirrord::daemon::MirrorRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Once,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    mode: CliMode,
    config_path: PathBuf,
}

fn parse_cli_args<I>(args: I) -> anyhow::Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs {
        mode: CliMode::Run,
        config_path: PathBuf::from(CONFIG_FILE_NAME),
    };
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--once" => parsed.mode = CliMode::Once,
            "--help" | "-h" => parsed.mode = CliMode::Help,
            "--config" => {
                let Some(path) = args.next() else {
                    anyhow::bail!("--config requires a path");
                };
                parsed.config_path = PathBuf::from(path);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = parse_cli_args(std::env::args())?;
    if args.mode == CliMode::Help {
        println!("Usage: webmirrord [--once] [--config <path>]");
        println!("  --once           Check the remote index once and exit");
        println!("  --config <path>  Run configuration file (default: {CONFIG_FILE_NAME})");
        println!("Environment: WEBMIRROR_REMOTE_URL, WEBMIRROR_LOCAL_DIR, WEBMIRROR_CHECK_SECS");
        return Ok(());
    }
    init_tracing();

    let config = MirrorConfig::load_or_init(&args.config_path)?;
    let mut runtime = MirrorRuntime::bootstrap(config)?;
    match args.mode {
        CliMode::Once => {
            runtime.run_once().await?;
        }
        CliMode::Run | CliMode::Help => runtime.run().await?,
    }
    Ok(())
}
