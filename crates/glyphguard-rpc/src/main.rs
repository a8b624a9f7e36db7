//! GlyphGuard RPC Server - REST backend for conflict detection.
//!
//! Registers the installations it is told about, boots the highest version,
//! and serves the conflict report and scanner routes. Lifecycle subcommands
//! run the activation and teardown hooks instead of serving.

mod error;
mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glyphguard_core::config::{AppConfig, RestConfig};
use glyphguard_core::{
    BootOutcome, ConflictAggregator, DottedVersion, InstallationRegistry, Loader,
    MemoryOptionStore, OptionStore, OptionsActivator, SqliteOptionStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "glyphguard-rpc")]
#[command(about = "REST server for GlyphGuard conflict detection")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory holding the option database (defaults to the user data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep options in memory instead of SQLite
    #[arg(long)]
    in_memory: bool,

    /// REST route namespace
    #[arg(long, default_value = RestConfig::NAMESPACE)]
    namespace: String,

    /// Bearer token for administrative routes (open when unset)
    #[arg(long)]
    admin_token: Option<String>,

    /// Version of the host runtime, checked against installation requirements
    #[arg(long, default_value = "1.0.0")]
    host_runtime: String,

    /// Additional installation as `PATH` or `PATH=VERSION` (repeatable)
    #[arg(long = "installation")]
    installations: Vec<String>,

    /// Admin settings page URL handed to page loads
    #[arg(
        long,
        default_value = "http://127.0.0.1/admin/options.php?page=glyphguard"
    )]
    settings_page_url: String,

    /// Public base URL the REST namespace is served under
    #[arg(long, default_value = "http://127.0.0.1")]
    public_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve the REST routes (default)
    Serve,
    /// Run the activation hook of the active installation
    Activate,
    /// Run the deactivation hook if this is the last installation
    Deactivate,
    /// Run the uninstall hook if this is the last installation
    Uninstall,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting {} RPC Server", AppConfig::APP_NAME);

    let store = open_store(&args)?;
    let registry = Arc::new(register_installations(&args.installations)?);
    let host_runtime = semver::Version::parse(&args.host_runtime)
        .with_context(|| format!("Invalid host runtime version: {}", args.host_runtime))?;
    let loader = Loader::new(
        registry,
        Arc::new(OptionsActivator::new(store.clone())),
        host_runtime,
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {}
        Command::Activate => {
            match loader.activate().await {
                Ok(active) => info!("Activated installation {}", active.version),
                Err(notice) => error!("{}", notice),
            }
            return Ok(());
        }
        Command::Deactivate => {
            let ran = loader.maybe_deactivate().await?;
            info!("Deactivation hook {}", if ran { "ran" } else { "skipped" });
            return Ok(());
        }
        Command::Uninstall => {
            let ran = loader.maybe_uninstall().await?;
            info!("Uninstall hook {}", if ran { "ran" } else { "skipped" });
            return Ok(());
        }
    }

    glyphguard_core::conflicts::troubleshoot_tab_url(&args.settings_page_url)
        .context("Invalid settings page URL")?;

    let boot = match loader.boot() {
        BootOutcome::Loaded(_) => match loader.initialize().await {
            Ok(active) => BootOutcome::Loaded(active),
            Err(notice) => BootOutcome::Failed(notice),
        },
        failed => failed,
    };

    let api_url = api_url(&args.public_url, &args.namespace);
    let state = server::AppState {
        boot,
        aggregator: ConflictAggregator::new(store),
        admin_token: args.admin_token,
        namespace: args.namespace,
        settings_page_url: args.settings_page_url,
        api_url,
    };

    // Start the server
    let addr = server::start_server(state, &args.host, args.port).await?;

    // Print port for the host process to read (intentional stdout for IPC)
    println!("GLYPHGUARD_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}

fn open_store(args: &Args) -> Result<Arc<dyn OptionStore>> {
    if args.in_memory {
        warn!("Using in-memory option store; nothing will persist");
        return Ok(Arc::new(MemoryOptionStore::new()));
    }

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(glyphguard_core::default_data_dir);
    let db_path = data_dir.join(AppConfig::DATABASE_FILE_NAME);
    info!("Option database: {}", db_path.display());
    Ok(Arc::new(SqliteOptionStore::open(&db_path)?))
}

/// Register this binary's own copy, then every `--installation`.
fn register_installations(extra: &[String]) -> Result<InstallationRegistry> {
    let registry = InstallationRegistry::new();

    let exe_path = std::env::current_exe()?;
    let own_location = exe_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    registry.register(
        own_location,
        DottedVersion::parse(env!("CARGO_PKG_VERSION"))?,
    )?;

    for spec in extra {
        let (path, version) = parse_installation(spec);
        if !registry.register_location(Path::new(path), version)? {
            warn!("Installation {} was not registered", path);
        }
    }

    Ok(registry)
}

/// Split `PATH=VERSION` into its parts.
fn parse_installation(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('=') {
        Some((path, version)) if !version.is_empty() => (path, Some(version)),
        _ => (spec.trim_end_matches('='), None),
    }
}

/// Public URL of the namespaced routes.
fn api_url(public_url: &str, namespace: &str) -> String {
    format!(
        "{}/{}",
        public_url.trim_end_matches('/'),
        namespace.trim_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installation() {
        assert_eq!(
            parse_installation("/plugins/a=4.1.0"),
            ("/plugins/a", Some("4.1.0"))
        );
        assert_eq!(parse_installation("/plugins/a"), ("/plugins/a", None));
        assert_eq!(parse_installation("/plugins/a="), ("/plugins/a", None));
    }

    #[test]
    fn test_registers_own_copy_and_manifest_installations() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("glyphguard.json"),
            r#"{"version": "99.0.0"}"#,
        )
        .unwrap();

        let registry =
            register_installations(&[temp_dir.path().display().to_string()]).unwrap();
        assert_eq!(registry.installation_count(), 2);
        assert_eq!(registry.select().unwrap().version.as_str(), "99.0.0");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "glyphguard-rpc",
            "--in-memory",
            "--installation",
            "/plugins/a=4.0.0",
            "--installation",
            "/plugins/b",
            "uninstall",
        ]);
        assert!(args.in_memory);
        assert_eq!(args.installations.len(), 2);
        assert!(matches!(args.command, Some(Command::Uninstall)));
        assert_eq!(args.namespace, RestConfig::NAMESPACE);
        assert_eq!(
            api_url(&args.public_url, &args.namespace),
            "http://127.0.0.1/glyphguard/v1"
        );
    }

    #[test]
    fn test_api_url_joins_base_and_namespace() {
        assert_eq!(
            api_url("https://site.example/wp-json/", "/glyphguard/v1/"),
            "https://site.example/wp-json/glyphguard/v1"
        );
    }
}
