use clap::{Parser, Subcommand};
use std::process::ExitCode;
use sitewatch_panel::config::PanelConfig;
use sitewatch_panel::view::render_table;
use sitewatch_panel::{
    EditError, HttpMonitorApi, InlineConfigEditor, MonitorApi, Notifier, StderrNotifier,
};
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Admin panel for sitewatch", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Server base URL, overrides the configuration
    #[arg(short, long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show all monitored sites
    List,
    /// Type a new interval into a site's cell and press Enter
    Edit { url: String, interval: String },
    /// Turn monitoring of a site on or off
    Toggle { url: String },
    /// Stop monitoring a site and remove it
    Delete { url: String },
    /// Start monitoring a new site
    Add { url: String, interval: String },
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// Same event sequence as editing the cell by hand: focus, type, Enter.
async fn edit_cell<A: MonitorApi, N: Notifier>(
    editor: &InlineConfigEditor<A, N>,
    url: &str,
    text: &str,
) -> Result<(), EditError> {
    let notify = |e: &EditError| editor.notifier().notify(&e.to_string());
    editor.focus(url).await.inspect_err(notify)?;
    editor.input(url, text).await.inspect_err(notify)?;
    editor.press_enter(url).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let mut config = match PanelConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load panel configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(server) = args.server {
        config.server_url = server;
    }
    debug!(config = ?config, "Configuration loaded.");

    let api = match HttpMonitorApi::new(config.server_url.clone(), config.request_timeout()) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    // Failures below were already shown to the user by the notifier.
    let editor = match InlineConfigEditor::mount(api, StderrNotifier, config.policy()).await {
        Ok(editor) => editor,
        Err(_) => return ExitCode::FAILURE,
    };

    let outcome = match &args.command {
        Command::List => Ok(()),
        Command::Edit { url, interval } => edit_cell(&editor, url, interval).await,
        Command::Toggle { url } => editor.toggle_enabled(url).await.map(|_| ()),
        Command::Delete { url } => editor.delete_target(url).await,
        Command::Add { url, interval } => editor.add_target(url, interval).await,
    };

    print!("{}", render_table(&editor.rows().await));
    editor.unmount();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
