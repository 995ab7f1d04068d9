use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::prelude::*;

use http_probe::adapters::{
    FixedFileChooser, JsonConfigStore, LogTailReader, ReqwestTransport, TracingLogSink, COMMUNICATION_TARGET,
};
use http_probe::domain::{AuthMethod, ConnectionConfig, ProbeSession, Scheme};
use http_probe::ports::{ConfigStorePort, LogSinkPort};
use http_probe::settings::AppSettings;

#[derive(Parser, Debug)]
#[clap(version = env!("HTTP_PROBE_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// Application settings file (defaults to the user config directory)
    #[clap(long, short = 's')]
    settings: Option<PathBuf>,

    /// Connection config file, overrides the settings
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Communication log file, overrides the settings
    #[clap(long, short = 'l')]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default connection config
    Init,
    /// Print the saved connection config
    Show,
    /// Edit the connection config and save it if anything changed
    Set(SetArgs),
    /// Send a GET request
    Get {
        #[clap(default_value = "")]
        command: String,
    },
    /// Upload the configured file with a POST request
    Post {
        #[clap(default_value = "")]
        command: String,

        /// Pick this file for upload and save it into the config first
        #[clap(long, short = 'f')]
        file: Option<PathBuf>,
    },
    /// Follow the communication log
    Tail,
}

#[derive(clap::Args, Debug)]
struct SetArgs {
    #[clap(long)]
    scheme: Option<String>,
    #[clap(long)]
    host: Option<String>,
    #[clap(long)]
    port: Option<u16>,
    #[clap(long)]
    path: Option<String>,
    #[clap(long)]
    query: Option<String>,
    #[clap(long)]
    timeout: Option<u32>,
    /// Basic or Anonymous
    #[clap(long)]
    auth: Option<String>,
    #[clap(long)]
    user: Option<String>,
    #[clap(long)]
    password: Option<String>,
    #[clap(long)]
    upload_file: Option<String>,
}

impl SetArgs {
    fn apply(self, draft: &mut ConnectionConfig) {
        if let Some(v) = self.scheme {
            draft.scheme = Scheme::from_str_lenient(&v);
        }
        if let Some(v) = self.host {
            draft.host = v;
        }
        if let Some(v) = self.port {
            draft.port = v.to_string();
        }
        if let Some(v) = self.path {
            draft.path = v;
        }
        if let Some(v) = self.query {
            draft.query = v;
        }
        if let Some(v) = self.timeout {
            draft.timeout_seconds = v;
        }
        if let Some(v) = self.auth {
            draft.auth_method = AuthMethod::from_str_lenient(&v);
        }
        if let Some(v) = self.user {
            draft.user = v;
        }
        if let Some(v) = self.password {
            draft.password = v;
        }
        if let Some(v) = self.upload_file {
            draft.upload_file_path = v;
        }
    }
}

fn init_logging(log_path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    let communication = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter_fn(|meta| meta.target() == COMMUNICATION_TARGET));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    tracing_subscriber::registry().with(communication).with(console).init();
    Ok(())
}

fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

async fn tail(log_path: &Path, settings: &AppSettings) -> Result<(), Box<dyn Error>> {
    let mut reader = LogTailReader::start(log_path, settings.tail.clone())?;
    let mut updates = reader.subscribe();

    let mut shown = reader.read_current_content().await.unwrap_or_default();
    print!("{}", shown);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(content) => {
                    match content.strip_prefix(shown.as_str()) {
                        Some(appended) => print!("{}", appended),
                        None => print!("{}", content),
                    }
                    shown = content;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} log updates", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    reader.dispose();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let opts = Opts::parse();

    let settings = AppSettings::load(opts.settings.as_deref())?;
    let config_path = opts.config.unwrap_or_else(|| settings.config_path.clone());
    let log_path = opts.log_file.unwrap_or_else(|| settings.log_path.clone());

    init_logging(&log_path)?;
    info!("Using config {} and log {}", config_path.display(), log_path.display());

    let sink: Arc<dyn LogSinkPort> = Arc::new(TracingLogSink::new());

    match opts.command {
        Command::Init => {
            if config_path.exists() {
                return Err(format!("{} already exists", config_path.display()).into());
            }
            JsonConfigStore::new(&config_path).save(&ConnectionConfig::default())?;
            println!("Wrote {}", config_path.display());
        }
        Command::Tail => tail(&log_path, &settings).await?,
        command => {
            let chooser_selection = match &command {
                Command::Post { file, .. } => file.clone(),
                _ => None,
            };
            let transport = Arc::new(ReqwestTransport::new(sink.clone()));
            let mut session = ProbeSession::new(
                Box::new(JsonConfigStore::new(&config_path)),
                transport,
                sink.clone(),
                Arc::new(FixedFileChooser::new(chooser_selection)),
            );
            session.load()?;

            match command {
                Command::Show => println!("{}", serde_json::to_string_pretty(session.saved())?),
                Command::Set(args) => {
                    session.edit(|draft| args.apply(draft));
                    if session.can_save() {
                        session.save()?;
                        println!("{}", session.status_message());
                    } else {
                        println!("No changes");
                    }
                }
                Command::Get { command } => {
                    let cancel = ctrl_c_token();
                    let result = session.send(&command, Some(&cancel)).await;
                    match result {
                        Ok(body) => println!("{}", body),
                        Err(e) => {
                            eprintln!("{}", session.status_message());
                            return Err(e.into());
                        }
                    }
                }
                Command::Post { command, .. } => {
                    if session.choose_upload_file() && session.can_save() {
                        session.save()?;
                    }
                    let cancel = ctrl_c_token();
                    let result = session.post(&command, Some(&cancel)).await;
                    match result {
                        Ok(body) => println!("{}", body),
                        Err(e) => {
                            eprintln!("{}", session.status_message());
                            return Err(e.into());
                        }
                    }
                }
                Command::Init | Command::Tail => {}
            }
        }
    }

    Ok(())
}
