//! Crush command-line client (`crush`)
//!
//! Drives the session and profile layer from a terminal: log in with an
//! identity-provider credential, inspect and edit the profile, upload a
//! picture. Settings resolve CLI → environment → TOML file → defaults.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crush_client::session::storage::FileStorage;
use crush_client::upload::content_type_for;
use crush_client::{
    navigate, Admission, ApiClient, IdentityExchange, MountOutcome, ProfileReconciler,
    ProfileView, SessionStore, UploadCoordinator,
};
use crush_common::config::{
    write_toml_config, ClientConfigResolver, ClientSettings, CliOverrides, LoggingConfig,
    TomlConfig,
};
use crush_common::{ClientEvent, EventBus, Route};

/// Command-line arguments for crush
#[derive(Parser, Debug)]
#[command(name = "crush")]
#[command(about = "Command-line client for the Crush matching service")]
#[command(version)]
struct Args {
    /// Backend base URL (overrides CRUSH_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session storage file (overrides CRUSH_SESSION_FILE and the config file)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// TOML config file (overrides CRUSH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange an identity-provider credential for a session
    Login {
        /// Credential issued by the identity provider
        #[arg(long, env = "CRUSH_CREDENTIAL", hide_env_values = true)]
        credential: String,
    },
    /// End the current session
    Logout,
    /// Show the current session
    Status,
    /// Decide whether a route would render for the current session
    Open {
        /// Route path, e.g. /user
        path: String,
    },
    /// Profile basic info
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Survey answers
    Answers {
        #[command(subcommand)]
        action: AnswersAction,
    },
    /// Profile picture
    Picture {
        #[command(subcommand)]
        action: PictureAction,
    },
    /// Client configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Print the profile in its editable form
    Show,
    /// Assign fields (field=value) and submit basic info
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
enum AnswersAction {
    /// Assign answers (questionN=value) and submit all twelve
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
enum PictureAction {
    /// Upload an image file
    Upload {
        file: PathBuf,

        /// Content type; sniffed from the file when omitted
        #[arg(long)]
        content_type: Option<String>,

        /// Also record the uploaded location in the profile
        #[arg(long)]
        save_to_profile: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print resolved settings
    Show,
    /// Write a config file with the resolved settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got {:?}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ClientConfigResolver::new(CliOverrides {
        api_base_url: args.api_url.clone(),
        session_file: args.session_file.clone(),
        config_file: args.config.clone(),
    });
    let settings = resolver
        .resolve()
        .context("Failed to resolve client settings")?;

    init_tracing(&settings.logging)?;
    debug!(api_base_url = %settings.api_base_url, "crush starting");

    let events = EventBus::default();
    let mut navigation = events.subscribe();
    let store = SessionStore::open(FileStorage::new(&settings.session_file), events);
    let api = ApiClient::new(&settings.api_base_url, settings.request_timeout)
        .context("Failed to create API client")?;

    match args.command {
        Command::Login { credential } => {
            let exchange = IdentityExchange::new(api, store.clone());
            let outcome = exchange.exchange(&credential).await?;
            println!(
                "Logged in as {}",
                outcome.session.identity().unwrap_or_default()
            );
            println!("Continue at {}", outcome.landing_route());
        }
        Command::Logout => {
            store.clear();
            println!("Logged out");
            while let Ok(event) = navigation.try_recv() {
                if let ClientEvent::Navigate { route, .. } = event {
                    println!("Continue at {}", route);
                }
            }
        }
        Command::Status => match store.get().credentials() {
            Some(c) => println!("Logged in as {}", c.identity()),
            None => println!("Not logged in"),
        },
        Command::Open { path } => {
            let route =
                Route::from_path(&path).ok_or_else(|| anyhow!("Unknown route {:?}", path))?;
            match navigate(route, &store.get()) {
                Admission::Render => println!("render {}", route),
                Admission::Redirect(to) => println!("redirect {}", to),
            }
        }
        Command::Profile { action } => {
            let mut view = mount_profile(api, store).await?;
            match action {
                ProfileAction::Show => {
                    let record = view.record().ok_or_else(|| anyhow!("Profile not loaded"))?;
                    println!("{}", serde_json::to_string_pretty(record)?);
                }
                ProfileAction::Set { assignments } => {
                    apply(&mut view, &assignments)?;
                    view.save_basic_info().await?;
                    println!("Profile updated");
                }
            }
        }
        Command::Answers {
            action: AnswersAction::Set { assignments },
        } => {
            let mut view = mount_profile(api, store).await?;
            apply(&mut view, &assignments)?;
            view.save_answers().await?;
            println!("Answers updated");
        }
        Command::Picture {
            action:
                PictureAction::Upload {
                    file,
                    content_type,
                    save_to_profile,
                },
        } => {
            upload_picture(api, store, file, content_type, save_to_profile).await?;
        }
        Command::Config { action } => run_config(&action, &resolver, &settings)?,
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        EnvFilter::new(format!(
            "crush={level},crush_client={level},crush_common={level}"
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = logging
        .file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Guard the profile route, then load the profile into a view
async fn mount_profile(api: ApiClient, store: SessionStore) -> Result<ProfileView> {
    let mut view = ProfileView::new(ProfileReconciler::new(api), store);
    match view.mount().await? {
        MountOutcome::Ready => Ok(view),
        MountOutcome::Redirect(route) => bail!("Not logged in; continue at {}", route),
        MountOutcome::Stale => bail!("Session changed while loading the profile"),
    }
}

fn apply(view: &mut ProfileView, assignments: &[(String, String)]) -> Result<()> {
    let record = view
        .record_mut()
        .ok_or_else(|| anyhow!("Profile not loaded"))?;
    for (field, value) in assignments {
        record.set_field(field, value)?;
    }
    Ok(())
}

async fn upload_picture(
    api: ApiClient,
    store: SessionStore,
    file: PathBuf,
    content_type: Option<String>,
    save_to_profile: bool,
) -> Result<()> {
    let session = store.get();
    let credentials = match navigate(Route::User, &session) {
        Admission::Redirect(route) => bail!("Not logged in; continue at {}", route),
        Admission::Render => session
            .credentials()
            .cloned()
            .ok_or_else(|| anyhow!("Not logged in"))?,
    };

    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content_type = content_type.unwrap_or_else(|| {
        content_type_for(&bytes, file.file_name().and_then(|n| n.to_str()))
    });

    let coordinator = UploadCoordinator::new(api.clone());
    let slot = coordinator
        .upload_picture(
            credentials.identity(),
            credentials.token(),
            bytes,
            &content_type,
        )
        .await?;
    let location = slot.public_location();
    info!(location = %location, "Picture stored");
    println!("Uploaded to {}", location);

    if save_to_profile {
        let mut view = mount_profile(api, store).await?;
        let record = view
            .record_mut()
            .ok_or_else(|| anyhow!("Profile not loaded"))?;
        record.picture_s3_url = Some(location.to_string());
        view.save_basic_info().await?;
        println!("Profile picture updated");
    }
    Ok(())
}

fn run_config(
    action: &ConfigAction,
    resolver: &ClientConfigResolver,
    settings: &ClientSettings,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let path = resolver.config_file_path();
            println!(
                "config_file = {}",
                path.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!("api_base_url = {}", settings.api_base_url);
            println!("session_file = {}", settings.session_file.display());
            match settings.request_timeout {
                Some(t) => println!("request_timeout_secs = {}", t.as_secs()),
                None => println!("request_timeout_secs = (none)"),
            }
            println!("logging.level = {}", settings.logging.level);
        }
        ConfigAction::Init { force } => {
            let path = resolver
                .config_file_path()
                .ok_or_else(|| anyhow!("No config directory on this platform; pass --config"))?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to replace)", path.display());
            }
            let config = TomlConfig {
                api_base_url: Some(settings.api_base_url.clone()),
                session_file: Some(settings.session_file.clone()),
                request_timeout_secs: settings.request_timeout.map(|t| t.as_secs()),
                logging: settings.logging.clone(),
            };
            write_toml_config(&config, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
