use std::{env, fs, process::Command};

use cairn_config::config::{self, generate_default_config, get_config, set_config_path, Config};
use cairn_core::{
    error::{CairnError, ErrorContext},
    CairnResult,
};
use cairn_dl::http_client::configure_http_client;
use cairn_utils::path::resolve_path;
use clap::Parser;
use cli::{Args, Commands, HooksAction};
use hooks::{add_hook, list_hooks, NewHook};
use logging::setup_logging;
use sync::{show_status, sync_sources, SyncOptions};
use tracing::{debug, info, warn};
use ureq::Proxy;
use utils::{parse_headers, COLOR, PROGRESS};

mod cli;
mod hooks;
mod logging;
mod progress;
mod sync;
mod utils;

/// Applies the network flags and the configured fetch timeout to the shared HTTP client.
fn setup_http_client(args: &Args) -> CairnResult<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .map_err(|err| CairnError::Custom(format!("Invalid proxy: {err}")))?;
    let headers = args.header.as_deref().map(parse_headers).transpose()?;
    let user_agent = args.user_agent.clone();
    let timeout = get_config().fetch_timeout();

    configure_http_client(|config| {
        if proxy.is_some() {
            config.proxy = proxy;
        }
        if user_agent.is_some() {
            config.user_agent = user_agent;
        }
        if headers.is_some() {
            config.headers = headers;
        }
        config.timeout = Some(timeout);
    });

    debug!("fetch timeout set to {timeout:?}");
    Ok(())
}

fn print_config(edit: Option<Option<String>>) -> CairnResult<()> {
    let config_path = config::CONFIG_PATH.read().unwrap().clone();

    match edit {
        Some(editor) => {
            let editor = editor
                .or_else(|| env::var("EDITOR").ok())
                .unwrap_or_else(|| "vi".to_string());
            Command::new(&editor)
                .arg(&config_path)
                .status()
                .with_context(|| {
                    format!("executing command {} {}", editor, config_path.display())
                })?;
        }
        None => {
            let content = match fs::read_to_string(&config_path) {
                Ok(v) => v,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Config file {} not found", config_path.display());
                    let def_config = Config::default_config::<&str>(&[]);
                    def_config
                        .to_annotated_document()
                        .map_err(CairnError::from)?
                        .to_string()
                }
                Err(err) => {
                    return Err(CairnError::IoError {
                        action: "reading config".to_string(),
                        source: err,
                    });
                }
            };
            info!("{}", content);
        }
    }

    Ok(())
}

fn print_env() -> CairnResult<()> {
    let config = get_config();

    info!(
        "CAIRN_CONFIG={}",
        config::CONFIG_PATH.read().unwrap().display()
    );
    info!("CAIRN_CACHE={}", config.get_cache_path()?.display());
    info!("CAIRN_HOOKS={}", config.get_hooks_path()?.display());
    Ok(())
}

/// Runs the parsed command. Returns `false` if a sync left the cache incomplete.
async fn handle_cli() -> CairnResult<bool> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    if args.no_progress || args.quiet {
        let mut progress = PROGRESS.write().unwrap();
        *progress = false;
    }

    if let Some(ref c) = args.config {
        set_config_path(resolve_path(c)?);
    }

    if let Commands::DefConfig {
        remotes,
    } = &args.command
    {
        let path = generate_default_config(remotes.as_slice())?;
        debug!("default config written to {}", path.display());
        return Ok(true);
    }

    config::init()?;
    setup_http_client(&args)?;

    match args.command {
        Commands::Sync {
            uris,
            fail_fast,
            parallel,
        } => {
            return sync_sources(SyncOptions {
                uris,
                fail_fast,
                parallel,
                json: args.json,
            })
            .await;
        }
        Commands::Status {
            uris,
        } => show_status(&uris, args.json)?,
        Commands::Config {
            edit,
        } => print_config(edit)?,
        Commands::Env => print_env()?,
        Commands::Hooks {
            action,
        } => {
            match action {
                HooksAction::List => list_hooks(args.json)?,
                HooksAction::Add {
                    name,
                    target,
                    config,
                    inactive,
                } => {
                    add_hook(NewHook {
                        name,
                        target,
                        config,
                        active: !inactive,
                    })?
                }
            }
        }
        Commands::DefConfig {
            ..
        } => unreachable!(),
    }

    Ok(true)
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match handle_cli().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(1);
        }
    }
}
