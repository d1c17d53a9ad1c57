use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;

use kifi_background::{Background, MessageRouter, MessageSender};
use kifi_config::{BackgroundSettings, ConfigStore};
use kifi_platform::InMemoryPlatform;
use kifi_remote::{HttpRemote, InMemoryRemote, RemoteApi};
use kifi_store::JsonFileStore;
use kifi_types::{Env, WindowKind};

use crate::cli::*;
use crate::host;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Config(args) => cmd_config(&cli, &args.action),
        Command::Dispatch(args) => cmd_dispatch(&cli, args).await,
        Command::Host(args) => cmd_host(&cli, args).await,
    }
}

/// Open the persisted config, switching environment first if asked.
pub(crate) fn open_config(store: &Path, env: Option<Env>) -> anyhow::Result<ConfigStore> {
    let store = JsonFileStore::open(store)
        .with_context(|| format!("opening store {}", store.display()))?;
    let config = ConfigStore::new(Arc::new(store));
    if let Some(env) = env {
        config.set_env(env)?;
    }
    Ok(config)
}

fn load_settings(cli: &Cli) -> anyhow::Result<BackgroundSettings> {
    match &cli.settings {
        Some(path) => BackgroundSettings::load(path)
            .with_context(|| format!("loading settings {}", path.display())),
        None => Ok(BackgroundSettings::default()),
    }
}

/// Background over the persisted config and an in-memory host.
fn open_background(
    cli: &Cli,
    offline: bool,
) -> anyhow::Result<(Arc<Background>, Arc<InMemoryPlatform>)> {
    let config = open_config(&cli.store, cli.env)?;
    let settings = load_settings(cli)?;
    let remote: Arc<dyn RemoteApi> = if offline {
        Arc::new(InMemoryRemote::new())
    } else {
        Arc::new(HttpRemote::new(&settings.user_agent)?)
    };
    let platform = Arc::new(InMemoryPlatform::new());
    let bg = Arc::new(Background::new(config, platform.clone(), remote, settings));
    Ok((bg, platform))
}

fn cmd_config(cli: &Cli, action: &ConfigAction) -> anyhow::Result<()> {
    let config = open_config(&cli.store, cli.env)?;
    match action {
        ConfigAction::Show => {
            let value = serde_json::to_value(config.get())?;
            match cli.format {
                OutputFormat::Json => println!("{value}"),
                OutputFormat::Text => {
                    if let Value::Object(fields) = value {
                        for (key, v) in fields {
                            println!("{} = {}", key.bold(), v);
                        }
                    }
                }
            }
        }
        ConfigAction::Set { key, value } => {
            if config.set(key, value)? {
                println!("{} Set {} = {}", "✓".green(), key.bold(), value);
            } else {
                println!("{} already {}", key.bold(), value.dimmed());
            }
        }
        ConfigAction::Remove { key } => {
            if config.remove(key)? {
                println!("{} Removed {}", "✓".green(), key.bold());
            } else {
                println!("{} = (not set)", key.bold());
            }
        }
        ConfigAction::Env { env } => {
            config.set_env(*env)?;
            println!(
                "{} Environment {} ({})",
                "✓".green(),
                env.as_str().yellow(),
                env.server().cyan()
            );
        }
    }
    Ok(())
}

async fn cmd_dispatch(cli: &Cli, args: &DispatchArgs) -> anyhow::Result<()> {
    let raw: Value = serde_json::from_str(&args.message).context("message is not JSON")?;
    let (bg, platform) = open_background(cli, args.offline)?;
    let sender = match &args.tab_url {
        Some(url) => MessageSender::tab(platform.open_tab(url, WindowKind::Normal)),
        None => MessageSender::page(),
    };
    let router = MessageRouter::new(bg);
    let reply = router.dispatch(&raw, &sender).into_value().await;
    match (reply, cli.format) {
        (Some(v), OutputFormat::Json) => println!("{v}"),
        (Some(v), OutputFormat::Text) => println!("{}", serde_json::to_string_pretty(&v)?),
        (None, OutputFormat::Json) => println!("null"),
        (None, OutputFormat::Text) => println!("{}", "(no reply)".dimmed()),
    }
    Ok(())
}

async fn cmd_host(cli: &Cli, args: &HostArgs) -> anyhow::Result<()> {
    let (bg, platform) = open_background(cli, args.offline)?;
    let flusher = bg.spawn_flusher();
    if let Some(reason) = args.start {
        let bg = Arc::clone(&bg);
        tokio::spawn(async move { bg.start(reason).await });
    }
    let router = MessageRouter::new(bg);
    let served = host::serve(&router, &platform, std::io::stdin(), &mut std::io::stdout().lock()).await?;
    tracing::info!(served, "native-messaging host stopped");
    flusher.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kifi_store::{InMemoryKeyValueStore, KeyValueStore};

    #[test]
    fn config_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let config = open_config(&path, None).unwrap();
        assert!(config.set("max_res", "9").unwrap());

        let reopened = open_config(&path, None).unwrap();
        assert_eq!(reopened.get().max_res, 9);
    }

    #[test]
    fn env_override_switches_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        open_config(&path, None).unwrap().set("max_res", "9").unwrap();
        let dev = open_config(&path, Some(Env::Development)).unwrap();
        assert_eq!(dev.env(), Env::Development);
        assert_eq!(dev.get().max_res, 5);
        assert_eq!(dev.get().server, "dev.ezkeep.com:9000");

        let back = open_config(&path, Some(Env::Production)).unwrap();
        assert_eq!(back.get().max_res, 9);
    }

    #[test]
    fn in_memory_store_is_interchangeable() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let config = ConfigStore::new(store.clone());
        config.set("hover_timeout", "3").unwrap();
        assert_eq!(
            store.get("production_hover_timeout").unwrap().as_deref(),
            Some("3")
        );
    }
}
