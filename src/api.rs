// Front-end commands
// One invocation of `optimize` is one form submission.

use anyhow::Context;
use serde_json::json;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::cli::{ConfigCommands, OptimizeArgs};
use crate::models::OptimizeRequest;
use crate::services::{
    copy_optimized_text, default_policy, get_api_key, load_policy, mask_key, parse_provider,
    render_text, AppConfig, ClientOptions, ConfigStore, ProviderClient, ProviderKind,
    RequestComposer, ResultView, Session, SubmitOutcome, SystemClipboard, TextGenerator,
    UnconfiguredGenerator, VALIDATION_MESSAGE,
};

pub const EXIT_PROCESSING: u8 = 1;
pub const EXIT_VALIDATION: u8 = 2;

pub struct ResolvedProvider {
    pub name: String,
    pub configured: bool,
    pub generator: Box<dyn TextGenerator>,
}

pub fn open_store(dir: Option<PathBuf>) -> anyhow::Result<ConfigStore> {
    let dir = match dir {
        Some(d) => d,
        None => ConfigStore::default_config_dir().context("No config directory available")?,
    };
    Ok(ConfigStore::new(dir))
}

pub fn load_composer(config: &AppConfig) -> anyhow::Result<RequestComposer> {
    let policy = match config.composer.policy_path {
        Some(ref path) => load_policy(Path::new(path)).map_err(anyhow::Error::msg)?,
        None => default_policy().clone(),
    };
    Ok(RequestComposer::new(policy).with_human_score_fallback(config.composer.human_score_fallback))
}

pub fn resolve_provider(
    store: &ConfigStore,
    config: &AppConfig,
    provider_override: Option<&str>,
) -> anyhow::Result<ResolvedProvider> {
    let spec = parse_provider(provider_override.unwrap_or(&config.provider));
    ProviderKind::from_name(&spec.name)?;

    let Some(api_key) = get_api_key(&spec.name, store) else {
        warn!(provider = %spec.name, "provider.unconfigured");
        return Ok(ResolvedProvider {
            generator: Box::new(UnconfiguredGenerator {
                provider: spec.name.clone(),
            }),
            name: spec.name,
            configured: false,
        });
    };

    let options = ClientOptions {
        base_url: config.providers.get(&spec.name).and_then(|p| p.base_url.clone()),
        proxy: config.proxy.as_ref().and_then(|p| p.active_url()),
        timeout_secs: Some(config.request_timeout_secs),
    };
    let client = ProviderClient::new(&spec, &api_key, &options)?;
    info!(provider = %spec.name, model = %client.model(), "provider.ready");

    Ok(ResolvedProvider {
        name: spec.name,
        configured: true,
        generator: Box::new(client),
    })
}

/// Idea from the positional argument, a file, or piped stdin.
pub fn read_idea(args: &OptimizeArgs) -> anyhow::Result<String> {
    if let Some(ref idea) = args.idea {
        return Ok(idea.clone());
    }
    if let Some(ref path) = args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buf = String::new();
    stdin
        .lock()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

pub async fn optimize_text(
    store: &ConfigStore,
    provider_override: Option<&str>,
    json_output: bool,
    args: OptimizeArgs,
) -> anyhow::Result<ExitCode> {
    let idea = read_idea(&args)?;
    if !OptimizeRequest::new(idea.as_str(), args.help_level, args.text_type, args.grade).has_idea() {
        // rejected before any config or provider is touched
        warn!("optimize.rejected: empty idea");
        report_failure(json_output, "validation", VALIDATION_MESSAGE);
        return Ok(ExitCode::from(EXIT_VALIDATION));
    }

    let config = store.load().map_err(anyhow::Error::msg)?;
    let composer = load_composer(&config)?;
    let provider = resolve_provider(store, &config, provider_override)?;

    let mut session = Session::new(composer);
    session.set_idea(idea);
    session.set_help_level(args.help_level);
    session.set_text_type(args.text_type);
    session.set_grade(args.grade);

    let outcome = session.submit(provider.generator.as_ref()).await;
    let (code, kind) = match outcome {
        SubmitOutcome::Completed => (ExitCode::SUCCESS, None),
        SubmitOutcome::Rejected(_) => (ExitCode::from(EXIT_VALIDATION), Some("validation")),
        SubmitOutcome::Failed(_) => (ExitCode::from(EXIT_PROCESSING), Some("processing")),
    };

    if let (Some(kind), Some(message)) = (kind, session.error_message()) {
        report_failure(json_output, kind, message);
        if kind == "processing" && !provider.configured {
            eprintln!(
                "Ingen API-nyckel hittades för {} (sätt miljövariabeln eller kör `skrivpartner config set-key {} <nyckel>`).",
                provider.name, provider.name
            );
        }
        return Ok(code);
    }

    if args.tips {
        session.toggle_tips();
    }

    let Some(result) = session.result() else {
        return Ok(ExitCode::from(EXIT_PROCESSING));
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", render_text(&ResultView::new(result), session.tips()));
    }

    if args.copy {
        match copy_optimized_text(result, &mut SystemClipboard) {
            Ok(()) => eprintln!("Kopierat till urklipp."),
            Err(e) => warn!(error = %e, "clipboard.copy_failed"),
        }
    }

    Ok(code)
}

fn report_failure(json_output: bool, kind: &str, message: &str) {
    if json_output {
        println!("{}", json!({ "error": message, "kind": kind }));
    } else {
        eprintln!("⚠️  {}", message);
    }
}

pub fn run_config(store: &ConfigStore, command: ConfigCommands, json_output: bool) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut config = store.load().map_err(anyhow::Error::msg)?;
            for key in config.api_keys.values_mut() {
                *key = mask_key(key);
            }
            if !json_output {
                println!("# {}", store.config_file().display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::SetKey { provider, key } => {
            ProviderKind::from_name(&provider)?;
            store.set_api_key(&provider, &key).map_err(anyhow::Error::msg)?;
            info!(provider = %provider, "config.key_stored");
            println!("Sparade nyckel för {}", provider);
        }
        ConfigCommands::DeleteKey { provider } => {
            store.delete_api_key(&provider).map_err(anyhow::Error::msg)?;
            println!("Tog bort nyckel för {}", provider);
        }
        ConfigCommands::SetProvider { spec } => {
            ProviderKind::from_name(&parse_provider(&spec).name)?;
            store.set_provider(&spec).map_err(anyhow::Error::msg)?;
            println!("Standardleverantör: {}", spec.trim());
        }
        ConfigCommands::SetUrl { provider, url } => {
            store.set_provider_url(&provider, &url).map_err(anyhow::Error::msg)?;
            println!("Bas-URL för {}: {}", provider, url);
        }
    }
    Ok(())
}
