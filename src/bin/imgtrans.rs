//! CLI binary for imgtrans.
//!
//! A thin shim over the library: subcommands map to session actions, and the
//! session state (extracted text, translation, error banner) is printed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imgtrans::credential::mask;
use imgtrans::{
    ClientConfig, CredentialStore, ExportFormat, FileCredentialStore, InferenceClient, Session,
    TargetLanguage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Save the API key once
  imgtrans key set gsk_...

  # Extract text only
  imgtrans extract menu.jpg

  # Extract, translate to English, export translation.md into ./out
  imgtrans run menu.jpg --lang en --export md --output-dir out

  # Machine-readable state
  imgtrans run sign.png --lang ja --json

TARGET LANGUAGES:
  en  英语    zh  中文    ja  日语    ko  韩语

ENVIRONMENT VARIABLES:
  IMGTRANS_ENDPOINT     Chat-completions URL (default: Groq)
  IMGTRANS_MODEL        Vision model ID
  IMGTRANS_CREDENTIALS  Path of the API-key file
  IMGTRANS_API_TIMEOUT  Per-request timeout in seconds
  RUST_LOG              Override log filtering

LIMITS:
  Images larger than 4 MiB are rejected before anything is uploaded.
"#;

/// Extract text from images and translate it using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "imgtrans",
    version,
    about = "Extract text from images and translate it using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chat-completions endpoint URL.
    #[arg(long, global = true, env = "IMGTRANS_ENDPOINT")]
    endpoint: Option<String>,

    /// Vision model ID.
    #[arg(long, global = true, env = "IMGTRANS_MODEL")]
    model: Option<String>,

    /// Per-request timeout in seconds (default: transport default).
    #[arg(long, global = true, env = "IMGTRANS_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Path of the API-key file.
    #[arg(long, global = true, env = "IMGTRANS_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Strip an outer code fence, CRLF and zero-width spaces from answers.
    #[arg(long, global = true, env = "IMGTRANS_CLEAN")]
    clean: bool,

    /// Print the final session state as JSON.
    #[arg(long, global = true, env = "IMGTRANS_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMGTRANS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "IMGTRANS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the stored API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Extract text from an image and print it.
    Extract {
        /// Image file (png, jpeg, gif, webp, bmp, tiff).
        image: PathBuf,
    },

    /// Extract, translate and optionally export.
    Run {
        /// Image file (png, jpeg, gif, webp, bmp, tiff).
        image: PathBuf,

        /// Target language.
        #[arg(short, long, env = "IMGTRANS_LANG", value_enum)]
        lang: LanguageArg,

        /// Export the pair in this format.
        #[arg(short, long, value_enum)]
        export: Option<FormatArg>,

        /// Directory for the exported file.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Save (or overwrite) the API key.
    Set { key: String },
    /// Print the stored key, masked.
    Show,
    /// Print the key file location.
    Path,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    En,
    Zh,
    Ja,
    Ko,
}

impl From<LanguageArg> for TargetLanguage {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::En => TargetLanguage::En,
            LanguageArg::Zh => TargetLanguage::Zh,
            LanguageArg::Ja => TargetLanguage::Ja,
            LanguageArg::Ko => TargetLanguage::Ko,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Txt,
    Md,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Txt => ExportFormat::Txt,
            FormatArg::Md => ExportFormat::Md,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = Arc::new(match cli.credentials {
        Some(ref path) => FileCredentialStore::new(path),
        None => FileCredentialStore::open_default().context("Failed to locate key file")?,
    });

    match cli.command {
        Command::Key { ref action } => run_key(action, &store).await,
        Command::Extract { ref image } => {
            let mut session = build_session(&cli, store).await?;
            select(&mut session, image).await?;
            let ready = session.can_extract().await;
            let ok = busy(&cli, "Extracting text…", ready, session.extract()).await;
            finish(&cli, &session, ok)?;
            if cli.json {
                print_json(&session)?;
            } else {
                println!("{}", session.state().extracted_text());
            }
            Ok(())
        }
        Command::Run {
            ref image,
            lang,
            export,
            ref output_dir,
        } => {
            let mut session = build_session(&cli, store).await?;
            session.select_target_language(lang.into());
            select(&mut session, image).await?;

            let ready = session.can_extract().await;
            let ok = busy(&cli, "Extracting text…", ready, session.extract()).await;
            finish(&cli, &session, ok)?;
            let ready = session.can_translate().await;
            let ok = busy(&cli, "Translating…", ready, session.translate()).await;
            finish(&cli, &session, ok)?;

            let exported = match export {
                Some(format) => {
                    let path = session.export(format.into(), output_dir).await;
                    finish(&cli, &session, path.is_some())?;
                    path
                }
                None => None,
            };

            if cli.json {
                print_json(&session)?;
            } else {
                let state = session.state();
                println!("{}", bold("原文："));
                println!("{}", state.extracted_text());
                println!();
                println!("{}", bold("译文："));
                println!("{}", state.translated_text());
                if let (Some(path), false) = (exported, cli.quiet) {
                    eprintln!("{} exported → {}", green("✔"), bold(&path.display().to_string()));
                }
            }
            Ok(())
        }
    }
}

async fn run_key(action: &KeyAction, store: &FileCredentialStore) -> Result<()> {
    match action {
        KeyAction::Set { key } => {
            store.set(key).await.context("Failed to save API key")?;
            eprintln!("{} API key saved to {}", green("✔"), store.path().display());
        }
        KeyAction::Show => match store.get().await.context("Failed to read API key")? {
            Some(key) => println!("{}", mask(&key)),
            None => anyhow::bail!("No API key saved. Run: imgtrans key set <KEY>"),
        },
        KeyAction::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

/// Map CLI args to `ClientConfig` and open a session.
async fn build_session(cli: &Cli, store: Arc<FileCredentialStore>) -> Result<Session> {
    let mut builder = ClientConfig::builder().clean_output(cli.clean);
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    let config = builder.build().context("Invalid configuration")?;
    let client = InferenceClient::new(config).context("Failed to create HTTP client")?;
    Ok(Session::new(store as Arc<dyn CredentialStore>, client).await)
}

async fn select(session: &mut Session, image: &Path) -> Result<()> {
    if !session.select_image_file(image).await {
        anyhow::bail!(
            "{}",
            session.state().error().unwrap_or("could not select image")
        );
    }
    Ok(())
}

/// Run `action` behind a spinner unless output is quiet or JSON.
async fn busy<F: Future<Output = bool>>(
    cli: &Cli,
    message: &'static str,
    ready: bool,
    action: F,
) -> bool {
    // A rejected action returns immediately; no spinner for it.
    if !ready || cli.quiet || cli.json {
        return action.await;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    let ok = action.await;
    bar.finish_and_clear();
    ok
}

/// Turn a failed action into an error, printing the JSON state first if asked.
fn finish(cli: &Cli, session: &Session, ok: bool) -> Result<()> {
    if ok {
        if cli.verbose {
            eprintln!("{}", dim(&format!("phase: {:?}", session.state().phase())));
        }
        return Ok(());
    }
    if cli.json {
        print_json(session)?;
    }
    let msg = session.state().error().unwrap_or("unknown error").to_string();
    anyhow::bail!("{} {}", red("✘"), msg)
}

fn print_json(session: &Session) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(session.state()).context("Failed to serialise state")?
    );
    Ok(())
}
