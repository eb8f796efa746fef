use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::{load_last_session, save_last_session};
use crate::cli::output::get_formatter;
use crate::client::DaemonClient;
use crate::extract::extract_text;
use crate::models::{Config, OutputFormat};
use crate::providers::Provider;
use crate::server::protocol::UploadRequest;

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(required = true, help = "Path to the document (UTF-8 text)")]
    pub file: PathBuf,

    #[arg(long, short = 'p', help = "AI provider: openai or gemini")]
    pub provider: Option<Provider>,

    #[arg(
        long,
        short = 'k',
        help = "API key (falls back to OPENAI_API_KEY / GEMINI_API_KEY)"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        short = 's',
        help = "Session to add the document to (defaults to the last session)"
    )]
    pub session: Option<String>,

    #[arg(long, help = "Start a fresh session even if one is active")]
    pub new_session: bool,
}

pub async fn handle_upload(args: UploadArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let provider = args.provider.unwrap_or(config.providers.default_provider);
    let api_key = resolve_api_key(args.api_key, provider)?;

    let text = extract_text(&args.file, config.session.max_upload_bytes)
        .with_context(|| format!("failed to extract text from {}", args.file.display()))?;

    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.display().to_string());

    let session_id = if args.new_session {
        None
    } else {
        args.session.or_else(load_last_session)
    };

    if verbose {
        eprintln!("Provider: {provider}");
        eprintln!("Document: {} ({} chars)", filename, text.chars().count());
        if let Some(ref id) = session_id {
            eprintln!("Session:  {id}");
        }
    }

    let client = DaemonClient::new(&config);
    let response = client
        .upload(UploadRequest {
            session_id,
            filename,
            text,
            provider,
            api_key,
        })
        .await
        .context("upload failed")?;

    save_last_session(&response.session_id);
    print!("{}", formatter.format_upload(&response));

    Ok(())
}

fn resolve_api_key(flag: Option<String>, provider: Provider) -> Result<String> {
    if let Some(key) = flag {
        return Ok(key);
    }
    let var = match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Gemini => "GEMINI_API_KEY",
    };
    std::env::var(var).with_context(|| format!("no API key: pass --api-key or set {var}"))
}
