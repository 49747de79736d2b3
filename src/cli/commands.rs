//! Command implementations for the contingency CLI.
//!
//! Every command loads the config first; flags override config values.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use contingency_core::config::{default_config_path, validate_drive_id, Config};
use contingency_core::drive::{DownloadReport, TransferProgress};
use contingency_core::lookup::CustomerRecord;
use contingency_core::transform::run as run_transform;
use contingency_core::{
    Credential, CredentialManager, DriveClient, DriveError, Downloader, RecordIndex, Uploader,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

pub fn config_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(default_config_path)
}

/// Load and validate the config, defaults when the file is missing
pub fn load_config(path: &Path) -> Result<Config> {
    tracing::debug!("Using config {}", path.display());
    let config = Config::load_or_default(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// A flag value, or the config value, or an error naming both
fn required<T: Clone>(flag: Option<T>, configured: &Option<T>, what: &str) -> Result<T> {
    match flag.or_else(|| configured.clone()) {
        Some(value) => Ok(value),
        None => bail!("Missing {}: pass it as an argument or set it in the config", what),
    }
}

fn credentials(config: &Config) -> Result<Credential> {
    let manager = CredentialManager::from_config(&config.auth).with_prompt(|url, opened| {
        if opened {
            println!("Your browser has been opened to visit:");
        } else {
            println!("Please visit this URL to authorize this application:");
        }
        println!("{}", url.blue().underline());
        println!();
    });

    manager
        .get_credentials()
        .with_context(|| "Cannot obtain Google Drive credentials")
}

// ============ AUTH COMMAND ============

pub fn auth(config: &Config) -> Result<()> {
    println!("{}", "Google Drive Authentication".bold().cyan());

    let credential = credentials(config)?;

    println!("{}", "✓ Credentials ready".green());
    match credential.expiry {
        Some(expiry) => println!("  Access token expires at {}", expiry.to_rfc3339()),
        None => println!("  Access token has no expiry"),
    }
    println!(
        "  Cached in {}",
        config.auth.token_cache_path.display().to_string().dimmed()
    );
    Ok(())
}

// ============ DOWNLOAD COMMAND ============

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("  [{bar:40.cyan/blue}] {pos}% {msg}")?.progress_chars("█▓░"),
    );
    Ok(pb)
}

pub fn download(config: &Config, file_id: Option<String>, destination: Option<PathBuf>) -> Result<()> {
    let file_id = required(file_id, &config.download.file_id, "file id")?;
    validate_drive_id("file id", &file_id)?;
    let destination = destination.or_else(|| config.download.destination.clone());

    let credential = credentials(config)?;
    let client = DriveClient::new(&credential)?;
    let downloader = Downloader::new(client).with_chunk_size(config.download.chunk_size);

    let pb = progress_bar()?;
    let result = downloader.download(&file_id, destination.as_deref(), |p: &TransferProgress| {
        if let Some(percent) = p.percent {
            pb.set_position(u64::from(percent));
        }
        pb.set_message(format!("{} bytes", p.bytes));
    });

    report_download(result, &pb)
}

/// Print the outcome of a download. Remote failures are reported and
/// swallowed; local I/O errors propagate.
fn report_download(result: Result<DownloadReport, DriveError>, pb: &ProgressBar) -> Result<()> {
    match result {
        Ok(report) => {
            pb.finish();
            println!(
                "{} Downloaded '{}' to {}",
                "✓".green(),
                report.file.name,
                report.destination.display()
            );
            Ok(())
        }
        Err(DriveError::NotFound { file_id }) => {
            pb.abandon();
            println!(
                "{}",
                format!(
                    "File {} not found (404). Check the file id and that your account can access it.",
                    file_id
                )
                .red()
            );
            Ok(())
        }
        Err(e) if e.is_remote() => {
            pb.abandon();
            println!("{}", format!("Download failed: {}", e).red());
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e).with_context(|| "Cannot write downloaded file")
        }
    }
}

// ============ UPLOAD COMMANDS ============

fn local_file(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    required(flag, &config.upload.local_path, "local file")
}

pub fn upload(
    config: &Config,
    local_path: Option<PathBuf>,
    name: Option<String>,
    parent: Option<String>,
    shared_drive: Option<String>,
) -> Result<()> {
    let local_path = local_file(local_path, config)?;
    let parent = required(parent, &config.upload.parent_folder_id, "parent folder id")?;
    validate_drive_id("parent folder id", &parent)?;
    let shared_drive = shared_drive.or_else(|| config.upload.shared_drive_id.clone());
    if let Some(id) = &shared_drive {
        validate_drive_id("shared drive id", id)?;
    }

    let name = match name.or_else(|| config.upload.remote_name.clone()) {
        Some(name) => name,
        None => local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("No file name in {}", local_path.display()))?,
    };

    let credential = credentials(config)?;
    let uploader = Uploader::new(DriveClient::new(&credential)?);
    let id = uploader
        .create(&local_path, &name, &parent, shared_drive.as_deref())
        .with_context(|| format!("Cannot upload {}", local_path.display()))?;

    println!("{} Uploaded '{}' with id {}", "✓".green(), name, id.cyan());
    Ok(())
}

pub fn overwrite(config: &Config, local_path: Option<PathBuf>, file_id: Option<String>) -> Result<()> {
    let local_path = local_file(local_path, config)?;
    let file_id = required(file_id, &config.upload.file_id, "file id")?;
    validate_drive_id("file id", &file_id)?;

    let credential = credentials(config)?;
    let uploader = Uploader::new(DriveClient::new(&credential)?);
    let id = uploader
        .overwrite(&local_path, &file_id)
        .with_context(|| format!("Cannot overwrite {}", file_id))?;

    println!("{} Updated file id: {}", "✓".green(), id.cyan());
    Ok(())
}

// ============ TRANSFORM COMMAND ============

pub fn transform(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let mut settings = config.transform.clone();
    if let Some(input) = input {
        settings.input = input;
    }
    if let Some(output) = output {
        settings.output = output;
    }

    println!("{}", "Transforming extract".bold().cyan());
    let report = run_transform(&settings)
        .with_context(|| format!("Cannot transform {}", settings.input.display()))?;

    println!(
        "{} {} rows written to {}",
        "✓".green(),
        report.rows.to_string().green().bold(),
        report.output.display()
    );
    Ok(())
}

// ============ LOOKUP COMMANDS ============

fn open_index(config: &Config, file: Option<PathBuf>) -> Result<RecordIndex> {
    let file = file.unwrap_or_else(|| config.lookup.file.clone());
    RecordIndex::load(&file, &config.lookup)
        .with_context(|| format!("Cannot load extract {}", file.display()))
}

fn print_customer(record: &CustomerRecord) {
    println!(
        "{} {}",
        record.id.cyan().bold(),
        record.holder_name.as_deref().unwrap_or("-").white().bold()
    );
    if let Some(collector) = &record.collector {
        println!("  Collector: {}", collector.yellow());
    }
    for (idx, obligation) in record.obligations.iter().enumerate() {
        println!("  {}.", (idx + 1).to_string().cyan());
        for (column, value) in &obligation.fields {
            println!(
                "     {}: {}",
                column.dimmed(),
                value.as_deref().unwrap_or("")
            );
        }
    }
}

pub fn lookup(config: &Config, id: &str, file: Option<PathBuf>) -> Result<()> {
    let index = open_index(config, file)?;
    match index.customer(id) {
        Some(record) => print_customer(&record),
        None => println!("{}", format!("No records for {}", id.trim()).yellow()),
    }
    Ok(())
}

pub fn suggest(config: &Config, fragment: &str, limit: usize, file: Option<PathBuf>) -> Result<()> {
    let index = open_index(config, file)?;
    let suggestions = index.suggest(fragment, limit);
    if suggestions.is_empty() {
        println!("{}", "No suggestions".yellow());
        return Ok(());
    }

    for s in suggestions {
        println!(
            "  {} {} {}",
            s.id.cyan(),
            s.holder_name.as_deref().unwrap_or("-"),
            s.collector.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}

// ============ CONFIG COMMANDS ============

pub fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to replace it)",
            path.display()
        );
    }
    Config::default().save(path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

pub fn config_show(config: &Config, path: &Path) -> Result<()> {
    println!("{}", format!("# {}", path.display()).dimmed());
    let rendered = toml::to_string_pretty(config).context("Cannot render config")?;
    print!("{}", rendered);
    Ok(())
}
