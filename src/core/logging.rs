//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::*;
use std::fs::File;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs what the bot will be able to do with the loaded configuration.
///
/// Nothing here is fatal: a bot without Google client credentials still answers `/help`,
/// and one without a Mega account still mirrors plain HTTP links.
pub fn log_startup_configuration(config: &crate::core::config::Config) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  drivelink configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Workers: {}", config.workers);
    log::info!("Drive folder: {}", config.drive_folder_name);
    log::info!("Credentials dir: {}", config.credentials_dir.display());
    log::info!("Download dir: {}", config.download_dir.display());

    if config.fallback_downloader {
        log::info!("✅ Fallback downloader enabled ({} segments)", config.fallback_segments);
    } else {
        log::info!("Fallback downloader disabled");
    }

    if config.google_client_id.is_empty() || config.google_client_secret().is_empty() {
        log::error!("❌ Google client id/secret not set - /auth and uploads will FAIL");
    } else {
        log::info!("✅ Google OAuth client configured");
    }

    if config.mega_email.is_empty() || config.mega_password().is_empty() {
        log::warn!("⚠️  Mega account not set - mega.nz links will FAIL");
    } else {
        log::info!("✅ Mega account: {} (via {})", config.mega_email, config.megatools_bin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A second init in the same test binary fails; only the file creation matters.
        let _ = init_logger(path);
        assert!(temp_file.path().exists());
    }
}
