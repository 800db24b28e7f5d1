use crate::config::types::{
    Config, HttpConfig, MirrorConfig, NotifyConfig, ReconcileConfig, UploadConfig,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_mirror_config(&config.mirror)?;
    validate_reconcile_config(&config.reconcile)?;
    validate_upload_config(&config.upload)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "mirror program cannot be empty".to_string(),
        ));
    }

    if config.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download-dir cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "mirror timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.tries == 0 || config.page_tries == 0 {
        return Err(ConfigError::Validation(format!(
            "tries and page-tries must be >= 1, got {} and {}",
            config.tries, config.page_tries
        )));
    }

    Ok(())
}

/// Validates reconciliation settings
fn validate_reconcile_config(config: &ReconcileConfig) -> Result<(), ConfigError> {
    if config.sections.is_empty() && config.enabled {
        return Err(ConfigError::Validation(
            "reconcile is enabled but no sections are configured".to_string(),
        ));
    }

    for section in &config.sections {
        validate_section_name(section)?;
    }

    if let Some(section) = &config.archive_listing_section {
        validate_section_name(section)?;
    }

    if config.archive_listing_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "archive-listing-path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.exhaustive_threshold < 1 {
        return Err(ConfigError::Validation(
            "exhaustive-threshold must be >= 1".to_string(),
        ));
    }

    if config.pagination_bounds.is_empty() {
        return Err(ConfigError::Validation(
            "pagination-bounds cannot be empty".to_string(),
        ));
    }

    if config.pagination_bounds[0] == 0
        || config.pagination_bounds.windows(2).any(|w| w[0] >= w[1])
    {
        return Err(ConfigError::Validation(format!(
            "pagination-bounds must be positive and strictly ascending, got {:?}",
            config.pagination_bounds
        )));
    }

    if config.probe_timeout_secs == 0
        || config.pagination_timeout_secs == 0
        || config.listing_timeout_secs == 0
    {
        return Err(ConfigError::Validation(
            "probe, pagination and listing timeouts must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

fn validate_upload_config(config: &UploadConfig) -> Result<(), ConfigError> {
    if config.bucket.trim().is_empty() {
        return Err(ConfigError::Validation(
            "upload bucket cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if config.mail_program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "mail-program cannot be empty".to_string(),
        ));
    }

    if let Some(email) = &config.email {
        validate_email(email)?;
    }

    Ok(())
}

/// Section names are single path segments
fn validate_section_name(section: &str) -> Result<(), ConfigError> {
    if section.is_empty() {
        return Err(ConfigError::Validation(
            "section name cannot be empty".to_string(),
        ));
    }

    if section.contains('/') || section.contains('?') || section.contains('#') {
        return Err(ConfigError::Validation(format!(
            "section '{}' must be a single path segment",
            section
        )));
    }

    Ok(())
}

/// Basic email validation
pub(crate) fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation("email cannot be empty".to_string()));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
