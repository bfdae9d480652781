use super::config::{default_config_path, CertgovConfig, ADDRESS_BOOK_FILE};
use std::path::PathBuf;

/// Write a commented default config file.
///
/// The deployment record defaults to `deployedAddresses.json` beside the
/// config file, where the deploy scripts can copy it.
pub fn execute(
    config_path: Option<PathBuf>,
    address_book: Option<PathBuf>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.unwrap_or_else(default_config_path);
    if config_path.exists() && !force {
        return Err(format!(
            "config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    let address_book = address_book.unwrap_or_else(|| PathBuf::from(ADDRESS_BOOK_FILE));
    CertgovConfig::create_default(&config_path, &address_book)?;

    println!("📝 Created: {}", config_path.display());
    println!("   Deployment record: {}", address_book.display());
    Ok(())
}
