//! Binary entry point: read the config, start file logging, build an empty
//! catalog and drive the Ratatui event loop until the user exits. Nothing is
//! persisted; the catalog lives as long as the process.
use anyhow::Context;
use library_catalog::{init_logging, run_app, App, Catalog, CatalogConfig};
use tracing::error;

fn main() -> anyhow::Result<()> {
    let config = CatalogConfig::load()?;
    init_logging(&config.log, &config.log_file()?)?;

    let catalog = Catalog::new(config.loans.on_delete).context("failed to open catalog")?;
    let mut app = App::new(catalog)?;

    let result = run_app(&mut app);
    if let Err(err) = &result {
        error!(error = %err, "terminal session failed");
    }
    result
}
