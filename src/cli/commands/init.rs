//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let tables = ctx.list_tables().await?;
    println!("  {} {} tables ready", style("✓").green(), tables.len());

    println!(
        "{} Initialized mediawatch in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
