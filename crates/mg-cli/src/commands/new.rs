//! New command implementation

use anyhow::{Context, Result};
use mg_core::{write_template, MigrationId};

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::{load_config, project_root};

/// Execute the new command
pub(crate) fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let root = project_root(global);
    let dir = match &args.dir {
        Some(dir) => root.join(dir),
        None => {
            let config = load_config(global).context("Failed to load project config")?;
            config
                .migration_paths_absolute(&root)
                .into_iter()
                .next()
                .context("No migration_paths configured")?
        }
    };

    let id = MigrationId::try_new(args.id.as_str())
        .context("Migration id must not be empty")?;
    let path = write_template(&dir, &id)?;
    println!("Created {}", path.display());

    Ok(())
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;
