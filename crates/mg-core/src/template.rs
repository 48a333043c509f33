//! Template for new migration files

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;

/// Render the YAML skeleton of a new migration.
///
/// The id is written as a YAML scalar, quoted whenever it would otherwise
/// read as something else.
pub fn render_template(id: &MigrationId) -> CoreResult<String> {
    let id_yaml = serde_yaml::to_string(id.as_str())?;
    Ok(format!(
        "# run_before lists migrations that must be applied after this one.\n\
         # on_load values are merged into the session state (existing keys win).\n\
         id: {}\n\
         run_before: []\n\
         description: Describe this change\n\
         on_load: {{}}\n\
         up: |\n  \
           -- forward SQL\n  \
           SELECT 1;\n\
         down: |\n  \
           -- SQL reverting the up body\n  \
           SELECT 1;\n",
        id_yaml.trim_end()
    ))
}

/// Write a new migration file `<dir>/<id>.yml`, refusing to overwrite
pub fn write_template(dir: &Path, id: &MigrationId) -> CoreResult<PathBuf> {
    if id.contains(['/', '\\']) {
        return Err(CoreError::InvalidMigrationId {
            context: format!("new migration '{id}' (path separators are not allowed)"),
        });
    }

    let path = dir.join(format!("{id}.yml"));
    if path.exists() {
        return Err(CoreError::MigrationExists {
            path: path.display().to_string(),
        });
    }

    fs::create_dir_all(dir)?;
    fs::write(&path, render_template(id)?)?;
    log::info!("Created migration {}", path.display());
    Ok(path)
}
