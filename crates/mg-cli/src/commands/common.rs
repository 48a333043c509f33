//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use mg_core::{
    discover_migrations, AppliedStore, Config, JsonLedger, LedgerBackend, Migration, Registry,
    Runner, RunnerOptions, SessionState, SqlExecutor,
};
use mg_meta::{MetaDb, MetaStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main prints nothing for it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Runner over whichever ledger backend the config selects
pub(crate) type ProjectRunner = Runner<Box<dyn AppliedStore>>;

/// A loaded project: config, root directory and open database
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) db: Rc<MetaDb>,
}

impl Project {
    /// Migration files found under the configured migration paths
    pub(crate) fn registry(&self) -> Result<Registry> {
        let executor: Rc<dyn SqlExecutor> = self.db.clone();
        let migrations =
            discover_migrations(&self.config.migration_paths_absolute(&self.root), executor)
                .context("Failed to load migration files")?;

        let mut registry = Registry::new();
        for migration in migrations {
            log::debug!("Found migration {} in {}", migration.id(), migration.path().display());
            registry.register(Box::new(migration))?;
        }
        Ok(registry)
    }

    /// The ledger backend named by `ledger.backend`
    pub(crate) fn store(&self) -> Result<Box<dyn AppliedStore>> {
        match self.config.ledger.backend {
            LedgerBackend::DuckDb => Ok(Box::new(MetaStore::new(self.db.clone()))),
            LedgerBackend::Json => {
                let path = self.config.ledger_path_absolute(&self.root);
                let ledger = JsonLedger::open(&path)
                    .with_context(|| format!("Failed to open ledger {}", path.display()))?;
                Ok(Box::new(ledger))
            }
        }
    }

    /// Initial session state from the config's `state` map
    pub(crate) fn session_state(&self) -> Result<SessionState> {
        SessionState::from_yaml(&self.config.state).context("Invalid value in config 'state'")
    }

    /// Build a runner for one batch; resolving the order may fail here
    pub(crate) fn runner(&self, global: &GlobalArgs) -> Result<ProjectRunner> {
        let options = RunnerOptions {
            dry_run: global.dry_run,
            rollback_policy: self.config.rollback_policy,
        };
        let runner = Runner::new(self.registry()?, self.store()?, self.session_state()?, options)?;
        Ok(runner)
    }
}

/// Project directory from the global arguments
pub(crate) fn project_root(global: &GlobalArgs) -> PathBuf {
    global.project_dir.clone()
}

/// Load the config from `--config` or the project directory
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let root = project_root(global);
    let config = match &global.config {
        Some(path) => Config::load(&resolve(&root, path))?,
        None => Config::load_from_dir(&root)?,
    };
    Ok(config)
}

/// Load the config and open the database it points at.
///
/// A dry run never creates the database file or writes the ledger schema.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = project_root(global);
    let config = load_config(global).context("Failed to load project config")?;

    let db = match config.database_path_absolute(&root) {
        Some(path) if global.dry_run => match MetaDb::open_read_only(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?
        {
            Some(db) => db,
            None => {
                log::debug!("No ledger in {}; dry run starts from empty", path.display());
                MetaDb::open_memory().context("Failed to open in-memory database")?
            }
        },
        Some(path) => MetaDb::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?,
        None => MetaDb::open_memory().context("Failed to open in-memory database")?,
    };

    Ok(Project {
        root,
        config,
        db: Rc::new(db),
    })
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
