//! Info command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, InfoArgs};
use crate::commands::common::load_project;

/// Execute the info command
pub(crate) fn execute(args: &InfoArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let runner = project.runner(global)?;

    match &args.id {
        Some(id) => println!("{}", runner.info(id)?),
        None => {
            for id in runner.dag().apply_order() {
                println!("{}: {}", id, runner.info(id)?);
            }
        }
    }

    Ok(())
}
