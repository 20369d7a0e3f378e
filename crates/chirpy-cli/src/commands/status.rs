//! Status command handler

use anyhow::Result;

use chirpy_core::Store;

use crate::output::Output;

/// Show where the store lives and how much it holds
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats()?;
    output.print_stats(&store.path().display().to_string(), &stats)
}
