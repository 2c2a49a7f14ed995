// src/watch.rs
//! Event-driven re-indexing.
//!
//! Watches the indexed root and keeps the index in sync: changed files are
//! re-indexed (their previous units dropped first), deleted files are
//! forgotten. The watch loop blocks its thread until the watcher dies.

use crate::lang::Lang;
use crate::tools::StructureTools;
use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;

/// Applies one filesystem event to the index.
pub fn handle_event(tools: &mut StructureTools, event: &Event) {
    for path in &event.paths {
        let analyzable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Lang::from_ext)
            .is_some();
        if !analyzable {
            continue;
        }
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                let units = tools.reindex_file(path);
                if tools.config().verbose {
                    eprintln!("re-indexed {} ({units} unit(s))", path.display());
                }
            }
            EventKind::Remove(_) => {
                tools.forget_file(path);
                if tools.config().verbose {
                    eprintln!("forgot {}", path.display());
                }
            }
            _ => {}
        }
    }
}

/// Watches `root` recursively and applies events until the channel closes.
///
/// # Errors
///
/// Returns an error when the watcher cannot be created or attached.
pub fn watch(tools: &mut StructureTools, root: &Path) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())
        .context("creating file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .context("watching indexed root")?;

    for result in rx {
        match result {
            Ok(event) => handle_event(tools, &event),
            Err(e) => {
                if tools.config().verbose {
                    eprintln!("watch error: {e}");
                }
            }
        }
    }
    Ok(())
}
