pub mod config;
pub mod review;
pub mod stack;

use super::output::Output;
use crate::engine::LocalStackEngine;
use crate::errors::{LadderError, Result};
use crate::stack::{EventSink, Severity, StackEvent, StackManager};
use std::env;
use std::sync::Arc;

/// Print progress events. Warnings and errors reach the user through the
/// log, so only informational events are shown here.
fn event_printer(verbose: bool) -> EventSink {
    Arc::new(move |event: &StackEvent| match event.severity() {
        Severity::Information => match event {
            StackEvent::Message { text, .. } => Output::info(text),
            other => Output::success(other),
        },
        Severity::Detail if !verbose => Output::sub_item(event),
        _ => {}
    })
}

/// Engine for the repository containing the working directory
pub(crate) fn open_engine(verbose: bool) -> Result<LocalStackEngine> {
    let current_dir = env::current_dir()
        .map_err(|e| LadderError::config(format!("Could not get current directory: {e}")))?;
    let manager = StackManager::open(&current_dir)?.with_event_sink(event_printer(verbose));
    Ok(LocalStackEngine::new(manager))
}
