use std::path::PathBuf;
use std::sync::Arc;

use docwatch_lib::config::{MonitorConfig, SettingsStore};
use docwatch_lib::logging::init_logging;
use docwatch_lib::production::{NotifyFileWatcher, TokioTaskExecutor};
use docwatch_lib::{DatabaseChange, DatabaseChangeMonitor, JsonDocumentFormat, MonitoredDocument, RecordDatabase};

fn usage() -> ! {
    eprintln!("usage: docwatch <document.json> [settings.sqlite]");
    std::process::exit(2);
}

fn describe(change: &DatabaseChange) -> String {
    match change {
        DatabaseChange::Added(record) => format!("added {}", record.key),
        DatabaseChange::Removed(record) => format!("removed {}", record.key),
        DatabaseChange::Modified { after, .. } => {
            format!("modified {} ({})", after.key, change.changed_fields().join(", "))
        }
        DatabaseChange::PreambleChanged { .. } => "preamble changed".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args_os().skip(1);
    let document_path = PathBuf::from(args.next().unwrap_or_else(|| usage()));
    let settings_path = args.next().map(PathBuf::from);

    let log_dir = std::env::var_os("DOCWATCH_LOG_DIR").map(PathBuf::from);
    let _guard = init_logging(log_dir.as_deref())?;

    let config = match &settings_path {
        Some(path) => MonitorConfig::from_settings(&SettingsStore::open(path)?)?,
        None => MonitorConfig::default(),
    };
    tracing::info!(debounce_ms = config.debounce.as_millis() as u64, "docwatch starting");

    let document = MonitoredDocument::open(&document_path, &JsonDocumentFormat)?;
    let watcher = Arc::new(NotifyFileWatcher::new(config.debounce)?);
    let (executor, mut completions) =
        TokioTaskExecutor::with_interactive_queue(tokio::runtime::Handle::current());

    let monitor = Arc::new(
        DatabaseChangeMonitor::builder(document.clone(), watcher, Arc::new(executor))
            .config(config)
            .start(),
    );
    if !monitor.is_active() {
        return Err(format!("could not monitor {}", document_path.display()).into());
    }

    // Accept every external change: adopt the disk version, then checkpoint
    let weak = Arc::downgrade(&monitor);
    let accepted_path = document_path.clone();
    monitor.add_listener(Arc::new(move |changes: &[DatabaseChange]| {
        for change in changes {
            tracing::info!(change = %describe(change), "External change");
        }
        match RecordDatabase::load(&accepted_path, &JsonDocumentFormat) {
            Ok(on_disk) => document.replace(on_disk),
            Err(e) => {
                tracing::warn!(error = %e, "Could not reload document, keeping in-memory state");
                return;
            }
        }
        if let Some(monitor) = weak.upgrade() {
            monitor.mark_external_changes_as_resolved();
        }
    }));

    loop {
        tokio::select! {
            more = completions.run_next() => {
                if !more {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    monitor.unregister();
    Ok(())
}
