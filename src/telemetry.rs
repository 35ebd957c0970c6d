//! Telemetry setup
//!
//! [`setup_telemetry`] installs the log subscriber and builds the exporters
//! for one workflow name. The returned [`Telemetry`] is handed to the
//! workflow builder; nothing here is kept in process-wide state apart from
//! the log subscriber, which can only be installed once.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ExporterKind, WorkflowConfig};
use crate::error::{Result, WorkflowError};
use crate::trace::{
    ConsoleExporter, FileExporter, InMemoryExporter, TraceExporter, TraceRecord, TracingContext,
};

static LOGGING: OnceLock<()> = OnceLock::new();

/// Installs the fmt subscriber filtered by `RUST_LOG`, or by `default_level`
/// when `RUST_LOG` is unset. Later calls are no-ops.
pub fn init_logging(default_level: &str) {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        // Fails only when another subscriber is already set, which is fine.
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .try_init();
    });
}

/// Exporters for one workflow name.
#[derive(Clone)]
pub struct Telemetry {
    workflow_name: String,
    exporters: Vec<Arc<dyn TraceExporter>>,
    memory: Option<InMemoryExporter>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("workflow_name", &self.workflow_name)
            .field("exporters", &self.exporters.len())
            .finish()
    }
}

impl Telemetry {
    /// Telemetry with no exporters; traces are still collected per run.
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            exporters: Vec::new(),
            memory: None,
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// Adds an in-memory exporter whose traces can be read back with
    /// [`Telemetry::exported`].
    pub fn with_memory_exporter(mut self) -> Self {
        if self.memory.is_none() {
            let memory = InMemoryExporter::new();
            self.exporters.push(Arc::new(memory.clone()));
            self.memory = Some(memory);
        }
        self
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn exporter_count(&self) -> usize {
        self.exporters.len()
    }

    /// Traces seen by the in-memory exporter, empty when there is none.
    pub fn exported(&self) -> Vec<TraceRecord> {
        self.memory
            .as_ref()
            .map(InMemoryExporter::traces)
            .unwrap_or_default()
    }

    /// Sends the trace through every exporter. All exporters are tried; the
    /// first failure is returned.
    pub fn export(&self, context: &TracingContext) -> Result<()> {
        let record = context.to_record(&self.workflow_name);
        debug!(
            trace_id = %record.trace_id,
            spans = record.spans.len(),
            exporters = self.exporters.len(),
            "Exporting trace"
        );

        let mut first_error = None;
        for exporter in &self.exporters {
            if let Err(e) = exporter.export(&record) {
                warn!(trace_id = %record.trace_id, error = %e, "Trace export failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(WorkflowError::TelemetryError(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Installs logging and builds the exporters named in `config`.
///
/// Safe to call more than once; each call returns an independent
/// [`Telemetry`].
pub fn setup_telemetry(config: &WorkflowConfig) -> Result<Telemetry> {
    init_logging(&config.log_level);

    if config.workflow_name.trim().is_empty() {
        return Err(WorkflowError::TelemetryError(
            "workflow name must not be empty".to_string(),
        ));
    }

    let mut telemetry = Telemetry::new(config.workflow_name.clone());
    for kind in &config.exporters {
        telemetry = match kind {
            ExporterKind::File => {
                telemetry.with_exporter(Arc::new(FileExporter::new(config.trace_dir.clone())))
            }
            ExporterKind::Console => telemetry.with_exporter(Arc::new(ConsoleExporter)),
            ExporterKind::Memory => telemetry.with_memory_exporter(),
        };
    }

    debug!(
        workflow = %config.workflow_name,
        exporters = ?config.exporters,
        "Telemetry configured"
    );
    Ok(telemetry)
}
