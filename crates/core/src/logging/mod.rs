//! Process-wide logging setup.
//!
//! `configure` turns a [`LoggerOptions`] into a [`LoggingPlan`] (two sink
//! descriptors plus per-target deferred levels), installs the global tracing
//! subscriber on first use and swaps the filter and sinks on every later call.
//! The returned [`LoggingHandle`] owns the file writer's worker guard and must
//! be kept alive for as long as the process logs.

mod correlation;
mod format;
mod rotating;

use std::{
    collections::BTreeMap,
    fs,
    io::{self, IsTerminal},
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use once_cell::sync::OnceCell;
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{
    filter::{Directive, LevelFilter, ParseError},
    fmt,
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{LogConfig, PathConfig};

pub use correlation::CorrelationLayer;
pub use format::LineFormat;
pub use rotating::RotatingFileWriter;

/// Standard severity levels with their conventional numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    #[strum(to_string = "WARNING", serialize = "WARN")]
    Warning,
    Error,
    #[strum(to_string = "CRITICAL", serialize = "FATAL")]
    Critical,
}

impl LogLevel {
    pub fn numeric(self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warning => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    /// tracing has no level above ERROR, so CRITICAL shares its filter.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SinkKind {
    RotatingFile,
    Console,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkDescriptor {
    pub kind: SinkKind,
    pub enabled: bool,
    pub max_bytes: Option<u64>,
    pub backup_count: Option<usize>,
}

/// Inputs to [`configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerOptions {
    pub project_name: String,
    pub level: LogLevel,
    pub file_sink: bool,
    pub console_sink: bool,
    pub max_bytes: u64,
    pub backup_count: usize,
    pub deferred_modules: Vec<String>,
    pub deferred_level: LogLevel,
}

impl LoggerOptions {
    /// Options derived from loaded configuration; the project name defaults
    /// to the configured module name.
    pub fn from_config(log: &LogConfig, paths: &PathConfig) -> Self {
        Self {
            project_name: paths.module_name().to_string(),
            level: log.log_level(),
            file_sink: log.enable_file_log(),
            console_sink: log.enable_console_log(),
            max_bytes: log.max_bytes(),
            backup_count: log.backup_count(),
            deferred_modules: log.deferred_modules().map(str::to_string).collect(),
            deferred_level: log.defer_log_level(),
        }
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }
}

/// What a configuration call will install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPlan {
    name: String,
    root_level: LogLevel,
    deferred: BTreeMap<String, LogLevel>,
    sinks: [SinkDescriptor; 2],
}

impl LoggingPlan {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_level(&self) -> LogLevel {
        self.root_level
    }

    pub fn sinks(&self) -> &[SinkDescriptor] {
        &self.sinks
    }

    pub fn sink(&self, kind: SinkKind) -> Option<&SinkDescriptor> {
        self.sinks.iter().find(|sink| sink.kind == kind)
    }

    pub fn deferred_modules(&self) -> impl Iterator<Item = (&str, LogLevel)> {
        self.deferred
            .iter()
            .map(|(name, level)| (name.as_str(), *level))
    }

    /// Level that applies to `target`, honouring `module::child` prefixes
    /// the same way target directives do.
    pub fn level_for(&self, target: &str) -> LogLevel {
        self.deferred
            .iter()
            .filter(|(name, _)| {
                target == name.as_str()
                    || target
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with("::"))
            })
            .max_by_key(|(name, _)| name.len())
            .map(|(_, level)| *level)
            .unwrap_or(self.root_level)
    }

    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::builder()
            .with_default_directive(self.root_level.as_filter().into())
            .parse_lossy("");
        for (name, level) in &self.deferred {
            let directive = format!("{name}={}", level.as_filter());
            let parsed: Directive =
                directive
                    .parse()
                    .map_err(|source| LoggingError::InvalidDirective {
                        directive: directive.clone(),
                        source,
                    })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Builds the sink plan for `options`. File sink first, console second.
pub fn read_configuration(options: &LoggerOptions) -> LoggingPlan {
    let deferred = options
        .deferred_modules
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| (name.to_string(), options.deferred_level))
        .collect();

    LoggingPlan {
        name: options.project_name.clone(),
        root_level: options.level,
        deferred,
        sinks: [
            SinkDescriptor {
                kind: SinkKind::RotatingFile,
                enabled: options.file_sink,
                max_bytes: Some(options.max_bytes),
                backup_count: Some(options.backup_count),
            },
            SinkDescriptor {
                kind: SinkKind::Console,
                enabled: options.console_sink,
                max_bytes: None,
                backup_count: None,
            },
        ],
    }
}

pub type BoxedSink<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Layers for the enabled sinks of `plan`, plus the guards that keep the
/// non-blocking file writer alive.
pub fn build_sinks<S>(
    plan: &LoggingPlan,
    paths: &PathConfig,
) -> Result<(Vec<BoxedSink<S>>, Vec<WorkerGuard>), LoggingError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let mut layers: Vec<BoxedSink<S>> = Vec::new();
    let mut guards = Vec::new();

    for sink in plan.sinks().iter().filter(|sink| sink.enabled) {
        match sink.kind {
            SinkKind::RotatingFile => {
                let dir = paths.logs_path();
                fs::create_dir_all(dir).map_err(|source| LoggingError::CreateLogDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
                let file = paths.log_file_path(plan.name());
                let writer = RotatingFileWriter::open(
                    &file,
                    sink.max_bytes.unwrap_or_default(),
                    sink.backup_count.unwrap_or_default(),
                )
                .map_err(|source| LoggingError::OpenLogFile { path: file, source })?;
                let (writer, guard) = NonBlockingBuilder::default()
                    .lossy(false)
                    .thread_name("jetpack-log-writer")
                    .finish(writer);
                guards.push(guard);

                let layer: BoxedSink<S> = fmt::layer()
                    .event_format(LineFormat::default())
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed();
                layers.push(layer);
            }
            SinkKind::Console => {
                let layer: BoxedSink<S> = fmt::layer()
                    .event_format(LineFormat::default())
                    .with_ansi(io::stderr().is_terminal())
                    .with_writer(io::stderr)
                    .boxed();
                layers.push(layer);
            }
        }
    }

    Ok((layers, guards))
}

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type CorrelatedRegistry = Layered<CorrelationLayer, FilteredRegistry>;

struct InstalledSubscriber {
    filter: reload::Handle<EnvFilter, Registry>,
    sinks: reload::Handle<Vec<BoxedSink<CorrelatedRegistry>>, CorrelatedRegistry>,
}

static SUBSCRIBER: OnceCell<InstalledSubscriber> = OnceCell::new();

/// Bumped by every successful `configure`; only the newest handle detaches
/// sinks on drop.
static GENERATION: AtomicU64 = AtomicU64::new(0);

fn install_subscriber() -> Result<InstalledSubscriber, LoggingError> {
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new("info"));
    let (sinks, sinks_handle) = reload::Layer::new(Vec::new());

    tracing_subscriber::registry()
        .with(filter)
        .with(CorrelationLayer)
        .with(sinks)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))?;

    Ok(InstalledSubscriber {
        filter: filter_handle,
        sinks: sinks_handle,
    })
}

/// Configures process-wide logging. Calling it again replaces the filter
/// and sinks instead of stacking new ones. Concurrent calls are not
/// coordinated beyond last-writer-wins.
///
/// Dropping the newest [`LoggingHandle`] removes its sinks, so events after
/// that point are discarded until the next call.
pub fn configure(
    options: &LoggerOptions,
    paths: &PathConfig,
) -> Result<LoggingHandle, LoggingError> {
    let plan = read_configuration(options);
    let filter = plan.env_filter()?;
    let (sinks, guards) = build_sinks::<CorrelatedRegistry>(&plan, paths)?;

    let installed = SUBSCRIBER.get_or_try_init(install_subscriber)?;
    installed
        .filter
        .reload(filter)
        .map_err(|err| LoggingError::Reload(err.to_string()))?;
    installed
        .sinks
        .reload(sinks)
        .map_err(|err| LoggingError::Reload(err.to_string()))?;
    let generation = GENERATION.fetch_add(1, Ordering::SeqCst) + 1;

    let log_file = plan
        .sink(SinkKind::RotatingFile)
        .filter(|sink| sink.enabled)
        .map(|_| paths.log_file_path(plan.name()));

    tracing::debug!(
        project = plan.name(),
        root_level = plan.root_level().as_ref(),
        deferred = plan.deferred.len(),
        file_sink = log_file.is_some(),
        "logging configured"
    );

    Ok(LoggingHandle {
        plan,
        log_file,
        generation,
        _guards: guards,
    })
}

/// Handle returned by [`configure`]. Dropping it detaches its sinks, then
/// flushes and stops the file writer.
pub struct LoggingHandle {
    plan: LoggingPlan,
    log_file: Option<PathBuf>,
    generation: u64,
    _guards: Vec<WorkerGuard>,
}

impl LoggingHandle {
    pub fn plan(&self) -> &LoggingPlan {
        &self.plan
    }

    pub fn root_level(&self) -> LogLevel {
        self.plan.root_level()
    }

    pub fn level_for(&self, target: &str) -> LogLevel {
        self.plan.level_for(target)
    }

    pub fn deferred_modules(&self) -> impl Iterator<Item = (&str, LogLevel)> {
        self.plan.deferred_modules()
    }

    pub fn sinks(&self) -> &[SinkDescriptor] {
        self.plan.sinks()
    }

    pub fn log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref()
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if GENERATION.load(Ordering::SeqCst) != self.generation {
            return;
        }
        if let Some(installed) = SUBSCRIBER.get() {
            // Only fails once the subscriber itself is gone.
            let _ = installed.sinks.reload(Vec::new());
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("plan", &self.plan)
            .field("log_file", &self.log_file)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log directive `{directive}`: {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("failed to create log directory `{}`: {source}", path.display())]
    CreateLogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open log file `{}`: {source}", path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
    #[error("failed to reload logging layers: {0}")]
    Reload(String),
}
