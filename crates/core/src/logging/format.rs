use std::fmt;

use chrono::Local;
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

use crate::context::CorrelationId;

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `<time> - <LEVEL> - [<thread>:<target>(): <line>] [<correlation id>] - <message>`
///
/// The target stands in for the calling function, which tracing does not
/// record. A missing correlation id renders as `-`.
#[derive(Debug, Clone)]
pub struct LineFormat {
    time_format: String,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::with_time_format(DEFAULT_TIME_FORMAT)
    }
}

impl LineFormat {
    pub fn with_time_format(time_format: impl Into<String>) -> Self {
        Self {
            time_format: time_format.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let thread = std::thread::current();
        let correlation_id = ctx.event_scope().and_then(|scope| {
            scope
                .into_iter()
                .find_map(|span| span.extensions().get::<CorrelationId>().cloned())
        });

        write!(
            writer,
            "{} - {:<6} - [{}:{}(): ",
            Local::now().format(&self.time_format),
            meta.level().as_str(),
            thread.name().unwrap_or("unnamed"),
            meta.target(),
        )?;
        match meta.line() {
            Some(line) => write!(writer, "{line}")?,
            None => writer.write_str("?")?,
        }
        write!(
            writer,
            "] [{}] - ",
            correlation_id.as_ref().map_or("-", CorrelationId::as_str)
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
