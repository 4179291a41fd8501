//! Console logging backend.

use std::io::{self, Write};

use super::LoggerBackend;
use crate::error::Result;
use crate::models::{MetricValue, Metrics};

/// Logger that prints each metric record as one line.
///
/// Lines look like `step:3 - acc:0.910 - loss:0.250`. Only numeric values are
/// printed (booleans count as 0/1), keys in sorted order.
pub struct ConsoleBackend {
    out: Box<dyn Write + Send>,
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleBackend {
    /// Print to standard output.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }
}

/// Render one record the way the console backend prints it.
pub fn format_console_line(data: &Metrics, step: u64) -> String {
    let mut keys: Vec<_> = data.keys().collect();
    keys.sort();

    let mut output = format!("step:{}", step);
    for key in keys {
        let number = match &data[key] {
            MetricValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_f64(),
        };
        if let Some(v) = number {
            output.push_str(&format!(" - {}:{:.3}", key, v));
        }
    }
    output
}

impl LoggerBackend for ConsoleBackend {
    fn log(&mut self, data: &Metrics, step: u64) -> Result<()> {
        writeln!(self.out, "{}", format_console_line(data, step))?;
        self.out.flush()?;
        Ok(())
    }
}
