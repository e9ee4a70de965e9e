use indicatif::ProgressBar;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Installs the stderr subscriber. `RUST_LOG` overrides the verbosity flags.
/// With a live progress bar, each log record is printed above the bar.
pub fn init(verbose: u8, quiet: bool, bar: Option<&ProgressBar>) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(BarWriter(bar.cloned()))
        .try_init();
}

fn directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info,ignore=warn,globset=warn",
        1 => "debug,ignore=warn,globset=warn",
        _ => "trace",
    }
}

#[derive(Clone)]
struct BarWriter(Option<ProgressBar>);

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = Record;

    fn make_writer(&'a self) -> Self::Writer {
        Record {
            bar: self.0.clone(),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Buffers one formatted event and emits it on drop, with the bar cleared.
struct Record {
    bar: Option<ProgressBar>,
    buf: Vec<u8>,
}

impl Record {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        let write = || {
            let _ = io::stderr().lock().write_all(&buf);
        };
        match &self.bar {
            Some(bar) => bar.suspend(write),
            None => write(),
        }
    }
}

impl Write for Record {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        self.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert!(directive(0).starts_with("info,"));
        assert!(directive(1).starts_with("debug,"));
        assert_eq!(directive(5), "trace");
        for v in 0..3 {
            assert!(directive(v).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn record_buffers_until_dropped() {
        let bar = ProgressBar::hidden();
        let writer = BarWriter(Some(bar));
        let mut record = writer.make_writer();
        record.write_all(b"line one\n").unwrap();
        record.write_all(b"line two\n").unwrap();
        assert_eq!(record.buf, b"line one\nline two\n");
        record.emit();
        assert!(record.buf.is_empty());
    }
}
