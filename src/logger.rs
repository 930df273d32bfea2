// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Logger implementation for firmware environments.
//!
//! The embedding firmware supplies a [`LogSink`] for wherever its console
//! lives; [`init`] wires it up as the global [`log`] logger. Cores share one
//! console, so [`LockedWriter`] is provided to serialise a `core::fmt::Write`
//! implementation behind a spin lock.

use core::fmt::{self, Write};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::{Once, mutex::SpinMutex};

static LOGGER: Once<Logger> = Once::new();

/// The destination for log messages, which must be shareable between cores.
pub trait LogSink: Sync {
    /// Writes the given formatted string to the sink.
    fn write_fmt(&self, args: fmt::Arguments);
}

struct Logger {
    sink: &'static dyn LogSink,
}

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        writeln!(self.sink, "{}: {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// Initialises the global logger to write to the given sink.
///
/// Returns an error if called more than once.
pub fn init(sink: &'static dyn LogSink, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.call_once(|| Logger { sink });
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

/// A [`LogSink`] wrapping a `Write` implementation behind a spin lock, so
/// that lines from different cores do not interleave.
pub struct LockedWriter<W: Write> {
    writer: SpinMutex<W>,
}

impl<W: Write> LockedWriter<W> {
    /// Creates a new locked sink around `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: SpinMutex::new(writer),
        }
    }
}

impl<W: Write + Send> LogSink for LockedWriter<W> {
    fn write_fmt(&self, args: fmt::Arguments) {
        let _ = self.writer.lock().write_fmt(args);
    }
}
