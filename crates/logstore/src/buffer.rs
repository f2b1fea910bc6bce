//! Per-channel line accumulator.

use chatlog_core::{Error, LogLine, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use telemetry::metrics;

/// Accumulates serialized lines per registered channel until the next drain.
///
/// Appends to different channels only share the map read lock. A drain takes
/// the write lock, so every channel is captured in one step: an append either
/// completes before the drain (and is in it) or starts after it (and waits
/// for the next one).
#[derive(Debug, Default)]
pub struct ChannelBuffer {
    channels: RwLock<HashMap<String, Mutex<Vec<LogLine>>>>,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with the given channels registered.
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buffer = Self::new();
        for channel in channels {
            buffer.register(channel);
        }
        buffer
    }

    /// Registers a channel. Returns `false` if it was already registered.
    pub fn register(&self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        let mut channels = self.channels.write();
        if channels.contains_key(&channel) {
            return false;
        }
        channels.insert(channel, Mutex::new(Vec::new()));
        metrics().registered_channels.set(channels.len() as u64);
        true
    }

    pub fn is_registered(&self, channel: &str) -> bool {
        self.channels.read().contains_key(channel)
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Appends a line to the end of a channel's sequence.
    pub fn append(&self, channel: &str, line: LogLine) -> Result<()> {
        let channels = self.channels.read();
        let Some(lines) = channels.get(channel) else {
            metrics().unregistered_channel_errors.inc();
            return Err(Error::unregistered_channel(channel));
        };
        lines.lock().push(line);
        metrics().buffered_lines.inc();
        Ok(())
    }

    /// Captures and empties every channel's sequence.
    ///
    /// The result has an entry for every registered channel, empty or not.
    pub fn drain_all(&self) -> BTreeMap<String, Vec<LogLine>> {
        let channels = self.channels.write();
        let drained: BTreeMap<String, Vec<LogLine>> = channels
            .iter()
            .map(|(name, lines)| (name.clone(), std::mem::take(&mut *lines.lock())))
            .collect();
        metrics().buffered_lines.set(0);
        drained
    }

    /// Puts lines back at the head of a channel's sequence, ahead of anything
    /// appended since they were drained.
    pub fn requeue(&self, channel: &str, lines: Vec<LogLine>) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let channels = self.channels.read();
        let Some(pending) = channels.get(channel) else {
            return Err(Error::unregistered_channel(channel));
        };
        let count = lines.len() as u64;
        let mut pending = pending.lock();
        let newer = std::mem::replace(&mut *pending, lines);
        pending.extend(newer);
        metrics().buffered_lines.inc_by(count);
        Ok(())
    }

    /// Pending line count per channel.
    pub fn pending(&self) -> BTreeMap<String, usize> {
        self.channels
            .read()
            .iter()
            .map(|(name, lines)| (name.clone(), lines.lock().len()))
            .collect()
    }

    pub fn pending_total(&self) -> usize {
        self.channels
            .read()
            .values()
            .map(|lines| lines.lock().len())
            .sum()
    }
}
