//! Sensor feed
//!
//! Reads raw motion samples from a line oriented source and drives the tap
//! detector with them. Two record types are understood:
//!
//! ```text
//! sample <timestamp_ns> <sensor> <accuracy> <v0> [<v1> ...]
//! accuracy <sensor> <accuracy>
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Malformed lines are
//! logged and skipped.
//!
//! `<timestamp_ns>` must be read from `CLOCK_MONOTONIC`, the clock behind
//! [`tapunlock_utils::monotonic_nanos`]. Recording windows and watches are
//! armed on that clock, so taps stamped with any other time base (a replay
//! starting at zero, wall-clock time) are never recorded or matched. The
//! feed warns once when the first sample is far from the current clock.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tapunlock_utils::{monotonic_nanos, Result, TapUnlockError};

use crate::config::SensorConfig;
use crate::detector::{Accuracy, SensorType, TapDetector};

/// Distance from the monotonic clock beyond which samples look mistimed
const CLOCK_SKEW_WARN_NS: u64 = 60_000_000_000;

/// One parsed feed record
#[derive(Debug, Clone, PartialEq)]
pub enum SensorLine {
    Sample {
        timestamp: u64,
        sensor: SensorType,
        accuracy: Accuracy,
        values: Vec<f32>,
    },
    Accuracy {
        sensor: SensorType,
        accuracy: Accuracy,
    },
}

/// Counters reported when a feed ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub samples: u64,
    pub accuracy_changes: u64,
    pub skipped: u64,
}

/// Parse a single feed line
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<SensorLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let record = match fields.next() {
        Some("sample") => {
            let timestamp = next_field(&mut fields, "timestamp")?
                .parse::<u64>()
                .map_err(|e| TapUnlockError::sensor(format!("bad timestamp: {}", e)))?;
            let sensor = next_field(&mut fields, "sensor")?
                .parse()
                .map_err(TapUnlockError::sensor)?;
            let accuracy = next_field(&mut fields, "accuracy")?
                .parse()
                .map_err(TapUnlockError::sensor)?;
            let values = fields
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| TapUnlockError::sensor(format!("bad sample value: {}", e)))?;
            if values.is_empty() {
                return Err(TapUnlockError::sensor("sample without values"));
            }
            SensorLine::Sample {
                timestamp,
                sensor,
                accuracy,
                values,
            }
        }
        Some("accuracy") => {
            let sensor = next_field(&mut fields, "sensor")?
                .parse()
                .map_err(TapUnlockError::sensor)?;
            let accuracy = next_field(&mut fields, "accuracy")?
                .parse()
                .map_err(TapUnlockError::sensor)?;
            if fields.next().is_some() {
                return Err(TapUnlockError::sensor("trailing fields after accuracy"));
            }
            SensorLine::Accuracy { sensor, accuracy }
        }
        Some(other) => {
            return Err(TapUnlockError::sensor(format!(
                "unknown record '{}'",
                other
            )))
        }
        None => return Ok(None),
    };

    Ok(Some(record))
}

fn next_field<'a>(fields: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<&'a str> {
    fields
        .next()
        .ok_or_else(|| TapUnlockError::sensor(format!("missing {}", name)))
}

/// Whether a sample stamped `timestamp` cannot be on the same clock as `now`
fn is_mistimed(timestamp: u64, now: u64) -> bool {
    timestamp.abs_diff(now) > CLOCK_SKEW_WARN_NS
}

/// Feed every line of `reader` into the detector until EOF
pub fn run_feed<R: BufRead>(reader: R, detector: &Mutex<Box<dyn TapDetector>>) -> Result<FeedStats> {
    let mut stats = FeedStats::default();
    let mut clock_checked = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(SensorLine::Sample {
                timestamp,
                sensor,
                accuracy,
                values,
            })) => {
                if !clock_checked {
                    clock_checked = true;
                    let now = monotonic_nanos();
                    if is_mistimed(timestamp, now) {
                        warn!(
                            "Sample timestamp {} is far from CLOCK_MONOTONIC ({}); taps will not line up with recordings",
                            timestamp, now
                        );
                    }
                }
                detector
                    .lock()
                    .on_sensor_changed(timestamp, sensor, accuracy, &values);
                stats.samples += 1;
            }
            Ok(Some(SensorLine::Accuracy { sensor, accuracy })) => {
                detector.lock().on_accuracy_changed(sensor, accuracy);
                stats.accuracy_changes += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping sensor line {}: {}", index + 1, e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

/// Open the configured sample source
pub fn open_source(config: &SensorConfig) -> Result<Box<dyn BufRead + Send>> {
    if config.is_stdin() {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let path = Path::new(&config.source);
    let file = File::open(path).map_err(|e| TapUnlockError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Run the feed on its own thread
///
/// Reading stdin or a FIFO blocks indefinitely, so the feed gets a plain
/// thread that never holds up runtime shutdown.
pub fn spawn_feed(
    source: Box<dyn BufRead + Send>,
    detector: Arc<Mutex<Box<dyn TapDetector>>>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("sensor-feed".into())
        .spawn(move || {
            debug!("Sensor feed started");
            match run_feed(source, &detector) {
                Ok(stats) => info!(
                    "Sensor feed ended: {} samples, {} accuracy changes, {} skipped",
                    stats.samples, stats.accuracy_changes, stats.skipped
                ),
                Err(e) => warn!("Sensor feed failed: {}", e),
            }
        })
}
