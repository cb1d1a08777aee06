//! # Progress Reporting
//!
//! Typed progress events for a transcription request. The overall percentage
//! delivered to the caller never decreases, and 100 is only reached when the
//! whole request has finished.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Strip in flight, `None` for whole-image recognition and the final event
    pub strip: Option<usize>,
    /// Recognizer progress within the current strip or image, in `[0, 1]`
    pub strip_fraction: f32,
    /// Overall completion, `0..=100`
    pub percent: u8,
}

/// Per-request strip bookkeeping, reset at the start of each recognition call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressState {
    pub completed_strips: usize,
    pub current_strip_fraction: f32,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall percentage while the next strip is in flight.
    pub fn in_flight_percent(&self, strip_count: usize) -> u8 {
        strip_in_flight_percent(
            self.completed_strips,
            self.current_strip_fraction,
            strip_count,
        )
    }

    /// Records recognizer progress within the strip in flight and returns the
    /// overall percentage.
    pub fn advance(&mut self, fraction: f32, strip_count: usize) -> u8 {
        self.current_strip_fraction = clamp_fraction(fraction);
        self.in_flight_percent(strip_count)
    }

    /// Marks the current strip complete and returns the overall percentage.
    pub fn complete_strip(&mut self, strip_count: usize) -> u8 {
        let percent = strip_completed_percent(self.completed_strips, strip_count);
        self.completed_strips += 1;
        self.current_strip_fraction = 0.0;
        percent
    }
}

fn clamp_fraction(fraction: f32) -> f32 {
    if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `min(99, round(100 * (index + fraction) / count))`
pub fn strip_in_flight_percent(index: usize, fraction: f32, strip_count: usize) -> u8 {
    if strip_count == 0 {
        return 0;
    }
    let overall = 100.0 * (index as f64 + clamp_fraction(fraction) as f64) / strip_count as f64;
    overall.round().min(99.0) as u8
}

/// `round(100 * (index + 1) / count)`, capped at 100
pub fn strip_completed_percent(index: usize, strip_count: usize) -> u8 {
    if strip_count == 0 {
        return 100;
    }
    let overall = 100.0 * (index + 1) as f64 / strip_count as f64;
    overall.round().min(100.0) as u8
}

/// `round(100 * fraction)` for a single whole-image recognition
pub fn whole_image_percent(fraction: f32) -> u8 {
    (100.0 * clamp_fraction(fraction)).round() as u8
}

/// Delivers progress events to an optional channel, enforcing a
/// non-decreasing overall percentage.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
    last_percent: AtomicU8,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl ProgressReporter {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            last_percent: AtomicU8::new(0),
        }
    }

    /// Reporter paired with the receiving end of a fresh channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Reporter that only tracks the percentage.
    pub fn silent() -> Self {
        Self {
            sender: None,
            last_percent: AtomicU8::new(0),
        }
    }

    /// Starts a new request: the next event may report any percentage again.
    pub fn reset(&self) {
        self.last_percent.store(0, Ordering::SeqCst);
    }

    /// Highest percentage reported so far.
    pub fn last_percent(&self) -> u8 {
        self.last_percent.load(Ordering::SeqCst)
    }

    /// Reports `percent`, raised to the last reported value if it is lower.
    ///
    /// Values of 100 are held at 99 until `finish` is called.
    pub fn report(&self, strip: Option<usize>, strip_fraction: f32, percent: u8) {
        let percent = percent.min(99);
        let previous = self.last_percent.fetch_max(percent, Ordering::SeqCst);
        self.send(ProgressEvent {
            strip,
            strip_fraction: clamp_fraction(strip_fraction),
            percent: previous.max(percent),
        });
    }

    /// Emits the final 100% event.
    pub fn finish(&self) {
        self.last_percent.store(100, Ordering::SeqCst);
        self.send(ProgressEvent {
            strip: None,
            strip_fraction: 1.0,
            percent: 100,
        });
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is listening anymore.
            if sender.send(event).is_err() {
                tracing::trace!("Progress receiver dropped, event discarded");
            }
        }
    }
}
