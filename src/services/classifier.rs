// src/services/classifier.rs

//! Per-record keep/skip decisions.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{MessageRecord, ParticipantRecord, Window};
use crate::services::ExclusionSet;

/// Payloads this short (after trimming) are reactions or noise.
const MIN_CONTENT_GRAPHEMES: usize = 3;

/// Leading character of bot commands.
const COMMAND_PREFIX: char = '/';

/// Outcome of classifying one record against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip(SkipReason),
    /// The record is older than the window; pagination can stop.
    WindowExceeded,
}

/// Why a record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Excluded,
    TooShort,
    Command,
    AfterWindow,
    Malformed,
}

/// Classify a message.
///
/// Cheap content filters run before the time checks, so an excluded or
/// noisy record never stops pagination on its own. The window's upper bound
/// is checked here too rather than trusted to the fetch call.
pub fn classify(record: &MessageRecord, window: &Window, exclusion: &ExclusionSet) -> Verdict {
    if exclusion.contains(record.author_id) {
        return Verdict::Skip(SkipReason::Excluded);
    }

    let payload = record.text.trim();
    if payload.graphemes(true).count() < MIN_CONTENT_GRAPHEMES {
        return Verdict::Skip(SkipReason::TooShort);
    }
    if payload.starts_with(COMMAND_PREFIX) {
        return Verdict::Skip(SkipReason::Command);
    }

    if window.is_before_start(record.timestamp) {
        return Verdict::WindowExceeded;
    }
    if record.timestamp < window.end() {
        return Verdict::Keep;
    }
    Verdict::Skip(SkipReason::AfterWindow)
}

/// Classify a participant. Participants have no time dimension; a decoded
/// record with an id is always kept.
pub fn classify_participant(record: &ParticipantRecord) -> Verdict {
    if record.id <= 0 {
        return Verdict::Skip(SkipReason::Malformed);
    }
    Verdict::Keep
}
