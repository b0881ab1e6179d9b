//! Caption merging.
//!
//! Turns a timestamped caption stream (WebVTT as produced by Whisper) into
//! coarse, time-bounded text blocks that are later grouped into chunks.

mod parser;

pub use parser::parse_cues;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single timestamped caption.
///
/// Times are whole seconds from the start of the video; millisecond
/// fractions are dropped. `text` keeps the cue's lines separated by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_time: u64,
    pub end_time: u64,
    pub text: String,
}

/// A time-coalesced group of cues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedBlock {
    /// Start of the block, in seconds.
    pub initial_time: u64,
    /// Space-joined cue text. Never empty.
    pub text: String,
}

/// Parse `captions` and merge its cues into blocks of at least
/// `merge_seconds` duration (the last block may be shorter).
pub fn merge(captions: &str, merge_seconds: u64) -> Result<Vec<MergedBlock>> {
    let cues = parse_cues(captions)?;
    let blocks = merge_cues(&cues, merge_seconds);
    debug!("Merged {} cues into {} blocks", cues.len(), blocks.len());
    Ok(blocks)
}

/// Merge already-parsed cues into blocks.
///
/// A block opens at the start of the first cue appended to an empty buffer.
/// After each text line the elapsed time `end_time - initial_time` of the
/// current cue is checked; once it reaches `merge_seconds` the block closes and
/// the next block's start is set to the closing cue's end. A cue with several
/// text lines therefore closes one block per remaining line once the threshold
/// has been crossed.
pub fn merge_cues(cues: &[Cue], merge_seconds: u64) -> Vec<MergedBlock> {
    let mut blocks = Vec::new();
    let mut buffer = String::new();
    let mut initial_time = 0u64;

    for cue in cues {
        if buffer.is_empty() {
            initial_time = cue.start_time;
        }
        let current_block_time = cue.end_time.saturating_sub(initial_time);

        for line in cue.text.lines() {
            buffer.push_str(line);
            buffer.push(' ');

            if current_block_time >= merge_seconds {
                blocks.push(MergedBlock {
                    initial_time,
                    text: buffer.trim().to_string(),
                });
                buffer.clear();
                initial_time = cue.end_time;
            }
        }
    }

    let remainder = buffer.trim();
    if !remainder.is_empty() {
        blocks.push(MergedBlock {
            initial_time,
            text: remainder.to_string(),
        });
    }

    blocks
}
