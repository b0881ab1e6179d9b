//! Line-oriented WebVTT cue parser.

use super::Cue;
use crate::error::{Result, VidragError};
use regex::Regex;
use std::sync::OnceLock;

fn timing_regex() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| {
        Regex::new(
            r"^(\d{2,}):(\d{2}):(\d{2})\.(\d{3})\s+-->\s+(\d{2,}):(\d{2}):(\d{2})\.(\d{3})(?:\s.*)?$",
        )
        .expect("Invalid regex")
    })
}

/// Parse a caption blob into an ordered sequence of cues.
///
/// Blank lines are ignored and the first non-blank line is the format header.
/// Every line containing `-->` must be a `HH:MM:SS.mmm --> HH:MM:SS.mmm`
/// timing line; the text lines that follow it belong to that cue. Text lines
/// that appear before the first timing line are header metadata and dropped.
pub fn parse_cues(captions: &str) -> Result<Vec<Cue>> {
    let mut cues: Vec<Cue> = Vec::new();
    let mut lines = captions
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    // Header ("WEBVTT").
    lines.next();

    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.contains("-->") {
            let (start_time, end_time) = parse_timing_line(line.trim(), line_no)?;
            cues.push(Cue {
                start_time,
                end_time,
                text: String::new(),
            });
        } else if let Some(cue) = cues.last_mut() {
            if !cue.text.is_empty() {
                cue.text.push('\n');
            }
            cue.text.push_str(line);
        }
    }

    Ok(cues)
}

/// Parse a timing line into whole `(start, end)` seconds.
fn parse_timing_line(line: &str, line_no: usize) -> Result<(u64, u64)> {
    let caps = timing_regex()
        .captures(line)
        .ok_or_else(|| VidragError::CaptionFormat {
            line: line_no,
            message: format!("expected 'HH:MM:SS.mmm --> HH:MM:SS.mmm', got '{}'", line),
        })?;

    let field = |i: usize| -> Result<u64> {
        caps[i].parse::<u64>().map_err(|e| VidragError::CaptionFormat {
            line: line_no,
            message: format!("invalid time component '{}': {}", &caps[i], e),
        })
    };

    let seconds = |h: u64, m: u64, s: u64| -> Result<u64> {
        h.checked_mul(3600)
            .and_then(|h| h.checked_add(m * 60 + s))
            .ok_or_else(|| VidragError::CaptionFormat {
                line: line_no,
                message: format!("timestamp out of range in '{}'", line),
            })
    };

    let start = seconds(field(1)?, field(2)?, field(3)?)?;
    let end = seconds(field(5)?, field(6)?, field(7)?)?;

    if start > end {
        return Err(VidragError::CaptionFormat {
            line: line_no,
            message: format!("cue ends ({}s) before it starts ({}s)", end, start),
        });
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_cues() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:05.500\nHello there.\n\n00:00:05.500 --> 00:01:02.000\nGeneral Kenobi.\n";
        let cues = parse_cues(vtt).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_time, 0);
        assert_eq!(cues[0].end_time, 5);
        assert_eq!(cues[0].text, "Hello there.");
        assert_eq!(cues[1].start_time, 5);
        assert_eq!(cues[1].end_time, 62);
    }

    #[test]
    fn test_hours_are_counted() {
        let vtt = "WEBVTT\n01:02:03.004 --> 01:02:09.999\nlate\n";
        let cues = parse_cues(vtt).unwrap();
        assert_eq!(cues[0].start_time, 3723);
        assert_eq!(cues[0].end_time, 3729);
    }

    #[test]
    fn test_multiline_cue_text() {
        let vtt = "WEBVTT\n00:00:00.000 --> 00:00:04.000\nfirst line\nsecond line\n";
        let cues = parse_cues(vtt).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "first line\nsecond line");
    }

    #[test]
    fn test_cue_settings_are_accepted() {
        let vtt = "WEBVTT\n00:00:01.000 --> 00:00:02.000 align:start position:0%\nhi\n";
        let cues = parse_cues(vtt).unwrap();
        assert_eq!(cues[0].start_time, 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_cues("WEBVTT\n\n").unwrap().is_empty());
        assert!(parse_cues("").unwrap().is_empty());
    }

    #[test]
    fn test_text_without_timing_is_dropped() {
        let cues = parse_cues("WEBVTT\nKind: captions\nLanguage: en\n").unwrap();
        assert!(cues.is_empty());
    }

    #[test]
    fn test_malformed_timing_line_reports_line_number() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:05.000\nok\n0:00:05 --> 0:00:09\nbad\n";
        match parse_cues(vtt) {
            Err(VidragError::CaptionFormat { line, .. }) => assert_eq!(line, 5),
            other => panic!("expected caption format error, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_hours_are_a_format_error() {
        let vtt = "WEBVTT\n5124095576030432:00:00.000 --> 5124095576030432:00:01.000\nhi\n";
        assert!(matches!(
            parse_cues(vtt),
            Err(VidragError::CaptionFormat { line: 2, .. })
        ));

        let vtt = "WEBVTT\n\n99999999999999999999:00:00.000 --> 99999999999999999999:00:01.000\nhi\n";
        assert!(matches!(
            parse_cues(vtt),
            Err(VidragError::CaptionFormat { line: 3, .. })
        ));
    }

    #[test]
    fn test_reversed_cue_is_rejected() {
        let vtt = "WEBVTT\n00:00:09.000 --> 00:00:05.000\noops\n";
        assert!(matches!(
            parse_cues(vtt),
            Err(VidragError::CaptionFormat { line: 2, .. })
        ));
    }
}
