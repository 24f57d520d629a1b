use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::Cue;

static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3}) --> ([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})").expect("valid timestamp regex")
});

/// Parse SubRip text into cues, in source order.
///
/// Malformed blocks are skipped one line at a time; the parser never fails
/// and returns an empty list when nothing can be recovered. A block whose
/// blank separator is missing ends where the next identifier and timestamp
/// pair begins.
pub fn parse_track(content: &str) -> Vec<Cue> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();
    let mut cues = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let Some(id) = parse_id(lines[i]) else {
            i += 1;
            continue;
        };

        let Some((start, end)) = lines.get(i + 1).and_then(|line| parse_timestamps(line)) else {
            debug!("Skipping cue candidate {} at line {}: no timestamp line", id, i + 1);
            i += 1;
            continue;
        };

        let mut text_lines = Vec::new();
        let mut j = i + 2;
        while j < lines.len() && !lines[j].trim().is_empty() && !starts_block(&lines, j) {
            text_lines.push(lines[j].trim());
            j += 1;
        }

        let text = text_lines.join(" ");
        if text.is_empty() {
            debug!("Discarding cue {} without text", id);
        } else {
            let cue = Cue::new(id, start, end, text);
            if cue.is_degenerate() {
                warn!("Cue {} has a non-positive duration: {} --> {}", id, cue.start_time, cue.end_time);
            }
            cues.push(cue);
        }

        // A blank terminator is consumed, a following block is not
        i = if j < lines.len() && lines[j].trim().is_empty() { j + 1 } else { j };
    }

    cues
}

fn parse_id(line: &str) -> Option<u32> {
    line.trim().parse().ok()
}

fn parse_timestamps(line: &str) -> Option<(&str, &str)> {
    let caps = TIMESTAMP_LINE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn starts_block(lines: &[&str], index: usize) -> bool {
    parse_id(lines[index]).is_some()
        && lines
            .get(index + 1)
            .is_some_and(|line| parse_timestamps(line).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_cues() {
        let cues = parse_track(
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,500\nWorld\n",
        );

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].id, 1);
        assert_eq!(cues[0].text, "Hello");
        assert_eq!(cues[0].seconds().unwrap(), (1.0, 2.0));
        assert_eq!(cues[1].id, 2);
        assert_eq!(cues[1].text, "World");
        assert_eq!(cues[1].seconds().unwrap(), (3.0, 4.5));
    }

    #[test]
    fn test_multiline_text_is_joined() {
        let cues = parse_track("7\r\n00:00:01,000 --> 00:00:02,000\r\n  first line \r\nsecond line\r\n\r\n");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, 7);
        assert_eq!(cues[0].text, "first line second line");
    }

    #[test]
    fn test_missing_blank_separator_resynchronizes() {
        let cues = parse_track(
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n",
        );
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "World"]);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let cues = parse_track(
            "1\nnot a timestamp\nlost text\n\n2\n00:00:03,000 --> 00:00:04,000\nKept\n",
        );
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, 2);
        assert_eq!(cues[0].text, "Kept");
    }

    #[test]
    fn test_cue_without_text_is_discarded() {
        let cues = parse_track(
            "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nSecond\n",
        );
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, 2);
    }

    #[test]
    fn test_no_valid_blocks_yields_empty() {
        assert!(parse_track("").is_empty());
        assert!(parse_track("just some prose\nwith no cues\n").is_empty());
        assert!(parse_track("1\n2\n3\n").is_empty());
    }

    #[test]
    fn test_ids_need_not_be_contiguous() {
        let cues = parse_track(
            "\u{feff}10\n00:00:01,000 --> 00:00:02,000\nA\n\n42\n00:00:02,000 --> 00:00:03,000\nB\n",
        );
        let ids: Vec<u32> = cues.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![10, 42]);
    }

    #[test]
    fn test_degenerate_cue_is_kept() {
        let cues = parse_track("1\n00:00:05,000 --> 00:00:04,000\nBackwards\n");
        assert_eq!(cues.len(), 1);
        assert!(cues[0].is_degenerate());
    }

    #[test]
    fn test_non_ascii_digits_are_not_timestamps() {
        let cues = parse_track(
            "1\n\u{660}\u{660}:\u{660}\u{660}:\u{660}\u{661},\u{660}\u{660}\u{660} --> \u{660}\u{660}:\u{660}\u{660}:\u{660}\u{662},\u{660}\u{660}\u{660}\nHello\n\n\
             2\n00:00:03,000 --> 00:00:04,000\nWorld\n",
        );

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, 2);
        assert!(cues[0].seconds().is_ok());
    }
}
