//! Outgoing message formatting.

/// Transport ceiling for one outgoing message. Longer texts are split into
/// numbered parts.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Room reserved in each part for the " (i/n)" suffix.
const PART_SUFFIX_ROOM: usize = 12;

/// Header, summary body, and count footer for a posted summary.
pub fn format_summary_message(
    group_name: &str,
    period_hours: i64,
    message_count: usize,
    summary: &str,
) -> String {
    format!(
        "📋 {group_name} (last {period_hours}h)\n\n{summary}\n\n({message_count} message{} summarized)",
        if message_count == 1 { "" } else { "s" }
    )
}

/// Posted when the window held no messages at all.
pub fn format_no_activity(group_name: &str, period_hours: i64) -> String {
    format!("📋 {group_name} (last {period_hours}h)\n\nNo activity to summarize.")
}

/// Posted when the window held too few messages for a useful summary.
pub fn format_low_activity(group_name: &str, period_hours: i64, count: usize) -> String {
    format!(
        "📋 {group_name} (last {period_hours}h)\n\nOnly {count} message{} in this period, too few to summarize.",
        if count == 1 { "" } else { "s" }
    )
}

/// Split `text` into parts no longer than `max` characters, numbered
/// " (i/n)" when more than one part results. Splits prefer line breaks and
/// fall back to hard character splits for single oversized lines.
pub fn split_long_message(text: &str, max: usize) -> Vec<String> {
    if text.chars().count() <= max {
        return vec![text.to_string()];
    }

    let limit = max.saturating_sub(PART_SUFFIX_ROOM).max(1);
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let push_current = |current: &mut String, current_len: &mut usize, parts: &mut Vec<String>| {
        if !current.is_empty() {
            parts.push(std::mem::take(current));
            *current_len = 0;
        }
    };

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > limit {
            // Oversized single line: flush, then hard-split by characters.
            push_current(&mut current, &mut current_len, &mut parts);
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(limit) {
                parts.push(chunk.iter().collect());
            }
            continue;
        }

        // +1 for the newline that would join it to the current part.
        let extra = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + extra > limit {
            push_current(&mut current, &mut current_len, &mut parts);
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    push_current(&mut current, &mut current_len, &mut parts);

    let total = parts.len();
    if total > 1 {
        for (i, part) in parts.iter_mut().enumerate() {
            part.push_str(&format!(" ({}/{})", i + 1, total));
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        let parts = split_long_message("hello", MAX_MESSAGE_LEN);
        assert_eq!(parts, vec!["hello".to_string()]);
    }

    #[test]
    fn long_text_splits_on_lines_with_numbering() {
        let text = (0..100)
            .map(|i| format!("line number {i} with some padding text"))
            .collect::<Vec<_>>()
            .join("\n");
        let parts = split_long_message(&text, 500);

        assert!(parts.len() > 1);
        for (i, part) in parts.iter().enumerate() {
            assert!(part.chars().count() <= 500, "part {i} too long");
            assert!(part.ends_with(&format!("({}/{})", i + 1, parts.len())));
        }
        // Nothing lost: strip suffixes and rejoin.
        let rejoined: String = parts
            .iter()
            .map(|p| p.rsplit_once(" (").map(|(body, _)| body).unwrap_or(p))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(rejoined.contains("line number 0"));
        assert!(rejoined.contains("line number 99"));
    }

    #[test]
    fn oversized_single_line_hard_splits() {
        let text = "x".repeat(1200);
        let parts = split_long_message(&text, 500);
        assert!(parts.len() >= 3);
        for part in &parts {
            assert!(part.chars().count() <= 500);
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(600);
        let parts = split_long_message(&text, 500);
        assert!(parts.len() >= 2);
        let glyphs: usize = parts
            .iter()
            .map(|p| p.rsplit_once(" (").map(|(body, _)| body).unwrap_or(p))
            .map(|body| body.chars().filter(|c| *c == 'é').count())
            .sum();
        assert_eq!(glyphs, 600);
    }

    #[test]
    fn summary_header_and_footer() {
        let text = format_summary_message("Team", 24, 1, "we shipped");
        assert!(text.starts_with("📋 Team (last 24h)"));
        assert!(text.contains("we shipped"));
        assert!(text.ends_with("(1 message summarized)"));

        assert!(format_no_activity("Team", 24).contains("No activity"));
        assert!(format_low_activity("Team", 24, 3).contains("Only 3 messages"));
    }
}
