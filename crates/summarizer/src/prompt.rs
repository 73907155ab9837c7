//! Prompt construction for summary requests.

use crate::{MessageRecord, SummaryInput};

const DETAIL_INSTRUCTIONS: &str = "Write a detailed summary of the conversation below. \
Cover the main topics discussed, any decisions or plans made, and questions left open. \
Mention which messages drew the most reactions. Use short paragraphs or bullet points. \
Do not quote messages verbatim and do not invent anything that is not in the transcript.";

const SIMPLE_INSTRUCTIONS: &str = "Write a brief summary of the conversation below in \
one short paragraph. Capture the overall gist only. Do not quote messages verbatim and \
do not invent anything that is not in the transcript.";

fn render_message(record: &MessageRecord) -> String {
    if record.reaction_count > 0 {
        format!(
            "{}: {} [{} reaction{}: {}]",
            record.sender,
            record.content,
            record.reaction_count,
            if record.reaction_count == 1 { "" } else { "s" },
            record.emojis.join(" ")
        )
    } else {
        format!("{}: {}", record.sender, record.content)
    }
}

/// Build the full prompt for one summary window.
pub fn build_prompt(input: &SummaryInput) -> String {
    let instructions = if input.detail {
        DETAIL_INSTRUCTIONS
    } else {
        SIMPLE_INSTRUCTIONS
    };

    let transcript: Vec<String> = input.messages.iter().map(render_message).collect();

    format!(
        "{instructions}\n\nGroup: {}\nPeriod: the last {} hours\nMessages: {}\n\n\
        Transcript:\n{}",
        input.group_name,
        input.period_hours,
        input.messages.len(),
        transcript.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reactions_are_annotated() {
        let input = SummaryInput {
            group_name: "Team".to_string(),
            period_hours: 24,
            detail: true,
            messages: vec![
                MessageRecord {
                    sender: "alice".to_string(),
                    content: "shipping friday".to_string(),
                    reaction_count: 2,
                    emojis: vec!["👍".to_string(), "🎉".to_string()],
                },
                MessageRecord {
                    sender: "bob".to_string(),
                    content: "sounds good".to_string(),
                    reaction_count: 0,
                    emojis: Vec::new(),
                },
            ],
        };

        let prompt = build_prompt(&input);
        assert!(prompt.contains("alice: shipping friday [2 reactions: 👍 🎉]"));
        assert!(prompt.contains("bob: sounds good"));
        assert!(!prompt.contains("sounds good ["));
        assert!(prompt.contains("the last 24 hours"));
    }

    #[test]
    fn detail_flag_selects_instructions() {
        let mut input = SummaryInput {
            group_name: "Team".to_string(),
            period_hours: 24,
            detail: false,
            messages: Vec::new(),
        };
        assert!(build_prompt(&input).contains("brief summary"));
        input.detail = true;
        assert!(build_prompt(&input).contains("detailed summary"));
    }
}
