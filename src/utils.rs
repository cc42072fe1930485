//! Helpers for working with messages, parts, and history.

use crate::error::{A2AError, A2AResult};
use crate::types::{Message, Part, Task};

/// Extracts the text content from all text parts in a list.
pub fn get_text_parts(parts: &[Part]) -> Vec<&str> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Joins all text parts of a message with the given delimiter.
pub fn message_text(message: &Message, delimiter: &str) -> String {
    get_text_parts(&message.parts).join(delimiter)
}

/// Validates an incoming message's parts.
///
/// File parts must carry exactly one of `bytes` / `uri`; a message with no
/// parts is rejected.
pub fn validate_message(message: &Message) -> A2AResult<()> {
    if message.parts.is_empty() {
        return Err(A2AError::invalid_params("message must have at least one part"));
    }
    for part in &message.parts {
        if let Part::File { file, .. } = part {
            file.validate().map_err(A2AError::invalid_params)?;
        }
    }
    Ok(())
}

/// Applies the `historyLength` truncation rules to a task's history.
///
/// - Absent: the full history is returned.
/// - `0`: history is omitted entirely.
/// - `N > 0`: the last N messages are kept.
pub fn apply_history_length(task: &mut Task, history_length: Option<u32>) {
    match history_length {
        None => {}
        Some(0) => {
            task.history = None;
        }
        Some(n) => {
            if let Some(ref mut history) = task.history {
                let n = n as usize;
                if history.len() > n {
                    let start = history.len() - n;
                    *history = history.split_off(start);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileContent, Role, TaskState, TaskStatus};

    fn task_with_history(n: usize) -> Task {
        Task {
            id: "t1".into(),
            session_id: None,
            status: TaskStatus {
                state: TaskState::Completed,
                message: None,
                timestamp: None,
            },
            artifacts: None,
            history: Some((0..n).map(|i| Message::user_text(format!("m{}", i))).collect()),
            metadata: None,
        }
    }

    #[test]
    fn text_extraction_skips_other_parts() {
        let message = Message {
            role: Role::User,
            parts: vec![
                Part::text("one"),
                Part::data(serde_json::Map::new()),
                Part::text("two"),
            ],
            metadata: None,
        };
        assert_eq!(message_text(&message, "\n"), "one\ntwo");
    }

    #[test]
    fn message_with_invalid_file_part_rejected() {
        let message = Message {
            role: Role::User,
            parts: vec![Part::File {
                file: FileContent {
                    name: None,
                    mime_type: None,
                    bytes: Some("QUJD".into()),
                    uri: Some("https://example.com".into()),
                },
                metadata: None,
            }],
            metadata: None,
        };
        let err = validate_message(&message).unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMS);
    }

    #[test]
    fn empty_message_rejected() {
        let message = Message {
            role: Role::User,
            parts: vec![],
            metadata: None,
        };
        assert!(validate_message(&message).is_err());
    }

    #[test]
    fn history_length_rules() {
        let mut task = task_with_history(5);
        apply_history_length(&mut task, None);
        assert_eq!(task.history.as_ref().unwrap().len(), 5);

        apply_history_length(&mut task, Some(2));
        let history = task.history.as_ref().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(message_text(&history[0], ""), "m3");

        apply_history_length(&mut task, Some(0));
        assert!(task.history.is_none());
    }
}
