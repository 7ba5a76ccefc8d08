//! Interpretation of free-form human replies at a workflow checkpoint.
//!
//! A reply either approves the pending step output (optionally with an edit
//! instruction), cancels the workflow, or matches neither. The token lists
//! mirror the phrases the assistant's prompts suggest to the user, so the
//! happy path never surprises anyone.

/// What a human reply means for the suspended workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeDirective {
    /// Advance to the next step using the prior output unchanged.
    Approve,
    /// Advance to the next step, amending the prior output with this edit.
    ApproveWithEdit(String),
    /// Abandon the workflow. No further steps run.
    Cancel,
    /// Neither approval nor cancellation; the pending request is re-emitted.
    Unrecognized,
}

/// Phrases that approve the pending output. Longer phrases first so prefix
/// matching never stops at a shorter token ("okay" before "ok").
const APPROVAL_TOKENS: &[&str] = &[
    "looks good",
    "go ahead",
    "approved",
    "approve",
    "proceed",
    "continue",
    "okay",
    "yes",
    "ok",
    "send",
];

/// Phrases that cancel the workflow.
const CANCEL_TOKENS: &[&str] = &[
    "start over",
    "never mind",
    "cancel",
    "abort",
    "reset",
    "stop",
    "quit",
];

/// Classify a human reply against the approval/cancel vocabulary.
///
/// Matching is case-insensitive. An approval token followed by more text
/// ("yes, but change the title") yields `ApproveWithEdit` with the
/// remainder; the leading conjunction is stripped.
pub fn interpret(response: &str) -> ResumeDirective {
    let lower = response.trim().to_lowercase();
    if lower.is_empty() {
        return ResumeDirective::Unrecognized;
    }

    for token in CANCEL_TOKENS {
        if matches_token(&lower, token) {
            return ResumeDirective::Cancel;
        }
    }

    for token in APPROVAL_TOKENS {
        if lower == *token {
            return ResumeDirective::Approve;
        }
        if let Some(rest) = token_remainder(&lower, token) {
            let edit = strip_conjunction(rest);
            if edit.is_empty() {
                return ResumeDirective::Approve;
            }
            return ResumeDirective::ApproveWithEdit(edit.to_string());
        }
    }

    ResumeDirective::Unrecognized
}

/// Whether `input` is the token alone or the token followed by a separator.
fn matches_token(input: &str, token: &str) -> bool {
    input == token || token_remainder(input, token).is_some()
}

/// The text after `token` when `input` starts with it at a word boundary.
fn token_remainder<'a>(input: &'a str, token: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(token)?;
    let first = rest.chars().next()?;
    if first.is_alphanumeric() {
        // "stop" must not match "stopwatch"
        return None;
    }
    Some(rest.trim_start_matches([',', '.', ';', ':', '!', '-', ' ']))
}

/// Drop a leading "but"/"and"/"please" from an edit instruction.
fn strip_conjunction(edit: &str) -> &str {
    for word in ["but ", "and ", "please "] {
        if let Some(rest) = edit.strip_prefix(word) {
            return rest.trim_start();
        }
    }
    edit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_approvals() {
        for reply in ["proceed", "yes", "ok", "OKAY", "Looks good", "go ahead", "approve"] {
            assert_eq!(interpret(reply), ResumeDirective::Approve, "reply: {reply}");
        }
    }

    #[test]
    fn test_approval_with_trailing_punctuation() {
        assert_eq!(interpret("proceed!"), ResumeDirective::Approve);
        assert_eq!(interpret("yes."), ResumeDirective::Approve);
    }

    #[test]
    fn test_cancellations() {
        for reply in ["cancel", "Abort", "stop", "start over", "reset", "quit"] {
            assert_eq!(interpret(reply), ResumeDirective::Cancel, "reply: {reply}");
        }
    }

    #[test]
    fn test_approval_with_edit() {
        assert_eq!(
            interpret("yes, but change the title"),
            ResumeDirective::ApproveWithEdit("change the title".to_string())
        );
        assert_eq!(
            interpret("proceed and emphasize remote work"),
            ResumeDirective::ApproveWithEdit("emphasize remote work".to_string())
        );
        assert_eq!(
            interpret("send emails to the top 3 candidates"),
            ResumeDirective::ApproveWithEdit("emails to the top 3 candidates".to_string())
        );
    }

    #[test]
    fn test_token_must_end_at_word_boundary() {
        // "ok" must not match "okra", "stop" must not match "stopwatch"
        assert_eq!(interpret("okra recipes"), ResumeDirective::Unrecognized);
        assert_eq!(interpret("stopwatch"), ResumeDirective::Unrecognized);
    }

    #[test]
    fn test_unrecognized_replies() {
        for reply in ["", "   ", "what's the weather", "blue", "maybe later?"] {
            assert_eq!(
                interpret(reply),
                ResumeDirective::Unrecognized,
                "reply: {reply}"
            );
        }
    }

    #[test]
    fn test_cancel_wins_over_embedded_approval() {
        // A cancellation phrase is checked before approval tokens.
        assert_eq!(interpret("cancel"), ResumeDirective::Cancel);
        assert_eq!(interpret("start over, yes"), ResumeDirective::Cancel);
    }
}
