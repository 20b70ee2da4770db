//! Fenced code block extraction for raw model replies.

const FENCE: &str = "```";
const LANGUAGE_TAG: &str = "python";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Outside,
    Inside { body_start: usize },
}

/// Returns the raw text between the first two fence markers.
///
/// `None` when the text has fewer than two markers, which covers both the
/// plain-text reply and an unterminated block.
pub fn find_fenced_block(text: &str) -> Option<&str> {
    let mut state = Scan::Outside;
    for (pos, _) in text.match_indices(FENCE) {
        match state {
            Scan::Outside => {
                state = Scan::Inside { body_start: pos + FENCE.len() };
            }
            Scan::Inside { body_start } => {
                return Some(&text[body_start..pos]);
            }
        }
    }
    None
}

/// Pulls the primary code segment out of a model reply.
///
/// The first fenced block wins; a leading `python` tag (any case) and the
/// line break after it are dropped. Replies without a complete block are
/// treated as code in their entirety and only trimmed.
pub fn extract_code_block(response: &str) -> &str {
    match find_fenced_block(response) {
        Some(block) => trim_blank(strip_language_tag(trim_blank(block))),
        None => trim_blank(response),
    }
}

/// Unicode whitespace plus the separator controls U+001C..=U+001F.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn trim_blank(text: &str) -> &str {
    text.trim_matches(is_blank)
}

fn strip_language_tag(segment: &str) -> &str {
    match segment.get(..LANGUAGE_TAG.len()) {
        Some(head) if head.eq_ignore_ascii_case(LANGUAGE_TAG) => {
            segment[LANGUAGE_TAG.len()..].trim_start_matches(['\n', '\r'])
        }
        _ => segment,
    }
}

/// Wraps code back into the fenced form the pipeline replays to the model.
pub fn fence(code: &str) -> String {
    format!("{FENCE}{LANGUAGE_TAG}\n{code}\n{FENCE}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_tagged_block_between_prose() {
        let response = "Here:\n```python\ndef f():\n    return 1\n```\nDone.";
        assert_eq!(extract_code_block(response), "def f():\n    return 1");
    }

    #[test]
    fn extracts_untagged_block() {
        assert_eq!(extract_code_block("```\nprint('hi')\n```"), "print('hi')");
    }

    #[test]
    fn plain_text_is_returned_trimmed() {
        assert_eq!(extract_code_block("no code here at all"), "no code here at all");
        assert_eq!(extract_code_block("  \n  just text  \n  "), "just text");
        assert_eq!(extract_code_block(""), "");
    }

    #[test]
    fn separator_controls_count_as_whitespace() {
        assert_eq!(extract_code_block("\u{1f}abc\u{1f}"), "abc");
        assert_eq!(extract_code_block("\u{1c}\u{1d}\u{1e} text \u{1f}"), "text");
        assert_eq!(extract_code_block("```\u{1e}python\nx=1\u{1f}\n```"), "x=1");
        assert_eq!(extract_code_block("\u{1b}esc\u{1b}"), "\u{1b}esc\u{1b}");
    }

    #[test]
    fn tag_match_ignores_case() {
        assert_eq!(extract_code_block("```Python\nx=1\n```"), "x=1");
        assert_eq!(extract_code_block("```PYTHON\r\nx=1\n```"), "x=1");
    }

    #[test]
    fn only_first_block_is_returned() {
        let response = "```python\nfirst()\n```\nand\n```python\nsecond()\n```";
        assert_eq!(extract_code_block(response), "first()");
    }

    #[test]
    fn single_marker_falls_back_to_whole_reply() {
        let response = "  Sure:\n```python\ndef f(): pass\n";
        assert_eq!(find_fenced_block(response), None);
        assert_eq!(extract_code_block(response), "Sure:\n```python\ndef f(): pass");
    }

    #[test]
    fn other_language_tags_are_kept() {
        assert_eq!(extract_code_block("```rust\nfn main() {}\n```"), "rust\nfn main() {}");
    }

    #[test]
    fn empty_block_yields_empty_string() {
        assert_eq!(extract_code_block("before ``` ``` after"), "");
        assert_eq!(extract_code_block("``````"), "");
    }

    #[test]
    fn multibyte_prefix_does_not_panic() {
        assert_eq!(extract_code_block("```日本語のコード\n```"), "日本語のコード");
    }

    #[test]
    fn fence_round_trips_through_extractor() {
        let code = "def f():\n    return 1";
        assert_eq!(extract_code_block(&fence(code)), code);
    }

    proptest! {
        #[test]
        fn marker_free_text_is_only_trimmed(s in "[^`]*") {
            prop_assert_eq!(extract_code_block(&s), s.trim_matches(is_blank));
        }

        #[test]
        fn ascii_text_matches_plain_trim(s in "[ -_a-~\t\n\r\x0b\x0c]*") {
            prop_assert_eq!(extract_code_block(&s), s.trim());
        }

        #[test]
        fn idempotent_on_marker_free_text(s in "[^`]*") {
            let once = extract_code_block(&s);
            prop_assert_eq!(extract_code_block(once), once);
        }

        #[test]
        fn never_panics(s in "\\PC*") {
            let _ = extract_code_block(&s);
        }

        #[test]
        fn first_block_wins(
            a in "[a-z ]{0,12}",
            b in "[a-z=0-9]{1,12}",
            c in "[a-z=0-9]{1,12}",
        ) {
            let response = format!("{a}```\n{b}\n```\n```\n{c}\n```");
            let expected = b.strip_prefix("python").unwrap_or(&b);
            prop_assert_eq!(extract_code_block(&response), expected);
        }
    }
}
