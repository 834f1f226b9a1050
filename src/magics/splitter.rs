//! Reassembly of line-continued magic arguments.
//!
//! A cell magic receives its first line (`head`, the text after `%%run_if`) and the rest of the cell (`body`)
//! separately. A condition too long for one line is continued with a trailing `\`, so the first lines of the
//! body may still belong to the condition.

use nbvalx_core::lang::magics::CONTINUATION;

/// Split a magic invocation into its logical argument line and the code that follows it.
///
/// While `head` ends with the continuation marker the marker is dropped and the next body line (trimmed) is
/// appended. The remaining body is returned untouched.
pub fn split<'b>(head: &str, body: &'b str) -> (String, &'b str) {
    let mut condition = head.trim_end().to_string();
    let mut rest = body;
    while let Some(stripped) = condition.strip_suffix(CONTINUATION) {
        condition = stripped.to_string();
        if rest.is_empty() {
            break;
        }
        let (line, remainder) = match rest.split_once('\n') {
            Some((line, remainder)) => (line, remainder),
            None => (rest, ""),
        };
        condition.push_str(line.trim());
        condition = condition.trim_end().to_string();
        rest = remainder;
    }
    (condition.trim().to_string(), rest)
}

/// Split cell source into its first line and the remaining lines.
pub fn first_line(source: &str) -> (&str, &str) {
    source.split_once('\n').unwrap_or((source, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_continuation() {
        assert_eq!(split("a \\", "  b\nc=1"), ("a b".to_string(), "c=1"));
    }

    #[test]
    fn test_no_continuation_keeps_body() {
        assert_eq!(split("tag == 1", "x = 1\ny = 2"), ("tag == 1".to_string(), "x = 1\ny = 2"));
    }

    #[test]
    fn test_multiple_continuations() {
        let (condition, code) = split("a == 1 and \\", "  b == 2 \\\n or c\nprint(1)\n");
        assert_eq!(condition, "a == 1 and b == 2 or c");
        assert_eq!(code, "print(1)\n");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(split("a \\", ""), ("a".to_string(), ""));
        assert_eq!(split("", ""), (String::new(), ""));
    }

    #[test]
    fn test_continuation_on_last_line() {
        assert_eq!(split("a and \\", "b"), ("a and b".to_string(), ""));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("%%run_if x\nbody"), ("%%run_if x", "body"));
        assert_eq!(first_line("only"), ("only", ""));
    }
}
