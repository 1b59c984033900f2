//! Prompt marker stripping for copied shell sessions and REPL transcripts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::NormalizationOptions;

/// Leading `$` or `>` shell prompt followed by at most one space or tab. A carriage return
/// after the marker belongs to the line ending and is kept.
static SHELL_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([$>])([ \t]?)").expect("shell prompt pattern is valid"));

/// Leading Python primary or continuation prompt.
static PYTHON_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:>>> |\.\.\. )").expect("python prompt pattern is valid"));

/// Strip recognised prompt markers from the start of every line.
///
/// Lines are split on `\n` and rejoined with it, so `\r\n` input keeps its carriage returns.
/// Each line is stripped until no enabled marker remains at its start, which makes the
/// transform idempotent even for stacked markers such as `$ $ ls`.
pub fn normalize(text: &str, options: NormalizationOptions) -> String {
    text.split('\n')
        .map(|line| normalize_line(line, options))
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str, options: NormalizationOptions) -> &str {
    let mut current = line;
    loop {
        let mut changed = false;
        if options.strip_python
            && let Some(rest) = strip_python(current)
        {
            current = rest;
            changed = true;
        }
        if options.strip_shell
            && let Some(rest) = strip_shell(current)
        {
            current = rest;
            changed = true;
        }
        if !changed {
            return current;
        }
    }
}

fn strip_python(line: &str) -> Option<&str> {
    PYTHON_PROMPT.find(line).map(|found| &line[found.end()..])
}

fn strip_shell(line: &str) -> Option<&str> {
    let captures = SHELL_PROMPT.captures(line)?;
    let end = captures.get(0)?.end();
    // A `>` that opens `>>` belongs to a REPL prompt or a redirect, not a shell prompt.
    if &captures[1] == ">" && captures[2].is_empty() && line[end..].starts_with('>') {
        return None;
    }
    Some(&line[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BOTH: NormalizationOptions = NormalizationOptions {
        strip_shell: true,
        strip_python: true,
    };

    #[test]
    fn strips_shell_prompts() {
        assert_eq!(normalize("$ ls -la", BOTH), "ls -la");
        assert_eq!(normalize("    > echo hi", BOTH), "echo hi");
        assert_eq!(normalize("$ls", BOTH), "ls");
        assert_eq!(normalize("$  indented", BOTH), " indented");
    }

    #[test]
    fn strips_python_prompts() {
        assert_eq!(normalize(">>> print(1)", BOTH), "print(1)");
        assert_eq!(normalize("... x = 2", BOTH), "x = 2");
        assert_eq!(normalize("  >>> import os", BOTH), "import os");
    }

    #[test]
    fn unmarked_lines_pass_through() {
        assert_eq!(normalize("cargo build --release", BOTH), "cargo build --release");
        assert_eq!(normalize("a > b", BOTH), "a > b");
        assert_eq!(normalize("", BOTH), "");
        assert_eq!(normalize(">>>print(1)", BOTH), ">>>print(1)");
    }

    #[test]
    fn disabled_classes_are_left_alone() {
        let shell_only = NormalizationOptions {
            strip_shell: true,
            strip_python: false,
        };
        assert_eq!(normalize(">>> x", shell_only), ">>> x");
        assert_eq!(normalize("... x", shell_only), "... x");
        assert_eq!(normalize("$ x", shell_only), "x");

        let python_only = NormalizationOptions {
            strip_shell: false,
            strip_python: true,
        };
        assert_eq!(normalize("$ ls", python_only), "$ ls");
        assert_eq!(normalize(">>> x", python_only), "x");

        let neither = NormalizationOptions {
            strip_shell: false,
            strip_python: false,
        };
        assert_eq!(normalize("$ ls\n>>> x", neither), "$ ls\n>>> x");
    }

    #[test]
    fn multi_line_transcripts_keep_separators() {
        let transcript = "$ ls\n>>> print(1)\n1\r\n... y\n";
        assert_eq!(normalize(transcript, BOTH), "ls\nprint(1)\n1\r\ny\n");
    }

    #[test]
    fn bare_prompts_keep_their_carriage_return() {
        assert_eq!(normalize("$\r\nls\r\n", BOTH), "\r\nls\r\n");
        assert_eq!(normalize(">\r", BOTH), "\r");
        assert_eq!(normalize("$\tls\r", BOTH), "ls\r");
    }

    #[test]
    fn stacked_markers_reach_a_fixed_point() {
        assert_eq!(normalize("$ $ ls", BOTH), "ls");
        assert_eq!(normalize("$ >>> x", BOTH), "x");
        assert_eq!(normalize(">>> $ ls", BOTH), "ls");
    }

    fn any_options() -> impl Strategy<Value = NormalizationOptions> {
        (any::<bool>(), any::<bool>()).prop_map(|(strip_shell, strip_python)| {
            NormalizationOptions {
                strip_shell,
                strip_python,
            }
        })
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(
            text in "([ \t$>.x]|>>> |\\.\\.\\. |\n){0,40}",
            options in any_options(),
        ) {
            let once = normalize(&text, options);
            prop_assert_eq!(normalize(&once, options), once);
        }

        #[test]
        fn normalize_never_adds_lines(text in "(?s).{0,80}", options in any_options()) {
            let out = normalize(&text, options);
            prop_assert_eq!(out.matches('\n').count(), text.matches('\n').count());
        }
    }
}
