//! Shell escaping and quoting utilities.

/// Characters that pass through `escape_word` untouched.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ',' | ':' | '/' | '@' | '-')
}

/// Escape a single word for a POSIX shell command line.
///
/// - Empty strings become `''`
/// - Every character outside `[A-Za-z0-9_.,:/@-]` is prefixed with a backslash
/// - A newline becomes `'\n'`, since a backslash-newline pair is a line continuation
pub fn escape_word(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }

    let mut escaped = String::with_capacity(word.len() * 2);
    for c in word.chars() {
        if c == '\n' {
            escaped.push_str("'\n'");
        } else if is_safe(c) {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}

/// Escape each word individually and join them with single spaces.
pub fn escape_words<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| escape_word(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Split an escaped command line back into words.
    ///
    /// Understands the subset produced by `escape_word`: backslash escapes and
    /// single-quoted runs. Unescaped whitespace separates words.
    fn split_words(line: &str) -> Vec<String> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    in_word = true;
                }
                '\'' => {
                    for quoted in chars.by_ref() {
                        if quoted == '\'' {
                            break;
                        }
                        current.push(quoted);
                    }
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            }
        }

        if in_word {
            words.push(current);
        }
        words
    }

    #[test]
    fn escape_word_leaves_safe_words_alone() {
        assert_eq!(escape_word("db:migrate"), "db:migrate");
        assert_eq!(escape_word("git@github.com:user/repo.git"), "git@github.com:user/repo.git");
        assert_eq!(escape_word("--delete-before"), "--delete-before");
    }

    #[test]
    fn escape_word_backslashes_metacharacters() {
        assert_eq!(escape_word("the program"), "the\\ program");
        assert_eq!(escape_word(">>> status"), "\\>\\>\\>\\ status");
        assert_eq!(escape_word("$HOME"), "\\$HOME");
        assert_eq!(escape_word("it's"), "it\\'s");
    }

    #[test]
    fn escape_word_empty() {
        assert_eq!(escape_word(""), "''");
    }

    #[test]
    fn escape_word_quotes_newlines() {
        assert_eq!(escape_word("a\nb"), "a'\n'b");
    }

    #[test]
    fn escape_words_joins_with_spaces() {
        let words = vec!["echo".to_string(), "one two".to_string()];
        assert_eq!(escape_words(&words), "echo one\\ two");
    }

    #[test]
    fn split_words_recovers_escaped_arguments() {
        let words = vec![
            "echo".to_string(),
            ">>> status".to_string(),
            "it's (here)".to_string(),
            "multi\nline".to_string(),
            "".to_string(),
        ];
        assert_eq!(split_words(&escape_words(&words)), words);
    }
}
