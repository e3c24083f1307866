//! Tokenizer for operator-supplied command lines.
//!
//! Used by the custom pipeline profile, where the whole encoder invocation is
//! a single configured string. Rules:
//!
//! - fields are separated by runs of spaces/tabs outside quotes;
//! - a field may be wrapped in matching `'` or `"`; the quotes are stripped,
//!   interior whitespace is kept, and a quote closes only on its own kind;
//! - outside quotes, `\` makes the next character literal and is consumed;
//! - an unterminated quote is a syntax error;
//! - a trailing field is emitted if non-empty.
//!
//! There is no shell expansion of any kind.

use crate::{Error, Result};

/// Tokenizer behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Tokenize the way legacy command lines were.
    ///
    /// The first character of the input is treated as escaped, and an escaped
    /// character never starts a field, so `a b` yields the single field `ab`.
    /// Almost certainly unintended: a leading quote or space becomes part of
    /// the first field. Only enable for parity with such configurations.
    pub escape_first_char: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Field,
    Quoted(char),
}

/// Split `command` into an argument vector with default options.
///
/// # Example
///
/// ```
/// use castforged_av::cmdline::parse_command_line;
///
/// let argv = parse_command_line(r#"foo "bar baz" qux"#)?;
/// assert_eq!(argv, ["foo", "bar baz", "qux"]);
/// # Ok::<(), castforged_av::Error>(())
/// ```
pub fn parse_command_line(command: &str) -> Result<Vec<String>> {
    parse_command_line_with(command, TokenizerOptions::default())
}

/// Split `command` into an argument vector.
///
/// # Errors
///
/// Returns [`Error::Syntax`] naming the input when a quote is never closed.
pub fn parse_command_line_with(command: &str, options: TokenizerOptions) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut state = State::Start;
    let mut escape_next = options.escape_first_char;

    for c in command.chars() {
        if let State::Quoted(quote) = state {
            if c == quote {
                args.push(std::mem::take(&mut current));
                state = State::Start;
            } else {
                current.push(c);
            }
            continue;
        }

        if escape_next {
            current.push(c);
            escape_next = false;
            if !options.escape_first_char {
                state = State::Field;
            }
            continue;
        }

        match c {
            '\\' => escape_next = true,
            '"' | '\'' => state = State::Quoted(c),
            ' ' | '\t' => {
                if state == State::Field {
                    args.push(std::mem::take(&mut current));
                    state = State::Start;
                }
            }
            _ => {
                state = State::Field;
                current.push(c);
            }
        }
    }

    if matches!(state, State::Quoted(_)) {
        return Err(Error::syntax("unclosed quote", command));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}
