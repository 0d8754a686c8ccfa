//! Tokenizer for formula strings.

use super::FormulaParseError;

/// A reference to a variable at a relative time step, e.g. `CASH[t-1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeRef {
    /// The referenced variable's name.
    pub base: String,
    /// Relative step: `name[t]` is 0, `name[t-1]` is -1, `name[t+2]` is 2.
    pub offset: i64,
    /// The reference exactly as written; the substitution key.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    TimeRef(TimeRef),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl Token {
    /// Human-readable rendering for error messages.
    pub fn display(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(s) => s.clone(),
            Token::TimeRef(r) => r.token.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
        }
    }
}

/// Splits a dependency token into its base variable name and whether it is a
/// time-offset reference. `"CASH[t-1]"` gives `("CASH", true)`; `"COGS"`
/// gives `("COGS", false)`.
pub fn reference_base(token: &str) -> (&str, bool) {
    match token.find('[') {
        Some(i) => (&token[..i], true),
        None => (token, false),
    }
}

/// Tokenizes `src`, pairing each token with its byte position.
pub fn lex(src: &str) -> Result<Vec<(Token, usize)>, FormulaParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push((Token::Plus, pos));
            }
            '-' => {
                chars.next();
                tokens.push((Token::Minus, pos));
            }
            '*' => {
                chars.next();
                tokens.push((Token::Star, pos));
            }
            '/' => {
                chars.next();
                tokens.push((Token::Slash, pos));
            }
            '^' => {
                chars.next();
                tokens.push((Token::Caret, pos));
            }
            '(' => {
                chars.next();
                tokens.push((Token::LParen, pos));
            }
            ')' => {
                chars.next();
                tokens.push((Token::RParen, pos));
            }
            ',' => {
                chars.next();
                tokens.push((Token::Comma, pos));
            }
            c if c.is_ascii_digit() => {
                let mut end = pos;
                let mut seen_dot = false;
                while let Some(&(p, c)) = chars.peek() {
                    if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                        seen_dot |= c == '.';
                        end = p + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &src[pos..end];
                let value = text.parse::<f64>().map_err(|_| {
                    FormulaParseError::InvalidNumber { text: text.to_string(), pos }
                })?;
                tokens.push((Token::Number(value), pos));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = pos;
                while let Some(&(p, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = p + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &src[pos..end];
                if matches!(chars.peek(), Some(&(_, '['))) {
                    let time_ref = lex_time_ref(src, pos, name, &mut chars)?;
                    tokens.push((Token::TimeRef(time_ref), pos));
                } else {
                    tokens.push((Token::Ident(name.to_string()), pos));
                }
            }
            _ => return Err(FormulaParseError::UnexpectedChar { ch, pos }),
        }
    }

    Ok(tokens)
}

/// Consumes `[t]`, `[t+N]` or `[t-N]` following an identifier. Anything else
/// inside the brackets is malformed; whitespace is not accepted there.
fn lex_time_ref(
    src: &str,
    start: usize,
    base: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<TimeRef, FormulaParseError> {
    let malformed = |end: usize| FormulaParseError::InvalidTimeRef {
        token: src[start..end.min(src.len())].to_string(),
    };

    chars.next(); // consume '['
    match chars.next() {
        Some((_, 't')) => {}
        Some((p, c)) => return Err(malformed(p + c.len_utf8())),
        None => return Err(malformed(src.len())),
    }

    let (offset, close) = match chars.next() {
        Some((p, ']')) => (0i64, p),
        Some((_, sign @ ('+' | '-'))) => {
            let mut digits = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let close = match chars.next() {
                Some((p, ']')) if !digits.is_empty() => p,
                Some((p, c)) => return Err(malformed(p + c.len_utf8())),
                None => return Err(malformed(src.len())),
            };
            let magnitude: i64 = digits
                .parse()
                .map_err(|_| malformed(close + 1))?;
            (if sign == '-' { -magnitude } else { magnitude }, close)
        }
        Some((p, c)) => return Err(malformed(p + c.len_utf8())),
        None => return Err(malformed(src.len())),
    };

    Ok(TimeRef {
        base: base.to_string(),
        offset,
        token: src[start..=close].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn lexes_arithmetic() {
        let tokens: Vec<Token> = lex("A + 2.5 * (B - 1)")
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("A".into()),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::LParen,
                Token::Ident("B".into()),
                Token::Minus,
                Token::Number(1.0),
                Token::RParen,
            ]
        );
    }

    #[rstest]
    #[case("X[t]", "X", 0)]
    #[case("X[t+3]", "X", 3)]
    #[case("DEBT_BALANCE[t-12]", "DEBT_BALANCE", -12)]
    fn lexes_time_refs(#[case] src: &str, #[case] base: &str, #[case] offset: i64) {
        let tokens = lex(src).unwrap();
        match &tokens[0].0 {
            Token::TimeRef(r) => {
                assert_eq!(r.base, base);
                assert_eq!(r.offset, offset);
                assert_eq!(r.token, src);
            }
            other => panic!("expected time ref, got {other:?}"),
        }
    }

    #[rstest]
    #[case("X[s-1]")]
    #[case("X[t-]")]
    #[case("X[t1]")]
    #[case("X[t-1")]
    #[case("X[")]
    fn rejects_malformed_time_refs(#[case] src: &str) {
        assert!(matches!(
            lex(src),
            Err(FormulaParseError::InvalidTimeRef { .. })
        ));
    }

    #[test]
    fn rejects_unknown_character() {
        let err = lex("A % B").unwrap_err();
        assert_eq!(err, FormulaParseError::UnexpectedChar { ch: '%', pos: 2 });
    }

    #[test]
    fn reference_base_splits_offsets() {
        assert_eq!(reference_base("CASH[t-1]"), ("CASH", true));
        assert_eq!(reference_base("COGS"), ("COGS", false));
    }
}
