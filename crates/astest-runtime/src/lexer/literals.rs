//! Literal scanning for the lexer

use crate::diagnostic::error_codes;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Scan a string literal; the token's lexeme is the decoded contents
    pub(super) fn string(&mut self) -> Token {
        let mut value = String::new();
        let mut error_token = None;

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() != '\\' {
                value.push(self.advance());
                continue;
            }

            self.advance(); // backslash
            if self.is_at_end() {
                break;
            }

            let escape_char = self.advance();
            let escaped = match escape_char {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                other => {
                    // Keep scanning so the closing quote is still found
                    if error_token.is_none() {
                        error_token = Some(self.error_token_with_code(
                            error_codes::INVALID_ESCAPE,
                            &format!("Invalid escape sequence '\\{}'", other),
                        ));
                    }
                    continue;
                }
            };
            value.push(escaped);
        }

        if self.is_at_end() {
            return self.error_token_with_code(
                error_codes::UNTERMINATED_STRING,
                "Unterminated string literal",
            );
        }

        self.advance(); // closing quote

        match error_token {
            Some(err) => err,
            None => self.make_token(TokenKind::String, &value),
        }
    }

    /// Scan a number literal (integer or decimal)
    pub(super) fn number(&mut self) -> Token {
        let start = self.current - 1;

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A '.' only continues the number when a digit follows
        if self.peek() == '.' && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if self.peek().is_alphabetic() || self.peek() == '_' {
            while self.peek().is_alphanumeric() || self.peek() == '_' {
                self.advance();
            }
            return self.error_token_with_code(
                error_codes::INVALID_NUMBER,
                "Invalid number literal",
            );
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        self.make_token(TokenKind::Number, &lexeme)
    }

    /// Scan an identifier or keyword
    pub(super) fn identifier(&mut self) -> Token {
        let start = self.current - 1;

        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        let kind = TokenKind::is_keyword(&lexeme).unwrap_or(TokenKind::Identifier);

        self.make_token(kind, &lexeme)
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostic::error_codes;
    use crate::lexer::Lexer;
    use crate::token::TokenKind;

    #[test]
    fn test_string_escapes_are_decoded() {
        let (tokens, diagnostics) = Lexer::new(r#""a\tb\n\"c\"""#).tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "a\tb\n\"c\"");
    }

    #[test]
    fn test_string_span_covers_quotes() {
        let (tokens, _) = Lexer::new(r#"x == "hi""#).tokenize();
        let s = &tokens[2];
        assert_eq!((s.span.column, s.span.end_column), (5, 9));
    }

    #[test]
    fn test_multiline_string_tracks_lines() {
        let (tokens, _) = Lexer::new("\"a\nb\" c").tokenize();
        assert_eq!(tokens[0].span.end_line, 2);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let (_, diagnostics) = Lexer::new("\"abc").tokenize();
        assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_STRING);
    }

    #[test]
    fn test_invalid_escape() {
        let (tokens, diagnostics) = Lexer::new(r#""\q" 1"#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(diagnostics[0].code, error_codes::INVALID_ESCAPE);
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = Lexer::new("42 3.25 7.").tokenize();
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].lexeme, "3.25");
        assert_eq!(tokens[2].lexeme, "7");
        assert_eq!(tokens[3].kind, TokenKind::Error);
    }

    #[test]
    fn test_invalid_number_suffix() {
        let (_, diagnostics) = Lexer::new("12abc").tokenize();
        assert_eq!(diagnostics[0].code, error_codes::INVALID_NUMBER);
    }
}
