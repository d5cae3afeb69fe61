//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes JavaScript source code.
///
/// The scanner is a cursor over the source and is cheap to clone, which
/// the parser relies on for bounded lookahead (arrow-function detection).
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    saw_newline: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Self {
            source,
            pos: 0,
            saw_newline: false,
        };
        scanner.skip_hashbang();
        scanner
    }

    /// Returns the source this scanner reads.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.saw_newline = false;
        self.skip_whitespace_and_comments();
        let newline = self.saw_newline;

        let start = self.pos;

        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start)).after_newline(newline);
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,

            '.' => self.scan_dot(),
            '+' => self.scan_compound('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => self.scan_compound('-', TokenKind::Minus, TokenKind::MinusMinus, TokenKind::MinusEqual),
            '*' => self.scan_star(),
            '/' => self.scan_if_equal(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_if_equal(TokenKind::Percent, TokenKind::PercentEqual),
            '^' => self.scan_if_equal(TokenKind::Caret, TokenKind::CaretEqual),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_logical('&', TokenKind::Ampersand, TokenKind::AmpersandEqual, TokenKind::AmpersandAmpersand, TokenKind::AmpersandAmpersandEqual),
            '|' => self.scan_logical('|', TokenKind::Pipe, TokenKind::PipeEqual, TokenKind::PipePipe, TokenKind::PipePipeEqual),
            '?' => self.scan_question(),

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template(),
            '0'..='9' => self.scan_number(ch),
            '#' => self.scan_private_identifier(),
            '\\' => self.scan_identifier(None),
            _ if is_id_start(ch) => self.scan_identifier(Some(ch)),

            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.pos)).after_newline(newline)
    }

    /// Re-scans a `/` or `/=` token starting at `start` as a regular
    /// expression literal. The parser calls this when a slash appears in
    /// expression-start position.
    pub fn rescan_regex(&mut self, start: usize, newline_before: bool) -> Token {
        self.pos = start + 1;
        let mut pattern = String::new();
        let mut in_class = false;

        loop {
            match self.advance() {
                None | Some('\n') | Some('\r') => {
                    return Token::new(TokenKind::Invalid, Span::new(start, self.pos))
                        .after_newline(newline_before);
                }
                Some('\\') => {
                    pattern.push('\\');
                    if let Some(escaped) = self.advance() {
                        pattern.push(escaped);
                    }
                }
                Some('[') => {
                    in_class = true;
                    pattern.push('[');
                }
                Some(']') => {
                    in_class = false;
                    pattern.push(']');
                }
                Some('/') if !in_class => break,
                Some(ch) => pattern.push(ch),
            }
        }

        let mut flags = String::new();
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                flags.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::RegExp { pattern, flags }, Span::new(start, self.pos))
            .after_newline(newline_before)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_hashbang(&mut self) {
        if self.source.starts_with("#!") {
            while let Some(ch) = self.peek() {
                if is_line_terminator(ch) {
                    break;
                }
                self.advance();
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if is_line_terminator(ch) => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some(ch) = self.advance() {
                            if is_line_terminator(ch) {
                                self.saw_newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn scan_dot(&mut self) -> TokenKind {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return self.scan_number('.');
        }
        if self.peek() == Some('.') && self.peek_next() == Some('.') {
            self.advance();
            self.advance();
            TokenKind::Ellipsis
        } else {
            TokenKind::Dot
        }
    }

    /// `+`, `++`, `+=` and the `-` family.
    fn scan_compound(
        &mut self,
        ch: char,
        single: TokenKind,
        double: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        if self.eat(ch) {
            double
        } else if self.eat('=') {
            assign
        } else {
            single
        }
    }

    fn scan_if_equal(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.eat('=') { assign } else { plain }
    }

    /// `&`, `&=`, `&&`, `&&=` and the `|` family.
    fn scan_logical(
        &mut self,
        ch: char,
        single: TokenKind,
        single_assign: TokenKind,
        double: TokenKind,
        double_assign: TokenKind,
    ) -> TokenKind {
        if self.eat(ch) {
            if self.eat('=') { double_assign } else { double }
        } else if self.eat('=') {
            single_assign
        } else {
            single
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        if self.eat('*') {
            self.scan_if_equal(TokenKind::StarStar, TokenKind::StarStarEqual)
        } else {
            self.scan_if_equal(TokenKind::Star, TokenKind::StarEqual)
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.eat('<') {
            self.scan_if_equal(TokenKind::LeftShift, TokenKind::LeftShiftEqual)
        } else {
            self.scan_if_equal(TokenKind::LessThan, TokenKind::LessThanEqual)
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.eat('>') {
            if self.eat('>') {
                self.scan_if_equal(TokenKind::UnsignedRightShift, TokenKind::UnsignedRightShiftEqual)
            } else {
                self.scan_if_equal(TokenKind::RightShift, TokenKind::RightShiftEqual)
            }
        } else {
            self.scan_if_equal(TokenKind::GreaterThan, TokenKind::GreaterThanEqual)
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.eat('=') {
            self.scan_if_equal(TokenKind::EqualEqual, TokenKind::StrictEqual)
        } else if self.eat('>') {
            TokenKind::Arrow
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.eat('=') {
            self.scan_if_equal(TokenKind::NotEqual, TokenKind::StrictNotEqual)
        } else {
            TokenKind::Bang
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        if self.eat('?') {
            self.scan_if_equal(TokenKind::QuestionQuestion, TokenKind::QuestionQuestionEqual)
        } else if self.peek() == Some('.') && !self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            TokenKind::QuestionDot
        } else {
            TokenKind::Question
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some(ch) if ch == quote => break,
                Some('\n') => return TokenKind::Invalid,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('b') => value.push('\u{8}'),
                    Some('f') => value.push('\u{c}'),
                    Some('v') => value.push('\u{b}'),
                    Some('0') => value.push('\0'),
                    Some('x') => {
                        if let Some(ch) = self.scan_hex_escape(2) {
                            value.push(ch);
                        }
                    }
                    Some('u') => {
                        if let Some(ch) = self.scan_unicode_escape() {
                            value.push(ch);
                        }
                    }
                    // Line continuation
                    Some('\r') => {
                        self.eat('\n');
                    }
                    Some('\n') => {}
                    Some(escaped) => value.push(escaped),
                    None => return TokenKind::Invalid,
                },
                Some(ch) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let start = self.pos;
        for _ in 0..digits {
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            self.advance();
        }
        u32::from_str_radix(&self.source[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
    }

    fn scan_unicode_escape(&mut self) -> Option<char> {
        if self.eat('{') {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let code = u32::from_str_radix(&self.source[start..self.pos], 16).ok();
            self.eat('}');
            code.and_then(char::from_u32)
        } else {
            self.scan_hex_escape(4)
        }
    }

    /// Scans a whole template literal, including `${ ... }` substitutions,
    /// and returns its raw text. Substitutions are not tokenized.
    fn scan_template(&mut self) -> TokenKind {
        let start = self.pos;
        let mut depth = 0usize;

        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some('\\') => {
                    self.advance();
                }
                Some('`') if depth == 0 => break,
                Some('$') if depth == 0 && self.peek() == Some('{') => {
                    self.advance();
                    depth = 1;
                }
                Some('{') if depth > 0 => depth += 1,
                Some('}') if depth > 0 => depth -= 1,
                Some(quote @ ('"' | '\'')) if depth > 0 => {
                    if matches!(self.scan_string(quote), TokenKind::Invalid) {
                        return TokenKind::Invalid;
                    }
                }
                Some('`') => {
                    // Nested template inside a substitution
                    if matches!(self.scan_template(), TokenKind::Invalid) {
                        return TokenKind::Invalid;
                    }
                }
                Some(_) => {}
            }
        }

        TokenKind::Template(self.source[start..self.pos - 1].to_string())
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => return self.scan_radix_number(16, "0x"),
                Some('o' | 'O') => return self.scan_radix_number(8, "0o"),
                Some('b' | 'B') => return self.scan_radix_number(2, "0b"),
                _ => {}
            }
        }

        let mut value = String::from(first);
        self.take_digits(&mut value);

        if first != '.' && self.peek() == Some('.') {
            value.push('.');
            self.advance();
            self.take_digits(&mut value);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            self.take_digits(&mut value);
        }

        if self.eat('n') {
            return TokenKind::BigInt(value);
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn take_digits(&mut self, value: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                value.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
    }

    fn scan_radix_number(&mut self, radix: u32, prefix: &str) -> TokenKind {
        self.advance(); // consume radix marker
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                value.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }

        if self.eat('n') {
            return TokenKind::BigInt(format!("{prefix}{value}"));
        }

        match u64::from_str_radix(&value, radix) {
            Ok(n) => TokenKind::Number(n as f64),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: Option<char>) -> TokenKind {
        let mut name = String::new();
        match first {
            Some(ch) => name.push(ch),
            None => match self.scan_identifier_escape() {
                Some(ch) => name.push(ch),
                None => return TokenKind::Invalid,
            },
        }

        loop {
            match self.peek() {
                Some('\\') => {
                    self.advance();
                    match self.scan_identifier_escape() {
                        Some(ch) => name.push(ch),
                        None => return TokenKind::Invalid,
                    }
                }
                Some(ch) if is_id_continue(ch) => {
                    name.push(ch);
                    self.advance();
                }
                _ => break,
            }
        }

        keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }

    fn scan_identifier_escape(&mut self) -> Option<char> {
        if self.eat('u') {
            self.scan_unicode_escape()
        } else {
            None
        }
    }

    fn scan_private_identifier(&mut self) -> TokenKind {
        let mut name = String::new();

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if name.is_empty() {
            TokenKind::Invalid
        } else {
            TokenKind::PrivateIdentifier(name)
        }
    }
}

fn keyword(name: &str) -> Option<TokenKind> {
    let kind = match name {
        "await" => TokenKind::Await,
        "break" => TokenKind::Break,
        "case" => TokenKind::Case,
        "catch" => TokenKind::Catch,
        "class" => TokenKind::Class,
        "const" => TokenKind::Const,
        "continue" => TokenKind::Continue,
        "debugger" => TokenKind::Debugger,
        "default" => TokenKind::Default,
        "delete" => TokenKind::Delete,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "enum" => TokenKind::Enum,
        "export" => TokenKind::Export,
        "extends" => TokenKind::Extends,
        "false" => TokenKind::False,
        "finally" => TokenKind::Finally,
        "for" => TokenKind::For,
        "function" => TokenKind::Function,
        "if" => TokenKind::If,
        "import" => TokenKind::Import,
        "in" => TokenKind::In,
        "instanceof" => TokenKind::Instanceof,
        "let" => TokenKind::Let,
        "new" => TokenKind::New,
        "null" => TokenKind::Null,
        "return" => TokenKind::Return,
        "static" => TokenKind::Static,
        "super" => TokenKind::Super,
        "switch" => TokenKind::Switch,
        "this" => TokenKind::This,
        "throw" => TokenKind::Throw,
        "true" => TokenKind::True,
        "try" => TokenKind::Try,
        "typeof" => TokenKind::Typeof,
        "var" => TokenKind::Var,
        "void" => TokenKind::Void,
        "while" => TokenKind::While,
        "with" => TokenKind::With,
        "yield" => TokenKind::Yield,
        "async" => TokenKind::Async,
        _ => return None,
    };
    Some(kind)
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch == '\u{200c}' || ch == '\u{200d}' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("{ } ( ) => ..."),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Arrow,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut scanner = Scanner::new("42 3.14 0xff 0b1010 1_000 .5 10n");
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 42.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 3.14));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 255.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 10.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 1000.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 0.5));
        assert!(matches!(scanner.next_token().kind, TokenKind::BigInt(s) if s == "10"));
    }

    #[test]
    fn test_strings_and_escapes() {
        let mut scanner = Scanner::new(r#""hello" 'wo\'rld' "\x41B\u{43}""#);
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "hello"));
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "wo'rld"));
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "ABC"));
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        assert_eq!(kinds("'abc"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("function exports _bar $baz"),
            vec![
                TokenKind::Function,
                TokenKind::Identifier("exports".into()),
                TokenKind::Identifier("_bar".into()),
                TokenKind::Identifier("$baz".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut scanner = Scanner::new("a // comment\nb /* multi\nline */ c /* inline */ d");
        assert!(!scanner.next_token().newline_before);
        assert!(scanner.next_token().newline_before);
        assert!(scanner.next_token().newline_before);
        assert!(!scanner.next_token().newline_before);
    }

    #[test]
    fn test_template_with_substitution() {
        let kinds = kinds("`a ${ {b: `c`}.b } d` x");
        assert_eq!(kinds[0], TokenKind::Template("a ${ {b: `c`}.b } d".into()));
        assert_eq!(kinds[1], TokenKind::Identifier("x".into()));
    }

    #[test]
    fn test_rescan_regex() {
        let source = "/ab[/]c/gi.test(x)";
        let mut scanner = Scanner::new(source);
        let slash = scanner.next_token();
        assert_eq!(slash.kind, TokenKind::Slash);
        let regex = scanner.rescan_regex(slash.span.start, false);
        assert_eq!(
            regex.kind,
            TokenKind::RegExp {
                pattern: "ab[/]c".into(),
                flags: "gi".into()
            }
        );
        assert_eq!(scanner.next_token().kind, TokenKind::Dot);
    }

    #[test]
    fn test_hashbang_is_skipped() {
        assert_eq!(kinds("#!/usr/bin/env node\nx"), vec![TokenKind::Identifier("x".into())]);
    }

    #[test]
    fn test_optional_chaining_vs_ternary_decimal() {
        assert_eq!(kinds("a?.b")[1], TokenKind::QuestionDot);
        assert_eq!(kinds("a?.5:1")[1], TokenKind::Question);
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("&&= ||= ??= >>>= **="),
            vec![
                TokenKind::AmpersandAmpersandEqual,
                TokenKind::PipePipeEqual,
                TokenKind::QuestionQuestionEqual,
                TokenKind::UnsignedRightShiftEqual,
                TokenKind::StarStarEqual,
            ]
        );
    }
}
