use crate::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    At,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    Question,
    Colon,
    ColonColon,
    Arrow,
    Eq,
    EqEq,
    Bang,
    BangEq,
    Lt,
    Gt,
    Le,
    Ge,
    AmpAmp,
    PipePipe,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    /// Compound assignment such as `+=` or `<<=`.
    OpEq,
    Unknown,
    Eof,
}

/// Lex the whole text. Comments and whitespace are dropped.
pub fn lex(text: &str) -> Vec<Token> {
    Lexer::new(text).collect()
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer { text, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                self.bump_char();
            }

            let rem = self.remaining();
            if rem.starts_with("//") {
                while let Some(c) = self.bump_char() {
                    if c == '\n' {
                        break;
                    }
                }
                continue;
            }

            if rem.starts_with("/*") {
                self.pos += 2;
                match self.remaining().find("*/") {
                    Some(end) => self.pos += end + 2,
                    None => self.pos = self.text.len(),
                }
                continue;
            }

            break;
        }
    }

    fn lex_identifier(&mut self, out: &mut String) {
        while let Some(c) = self.peek_char() {
            if unicode_ident::is_xid_continue(c) || c == '$' {
                out.push(c);
                self.bump_char();
            } else {
                break;
            }
        }
    }

    fn lex_number(&mut self, out: &mut String) -> TokenKind {
        let is_hex = out == "0" && matches!(self.peek_char(), Some('x' | 'X'));
        let mut is_fractional = out.starts_with('.');
        while let Some(c) = self.peek_char() {
            if !is_hex && matches!(c, 'e' | 'E') {
                is_fractional = true;
                out.push(c);
                self.bump_char();
                if let Some(sign @ ('+' | '-')) = self.peek_char() {
                    out.push(sign);
                    self.bump_char();
                }
            } else if c.is_ascii_alphanumeric() || c == '_' {
                out.push(c);
                self.bump_char();
            } else if c == '.' && !is_hex && !is_fractional {
                if !matches!(self.peek_char_n(1), Some(d) if d.is_ascii_digit()) {
                    // `1.` is a complete double literal unless a member access follows.
                    if matches!(self.peek_char_n(1), Some(n) if unicode_ident::is_xid_start(n)) {
                        break;
                    }
                }
                is_fractional = true;
                out.push(c);
                self.bump_char();
            } else {
                break;
            }
        }

        let last = out.chars().last().unwrap_or('0');
        match last {
            'l' | 'L' => TokenKind::LongLiteral,
            'f' | 'F' if !is_hex => TokenKind::FloatLiteral,
            'd' | 'D' if !is_hex => TokenKind::DoubleLiteral,
            _ if is_fractional => TokenKind::DoubleLiteral,
            _ => TokenKind::IntLiteral,
        }
    }

    /// Lexes a string or text block; the opening quote is already in `out`.
    fn lex_string_literal(&mut self, out: &mut String) {
        if self.remaining().starts_with("\"\"") {
            self.pos += 2;
            out.push_str("\"\"");
            match self.remaining().find("\"\"\"") {
                Some(end) => {
                    out.push_str(&self.remaining()[..end + 3]);
                    self.pos += end + 3;
                }
                None => {
                    out.push_str(self.remaining());
                    self.pos = self.text.len();
                }
            }
            return;
        }
        self.lex_quoted(out, '"');
    }

    fn lex_quoted(&mut self, out: &mut String, quote: char) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.bump_char();
            out.push(c);
            if c == quote {
                break;
            }
            if c == '\\' {
                if let Some(escaped) = self.bump_char() {
                    out.push(escaped);
                }
            }
        }
    }

    /// Picks the longest operator among `candidates` (longest first).
    fn lex_operator(&mut self, first: char, candidates: &[(&str, TokenKind)], fallback: TokenKind) -> (TokenKind, String) {
        for (op, kind) in candidates {
            let rest = &op[first.len_utf8()..];
            if self.remaining().starts_with(rest) {
                self.pos += rest.len();
                return (*kind, (*op).to_string());
            }
        }
        (fallback, first.to_string())
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let ch = self.bump_char()?;

        let (kind, text) = match ch {
            '{' => (TokenKind::LBrace, "{".to_string()),
            '}' => (TokenKind::RBrace, "}".to_string()),
            '(' => (TokenKind::LParen, "(".to_string()),
            ')' => (TokenKind::RParen, ")".to_string()),
            '[' => (TokenKind::LBracket, "[".to_string()),
            ']' => (TokenKind::RBracket, "]".to_string()),
            ';' => (TokenKind::Semi, ";".to_string()),
            ',' => (TokenKind::Comma, ",".to_string()),
            '@' => (TokenKind::At, "@".to_string()),
            '?' => (TokenKind::Question, "?".to_string()),
            '.' if matches!(self.peek_char(), Some(d) if d.is_ascii_digit()) => {
                let mut num = String::from(".");
                let kind = self.lex_number(&mut num);
                (kind, num)
            }
            '.' => self.lex_operator('.', &[("...", TokenKind::Ellipsis)], TokenKind::Dot),
            ':' => self.lex_operator(':', &[("::", TokenKind::ColonColon)], TokenKind::Colon),
            '=' => self.lex_operator('=', &[("==", TokenKind::EqEq)], TokenKind::Eq),
            '!' => self.lex_operator('!', &[("!=", TokenKind::BangEq)], TokenKind::Bang),
            '<' => self.lex_operator(
                '<',
                &[("<<=", TokenKind::OpEq), ("<=", TokenKind::Le)],
                TokenKind::Lt,
            ),
            // `>>` is left as two tokens so nested type arguments close cleanly.
            '>' => self.lex_operator(
                '>',
                &[(">>>=", TokenKind::OpEq), (">>=", TokenKind::OpEq), (">=", TokenKind::Ge)],
                TokenKind::Gt,
            ),
            '&' => self.lex_operator(
                '&',
                &[("&&", TokenKind::AmpAmp), ("&=", TokenKind::OpEq)],
                TokenKind::Unknown,
            ),
            '|' => self.lex_operator(
                '|',
                &[("||", TokenKind::PipePipe), ("|=", TokenKind::OpEq)],
                TokenKind::Unknown,
            ),
            '^' => self.lex_operator('^', &[("^=", TokenKind::OpEq)], TokenKind::Unknown),
            '+' => self.lex_operator(
                '+',
                &[("++", TokenKind::PlusPlus), ("+=", TokenKind::OpEq)],
                TokenKind::Plus,
            ),
            '-' => self.lex_operator(
                '-',
                &[
                    ("--", TokenKind::MinusMinus),
                    ("-=", TokenKind::OpEq),
                    ("->", TokenKind::Arrow),
                ],
                TokenKind::Minus,
            ),
            '*' => self.lex_operator('*', &[("*=", TokenKind::OpEq)], TokenKind::Star),
            '/' => self.lex_operator('/', &[("/=", TokenKind::OpEq)], TokenKind::Slash),
            '%' => self.lex_operator('%', &[("%=", TokenKind::OpEq)], TokenKind::Percent),
            '"' => {
                let mut lit = String::from("\"");
                self.lex_string_literal(&mut lit);
                (TokenKind::StringLiteral, lit)
            }
            '\'' => {
                let mut lit = String::from("'");
                self.lex_quoted(&mut lit, '\'');
                (TokenKind::CharLiteral, lit)
            }
            c if c.is_ascii_digit() => {
                let mut num = c.to_string();
                let kind = self.lex_number(&mut num);
                (kind, num)
            }
            c if unicode_ident::is_xid_start(c) || c == '_' || c == '$' => {
                let mut ident = c.to_string();
                self.lex_identifier(&mut ident);
                (TokenKind::Ident, ident)
            }
            other => (TokenKind::Unknown, other.to_string()),
        };

        Some(Token {
            kind,
            text,
            range: Span::new(start, self.pos),
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numeric_literal_kinds() {
        assert_eq!(
            kinds("1 2L 3.0 4f 5e3 0x1F .5 6d"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::LongLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::FloatLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
            ]
        );
    }

    #[test]
    fn nested_generics_close_with_separate_tokens() {
        assert_eq!(
            kinds("Map<A,List<B>>"),
            vec![
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Gt,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_ranges_are_byte_offsets() {
        let tokens = lex("/* é */ x // trailing\ny");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens[0].range, Span::new(9, 10));
        assert_eq!(tokens[1].text, "y");
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("a += b == c != d && e || f -> g ... h++"),
            vec![
                TokenKind::Ident,
                TokenKind::OpEq,
                TokenKind::Ident,
                TokenKind::EqEq,
                TokenKind::Ident,
                TokenKind::BangEq,
                TokenKind::Ident,
                TokenKind::AmpAmp,
                TokenKind::Ident,
                TokenKind::PipePipe,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Ellipsis,
                TokenKind::Ident,
                TokenKind::PlusPlus,
            ]
        );
    }

    #[test]
    fn string_and_char_literals_handle_escapes() {
        let tokens = lex(r#""a\"b" '\'' "unterminated"#);
        assert_eq!(tokens[0].text, r#""a\"b""#);
        assert_eq!(tokens[1].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[1].text, r"'\''");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn unicode_identifiers() {
        let tokens = lex("größe $x _y");
        assert_eq!(
            tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["größe", "$x", "_y"]
        );
    }
}
