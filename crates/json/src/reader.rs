use crate::config::ReaderConfig;
use crate::token::{Token, TokenFlags, TokenType};
use diag::{fail, json, rw, Diagnostic, Highlight, Location, Result, SourceSpan};
use fxhash::FxHashSet;
use pipe::{Entry, Name, Reader};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    InProgress,
    FinishedStr,
    // Reserved for hosts that poison a reader instead of aborting it.
    #[allow(dead_code)]
    Invalid,
}

fn state_name(state: State) -> &'static str {
    match state {
        State::Uninitialized => "Uninitialized",
        State::InProgress => "InProgress",
        State::FinishedStr => "FinishedStr",
        State::Invalid => "Invalid",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Nil,
    Object,
    Array,
}

/// Streaming JSON pull parser producing the entry alphabet.
///
/// The dialect is a superset of RFC 8259: `//` line and nesting `/* */`
/// block comments, and a single trailing comma before `}` or `]`. Object
/// keys must be string literals and are duplicate-checked per object.
///
/// Input is UTF-8; UTF-16 buffers are transcoded up front by
/// `set_input_utf16` and owned by the reader.
pub struct JsonReader<'a> {
    buf: Cow<'a, str>,
    state: State,
    states: Vec<ParseState>,
    keys: Vec<FxHashSet<Name>>,
    top_object_at_value: bool,
    token: Token,
    cached_next: Option<Token>,
    need_consume: bool,
    cur: usize,
    loc: Location,
    config: ReaderConfig,
}

impl Default for JsonReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> JsonReader<'a> {
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        JsonReader {
            buf: Cow::Borrowed(""),
            state: State::Uninitialized,
            states: vec![ParseState::Nil],
            keys: Vec::new(),
            top_object_at_value: false,
            token: Token::default(),
            cached_next: None,
            need_consume: true,
            cur: 0,
            loc: Location::default(),
            config: config.normalized(),
        }
    }

    pub fn set_input(&mut self, text: &'a str) -> Result<()> {
        self.set_input_cow(Cow::Borrowed(text))
    }

    /// Transcode a UTF-16 buffer and take ownership of the result.
    /// Unpaired surrogates are replaced, matching wide-string readers that
    /// accept whatever buffer the host hands over.
    pub fn set_input_utf16(&mut self, text: &[u16]) -> Result<()> {
        self.set_input_cow(Cow::Owned(String::from_utf16_lossy(text)))
    }

    fn set_input_cow(&mut self, buf: Cow<'a, str>) -> Result<()> {
        if self.state == State::InProgress {
            self.finish()?;
        }
        if self.state != State::Uninitialized && self.state != State::FinishedStr {
            return fail!(
                json::EXPECT_STATE_UNINITIALIZED_OR_FINISHED,
                state_name(self.state)
            );
        }

        // Proper reads leave these empty; `abort_and_uninitialize` clears
        // them after an error.
        debug_assert!(self.keys.is_empty());
        debug_assert_eq!(self.states.len(), 1);

        self.buf = buf;
        self.token = Token::default();
        self.cached_next = None;
        self.state = State::InProgress;
        self.top_object_at_value = false;
        self.need_consume = true;
        self.cur = 0;
        self.loc = Location { line: 1, column: 0 };
        self.keys.clear();
        self.states.clear();
        self.states.push(ParseState::Nil);

        tracing::trace!(len = self.buf.len(), "json reader input set");
        Ok(())
    }

    /// Demand that the whole document was consumed: the next entry must be
    /// `Ended`. Trailing comments are not trailing tokens.
    pub fn finish(&mut self) -> Result<()> {
        if self.state != State::InProgress {
            return fail!(json::EXPECT_STATE_IN_PROGRESS, state_name(self.state));
        }

        let next = self.peek()?;
        if next != Entry::Ended {
            return fail!(
                json::UNEXPECTED_TRAILING_TOKEN,
                next,
                self.highlight(self.token.span)
            );
        }
        debug_assert_eq!(self.state, State::FinishedStr);
        Ok(())
    }

    /// Reset after a failure so a new input can be provided.
    pub fn abort_and_uninitialize(&mut self) {
        self.state = State::Uninitialized;
        self.states.clear();
        self.states.push(ParseState::Nil);
        self.keys.clear();
        self.cached_next = None;
        self.top_object_at_value = false;
        self.need_consume = true;
    }

    /// Count of unclosed containers.
    pub fn nesting(&self) -> usize {
        self.states.len() - 1
    }

    //	cursor primitives

    fn is_at_end(&self) -> bool {
        self.cur >= self.buf.len()
    }

    fn peek_ch(&self) -> Option<char> {
        self.buf[self.cur..].chars().next()
    }

    fn peek_ch_at(&self, n: usize) -> Option<char> {
        self.buf[self.cur..].chars().nth(n)
    }

    fn advance(&mut self) {
        debug_assert!(!self.is_at_end());
        if let Some(ch) = self.peek_ch() {
            self.cur += ch.len_utf8();
            self.loc.column += 1;
        }
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn new_line(&mut self) {
        self.loc.line += 1;
        self.loc.column = 0;
    }

    fn token_text(&self) -> &str {
        let span = self.token.span;
        &self.buf[span.begin..span.begin + span.len]
    }

    fn token_entry_lossy(&self) -> Entry {
        self.token.ty.to_entry().unwrap_or(Entry::None)
    }

    //	raw scanner, one token per call

    fn consume_raw_token(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, State::InProgress);
        if let Some(cached) = self.cached_next.take() {
            self.token = cached;
            return Ok(());
        }

        if self.is_at_end() {
            self.token = Token {
                ty: TokenType::Eof,
                span: SourceSpan::new(self.cur, 0),
                flags: TokenFlags::default(),
            };
            self.state = State::FinishedStr;
            return Ok(());
        }

        let ch = self.peek_ch().expect("cursor checked in range");
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                self.read_whitespace();
                Ok(())
            }
            '/' => match self.peek_ch_at(1) {
                Some('/') => {
                    self.read_line_comment();
                    Ok(())
                }
                Some('*') => self.read_block_comment(),
                _ => fail!(
                    json::UNEXPECTED_CHAR,
                    ch,
                    self.highlight(SourceSpan::new(self.cur, 1))
                ),
            },
            '{' => self.single_char_token(TokenType::CurlyOpen),
            '}' => self.single_char_token(TokenType::CurlyClose),
            '[' => self.single_char_token(TokenType::SquareOpen),
            ']' => self.single_char_token(TokenType::SquareClose),
            ':' => self.single_char_token(TokenType::Colon),
            ',' => self.single_char_token(TokenType::Comma),
            't' => {
                self.read_word_expect("true")?;
                self.token.ty = TokenType::True;
                Ok(())
            }
            'f' => {
                self.read_word_expect("false")?;
                self.token.ty = TokenType::False;
                Ok(())
            }
            'n' => {
                self.read_word_expect("null")?;
                self.token.ty = TokenType::Null;
                Ok(())
            }
            '"' => self.read_string_token(),
            '-' => self.read_number_token(),
            c if c.is_ascii_digit() => self.read_number_token(),
            _ => fail!(
                json::UNEXPECTED_CHAR,
                ch,
                self.highlight(SourceSpan::new(self.cur, 1))
            ),
        }
    }

    fn single_char_token(&mut self, ty: TokenType) -> Result<()> {
        self.token = Token {
            ty,
            span: SourceSpan::new(self.cur, 1),
            flags: TokenFlags::default(),
        };
        self.advance();
        Ok(())
    }

    fn read_whitespace(&mut self) {
        let begin = self.cur;
        while let Some(ch) = self.peek_ch() {
            if ch == '\n' {
                self.new_line();
            }
            if !matches!(ch, ' ' | '\t' | '\n' | '\r') {
                break;
            }
            self.advance();
        }
        self.token = Token {
            ty: TokenType::Whitespace,
            span: SourceSpan::new(begin, self.cur - begin),
            flags: TokenFlags::default(),
        };
    }

    fn read_line_comment(&mut self) {
        let begin = self.cur;
        debug_assert!(self.buf[self.cur..].starts_with("//"));
        self.advance_n(2);

        // The newline is left for the whitespace scanner, which owns the
        // line counter.
        let len = memchr::memchr2(b'\n', b'\r', &self.buf.as_bytes()[self.cur..])
            .unwrap_or(self.buf.len() - self.cur);
        let columns = self.buf[self.cur..self.cur + len].chars().count();
        self.cur += len;
        self.loc.column += columns as u32;

        self.token = Token {
            ty: TokenType::LineComment,
            span: SourceSpan::new(begin, self.cur - begin),
            flags: TokenFlags::default(),
        };
    }

    fn read_block_comment(&mut self) -> Result<()> {
        let begin = self.cur;
        debug_assert!(self.buf[self.cur..].starts_with("/*"));
        self.advance_n(2);

        let mut depth = 1u32;
        while !self.is_at_end() {
            let c0 = self.peek_ch();
            let c1 = self.peek_ch_at(1);
            match (c0, c1) {
                (Some('\n'), _) => self.new_line(),
                (Some('/'), Some('*')) => depth += 1,
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance_n(2);
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }

        if depth != 0 {
            return fail!(
                json::UNCLOSED_BLOCK_COMMENT,
                self.highlight(SourceSpan::new(begin, 2))
            );
        }
        self.token = Token {
            ty: TokenType::BlockComment,
            span: SourceSpan::new(begin, self.cur - begin),
            flags: TokenFlags::default(),
        };
        Ok(())
    }

    fn read_word_expect(&mut self, word: &str) -> Result<()> {
        let begin = self.cur;
        if self.buf.len() - self.cur < word.len() {
            return fail!(
                json::EXPECT_WORD_BUT_EOF,
                word,
                self.highlight(self.token.span)
            );
        }

        if !self.buf[self.cur..].starts_with(word) {
            let actual: String = self.buf[self.cur..].chars().take(word.chars().count()).collect();
            let span = SourceSpan::new(begin, actual.len());
            return fail!(
                json::EXPECT_WORD_BUT_NOT_FOUND,
                word,
                actual,
                self.highlight(span)
            );
        }

        self.token.span = SourceSpan::new(begin, word.len());
        self.advance_n(word.chars().count());
        Ok(())
    }

    fn read_string_token(&mut self) -> Result<()> {
        let begin = self.cur;
        self.token.flags = TokenFlags::default();

        self.advance();
        loop {
            match self.peek_ch() {
                None | Some('\n') => {
                    return fail!(
                        json::UNCLOSED_STRING_LITERAL,
                        self.highlight(SourceSpan::new(begin, 1))
                    );
                }
                Some('"') => {
                    self.advance();
                    self.token.ty = TokenType::String;
                    self.token.span = SourceSpan::new(begin, self.cur - begin);
                    return Ok(());
                }
                Some('\\') => {
                    self.token.flags.has_escape = true;
                    self.advance();
                    // Consume the escaped char so neither `\"` nor a `\\`
                    // at the end of the literal terminates it early.
                    if !self.is_at_end() {
                        self.advance();
                    }
                }
                Some(c) if (c as u32) < 0x20 => {
                    return fail!(
                        json::INVALID_CONTROL_CHAR_IN_STRING,
                        self.highlight(SourceSpan::new(self.cur, 1))
                    );
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn read_number_token(&mut self) -> Result<()> {
        let begin = self.cur;
        self.token.flags = TokenFlags::default();

        if self.peek_ch() == Some('-') {
            self.token.flags.is_negative = true;
        }

        self.advance();
        while !self.is_at_end() {
            match self.peek_ch() {
                Some('.') => {
                    self.token.flags.has_decimal = true;
                    self.token.flags.decimal_offset = self.cur - begin;
                    self.advance();
                }
                Some('e') | Some('E') => {
                    self.token.flags.has_exp = true;
                    self.advance();
                }
                Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.advance(),
                _ => break,
            }
        }

        self.token.ty = TokenType::Number;
        self.token.span = SourceSpan::new(begin, self.cur - begin);
        Ok(())
    }

    //	effective token layer

    fn consume_effective_token(&mut self) -> Result<()> {
        loop {
            self.consume_raw_token()?;
            if self.token.ty.is_effective() {
                return Ok(());
            }
        }
    }

    fn putback_token(&mut self, putback: Token) {
        debug_assert!(self.cached_next.is_none());
        self.cached_next = Some(self.token);
        self.token = putback;
    }

    fn token_as_entry(&self) -> Result<Entry> {
        match self.token.ty.to_entry() {
            Some(entry) => Ok(entry),
            None => fail!(json::UNEXPECTED_TOKEN, self.highlight(self.token.span)),
        }
    }

    /// Consume the next effective token when one isn't pending, checking
    /// its entry kind. A pending token (from `peek`) skips the check: the
    /// concrete read matches on the token itself, which is what makes
    /// coercion work.
    fn check_consume(&mut self, expected: Entry) -> Result<()> {
        if self.need_consume {
            self.consume_effective_token()?;
            let actual = self.token_as_entry()?;
            if actual != expected {
                return fail!(
                    rw::DATA_TYPE_MISMATCH,
                    expected,
                    actual,
                    self.highlight(self.token.span)
                );
            }
        }
        self.need_consume = true;
        Ok(())
    }

    //	structural state machine

    fn top_state(&self) -> ParseState {
        *self.states.last().expect("parse state stack never empty")
    }

    fn is_at_object_key(&self) -> bool {
        self.top_state() == ParseState::Object && !self.top_object_at_value
    }

    fn check_not_object_key(&self) -> Result<()> {
        if self.is_at_object_key() {
            return fail!(json::KEY_MUST_BE_STRING, self.highlight(self.token.span));
        }
        Ok(())
    }

    fn check_object_duplicated_key(&mut self, key: &Name) -> Result<()> {
        debug_assert!(!self.keys.is_empty() && self.is_at_object_key());
        let span = self.token.span;
        let keys = self.keys.last_mut().expect("key set present at object key");
        if !keys.insert(key.clone()) {
            return fail!(json::DUPLICATED_KEY, self.highlight(span));
        }
        Ok(())
    }

    fn check_object_key(&mut self, parsed: &str, key: &Name) -> Result<()> {
        if self.is_at_object_key() {
            if parsed.chars().count() > self.config.max_key_len {
                return fail!(
                    json::OBJECT_KEY_TOO_LONG,
                    self.config.max_key_len,
                    self.highlight(self.token.span)
                );
            }
            self.check_object_duplicated_key(key)?;
        }
        Ok(())
    }

    /// Comma/close discipline after a completed value read.
    fn end_top_read(&mut self) -> Result<()> {
        match self.top_state() {
            ParseState::Object => {
                if !self.top_object_at_value {
                    // At key position: the next effective token must be `:`.
                    self.consume_effective_token()?;
                    if self.token.ty != TokenType::Colon {
                        return fail!(json::UNEXPECTED_TOKEN, self.highlight(self.token.span));
                    }
                    self.top_object_at_value = true;
                    Ok(())
                } else {
                    // At value position: a comma moves to the next key
                    // (trailing comma before `}` allowed); a close brace is
                    // put back for `read_map_end`.
                    let prev = self.token;
                    self.consume_effective_token()?;
                    self.top_object_at_value = false;

                    match self.token.ty {
                        TokenType::Comma => Ok(()),
                        TokenType::CurlyClose => {
                            self.putback_token(prev);
                            Ok(())
                        }
                        _ => fail!(json::EXPECT_COMMA, self.highlight(self.token.span)),
                    }
                }
            }
            ParseState::Array => {
                let prev = self.token;
                self.consume_effective_token()?;

                match self.token.ty {
                    TokenType::Comma => Ok(()),
                    TokenType::SquareClose => {
                        self.putback_token(prev);
                        Ok(())
                    }
                    _ => fail!(json::EXPECT_COMMA, self.highlight(self.token.span)),
                }
            }
            ParseState::Nil => Ok(()),
        }
    }

    fn pop_top_state(&mut self, expected: ParseState) {
        let popped = self.states.pop();
        debug_assert_eq!(popped, Some(expected));
    }

    //	string and number parsing

    fn parse_string_token(&mut self) -> Result<String> {
        debug_assert_eq!(self.token.ty, TokenType::String);
        let span = self.token.span;
        let literal = &self.buf[span.begin + 1..span.begin + span.len - 1];

        if !self.token.flags.has_escape {
            return Ok(literal.to_owned());
        }

        let mut out = String::with_capacity(literal.len());
        let mut chars = literal.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('/') => out.push('/'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('u') => {
                    let high = decode_hex4(&mut chars)
                        .ok_or(())
                        .or_else(|_| self.fail_escaping())?;
                    if (0xD800..=0xDBFF).contains(&high) {
                        // Surrogate pair: demand the low half.
                        let followed = chars.next() == Some('\\') && chars.next() == Some('u');
                        if !followed {
                            return self.fail_escaping();
                        }
                        let low = decode_hex4(&mut chars)
                            .ok_or(())
                            .or_else(|_| self.fail_escaping())?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return self.fail_escaping();
                        }
                        let code =
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        match char::from_u32(code) {
                            Some(decoded) => out.push(decoded),
                            None => return self.fail_escaping(),
                        }
                    } else if (0xDC00..=0xDFFF).contains(&high) {
                        return self.fail_escaping();
                    } else {
                        match char::from_u32(high) {
                            Some(decoded) => out.push(decoded),
                            None => return self.fail_escaping(),
                        }
                    }
                }
                _ => return self.fail_escaping(),
            }
        }
        Ok(out)
    }

    fn fail_escaping<T>(&self) -> Result<T> {
        fail!(
            json::INVALID_STRING_ESCAPING,
            self.highlight(self.token.span)
        )
    }

    /// Parse the integer prefix of the number token: everything up to the
    /// decimal point when one exists, the full token otherwise. An
    /// exponent or overflow surfaces as a failed parse.
    fn parse_integer<T: std::str::FromStr>(&mut self) -> Result<T> {
        let span = self.token.span;
        let text = self.token_text();
        let int_len = if self.token.flags.has_decimal {
            self.token.flags.decimal_offset
        } else {
            text.len()
        };

        let value = match text[..int_len].parse::<T>() {
            Ok(value) => value,
            Err(_) => return fail!(json::PARSE_INTEGER_FAILED, self.highlight(span)),
        };
        self.end_top_read()?;
        Ok(value)
    }

    fn read_signed_integer<T: std::str::FromStr>(&mut self, entry: Entry) -> Result<T> {
        self.check_consume(entry)?;
        if self.token.ty == TokenType::Number {
            self.check_not_object_key()?;
            self.parse_integer()
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                entry,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_unsigned_integer<T: std::str::FromStr>(&mut self, entry: Entry) -> Result<T> {
        self.check_consume(entry)?;
        if self.token.ty == TokenType::Number {
            self.check_not_object_key()?;

            if self.token.flags.is_negative {
                return fail!(
                    json::READ_UNSIGNED_WITH_NEGATIVE_NUMBER,
                    self.highlight(self.token.span)
                );
            }
            self.parse_integer()
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                entry,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_floating<T: std::str::FromStr>(&mut self, entry: Entry) -> Result<T> {
        self.check_consume(entry)?;
        if self.token.ty == TokenType::Number {
            self.check_not_object_key()?;

            let span = self.token.span;
            let value = match self.token_text().parse::<T>() {
                Ok(value) => value,
                Err(_) => return fail!(json::PARSE_FLOAT_FAILED, self.highlight(span)),
            };
            self.end_top_read()?;
            Ok(value)
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                entry,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn highlight(&self, span: SourceSpan) -> Highlight {
        let formatted = diag::format_highlight(&self.buf, span, self.loc);
        let formatted = if formatted.is_empty() {
            "<contents empty>".to_owned()
        } else {
            formatted
        };
        Highlight::new("JsonReader", formatted).with_file_context(
            self.config
                .diag_file_path
                .clone()
                .unwrap_or_else(|| "<in-memory>".to_owned()),
            self.loc,
        )
    }
}

impl Reader for JsonReader<'_> {
    fn peek(&mut self) -> Result<Entry> {
        if self.need_consume {
            self.consume_effective_token()?;
            let entry = self.token_as_entry()?;
            self.need_consume = false;
            Ok(entry)
        } else {
            self.token_as_entry()
        }
    }

    fn read_nil(&mut self) -> Result<()> {
        self.check_consume(Entry::Nil)?;
        if self.token.ty == TokenType::Null {
            self.check_not_object_key()?;
            self.end_top_read()?;
            Ok(())
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::Nil,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.check_consume(Entry::Bool)?;
        match self.token.ty {
            TokenType::True => {
                self.check_not_object_key()?;
                self.end_top_read()?;
                Ok(true)
            }
            TokenType::False => {
                self.check_not_object_key()?;
                self.end_top_read()?;
                Ok(false)
            }
            _ => fail!(
                json::READ_TYPE_MISMATCH,
                Entry::Bool,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            ),
        }
    }

    fn read_name(&mut self) -> Result<Name> {
        self.check_consume(Entry::Name)?;
        if self.token.ty == TokenType::String {
            let parsed = self.parse_string_token()?;
            let name = Name::new(&parsed);
            self.check_object_key(&parsed, &name)?;
            self.end_top_read()?;
            Ok(name)
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::Name,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_string(&mut self) -> Result<String> {
        self.check_consume(Entry::String)?;
        match self.token.ty {
            TokenType::String => {
                let parsed = self.parse_string_token()?;
                let name = Name::new(&parsed);
                self.check_object_key(&parsed, &name)?;
                self.end_top_read()?;
                Ok(parsed)
            }
            TokenType::Number => {
                // Number-to-string coercion keeps the raw token text.
                let parsed = self.token_text().to_owned();
                self.end_top_read()?;
                Ok(parsed)
            }
            _ => fail!(
                json::READ_TYPE_MISMATCH,
                Entry::String,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            ),
        }
    }

    fn read_text(&mut self) -> Result<String> {
        self.check_consume(Entry::Text)?;
        if self.token.ty == TokenType::String {
            let parsed = self.parse_string_token()?;
            let name = Name::new(&parsed);
            self.check_object_key(&parsed, &name)?;
            self.end_top_read()?;
            Ok(parsed)
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::Text,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_int8(&mut self) -> Result<i8> {
        self.read_signed_integer(Entry::Int8)
    }
    fn read_int16(&mut self) -> Result<i16> {
        self.read_signed_integer(Entry::Int16)
    }
    fn read_int32(&mut self) -> Result<i32> {
        self.read_signed_integer(Entry::Int32)
    }
    fn read_int64(&mut self) -> Result<i64> {
        self.read_signed_integer(Entry::Int64)
    }

    fn read_uint8(&mut self) -> Result<u8> {
        self.read_unsigned_integer(Entry::UInt8)
    }
    fn read_uint16(&mut self) -> Result<u16> {
        self.read_unsigned_integer(Entry::UInt16)
    }
    fn read_uint32(&mut self) -> Result<u32> {
        self.read_unsigned_integer(Entry::UInt32)
    }
    fn read_uint64(&mut self) -> Result<u64> {
        self.read_unsigned_integer(Entry::UInt64)
    }

    fn read_float(&mut self) -> Result<f32> {
        self.read_floating(Entry::Float)
    }
    fn read_double(&mut self) -> Result<f64> {
        self.read_floating(Entry::Double)
    }

    fn read_map_root(&mut self) -> Result<()> {
        self.check_consume(Entry::MapRoot)?;
        if self.token.ty == TokenType::CurlyOpen {
            self.check_not_object_key()?;
            self.states.push(ParseState::Object);
            self.top_object_at_value = false;
            self.keys.push(FxHashSet::default());
            Ok(())
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::MapRoot,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.check_consume(Entry::MapEnd)?;
        if self.token.ty == TokenType::CurlyClose {
            self.pop_top_state(ParseState::Object);
            self.top_object_at_value = true;
            self.keys.pop();
            self.end_top_read()?;
            Ok(())
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::MapEnd,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_array_root(&mut self) -> Result<()> {
        self.check_consume(Entry::ArrayRoot)?;
        if self.token.ty == TokenType::SquareOpen {
            self.check_not_object_key()?;
            self.states.push(ParseState::Array);
            Ok(())
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::ArrayRoot,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.check_consume(Entry::ArrayEnd)?;
        if self.token.ty == TokenType::SquareClose {
            self.pop_top_state(ParseState::Array);
            self.end_top_read()?;
            Ok(())
        } else {
            fail!(
                json::READ_TYPE_MISMATCH,
                Entry::ArrayEnd,
                self.token_entry_lossy(),
                self.highlight(self.token.span)
            )
        }
    }

    fn coercion(&mut self, to_entry: Entry) -> bool {
        match self.token.ty {
            TokenType::Number => to_entry.is_numeric() || to_entry == Entry::String,
            TokenType::String => to_entry == Entry::Name || to_entry == Entry::Text,
            _ => false,
        }
    }

    fn format_diagnostic(&self, diag: &mut Diagnostic) {
        diag.push(diag::Arg::Highlight(self.highlight(self.token.span)));
    }

    fn id(&self) -> &'static str {
        "JsonReader"
    }
}

fn decode_hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut code = 0u32;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        code = code * 16 + digit;
    }
    Some(code)
}
