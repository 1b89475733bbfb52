use diag::SourceSpan;
use pipe::Entry;

/// Raw scanner token kinds. Whitespace and comments are produced by the
/// scanner and filtered out by the effective-token layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenType {
    Eof,
    Null,
    CurlyOpen,
    CurlyClose,
    SquareOpen,
    SquareClose,
    Colon,
    Comma,
    String,
    Number,
    True,
    False,
    Whitespace,
    LineComment,
    BlockComment,
}

impl TokenType {
    pub(crate) fn is_effective(self) -> bool {
        !matches!(
            self,
            TokenType::Whitespace | TokenType::LineComment | TokenType::BlockComment
        )
    }

    /// The entry a token surfaces as, or `None` for tokens that never map
    /// to an entry (separators, non-effective tokens).
    pub(crate) fn to_entry(self) -> Option<Entry> {
        match self {
            TokenType::Eof => Some(Entry::Ended),
            TokenType::Null => Some(Entry::Nil),
            TokenType::CurlyOpen => Some(Entry::MapRoot),
            TokenType::CurlyClose => Some(Entry::MapEnd),
            TokenType::SquareOpen => Some(Entry::ArrayRoot),
            TokenType::SquareClose => Some(Entry::ArrayEnd),
            TokenType::String => Some(Entry::String),
            TokenType::Number => Some(Entry::Double),
            TokenType::True | TokenType::False => Some(Entry::Bool),
            _ => None,
        }
    }
}

/// Number shape recorded at scan time, validated at parse time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TokenFlags {
    pub has_escape: bool,
    pub is_negative: bool,
    pub has_decimal: bool,
    /// Byte offset of the decimal point from the token begin.
    pub decimal_offset: usize,
    pub has_exp: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token {
    pub ty: TokenType,
    pub span: SourceSpan,
    pub flags: TokenFlags,
}

impl Default for Token {
    fn default() -> Self {
        Token {
            ty: TokenType::Eof,
            span: SourceSpan::default(),
            flags: TokenFlags::default(),
        }
    }
}
