//! Error codes, grouped by category. Each category owns a `u16` namespace
//! and a table of format strings resolved at diagnostic-formatting time.

use lazy_static::lazy_static;
use std::fmt;
use std::sync::RwLock;

/// `(category, id)` pair identifying one diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub category: u16,
    pub id: u16,
}

impl ErrorCode {
    pub const fn new(category: u16, id: u16) -> Self {
        ErrorCode { category, id }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

/// One diagnostic kind: its id within the category and its format string.
/// Format strings substitute `{0}`, `{1}`, … from captured arguments.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticDetail {
    pub id: u16,
    pub msg: &'static str,
}

/// A category's worth of diagnostic details.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticGroup {
    pub category: u16,
    pub details: &'static [DiagnosticDetail],
}

lazy_static! {
    static ref GROUPS: RwLock<Vec<DiagnosticGroup>> = RwLock::new(Vec::new());
}

pub fn register_group(group: DiagnosticGroup) {
    let mut groups = GROUPS.write().expect("diagnostic group table poisoned");
    if !groups.iter().any(|g| g.category == group.category) {
        groups.push(group);
    }
}

pub fn clear_groups() {
    GROUPS
        .write()
        .expect("diagnostic group table poisoned")
        .clear();
}

/// Look up the format string registered for a code, if any.
pub fn find_detail(code: ErrorCode) -> Option<&'static str> {
    let groups = GROUPS.read().expect("diagnostic group table poisoned");
    groups
        .iter()
        .find(|g| g.category == code.category)
        .and_then(|g| g.details.iter().find(|d| d.id == code.id))
        .map(|d| d.msg)
}

pub(crate) fn register_builtin_groups() {
    register_group(common::group());
    register_group(rw::group());
    register_group(json::group());
    register_group(serde::group());
    register_group(msgpack::group());
}

macro_rules! declare_codes {
    ($category:expr, [$(($name:ident, $id:expr, $msg:expr),)*]) => {
        pub const CATEGORY: u16 = $category;

        $( pub const $name: $crate::ErrorCode = $crate::ErrorCode::new(CATEGORY, $id); )*

        pub(crate) fn group() -> $crate::DiagnosticGroup {
            static DETAILS: &[$crate::DiagnosticDetail] = &[
                $( $crate::DiagnosticDetail { id: $id, msg: $msg }, )*
            ];
            $crate::DiagnosticGroup { category: CATEGORY, details: DETAILS }
        }
    };
}

pub mod common {
    declare_codes!(
        0x1,
        [
            (UNREACHABLE, 1, "Unreachable code executed"),
            (PLACE_HOLD_ERROR, 2, "Placeholder error"),
            (STALE_HANDLER, 3, "Calling into an unbound handler"),
            (NOT_INITIALIZED, 4, "Environment not initialized"),
        ]
    );
}

pub mod rw {
    declare_codes!(
        0x2,
        [
            (INVALID_STATE_NO_EXPECT, 1, "Invalid internal state: '{0}'"),
            (
                INVALID_STATE_WITH_EXPECT,
                2,
                "Invalid internal state, expecting '{0}', actual '{1}'"
            ),
            (
                DATA_TYPE_MISMATCH,
                3,
                "Data type mismatch, expecting '{0}', actual '{1}'"
            ),
            (
                DATA_TYPE_MISMATCH2,
                4,
                "Data type mismatch, expecting '{0}' or '{1}', actual '{2}'"
            ),
            (
                PROPERTY_MISMATCH,
                5,
                "Property mismatch, expecting '{0}', actual '{1}' of '{2}'"
            ),
            (
                PROPERTY_MISMATCH2,
                6,
                "Property mismatch, expecting '{0}' or '{1}', actual '{2}' of '{3}'"
            ),
            (ALREADY_ENDED, 7, "Stream already ended"),
            (
                CANT_FIND_PROPERTY_BY_NAME,
                8,
                "Can not find property by name '{0}' in '{1}'"
            ),
            (
                STRUCT_NAME_MISMATCH,
                9,
                "Struct name mismatch, expecting '{0}', actual '{1}'"
            ),
            (
                ENUM_NAME_MISMATCH,
                10,
                "Enum name mismatch, expecting '{0}', actual '{1}'"
            ),
            (ENUM_NAME_NOT_FOUND, 11, "Enum name '{0}' not found in '{1}'"),
            (ENUM_VALUE_INVALID, 12, "Enum '{0}' has no entry of value '{1}'"),
            (
                ENUM_SIGN_MISMATCH,
                13,
                "Enum sign mismatch, enum '{0}' unsigned: '{1}'"
            ),
            (WRITE_BLOB_OVERRUN, 14, "Writing blob overrun, capacity '{0}', actual '{1}'"),
            (
                FIND_PROPERTY_BY_INDEX_FAILED,
                15,
                "Find property by index failed, struct '{0}', index '{1}'"
            ),
            (CANT_USE_PUTBACK_VALUE, 16, "Can not use putback value for '{0}'"),
            (
                PIPE_READ_WRITE_MISMATCH,
                17,
                "Pipe visit read write mismatch on '{0}'"
            ),
            (SKIP_OUT_OF_RANGE, 18, "Skip out of range"),
        ]
    );
}

pub mod json {
    declare_codes!(
        0x3,
        [
            (
                EXPECT_WORD_BUT_NOT_FOUND,
                1,
                "Expect word '{0}' but found '{1}' instead"
            ),
            (
                EXPECT_WORD_BUT_EOF,
                2,
                "Expect word '{0}' but reaching end of input"
            ),
            (UNEXPECTED_CHAR, 3, "Unexpected char '{0}'"),
            (UNEXPECTED_TOKEN, 4, "Unexpected token"),
            (UNCLOSED_BLOCK_COMMENT, 5, "Unclosed block comment"),
            (UNCLOSED_STRING_LITERAL, 6, "Unclosed string literal"),
            (INVALID_STRING_ESCAPING, 7, "Invalid string escaping"),
            (
                INVALID_CONTROL_CHAR_IN_STRING,
                8,
                "Invalid control character found in string"
            ),
            (
                READ_UNSIGNED_WITH_NEGATIVE_NUMBER,
                9,
                "Reading unsigned with negative number"
            ),
            (PARSE_INTEGER_FAILED, 10, "Parse integer failed"),
            (PARSE_FLOAT_FAILED, 11, "Parse float failed"),
            (DUPLICATED_KEY, 12, "Duplicated key within object"),
            (KEY_MUST_BE_STRING, 13, "Object key must be a string"),
            (
                READ_TYPE_MISMATCH,
                14,
                "Reading type mismatch, expecting '{0}', actual '{1}'"
            ),
            (EXPECT_COMMA, 15, "Expect ',' but not found"),
            (OBJECT_KEY_TOO_LONG, 16, "Object key string too long, limit '{0}'"),
            (
                EXPECT_STATE_IN_PROGRESS,
                17,
                "Expect internal state to be 'InProgress', actual '{0}'"
            ),
            (
                EXPECT_STATE_UNINITIALIZED_OR_FINISHED,
                18,
                "Expect internal state to be 'Uninitialized' or 'Finished', actual '{0}'"
            ),
            (
                UNEXPECTED_TRAILING_TOKEN,
                19,
                "Expect ending but found trailing token, actual '{0}'"
            ),
        ]
    );
}

pub mod serde {
    declare_codes!(
        0x4,
        [
            (
                NO_MATCHING_HANDLER,
                1,
                "No matching handler for '{0}' of kind '{1}'"
            ),
            (NOT_PREPARED, 2, "Context not prepared before dispatch"),
            (EXPECT_META_TYPE, 3, "Expect a struct meta type, actual '{0}'"),
            (STRUCT_NOT_FOUND, 4, "Struct '{0}' not found"),
            (
                DATA_ENTRY_MISMATCH,
                5,
                "Data entry mismatch, expecting '{0}', actual '{1}'"
            ),
        ]
    );
}

pub mod msgpack {
    // The MsgPack codec is an external collaborator; the category is
    // reserved so its ids never collide with another group.
    declare_codes!(0x5, []);
}
