use diag::{json as djson, rw, ScopedEnv};
use json::{JsonReader, JsonWriter, ReaderConfig, WriteConfig, WriteStyle};
use pipe::{pipe_visit, Entry, Name, Reader};

fn expect_fail_env() -> ScopedEnv {
    let env = ScopedEnv::new();
    diag::with_env(|e| e.expect_fail = true);
    env
}

#[test]
fn test_single_key_object() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#"{"a": 1}"#).unwrap();

    assert_eq!(r.peek().unwrap(), Entry::MapRoot);
    r.read_map_root().unwrap();
    assert_eq!(r.peek().unwrap(), Entry::String);
    assert_eq!(r.read_name().unwrap(), Name::new("a"));
    assert_eq!(r.peek().unwrap(), Entry::Double);
    assert_eq!(r.read_int32().unwrap(), 1);
    assert_eq!(r.peek().unwrap(), Entry::MapEnd);
    r.read_map_end().unwrap();
    assert_eq!(r.peek().unwrap(), Entry::Ended);
    r.finish().unwrap();
}

#[test]
fn test_empty_containers() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input("{}").unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    assert_eq!(r.peek().unwrap(), Entry::MapEnd);
    r.read_map_end().unwrap();
    r.finish().unwrap();

    r.set_input("[]").unwrap();
    r.peek().unwrap();
    r.read_array_root().unwrap();
    assert_eq!(r.peek().unwrap(), Entry::ArrayEnd);
    r.read_array_end().unwrap();
    r.finish().unwrap();
}

#[test]
fn test_peek_is_idempotent() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input("[true]").unwrap();
    r.peek().unwrap();
    r.read_array_root().unwrap();

    for _ in 0..5 {
        assert_eq!(r.peek().unwrap(), Entry::Bool);
    }
    assert!(r.read_bool().unwrap());
}

#[test]
fn test_trailing_comma_in_array() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input("[1,2,3,]").unwrap();
    r.peek().unwrap();
    r.read_array_root().unwrap();

    let mut items = Vec::new();
    loop {
        match r.peek().unwrap() {
            Entry::ArrayEnd => break,
            _ => items.push(r.read_int32().unwrap()),
        }
    }
    r.read_array_end().unwrap();
    r.finish().unwrap();
    assert_eq!(items, vec![1, 2, 3]);
}

#[test]
fn test_trailing_comma_in_object() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#"{"a": 1,}"#).unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    r.read_name().unwrap();
    r.peek().unwrap();
    r.read_int32().unwrap();
    assert_eq!(r.peek().unwrap(), Entry::MapEnd);
    r.read_map_end().unwrap();
    r.finish().unwrap();
}

#[test]
fn test_duplicated_key() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("{\n  \"a\": 1,\n  \"a\": 2\n}").unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    r.read_name().unwrap();
    r.peek().unwrap();
    r.read_int32().unwrap();
    r.peek().unwrap();

    let before = diag::with_env(|env| env.diagnostics.len());
    let err = r.read_name().unwrap_err();
    assert_eq!(err.code, djson::DUPLICATED_KEY);

    // Exactly one diagnostic, carrying a highlight that points at the
    // second key.
    diag::with_env(|env| {
        assert_eq!(env.diagnostics.len(), before + 1);
        let diag = env.diagnostics.last().unwrap();
        let highlight = diag.highlights().next().expect("highlight attached");
        assert!(highlight.formatted.contains("\"a\": 2"));
        assert!(highlight.formatted.contains('^'));
        env.diagnostics.clear();
    });
}

#[test]
fn test_duplicate_keys_differing_by_case_are_accepted() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#"{"Key": 1, "key": 2}"#).unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_name().unwrap(), Name::new("Key"));
    r.peek().unwrap();
    r.read_int32().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_name().unwrap(), Name::new("key"));
    r.peek().unwrap();
    r.read_int32().unwrap();
    r.peek().unwrap();
    r.read_map_end().unwrap();
    r.finish().unwrap();
}

#[test]
fn test_read_unsigned_with_negative_number() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input(r#"{"u": -1}"#).unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    r.read_name().unwrap();
    r.peek().unwrap();

    let err = r.read_uint32().unwrap_err();
    assert_eq!(err.code, djson::READ_UNSIGNED_WITH_NEGATIVE_NUMBER);
}

#[test]
fn test_integer_reads() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();

    // Integer prefix of a decimal parses; the fraction is left behind.
    r.set_input("1.5").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int32().unwrap(), 1);
    r.finish().unwrap();

    // An exponent makes the integer prefix shorter than the token.
    r.set_input("1e5").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int32().unwrap_err().code, djson::PARSE_INTEGER_FAILED);
    r.abort_and_uninitialize();

    // Overflow of the target width.
    r.set_input("300").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int8().unwrap_err().code, djson::PARSE_INTEGER_FAILED);
    r.abort_and_uninitialize();

    r.set_input("-128").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int8().unwrap(), -128);
    r.finish().unwrap();

    r.set_input("18446744073709551615").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_uint64().unwrap(), u64::MAX);
    r.finish().unwrap();
}

#[test]
fn test_float_reads() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();

    r.set_input("-12.5e2").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_double().unwrap(), -1250.0);
    r.finish().unwrap();

    // The scanner over-accepts; parsing validates.
    r.set_input("1..2").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_double().unwrap_err().code, djson::PARSE_FLOAT_FAILED);
    r.abort_and_uninitialize();
}

#[test]
fn test_coercion() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();

    // Number coerces to any numeric width or to String.
    r.set_input("42").unwrap();
    assert_eq!(r.peek().unwrap(), Entry::Double);
    assert!(r.coercion(Entry::UInt8));
    assert!(r.coercion(Entry::Int64));
    assert!(r.coercion(Entry::String));
    assert!(!r.coercion(Entry::Bool));
    assert_eq!(r.read_string().unwrap(), "42");
    r.finish().unwrap();

    // String coerces to Name or Text only.
    r.set_input(r#""hello""#).unwrap();
    assert_eq!(r.peek().unwrap(), Entry::String);
    assert!(r.coercion(Entry::Name));
    assert!(r.coercion(Entry::Text));
    assert!(!r.coercion(Entry::Int32));
    assert_eq!(r.read_name().unwrap(), Name::new("hello"));
    r.finish().unwrap();
}

#[test]
fn test_blind_numeric_read_requires_peek() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("5").unwrap();

    // Without a peek the consumed token is checked against the requested
    // entry, and a bare number surfaces as Double.
    assert_eq!(r.read_int32().unwrap_err().code, rw::DATA_TYPE_MISMATCH);
}

#[test]
fn test_comments() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(
        r#"
        // leading comment
        {
            /* block /* nested */ still in comment */
            "a": 1 // trailing
        }
        "#,
    )
    .unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_name().unwrap(), Name::new("a"));
    r.peek().unwrap();
    assert_eq!(r.read_int32().unwrap(), 1);
    r.peek().unwrap();
    r.read_map_end().unwrap();
    r.finish().unwrap();
}

#[test]
fn test_comment_before_eof_is_not_trailing() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input("1 // the end").unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int32().unwrap(), 1);
    r.finish().unwrap();
}

#[test]
fn test_unclosed_block_comment() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("/* outer /* inner */").unwrap();

    let err = r.peek().unwrap_err();
    assert_eq!(err.code, djson::UNCLOSED_BLOCK_COMMENT);

    // Highlight points at the outer open.
    diag::with_env(|env| {
        let diag = env.diagnostics.last().unwrap();
        let highlight = diag.highlights().next().expect("highlight attached");
        assert!(highlight.formatted.contains("/* outer"));
        env.diagnostics.clear();
    });
}

#[test]
fn test_eof_inside_block_comment() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("/*").unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::UNCLOSED_BLOCK_COMMENT);
}

#[test]
fn test_string_escapes() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#""q\" b\\ s\/ b\b f\f n\n r\r t\t uA""#)
        .unwrap();
    r.peek().unwrap();
    assert_eq!(
        r.read_string().unwrap(),
        "q\" b\\ s/ b\u{8} f\u{c} n\n r\r t\t uA"
    );
    r.finish().unwrap();
}

#[test]
fn test_escaped_backslash_at_end_of_string() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#""back\\""#).unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_string().unwrap(), "back\\");
    r.finish().unwrap();
}

#[test]
fn test_surrogate_pair_escape() {
    let _env = ScopedEnv::new();
    let mut r = JsonReader::new();
    r.set_input(r#""\uD83D\uDE00""#).unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_string().unwrap(), "😀");
    r.finish().unwrap();
}

#[test]
fn test_invalid_escapes() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();

    r.set_input(r#""\x""#).unwrap();
    r.peek().unwrap();
    assert_eq!(
        r.read_string().unwrap_err().code,
        djson::INVALID_STRING_ESCAPING
    );
    r.abort_and_uninitialize();

    // Unpaired high surrogate.
    r.set_input(r#""\uD83D""#).unwrap();
    r.peek().unwrap();
    assert_eq!(
        r.read_string().unwrap_err().code,
        djson::INVALID_STRING_ESCAPING
    );
    r.abort_and_uninitialize();
}

#[test]
fn test_eof_inside_string() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input(r#""unclosed"#).unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::UNCLOSED_STRING_LITERAL);
}

#[test]
fn test_line_break_inside_string() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("\"broken\nstring\"").unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::UNCLOSED_STRING_LITERAL);
}

#[test]
fn test_control_char_inside_string() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("\"tab\there\"").unwrap();
    assert_eq!(
        r.peek().unwrap_err().code,
        djson::INVALID_CONTROL_CHAR_IN_STRING
    );
}

#[test]
fn test_word_expect() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();

    r.set_input("trUe").unwrap();
    assert_eq!(
        r.peek().unwrap_err().code,
        djson::EXPECT_WORD_BUT_NOT_FOUND
    );
    r.abort_and_uninitialize();

    r.set_input("tru").unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::EXPECT_WORD_BUT_EOF);
    r.abort_and_uninitialize();

    // An exact fit at end of input is fine.
    r.set_input("true").unwrap();
    r.peek().unwrap();
    assert!(r.read_bool().unwrap());
    r.finish().unwrap();
}

#[test]
fn test_reject_number_without_integer_part_or_leading_plus() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();

    r.set_input(".5").unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::UNEXPECTED_CHAR);
    r.abort_and_uninitialize();

    r.set_input("+1").unwrap();
    assert_eq!(r.peek().unwrap_err().code, djson::UNEXPECTED_CHAR);
    r.abort_and_uninitialize();
}

#[test]
fn test_key_must_be_string() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("{true: 1}").unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_bool().unwrap_err().code, djson::KEY_MUST_BE_STRING);
}

#[test]
fn test_expect_comma() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("[1 2]").unwrap();
    r.peek().unwrap();
    r.read_array_root().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_int32().unwrap_err().code, djson::EXPECT_COMMA);
}

#[test]
fn test_object_key_too_long() {
    let _env = expect_fail_env();
    let config = ReaderConfig {
        max_key_len: 1, // clamped up to the minimum
        diag_file_path: None,
    };
    let long_key = "k".repeat(300);
    let doc = format!(r#"{{"{}": 1}}"#, long_key);

    let mut r = JsonReader::with_config(config);
    r.set_input(&doc).unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    assert_eq!(
        r.read_name().unwrap_err().code,
        djson::OBJECT_KEY_TOO_LONG
    );
}

#[test]
fn test_deeply_nested_arrays() {
    let _env = ScopedEnv::new();
    const DEPTH: usize = 64;
    let doc = format!("{}1{}", "[".repeat(DEPTH), "]".repeat(DEPTH));

    let mut r = JsonReader::new();
    r.set_input(&doc).unwrap();
    for _ in 0..DEPTH {
        r.peek().unwrap();
        r.read_array_root().unwrap();
    }
    assert_eq!(r.nesting(), DEPTH);
    r.peek().unwrap();
    r.read_int32().unwrap();
    for _ in 0..DEPTH {
        r.peek().unwrap();
        r.read_array_end().unwrap();
    }

    // Depth returns to zero exactly at Ended.
    assert_eq!(r.nesting(), 0);
    assert_eq!(r.peek().unwrap(), Entry::Ended);
    r.finish().unwrap();
}

#[test]
fn test_unexpected_trailing_token() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("1 2").unwrap();
    r.peek().unwrap();
    r.read_int32().unwrap();
    assert_eq!(
        r.finish().unwrap_err().code,
        djson::UNEXPECTED_TRAILING_TOKEN
    );
}

#[test]
fn test_finish_requires_in_progress() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    assert_eq!(
        r.finish().unwrap_err().code,
        djson::EXPECT_STATE_IN_PROGRESS
    );
}

#[test]
fn test_abort_allows_reuse() {
    let _env = expect_fail_env();
    let mut r = JsonReader::new();
    r.set_input("[1,").unwrap();
    r.peek().unwrap();
    r.read_array_root().unwrap();
    r.peek().unwrap();
    r.read_int32().unwrap();

    // The input ran out inside the array.
    assert_eq!(r.peek().unwrap(), Entry::Ended);
    assert_eq!(
        r.read_array_end().unwrap_err().code,
        djson::READ_TYPE_MISMATCH
    );

    r.abort_and_uninitialize();
    r.set_input("true").unwrap();
    r.peek().unwrap();
    assert!(r.read_bool().unwrap());
    r.finish().unwrap();
}

#[test]
fn test_utf16_input() {
    let _env = ScopedEnv::new();
    let wide: Vec<u16> = r#"{"a": "值"}"#.encode_utf16().collect();
    let mut r = JsonReader::new();
    r.set_input_utf16(&wide).unwrap();
    r.peek().unwrap();
    r.read_map_root().unwrap();
    r.peek().unwrap();
    r.read_name().unwrap();
    r.peek().unwrap();
    assert_eq!(r.read_string().unwrap(), "值");
    r.peek().unwrap();
    r.read_map_end().unwrap();
    r.finish().unwrap();
}

#[test]
fn test_roundtrip_via_pipe() {
    let _env = ScopedEnv::new();
    let input = r#"{"a":1,"b":[true,null,"x"],"c":{"d":"y","e":2.5}}"#;

    let mut r = JsonReader::new();
    r.set_input(input).unwrap();
    let mut w = JsonWriter::with_config(WriteConfig {
        style: WriteStyle::Compact,
    });
    pipe_visit(&mut r, &mut w).unwrap();
    r.finish().unwrap();

    let output = w.take_output();
    let lhs: serde_json::Value = serde_json::from_str(input).unwrap();
    let rhs: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(lhs, rhs);
}

#[test]
fn test_failed_reads_leave_exactly_one_diagnostic() {
    let _env = expect_fail_env();

    for (doc, code) in [
        ("{\"a\":1 \"b\":2}", djson::EXPECT_COMMA),
        ("[01x]", djson::UNEXPECTED_CHAR),
    ] {
        let before = diag::with_env(|env| env.diagnostics.len());
        let mut r = JsonReader::new();
        r.set_input(doc).unwrap();
        let mut failed = false;
        for _ in 0..16 {
            let entry = match r.peek() {
                Ok(e) => e,
                Err(err) => {
                    assert_eq!(err.code, code);
                    failed = true;
                    break;
                }
            };
            let result = match entry {
                Entry::MapRoot => r.read_map_root(),
                Entry::MapEnd => r.read_map_end(),
                Entry::ArrayRoot => r.read_array_root(),
                Entry::ArrayEnd => r.read_array_end(),
                Entry::String => r.read_string().map(|_| ()),
                Entry::Double => r.read_double().map(|_| ()),
                Entry::Ended => break,
                other => panic!("unexpected entry {other}"),
            };
            if let Err(err) = result {
                assert_eq!(err.code, code);
                failed = true;
                break;
            }
        }
        assert!(failed, "expected {doc} to fail");
        let after = diag::with_env(|env| env.diagnostics.len());
        assert_eq!(after, before + 1);
        diag::with_env(|env| env.diagnostics.clear());
    }
}
