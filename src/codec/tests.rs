use pretty_assertions::assert_eq;

use super::*;
use crate::config::AnnotationSet;
use crate::error::DiagnosticKind;
use crate::locator::{Candidate, locate};
use crate::span::BufferId;

fn decode_first(text: &str, language: HostLanguage) -> OctoResult<(String, StyleHints)> {
    let buffer = SourceBuffer::new(BufferId(7), text);
    let found = locate(&buffer, language, &AnnotationSet::default());
    match found.into_iter().next() {
        Some(Candidate::Literal(literal)) => decode(&buffer, &literal, language),
        Some(Candidate::Skipped { error, .. }) => Err(error),
        None => panic!("no literal in {text:?}"),
    }
}

/// Encodes `formatted` into the literal's slot and decodes it again.
fn round_trip(source: &str, language: HostLanguage, formatted: &str) -> String {
    let (_, hints) = decode_first(source, language).unwrap();
    let encoded = encode(formatted, &hints, &FormatConfig::default()).unwrap();
    let rewritten = format!("@Query({encoded})");
    let (decoded, _) = decode_first(&rewritten, language).unwrap();
    assert_eq!(decoded, formatted, "encoded as {encoded}");
    encoded
}

const FORMATTED: &str = "SELECT\n    u.id,\n    u.name\nFROM User u\nWHERE u.name = 'a\\b \"c\"'";

#[test]
fn test_decode_java_concatenation_inserts_space() {
    let (text, hints) =
        decode_first(r#"@Query("select u" + "from User u" + " where x\t= 1")"#, HostLanguage::Java)
            .unwrap();
    assert_eq!(text, "select u from User u where x\t= 1");
    assert_eq!(hints.fragment_count, 3);
    assert_eq!(hints.separator.as_deref(), Some(" + "));
}

#[test]
fn test_decode_java_text_block() {
    let source = "    @Query(\"\"\"\n        select u \\\n        from User u   \n        where u.name = \\\"x\\\"\n        \"\"\")";
    let (text, hints) = decode_first(source, HostLanguage::Java).unwrap();
    assert_eq!(text, "select u from User u\nwhere u.name = \"x\"");
    let block = hints.block.unwrap();
    assert_eq!(block.margin, "        ");
    assert!(block.closes_on_own_line);
    assert_eq!(hints.line_indent, "    ");
}

#[test]
fn test_decode_errors() {
    let err = decode_first(r#"@Query("select \q")"#, HostLanguage::Java).unwrap_err();
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::UnsupportedEscape));

    let err = decode_first(r#"@Query("select * from ${table}")"#, HostLanguage::Kotlin).unwrap_err();
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::LiteralNotExtractable));

    let err = decode_first(r#"@Query("select \N{BULLET}")"#, HostLanguage::Python).unwrap_err();
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::UnsupportedEscape));
}

#[test]
fn test_round_trip_single_line_styles() {
    let encoded = round_trip(r#"@Query("select 1")"#, HostLanguage::Java, FORMATTED);
    assert!(encoded.starts_with('"') && !encoded.contains('\n'));
    round_trip(r#"@Query("select 1")"#, HostLanguage::Kotlin, "SELECT $x\nFROM t");
    round_trip("@Query('select 1')", HostLanguage::Python, FORMATTED);
}

#[test]
fn test_round_trip_triple_styles() {
    let java = "@Query(\"\"\"\n        select 1 \n        \"\"\")";
    let encoded = round_trip(java, HostLanguage::Java, "SELECT a  \nFROM t\nWHERE b = '\"\"\"'");
    assert!(encoded.contains("\\s\n"));

    let kotlin = "@Query(\"\"\"\n        select 1\n    \"\"\")";
    let encoded = round_trip(kotlin, HostLanguage::Kotlin, FORMATTED);
    assert!(encoded.ends_with("\n    \"\"\""));

    let python = "@Query('''select 1''')";
    round_trip(python, HostLanguage::Python, "SELECT\n    a\nFROM t");
}

#[test]
fn test_round_trip_concatenation() {
    let source = "@Query(\"select u \" +\n        \"from User u\")";
    let encoded = round_trip(source, HostLanguage::Java, "SELECT u\nFROM User u\nWHERE u.a = 1");
    assert_eq!(
        encoded,
        "\"SELECT u\\n\" +\n        \"FROM User u\\n\" +\n        \"WHERE u.a = 1\""
    );

    let python = "@Query(\"select u \"\n       \"from User u\")";
    round_trip(python, HostLanguage::Python, "SELECT u\nFROM User u");
}

#[test]
fn test_encode_unsupported() {
    let config = FormatConfig::default();

    let (_, hints) = decode_first("@Query(r'select 1')", HostLanguage::Python).unwrap();
    assert!(encode("SELECT 1\nFROM t", &hints, &config).is_err());
    assert!(encode("SELECT 'x'", &hints, &config).is_err());
    assert!(encode("SELECT 1", &hints, &config).is_ok());

    let (_, hints) = decode_first("@Query(\"\"\"select 1\"\"\")", HostLanguage::Kotlin).unwrap();
    assert!(encode("SELECT ${x}", &hints, &config).is_err());

    let (_, hints) =
        decode_first("@Query(\"\"\"select\"\"\" + \"1\")", HostLanguage::Kotlin).unwrap();
    let err = encode("SELECT\n1", &hints, &config).unwrap_err();
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::EncodeUnsupported));

    let (_, hints) = decode_first("@Query(\"a\" /* x */ + \"b\")", HostLanguage::Java).unwrap();
    assert!(encode("A\nB", &hints, &config).is_err());
}

#[test]
fn test_promote_text_block() {
    let source = "    @Query(\"select u from User u where u.id = 1\")";
    let (_, hints) = decode_first(source, HostLanguage::Java).unwrap();
    let config = FormatConfig {
        promote_text_blocks: true,
        ..FormatConfig::default()
    };
    let encoded = encode("SELECT u\nFROM User u", &hints, &config).unwrap();
    assert_eq!(
        encoded,
        "\"\"\"\n        SELECT u\n        FROM User u\n        \"\"\""
    );
    assert_eq!(encode("SELECT 1", &hints, &config).unwrap(), "\"SELECT 1\"");
}

#[test]
fn test_unicode_escapes_are_kept() {
    let source = r#"@Query("select u from User u where u.name = 'caf\u00e9'")"#;
    let encoded = round_trip(source, HostLanguage::Java, "SELECT u\nFROM User u\nWHERE u.name = 'café 😀'");
    assert_eq!(
        encoded,
        r#""SELECT u\nFROM User u\nWHERE u.name = 'caf\u00e9 \ud83d\ude00'""#
    );

    let encoded = round_trip(r#"@Query("select 'é'")"#, HostLanguage::Java, "SELECT 'é'");
    assert_eq!(encoded, "\"SELECT 'é'\"");
}

#[test]
fn test_inline_raw_string_moves_to_its_own_lines() {
    let source = "    @Query(\"\"\"select u from User u\"\"\")";
    let encoded = round_trip(source, HostLanguage::Kotlin, "SELECT u\nFROM User u");
    assert_eq!(
        encoded,
        "\"\"\"\n        SELECT u\n        FROM User u\n        \"\"\""
    );

    let (_, hints) = decode_first(source, HostLanguage::Kotlin).unwrap();
    let single = encode("SELECT u", &hints, &FormatConfig::default()).unwrap();
    assert_eq!(single, "\"\"\"SELECT u\"\"\"");
}
