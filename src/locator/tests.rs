use pretty_assertions::assert_eq;

use super::*;
use crate::config::AnnotationSet;
use crate::error::DiagnosticKind;
use crate::span::BufferId;

fn scan(text: &str, language: HostLanguage) -> Vec<Candidate> {
    let buffer = SourceBuffer::new(BufferId(1), text);
    locate(&buffer, language, &AnnotationSet::default())
}

fn literal(candidate: &Candidate) -> &LocatedLiteral {
    match candidate {
        Candidate::Literal(literal) => literal,
        Candidate::Skipped { error, .. } => panic!("unexpected skip: {error}"),
    }
}

fn contents(text: &str, literal: &LocatedLiteral) -> Vec<String> {
    literal
        .fragments
        .iter()
        .map(|f| text[f.content.start..f.content.end].to_string())
        .collect()
}

#[test]
fn test_java_single_literal() {
    let text = r#"
interface UserRepository {
    @Query("select u from User u")
    List<User> all();
}
"#;
    let found = scan(text, HostLanguage::Java);
    assert_eq!(found.len(), 1);
    let lit = literal(&found[0]);
    assert_eq!(lit.annotation, "Query");
    assert_eq!(lit.dialect, Dialect::Jpql);
    assert_eq!(contents(text, lit), vec!["select u from User u"]);
    assert_eq!(&text[lit.span.start..lit.span.end], "\"select u from User u\"");
}

#[test]
fn test_ignores_annotations_in_comments_and_strings() {
    let text = r#"
// @Query("select 1")
/* @Query("select 2") */
String s = "@Query(\"select 3\")";
char c = '"';
@Query("select 4")
"#;
    let found = scan(text, HostLanguage::Java);
    assert_eq!(found.len(), 1);
    assert_eq!(contents(text, literal(&found[0])), vec!["select 4"]);
}

#[test]
fn test_concatenated_fragments_with_comment() {
    let text = "@Query(\"select u \" + // cols\n        \"from User u\")";
    let found = scan(text, HostLanguage::Java);
    let lit = literal(&found[0]);
    assert_eq!(lit.fragments.len(), 2);
    assert_eq!(lit.fragments[0].joiner, Some(Joiner::Concatenation));
    assert_eq!(lit.fragments[1].joiner, None);
    let buffer = SourceBuffer::new(BufferId(1), text);
    assert_eq!(lit.separator(&buffer, 0), Some(" + // cols\n        "));
}

#[test]
fn test_named_and_native_arguments() {
    let text = r#"@Query(nativeQuery = true, value = "select * from users")"#;
    let found = scan(text, HostLanguage::Java);
    let lit = literal(&found[0]);
    assert_eq!(lit.dialect, Dialect::Native);
    assert_eq!(contents(text, lit), vec!["select * from users"]);

    let text = r#"@org.example.NativeQuery(query = "select 1")"#;
    let lit = scan(text, HostLanguage::Java).remove(0);
    assert_eq!(literal(&lit).dialect, Dialect::Native);
    assert_eq!(literal(&lit).annotation, "org.example.NativeQuery");
}

#[test]
fn test_positional_argument_wins() {
    let text = r#"@Query("select a from A a", countQuery = "select count(a) from A a")"#;
    let found = scan(text, HostLanguage::Java);
    assert_eq!(contents(text, literal(&found[0])), vec!["select a from A a"]);
}

#[test]
fn test_variable_argument_is_skipped() {
    let text = "@Query(QUERY)\nvoid a();\n@Query(\"select 1\")\nvoid b();";
    let found = scan(text, HostLanguage::Java);
    assert_eq!(found.len(), 2);
    let Candidate::Skipped { span, error } = &found[0] else {
        panic!("expected skip");
    };
    assert_eq!(&text[span.start..span.end], "QUERY");
    assert_eq!(
        error.diagnostic_kind(),
        Some(DiagnosticKind::LiteralNotExtractable)
    );
    literal(&found[1]);
}

#[test]
fn test_method_call_and_missing_arguments_are_skipped() {
    let found = scan(
        "@Query(\"select \" + suffix())\n@Query\n@Query(countQuery = \"x\")",
        HostLanguage::Java,
    );
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|c| matches!(c, Candidate::Skipped { .. })));
}

#[test]
fn test_unrecognized_annotations_are_ignored() {
    let found = scan("@Override\n@Modifying(clearAutomatically = true)", HostLanguage::Java);
    assert!(found.is_empty());
}

#[test]
fn test_java_text_block() {
    let text = "@Query(\"\"\"\n        select u\n        from User u\n        \"\"\")";
    let lit = scan(text, HostLanguage::Java).remove(0);
    let lit = literal(&lit);
    assert_eq!(lit.fragments[0].style, QuoteStyle::Triple);
    assert_eq!(
        contents(text, lit),
        vec!["\n        select u\n        from User u\n        "]
    );
}

#[test]
fn test_kotlin_raw_string_and_template() {
    let text = "@Query(\"\"\"select u from User u\"\"\")\nfun a()\n@Query(\"select $table\")\nfun b()";
    let found = scan(text, HostLanguage::Kotlin);
    assert_eq!(found.len(), 2);
    let lit = literal(&found[0]);
    assert!(lit.fragments[0].is_raw(HostLanguage::Kotlin));
    // Templates are rejected while decoding, not while locating.
    literal(&found[1]);
}

#[test]
fn test_python_joiners() {
    let text = "@Query(\"select u \"\n       'from User u ' \\\n       r\"where u.id = 1\")\ndef find(): ...";
    let found = scan(text, HostLanguage::Python);
    let lit = literal(&found[0]);
    let joiners: Vec<_> = lit.fragments.iter().map(|f| f.joiner).collect();
    assert_eq!(
        joiners,
        vec![
            Some(Joiner::Juxtaposition),
            Some(Joiner::LineContinuation),
            None
        ]
    );
    assert_eq!(lit.fragments[1].style, QuoteStyle::Single);
    assert_eq!(lit.fragments[2].style, QuoteStyle::Raw);
}

#[test]
fn test_python_f_string_is_skipped() {
    let found = scan("@Query(f\"select {cols}\")", HostLanguage::Python);
    assert!(matches!(found[0], Candidate::Skipped { .. }));
    let found = scan("@Query(sql=b'select 1')", HostLanguage::Python);
    assert!(matches!(found[0], Candidate::Skipped { .. }));
}

#[test]
fn test_python_keyword_argument() {
    let text = "@Query(sql='select 1', native=False)";
    let found = scan(text, HostLanguage::Python);
    assert_eq!(contents(text, literal(&found[0])), vec!["select 1"]);
}

#[test]
fn test_source_mode_for_path() {
    let annotations = AnnotationSet::default();
    assert_eq!(
        SourceMode::for_path(Path::new("q/users.sql"), &annotations),
        Some(SourceMode::Standalone)
    );
    assert!(matches!(
        SourceMode::for_path(Path::new("Repo.kt"), &annotations),
        Some(SourceMode::Annotated {
            language: HostLanguage::Kotlin,
            ..
        })
    ));
    assert_eq!(SourceMode::for_path(Path::new("README.md"), &annotations), None);
}
