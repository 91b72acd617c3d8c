use pretty_assertions::assert_eq;

use super::format_script;
use crate::config::{FormatConfig, KeywordCase};
use crate::parser::tokens::tokenize;
use crate::parser::{Dialect, TokenKind, parse};

fn fmt_with(input: &str, dialect: Dialect, config: &FormatConfig) -> String {
    let script = parse(input, dialect).unwrap();
    let once = format_script(&script, config);
    let again = format_script(&parse(&once, dialect).unwrap(), config);
    assert_eq!(once, again, "formatting is not idempotent");
    once
}

fn fmt(input: &str) -> String {
    fmt_with(input, Dialect::Jpql, &FormatConfig::default())
}

#[test]
fn test_fmt_where_conjunction() {
    let output = fmt("select u from User u where u.active = true and u.age > 18");
    let expected = r#"
SELECT u
FROM User u
WHERE u.active = TRUE
AND u.age > 18
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_select_list() {
    let output = fmt("select u.id, u.name from User u order by u.name desc");
    let expected = r#"
SELECT
    u.id,
    u.name
FROM User u
ORDER BY u.name DESC
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_constructor_projection() {
    let output = fmt("SELECT new com.example.UserDto(u.id, u.name, u.email) FROM User u");
    let expected = r#"
SELECT NEW com.example.UserDto(
        u.id,
        u.name,
        u.email
       )
FROM User u
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_constructor_without_args() {
    assert_eq!(
        fmt("select new Marker() from User u"),
        "SELECT NEW Marker()\nFROM User u"
    );
}

#[test]
fn test_fmt_subquery() {
    let output = fmt("select a from T a where a.id in (select b.id from B b where b.x = 1)");
    let expected = r#"
SELECT a
FROM T a
WHERE a.id IN (
    SELECT b.id
    FROM B b
    WHERE b.x = 1
)
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_joins_one_per_line() {
    let input = "select o from Order o join o.items i left join o.customer c where c.id = :id";
    let expected = r#"
SELECT o
FROM
    Order o
    JOIN o.items i
    LEFT JOIN o.customer c
WHERE c.id = :id
"#;
    assert_eq!(fmt(input), expected.trim());

    let config = FormatConfig {
        one_join_per_line: false,
        ..FormatConfig::default()
    };
    let output = fmt_with(input, Dialect::Jpql, &config);
    assert_eq!(
        output,
        "SELECT o\nFROM Order o JOIN o.items i LEFT JOIN o.customer c\nWHERE c.id = :id"
    );
}

#[test]
fn test_fmt_keyword_case() {
    let lower = FormatConfig {
        keyword_case: KeywordCase::Lower,
        ..FormatConfig::default()
    };
    assert_eq!(
        fmt_with("SELECT u FROM User u", Dialect::Jpql, &lower),
        "select u\nfrom User u"
    );

    let preserve = FormatConfig {
        keyword_case: KeywordCase::Preserve,
        ..FormatConfig::default()
    };
    assert_eq!(
        fmt_with("Select u From User u", Dialect::Jpql, &preserve),
        "Select u\nFrom User u"
    );
}

#[test]
fn test_fmt_comments() {
    let output = fmt("select a, -- first\n  b\nfrom T -- tables\n");
    let expected = r#"
SELECT
    a, -- first
    b
FROM T -- tables
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_own_line_comment_before_clause() {
    let output = fmt("select a from T a\n-- only active\nwhere a.active = true");
    let expected = r#"
SELECT a
FROM T a
-- only active
WHERE a.active = TRUE
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_spacing() {
    let output = fmt_with(
        "select count(*),coalesce(a,b) , x::text, -1, a-b from T where a in(1,2)",
        Dialect::Native,
        &FormatConfig::default(),
    );
    let expected = r#"
SELECT
    count(*),
    coalesce(a, b),
    x::text,
    -1,
    a - b
FROM T
WHERE a IN (1, 2)
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_expands_wide_predicate_group() {
    let config = FormatConfig {
        max_line_width: 30,
        ..FormatConfig::default()
    };
    let output = fmt_with(
        "select a from T a where (a.x = 1 or a.y = 2 or a.z = 3) and a.w = 4",
        Dialect::Jpql,
        &config,
    );
    let expected = r#"
SELECT a
FROM T a
WHERE (
    a.x = 1
    OR a.y = 2
    OR a.z = 3
)
AND a.w = 4
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_statements() {
    assert_eq!(
        fmt_with("select 1; select 2;", Dialect::Native, &FormatConfig::default()),
        "SELECT 1;\n\nSELECT 2;"
    );
    assert_eq!(
        fmt_with("select 1;\n-- bye", Dialect::Native, &FormatConfig::default()),
        "SELECT 1;\n-- bye"
    );
}

#[test]
fn test_fmt_insert_values() {
    let output = fmt_with(
        "insert into t(a, b) values (1, 2), (3, 4)",
        Dialect::Native,
        &FormatConfig::default(),
    );
    let expected = r#"
INSERT INTO t(a, b)
VALUES
    (1, 2),
    (3, 4)
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_update() {
    assert_eq!(
        fmt("update User u set u.name = :n where u.id = :id"),
        "UPDATE User u\nSET u.name = :n\nWHERE u.id = :id"
    );
}

#[test]
fn test_fmt_delete() {
    assert_eq!(
        fmt("delete from User u where u.id = :id and u.active = false"),
        "DELETE FROM User u\nWHERE u.id = :id\nAND u.active = FALSE"
    );
}

#[test]
fn test_fmt_limit_offset() {
    assert_eq!(
        fmt_with(
            "select a from t order by a limit 10 offset 5",
            Dialect::Native,
            &FormatConfig::default()
        ),
        "SELECT a\nFROM t\nORDER BY a\nLIMIT 10\nOFFSET 5"
    );
}

#[test]
fn test_fmt_set_operation_with_group() {
    let output = fmt("select a from T a union (select b from U b)");
    let expected = r#"
SELECT a
FROM T a
UNION (
    SELECT b
    FROM U b
)
"#;
    assert_eq!(output, expected.trim());
}

#[test]
fn test_fmt_keeps_preamble_and_ddl() {
    let native = |input: &str| fmt_with(input, Dialect::Native, &FormatConfig::default());
    assert_eq!(
        native("EXPLAIN select a from t"),
        "EXPLAIN\nSELECT a\nFROM t"
    );
    assert_eq!(
        native("create table t (a int, b text);\nselect a from t limit 10;"),
        "create table t (a int, b text);\n\nSELECT a\nFROM t\nLIMIT 10;"
    );
}

const SAMPLES: &[(Dialect, &str)] = &[
    (Dialect::Jpql, "select distinct u from User u left join fetch u.roles r where r.name like :n or u.admin = true"),
    (Dialect::Jpql, "select o from Order o where o.total between 10 and 20 and case when o.x = 1 and o.y = 2 then 1 else 0 end = 1"),
    (Dialect::Jpql, "with t as (select id from a), s as (select id from b) select * from t union all select * from s"),
    (Dialect::Jpql, "/* head */ select a -- x\n, b /* y */ from t where a = (select max(a) from t) group by a having count(*) > 1"),
    (Dialect::Jpql, "select new com.acme.Dto(a.id, (a.x + 1), coalesce(a.y, 0)) from A a"),
    (Dialect::Jpql, "select a from t\n-- trailing note"),
    (Dialect::Jpql, "delete from User u where u.id = :id"),
    (Dialect::Jpql, "update User u set u.name = :n, u.age = 3 where u.id = :id"),
    (Dialect::Native, "select a from t limit 10 offset 5"),
    (Dialect::Jpql, "select a from T a union (select b from U b where b.x = 1)"),
    (Dialect::Native, "EXPLAIN ANALYZE select a from t where a > 1"),
    (Dialect::Native, "create table t (a int, b text);\ncreate index i on t (a);\ninsert into t values (1, 'x');"),
    (Dialect::Native, "call refresh_stats(1, 'x'); select 1 intersect select 2 except all (select 3)"),
];

#[test]
fn test_fmt_is_idempotent_on_mixed_inputs() {
    for (dialect, input) in SAMPLES {
        fmt_with(input, *dialect, &FormatConfig::default());
    }
}

/// Code tokens with keywords upper-cased, and comments in order. Comments
/// are compared apart from code because inline ones may be hoisted past
/// punctuation.
fn significant_tokens(text: &str) -> (Vec<(TokenKind, String)>, Vec<String>) {
    let tokens = tokenize(text).unwrap();
    let code = tokens
        .iter()
        .filter(|t| !t.is_trivia())
        .map(|t| match t.kind {
            TokenKind::Keyword => (t.kind, t.text.to_ascii_uppercase()),
            _ => (t.kind, t.text.clone()),
        })
        .collect();
    let comments = tokens
        .iter()
        .filter(|t| t.is_comment())
        .map(|t| t.text.trim_end().to_string())
        .collect();
    (code, comments)
}

#[test]
fn test_fmt_keeps_every_token() {
    for config in [
        FormatConfig::default(),
        FormatConfig {
            one_join_per_line: false,
            keyword_case: KeywordCase::Lower,
            max_line_width: 20,
            ..FormatConfig::default()
        },
    ] {
        for (dialect, input) in SAMPLES {
            let output = fmt_with(input, *dialect, &config);
            assert_eq!(
                significant_tokens(&output),
                significant_tokens(input),
                "tokens changed for {input:?}:\n{output}"
            );
        }
    }
}
