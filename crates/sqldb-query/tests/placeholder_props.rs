//! Placeholder rendering properties.
//!
//! For a statement with N neutral placeholders every dialect must emit
//! exactly N native tokens, in order: numbered dialects count 1..=N, the
//! others repeat one token.

use proptest::prelude::*;
use sqldb_core::{Backend, PLACEHOLDER};
use sqldb_query::generator_for;

/// Statement fragments without digits, braces, `?`, `$` or `@`.
fn fragment() -> impl Strategy<Value = String> {
    "[A-Za-z_ =<>(),.']{0,12}"
}

fn statement() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(fragment(), 1..12).prop_map(|parts| {
        let n = parts.len() - 1;
        (parts.join(PLACEHOLDER), n)
    })
}

/// Numbers following each `prefix` occurrence, in order.
fn numbered_tokens(stmt: &str, prefix: char) -> Vec<usize> {
    let mut out = Vec::new();
    let mut chars = stmt.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != prefix {
            continue;
        }
        let mut digits = String::new();
        while let Some(&(_, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }
        if let Ok(n) = digits.parse() {
            out.push(n);
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_repeated_dialects_emit_n_question_marks((stmt, n) in statement()) {
        for backend in [Backend::Sqlite, Backend::Mysql] {
            let rendered = generator_for(backend).format_stmt(&stmt);
            prop_assert_eq!(rendered.matches('?').count(), n);
            prop_assert!(!rendered.contains(PLACEHOLDER));
        }
    }

    #[test]
    fn prop_pgsql_emits_sequential_numbers((stmt, n) in statement()) {
        let rendered = generator_for(Backend::Pgsql).format_stmt(&stmt);
        prop_assert_eq!(numbered_tokens(&rendered, '$'), (1..=n).collect::<Vec<_>>());
        prop_assert!(!rendered.contains(PLACEHOLDER));
    }

    #[test]
    fn prop_mssql_emits_sequential_numbers((stmt, n) in statement()) {
        let rendered = generator_for(Backend::Mssql)
            .format_stmt(&stmt)
            .replace("@p", "@");
        prop_assert_eq!(numbered_tokens(&rendered, '@'), (1..=n).collect::<Vec<_>>());
    }

    #[test]
    fn prop_text_between_placeholders_is_preserved((stmt, _n) in statement()) {
        let rendered = generator_for(Backend::Pgsql).format_stmt(&stmt);
        let original: Vec<&str> = stmt.split(PLACEHOLDER).collect();
        let mut rest = rendered.as_str();
        for (i, part) in original.iter().enumerate() {
            prop_assert!(rest.starts_with(*part));
            rest = &rest[part.len()..];
            if i + 1 < original.len() {
                let token = format!("${}", i + 1);
                prop_assert!(rest.starts_with(&token));
                rest = &rest[token.len()..];
            }
        }
        prop_assert!(rest.is_empty());
    }
}
