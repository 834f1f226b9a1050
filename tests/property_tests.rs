//! Property-based tests for notebook expansion
//!
//! These tests use proptest to verify invariants across many randomly
//! generated notebooks, catching edge cases that hand-written tests might miss.

use std::path::Path;

use nbvalx::magics::evaluator::evaluate_condition;
use nbvalx::magics::splitter::split;
use nbvalx::notebook::expand::{ExpandOptions, expand};
use nbvalx::notebook::{Cell, Notebook};
use nbvalx_syntax::parser::expression_from_source;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Allowed values of up to three tags `t0`, `t1`, `t2`: distinct small integers per tag.
fn tag_values_strategy() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(prop::collection::btree_set(-3i64..6, 1..4), 1..4)
        .prop_map(|tags| tags.into_iter().map(|values| values.into_iter().collect()).collect())
}

/// A guard over tag `t{tag}`.
fn condition_strategy() -> impl Strategy<Value = String> {
    (0usize..3, prop::sample::select(vec!["==", "!=", "<", ">="]), -3i64..6)
        .prop_map(|(tag, op, value)| format!("t{tag} {op} {value}"))
}

fn tagged_notebook(tags: &[Vec<i64>], guards: &[String]) -> Notebook {
    let allowed: Vec<String> = tags
        .iter()
        .enumerate()
        .map(|(i, values)| {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            format!("t{i}: {}", values.join(", "))
        })
        .collect();
    let mut cells = vec![
        Cell::code("%load_ext nbvalx"),
        Cell::code(format!("%%register_allowed_run_if_tags\n{}", allowed.join("\n"))),
    ];
    for (i, guard) in guards.iter().enumerate() {
        cells.push(Cell::code(format!("%%run_if {guard}\nx{i} = 1")));
    }
    Notebook::from_cells(cells)
}

/// Guards only over the declared tags.
fn declared_guards(tags: &[Vec<i64>], guards: Vec<String>) -> Vec<String> {
    guards
        .into_iter()
        .filter(|guard| guard[1..2].parse::<usize>().is_ok_and(|tag| tag < tags.len()))
        .collect()
}

fn options(tag_collapse: bool, keyword: Option<String>) -> ExpandOptions {
    ExpandOptions {
        tag_collapse,
        keyword,
        work_dir: "out".into(),
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Property: one notebook per point of the cartesian product of the tag values
    #[test]
    fn combination_count_is_the_product(tags in tag_values_strategy()) {
        let nb = tagged_notebook(&tags, &[]);
        let out = expand(&nb, Path::new("nb.ipynb"), &options(false, None)).unwrap();
        let expected: usize = tags.iter().map(Vec::len).product();
        prop_assert_eq!(out.len(), expected);

        let label = out[out.len() / 2].combination.as_ref().unwrap().label();
        let filtered = expand(&nb, Path::new("nb.ipynb"), &options(false, Some(label))).unwrap();
        prop_assert_eq!(filtered.len(), 1);

        let none = expand(&nb, Path::new("nb.ipynb"), &options(false, Some("t9=0".to_string()))).unwrap();
        prop_assert!(none.is_empty());
    }

    /// Property: collapse keeps exactly the guarded cells whose condition holds for the combination
    #[test]
    fn collapse_round_trip(
        tags in tag_values_strategy(),
        guards in prop::collection::vec(condition_strategy(), 0..6),
    ) {
        let guards = declared_guards(&tags, guards);
        let nb = tagged_notebook(&tags, &guards);
        let out = expand(&nb, Path::new("nb.ipynb"), &options(true, None)).unwrap();

        for expanded in &out {
            let bindings = expanded.combination.as_ref().unwrap().bindings();
            let kept: Vec<&str> = expanded.notebook.cells.iter().map(|c| c.source.as_str()).collect();
            for (i, guard) in guards.iter().enumerate() {
                let expr = expression_from_source(guard).unwrap();
                let holds = evaluate_condition(&expr, bindings).unwrap();
                let body = format!("x{i} = 1");
                prop_assert_eq!(kept.contains(&body.as_str()), holds, "guard `{}`", guard);
            }
        }
    }

    /// Property: expansion is deterministic
    #[test]
    fn expansion_is_deterministic(
        tags in tag_values_strategy(),
        guards in prop::collection::vec(condition_strategy(), 0..4),
        collapse in any::<bool>(),
    ) {
        let nb = tagged_notebook(&tags, &declared_guards(&tags, guards));
        let first = expand(&nb, Path::new("nb.ipynb"), &options(collapse, None)).unwrap();
        let second = expand(&nb, Path::new("nb.ipynb"), &options(collapse, None)).unwrap();
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.path, &b.path);
            prop_assert_eq!(a.notebook.to_json().unwrap(), b.notebook.to_json().unwrap());
        }
    }

    /// Property: without a continuation marker the body is returned untouched
    #[test]
    fn split_without_continuation(head in "[a-z0-9 =<>]{0,20}", body in "[a-z0-9 =\n]{0,40}") {
        let (condition, code) = split(&head, &body);
        prop_assert_eq!(condition, head.trim().to_string());
        prop_assert_eq!(code, body.as_str());
    }

    /// Property: a continued condition consumes exactly one body line
    #[test]
    fn split_consumes_continued_line(
        head in "[a-z][a-z0-9 ]{0,10}",
        next in "[a-z0-9 ]{0,10}",
        rest in "[a-z0-9 =\n]{0,30}",
    ) {
        let body = format!("{next}\n{rest}");
        let (condition, code) = split(&format!("{head} \\"), &body);
        let expected = format!("{head} {}", next.trim());
        prop_assert_eq!(condition, expected.trim().to_string());
        prop_assert_eq!(code, rest.as_str());
    }
}
