#[cfg(test)]
/// Parser unit tests.
///
/// These tests focus on precedence, the literal-only rule of declaration blocks, and
/// line-level error recovery.
mod tests {
    use super::*;

    fn expr(source: &str) -> Spanned<Expr> {
        expression_from_source(source).unwrap()
    }

    #[test]
    fn test_power_binds_tighter_than_comparison() {
        let e = expr("tag**2 == 1");
        match &e.node {
            Expr::Compare(lhs, rest) => {
                assert!(matches!(lhs.node, Expr::Binary(_, BinaryOp::Pow, _)));
                assert_eq!(rest.len(), 1);
                assert_eq!(rest[0].0, CompareOp::Eq);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_unary_minus_is_looser_than_power() {
        // -2**2 == -(2**2)
        let e = expr("-2**2");
        match &e.node {
            Expr::Unary(UnaryOp::Neg, inner) => {
                assert!(matches!(inner.node, Expr::Binary(_, BinaryOp::Pow, _)))
            }
            other => panic!("expected negation, got {other:?}"),
        }
    }

    #[test]
    fn test_or_is_loosest() {
        let e = expr("a and b or not c");
        match &e.node {
            Expr::Binary(lhs, BinaryOp::Or, rhs) => {
                assert!(matches!(lhs.node, Expr::Binary(_, BinaryOp::And, _)));
                assert!(matches!(rhs.node, Expr::Unary(UnaryOp::Not, _)));
            }
            other => panic!("expected disjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_two_word_comparisons() {
        let e = expr("x not in (1, 2) and y is not None");
        let Expr::Binary(lhs, BinaryOp::And, rhs) = &e.node else {
            panic!("expected conjunction");
        };
        assert!(matches!(&lhs.node, Expr::Compare(_, rest) if rest[0].0 == CompareOp::NotIn));
        assert!(matches!(&rhs.node, Expr::Compare(_, rest) if rest[0].0 == CompareOp::IsNot));
    }

    #[test]
    fn test_chained_comparison_is_one_node() {
        let e = expr("0 < x <= 10");
        let Expr::Compare(_, rest) = &e.node else {
            panic!("expected comparison");
        };
        assert_eq!(rest.iter().map(|(op, _)| *op).collect::<Vec<_>>(), vec![CompareOp::Lt, CompareOp::LtEq]);
    }

    #[test]
    fn test_condition_split_by_continuation() {
        let e = expr("a == 1 and \\\n b == 2");
        assert_eq!(e.node.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_tuple_forms() {
        assert!(matches!(expr("()").node, Expr::Tuple(ref v) if v.is_empty()));
        assert!(matches!(expr("(1,)").node, Expr::Tuple(ref v) if v.len() == 1));
        assert!(matches!(expr("(1)").node, Expr::Literal(Literal::Int(1))));
        assert!(matches!(expr("1, 2").node, Expr::Tuple(ref v) if v.len() == 2));
        assert!(matches!(expr("[1, 2,]").node, Expr::List(ref v) if v.len() == 2));
    }

    #[test]
    fn test_assignment_in_condition_is_rejected() {
        let errs = expression_from_source("tag = 1").unwrap_err();
        assert!(errs[0].message.contains("assignment is not allowed"));
        assert_eq!(errs[0].hints, vec!["use '==' to compare".to_string()]);
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let errs = expression_from_source("a b").unwrap_err();
        assert!(errs[0].message.contains("expected end of condition"), "{}", errs[0].message);
    }

    #[test]
    fn test_empty_condition_is_rejected() {
        let errs = expression_from_source("   ").unwrap_err();
        assert!(errs[0].message.contains("expected a condition"));
    }

    #[test]
    fn test_allowed_block() {
        let decls = allowed_block_from_source("bool_tag: True, False\nint_tag: 2, -1\nstr_tag: \"a\", 'b'\n").unwrap();
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].node.values[1].node, Literal::Bool(false));
        assert_eq!(decls[1].node.values[1].node, Literal::Int(-1));
        assert_eq!(decls[2].node.values[0].node, Literal::Str("a".to_string()));
    }

    #[test]
    fn test_allowed_block_requires_quoted_strings() {
        let errs = allowed_block_from_source("tag: a, b").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "string values must be quoted");
        assert_eq!(errs[0].kind, crate::diagnostics::ErrorKind::Syntax);
    }

    #[test]
    fn test_allowed_block_reports_every_bad_line() {
        let errs = allowed_block_from_source("a: x\nb: 1\nc 2\nd: None\n").unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(errs[1].message.contains("':' after the name"));
        assert!(errs[2].message.contains("not None"));
    }

    #[test]
    fn test_allowed_block_rejects_reserved_names() {
        let errs = allowed_block_from_source("not: 1").unwrap_err();
        assert!(errs[0].message.contains("reserved word 'not'"), "{}", errs[0].message);
    }

    #[test]
    fn test_empty_allowed_block_is_empty() {
        assert!(allowed_block_from_source("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_assignment_block() {
        let assignments = assignment_block_from_source("a = 1\nb = 'x'\nc = -0.5").unwrap();
        assert_eq!(assignments.len(), 3);
        assert_eq!(assignments[2].node.value.node, Literal::Float(-0.5));
        assert_eq!(assignments[1].node.to_string(), "b = 'x'");
    }

    #[test]
    fn test_assignment_block_rejects_expressions() {
        let errs = assignment_block_from_source("a = 1 + 1").unwrap_err();
        assert!(errs[0].message.contains("expected end of line"), "{}", errs[0].message);
    }
}
