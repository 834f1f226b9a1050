//! Rendering parsed conditions back to canonical source.

use nbvalx_syntax::parser;

fn canonical(source: &str) -> String {
    parser::expression_from_source(source).unwrap().node.to_string()
}

#[test]
fn conditions_render_canonically() {
    insta::assert_snapshot!(canonical("tag**2==1"), @"tag ** 2 == 1");
    insta::assert_snapshot!(canonical("(a and b) or c"), @"a and b or c");
    insta::assert_snapshot!(canonical("a and (b or c)"), @"a and (b or c)");
    insta::assert_snapshot!(canonical("not (a == 1)"), @"not a == 1");
    insta::assert_snapshot!(canonical("(a - b) - c"), @"a - b - c");
    insta::assert_snapshot!(canonical("a - (b - c)"), @"a - (b - c)");
    insta::assert_snapshot!(canonical("2 ** 3 ** 2"), @"2 ** 3 ** 2");
    insta::assert_snapshot!(canonical("(2 ** 3) ** 2"), @"(2 ** 3) ** 2");
    insta::assert_snapshot!(canonical("x not in ['a', \"b\"]"), @"x not in ['a', 'b']");
    insta::assert_snapshot!(canonical("flag is not None"), @"flag is not None");
}

#[test]
fn rendering_is_a_fixed_point() {
    for source in [
        "a == 1 and b != 'x' or not c",
        "-x ** 2 + 3 // 2 % 5 < 1.5",
        "(1, 2) == (a, b)",
        "x in (1,)",
    ] {
        let once = canonical(source);
        assert_eq!(canonical(&once), once, "rendering of {source:?} is not stable");
    }
}

#[test]
fn declarations_render_canonically() {
    let decls = parser::allowed_block_from_source("a: 1,2\nb: \"x\" , 'y'\nc: 0.10, -3e20").unwrap();
    let rendered: Vec<String> = decls.iter().map(|d| d.node.to_string()).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    a: 1, 2
    b: 'x', 'y'
    c: 0.1, -3e+20
    ");
}
