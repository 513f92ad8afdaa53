// パス: tests/combinator.rs
// 役割: ブラケット抽象とコンビネータ探索の統合テスト
// 意図: 変換後の項が元のラムダ項と同じ振る舞いをすることを簡約で確かめる
// 関連ファイル: src/combinator.rs, src/search.rs, src/reducer.rs
#[path = "test_support.rs"]
mod support;

use combinatorx::combinator::{compile, Algorithm};
use combinatorx::parser::parse_equation;
use combinatorx::reducer::FreeVariables;
use combinatorx::search::{search, SearchQuery};
use combinatorx::term::TermKind;
use support::{assert_alpha_eq, normal_form, parse_expr, prelude_defs};

/// 項にラムダが残っていないか。
fn lambda_free(src: &str) -> bool {
    let mut stack = vec![parse_expr(src)];
    while let Some(t) = stack.pop() {
        match t.kind() {
            TermKind::Var { .. } => {}
            TermKind::Abs { .. } => return false,
            TermKind::App { func, arg } => {
                stack.push(func);
                stack.push(arg);
            }
        }
    }
    true
}

#[test]
/// どのアルゴリズムでも、変換結果に引数を与えると元の項と同じ正規形になる。
fn compiled_terms_behave_like_the_original() {
    struct Case {
        src: &'static str,
        args: &'static str,
    }
    let cases = [
        Case { src: "\\x y. x", args: "a b" },
        Case { src: "\\x y z. x z (y z)", args: "a b c" },
        Case { src: "\\x y z. x (y z)", args: "a b c" },
        Case { src: "\\f x. f (f x)", args: "g y" },
        Case { src: "\\x y. y x", args: "a b" },
        Case { src: "\\x. x x", args: "a" },
        Case { src: "\\p q. p q p", args: "a b" },
    ];
    for algo in Algorithm::ALL {
        for c in &cases {
            let compiled = compile(&parse_expr(c.src), algo).to_string();
            assert!(lambda_free(&compiled), "{algo}: {} -> {compiled}", c.src);
            let got = normal_form(&format!("({compiled}) {}", c.args));
            let want = normal_form(&format!("({}) {}", c.src, c.args));
            assert_alpha_eq(&got, &want, &format!("{algo}: {}", c.src));
        }
    }
}

#[test]
/// eta と turner は primitive より短い項を作る。
fn optimised_algorithms_are_smaller() {
    let src = parse_expr("\\f g x. f (g x)");
    let primitive = compile(&src, Algorithm::Primitive).size();
    let eta = compile(&src, Algorithm::Eta).size();
    let turner = compile(&src, Algorithm::Turner).size();
    assert!(eta <= primitive, "eta {eta} > primitive {primitive}");
    assert!(turner < eta, "turner {turner} >= eta {eta}");
    assert_eq!(compile(&src, Algorithm::Turner).to_string(), "B");
}

#[test]
/// 探索は小さい項から順に試す。
fn search_prefers_smaller_terms() {
    let defs = prelude_defs();
    let eq = parse_equation("x y = y x").expect("equation");
    let basis = vec!["C".to_string(), "I".to_string()];
    let query = SearchQuery {
        params: &eq.params,
        body: &eq.body,
        basis: &basis,
        max_size: 3,
        max_steps: 100,
        free_variables: FreeVariables::Symbolic,
    };
    let result = search(&defs, &query).expect("search");
    assert_eq!(result.found.map(|t| t.to_string()).as_deref(), Some("C I"));
    assert_eq!(result.tried, 2 + 2);
}

#[test]
/// 目標が上限内に正規化できなければ探索しない。
fn search_requires_a_normalizing_target() {
    let defs = prelude_defs();
    let eq = parse_equation("x = OMEGA").expect("equation");
    let basis = vec!["I".to_string()];
    let query = SearchQuery {
        params: &eq.params,
        body: &eq.body,
        basis: &basis,
        max_size: 2,
        max_steps: 50,
        free_variables: FreeVariables::Symbolic,
    };
    let result = search(&defs, &query).expect("search");
    assert!(!result.target_normalized);
    assert_eq!(result.tried, 0);
}
