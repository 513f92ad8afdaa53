// パス: tests/reducer.rs
// 役割: 正規順序グラフ簡約の統合テスト（代入・遅延性・共有・上限）
// 意図: 標準ライブラリの Church 符号化を通して簡約器の意味論を確かめる
// 関連ファイル: src/reducer.rs, src/subst.rs, src/prelude.rs
#[path = "test_support.rs"]
mod support;

use std::sync::atomic::{AtomicBool, Ordering};

use combinatorx::definitions::Definitions;
use combinatorx::errors::ReduceError;
use combinatorx::reducer::{FreeVariables, Reducer, Status};
use combinatorx::term::Term;
use support::{assert_alpha_eq, church, normal_form, parse_expr, prelude_defs, reduce_with};

#[test]
/// 代入は捕獲を避けて内側の束縛変数を改名する。
fn substitution_avoids_capture() {
    let r = reduce_with(&Definitions::new(), "(\\x. \\y. x) y", 10);
    assert_eq!(r.status, Status::Normal);
    assert_eq!(r.term.to_string(), "\\y'. y");
}

#[test]
/// 捨てられる引数は評価されない。
fn normal_order_is_lazy() {
    struct Case {
        src: &'static str,
        want: &'static str,
    }
    let cases = [
        Case { src: "(\\x. I) OMEGA", want: "\\x. x" },
        Case { src: "K z OMEGA", want: "z" },
        Case { src: "FST (PAIR z OMEGA)", want: "z" },
        Case { src: "IF FALSE OMEGA w", want: "w" },
    ];
    for c in cases {
        assert_alpha_eq(&normal_form(c.src), &parse_expr(c.want), c.src);
    }
}

#[test]
/// Church 真理値の演算。
fn church_booleans() {
    struct Case {
        src: &'static str,
        want: &'static str,
    }
    let cases = [
        Case { src: "AND TRUE FALSE", want: "\\x y. y" },
        Case { src: "AND TRUE TRUE", want: "\\x y. x" },
        Case { src: "OR FALSE TRUE", want: "\\x y. x" },
        Case { src: "NOT TRUE", want: "\\x y. y" },
        Case { src: "IF TRUE a b", want: "a" },
    ];
    for c in cases {
        assert_alpha_eq(&normal_form(c.src), &parse_expr(c.want), c.src);
    }
}

#[test]
/// Church 数の算術。結果は対応する数と α 同値。
fn church_arithmetic() {
    struct Case {
        src: &'static str,
        want: usize,
    }
    let cases = [
        Case { src: "ADD ONE TWO", want: 3 },
        Case { src: "SUCC FOUR", want: 5 },
        Case { src: "MULT TWO THREE", want: 6 },
        Case { src: "PRED THREE", want: 2 },
        Case { src: "PRED ZERO", want: 0 },
        Case { src: "SUB FIVE TWO", want: 3 },
        Case { src: "POW TWO THREE", want: 8 },
        Case { src: "ADD 2 3", want: 5 },
        Case { src: "FACT THREE", want: 6 },
    ];
    for c in cases {
        assert_alpha_eq(&normal_form(c.src), &church(c.want), c.src);
    }
    assert_alpha_eq(
        &normal_form("ADD ONE TWO"),
        &parse_expr("\\f x. f (f (f x))"),
        "ADD ONE TWO",
    );
}

#[test]
/// 比較述語とリスト。
fn predicates_and_lists() {
    let defs = prelude_defs();
    let as_bool = |src: &str| {
        let r = reduce_with(&defs, src, support::STEPS);
        assert_eq!(r.status, Status::Normal, "{src}");
        r.term
    };
    let tt = as_bool("TRUE");
    let ff = as_bool("FALSE");

    assert_alpha_eq(&as_bool("ISZERO ZERO"), &tt, "ISZERO ZERO");
    assert_alpha_eq(&as_bool("ISZERO 2"), &ff, "ISZERO 2");
    assert_alpha_eq(&as_bool("LEQ TWO THREE"), &tt, "LEQ 2 3");
    assert_alpha_eq(&as_bool("LEQ THREE TWO"), &ff, "LEQ 3 2");
    assert_alpha_eq(&as_bool("EQ TWO 2"), &tt, "EQ 2 2");
    assert_alpha_eq(&as_bool("ISNIL NIL"), &tt, "ISNIL NIL");
    assert_alpha_eq(&as_bool("ISNIL (CONS a NIL)"), &ff, "ISNIL (CONS a NIL)");
    assert_alpha_eq(&as_bool("HEAD (TAIL (CONS a (CONS b NIL)))"), &parse_expr("b"), "HEAD");
}

#[test]
/// α 同値な入力は α 同値な結果になる。
fn reduction_respects_alpha_equivalence() {
    let defs = Definitions::new();
    let a = reduce_with(&defs, "(\\a. \\b. a b) c", 10);
    let b = reduce_with(&defs, "(\\x. \\y. x y) c", 10);
    assert_alpha_eq(&a.term, &b.term, "renamed binders");
    assert_eq!(a.steps, b.steps);
}

#[test]
/// 共有された引数は参照が 2 つあっても一度しか簡約されない。
fn shared_subterm_is_reduced_once() {
    let defs = prelude_defs();
    let twice = reduce_with(&defs, "(\\x. PAIR x x) (I (I z))", 100);
    let once = reduce_with(&defs, "(\\x. PAIR x z) (I (I z))", 100);
    assert_eq!(twice.term.to_string(), "\\f. f z z");
    assert_eq!(twice.steps, once.steps);
    assert_eq!(twice.steps, 7);
}

#[test]
/// 同じ定義を二度参照しても、一度目に簡約した複製を使い回す。
fn definitions_are_shared_within_a_run() {
    let mut defs = prelude_defs();
    defs.define("P", parse_expr("I (I z)"));
    struct Case {
        src: &'static str,
        want: &'static str,
    }
    let cases = [
        Case { src: "PAIR P P", want: "\\f. f z z" },
        Case { src: "PAIR P z", want: "\\f. f z z" },
    ];
    let steps: Vec<usize> = cases
        .iter()
        .map(|c| {
            let r = reduce_with(&defs, c.src, 100);
            assert_eq!(r.status, Status::Normal, "{}", c.src);
            assert_eq!(r.term.to_string(), c.want, "{}", c.src);
            r.steps
        })
        .collect();
    assert_eq!(steps, vec![7, 7]);
    // 再帰的な定義は展開のたびに複製するので結果は変わらない
    assert_alpha_eq(&normal_form("FACT 3"), &church(6), "FACT 3");
}

#[test]
/// 大域の名前と同じ束縛名は、展開された定義中の参照を捕獲しない。
fn binders_never_capture_unfolded_names() {
    let mut defs = prelude_defs();
    defs.define("N", parse_expr("\\y. K"));
    struct Case {
        src: &'static str,
        want: &'static str,
        captured: &'static str,
    }
    let cases = [
        Case { src: "\\FALSE. NOT TRUE", want: "\\q x y. y", captured: "\\FALSE. FALSE" },
        Case { src: "\\K. N", want: "\\a b x c. x", captured: "\\K y. K" },
        Case { src: "\\TRUE. TRUE", want: "\\x. x", captured: "\\a x y. x" },
    ];
    for c in cases {
        let r = reduce_with(&defs, c.src, 1_000);
        assert_eq!(r.status, Status::Normal, "{}", c.src);
        assert_alpha_eq(&r.term, &parse_expr(c.want), c.src);
        assert!(!r.term.alpha_eq(&parse_expr(c.captured)), "{}: captured", c.src);
    }
}

#[test]
/// 既定の上限いっぱいまで発散しても、深い正規形を作っても落ちない。
fn large_budgets_and_deep_results() {
    let defs = prelude_defs();
    struct Case {
        src: &'static str,
    }
    let cases = [Case { src: "OMEGA" }, Case { src: "Y I" }, Case { src: "Y K" }];
    for c in cases {
        let r = reduce_with(&defs, c.src, support::STEPS);
        assert_eq!(r.status, Status::StepLimitExceeded, "{}", c.src);
        assert_eq!(r.steps, support::STEPS, "{}", c.src);
        drop(r);
    }

    let r = reduce_with(&defs, "MULT 200 200", support::STEPS);
    assert_eq!(r.status, Status::Normal);
    assert_alpha_eq(&r.term, &church(40_000), "MULT 200 200");
    assert_eq!(r.term.to_string().matches("f (").count(), 39_999);
}

#[test]
/// k ステップで終わる項は上限 k で完了し、k - 1 では途中の項を返す。
fn step_bound_is_exact() {
    let defs = prelude_defs();
    let src = "(\\x. x) ((\\y. y) z)";
    let done = reduce_with(&defs, src, 2);
    assert_eq!((done.status, done.steps), (Status::Normal, 2));
    let partial = reduce_with(&defs, src, 1);
    assert_eq!(partial.status, Status::StepLimitExceeded);
    assert_eq!(partial.steps, 1);
    assert_eq!(partial.term.to_string(), "(\\y. y) z");

    let diverging = reduce_with(&defs, "OMEGA", 50);
    assert_eq!(diverging.status, Status::StepLimitExceeded);
    assert_eq!(diverging.steps, 50);
}

#[test]
/// 簡約しても環境に保存された定義は変わらない。
fn stored_definitions_are_not_rewritten() {
    let defs = prelude_defs();
    let before = defs.lookup("S").expect("S").to_string();
    let first = reduce_with(&defs, "S K K z", 100);
    let second = reduce_with(&defs, "S K K z", 100);
    assert_eq!(first.term.to_string(), "z");
    assert_eq!(first.steps, second.steps);
    assert_eq!(defs.lookup("S").expect("S").to_string(), before);
}

#[test]
/// 割り込みはステップの間でだけ効き、その時点の項を返す。
fn interrupt_stops_between_steps() {
    let defs = prelude_defs();
    let flag = AtomicBool::new(false);
    let mut stop_after_three = |n: usize, _: &Term| {
        if n == 3 {
            flag.store(true, Ordering::Relaxed);
        }
    };
    let r = Reducer::new(&defs, 1_000)
        .interrupt(&flag)
        .observe(&mut stop_after_three)
        .normalize(&parse_expr("OMEGA"))
        .expect("reduce");
    assert_eq!(r.status, Status::Interrupted);
    assert_eq!(r.steps, 3);
    assert_eq!(r.term.to_string(), "(\\x. x x) (\\x. x x)");
}

#[test]
/// 弱頭部正規形では本体の中を簡約しない。
fn whnf_stops_at_the_first_lambda() {
    let defs = Definitions::new();
    let r = Reducer::new(&defs, 10)
        .whnf(&parse_expr("(\\x. \\y. x) ((\\z. z) a)"))
        .expect("whnf");
    assert_eq!(r.status, Status::Normal);
    assert_eq!(r.steps, 1);
    assert_eq!(r.term.to_string(), "\\y. (\\z. z) a");
}

#[test]
/// 厳格モードでは未定義の名前が簡約中に見つかった時点で失敗する。
fn strict_mode_reports_unbound_names() {
    let defs = prelude_defs();
    let err = Reducer::new(&defs, 100)
        .free_variables(FreeVariables::Reject)
        .normalize(&parse_expr("K undefined_thing z"))
        .expect_err("unbound");
    assert_eq!(
        err,
        ReduceError::UnboundVariable {
            name: "undefined_thing".into()
        }
    );
    // 捨てられる側なら展開されないので失敗しない
    let ok = Reducer::new(&defs, 100)
        .free_variables(FreeVariables::Reject)
        .normalize(&parse_expr("K I undefined_thing"))
        .expect("lazy");
    assert_eq!(ok.term.to_string(), "\\x. x");
}
