// パス: tests/lexer_parser.rs
// 役割: Lexer と parser の基本〜境界テストを一本化
// 意図: 字句解析・構文解析と表示の往復を重要ケースで網羅する
// 関連ファイル: src/lexer.rs, src/parser/mod.rs, src/term.rs
#[path = "test_support.rs"]
mod support;

use combinatorx::lexer::{self, TokenKind};
use combinatorx::parser;
use combinatorx::term::{Term, TermKind};
use support::{assert_alpha_eq, parse_expr};

#[test]
/// 代表的な字句パターンをテーブル駆動で検証する。
fn lexer_happy_paths() {
    struct Case<'a> {
        src: &'a str,
        kinds: &'a [TokenKind],
        note: &'a str,
    }

    let cases = [
        Case {
            src: "\\x. x",
            kinds: &[
                TokenKind::LAMBDA,
                TokenKind::IDENT,
                TokenKind::DOT,
                TokenKind::IDENT,
                TokenKind::EOF,
            ],
            note: "ラムダ",
        },
        Case {
            src: "ADD 12 x'",
            kinds: &[
                TokenKind::IDENT,
                TokenKind::NUMBER,
                TokenKind::IDENT,
                TokenKind::EOF,
            ],
            note: "数字とプライム付き識別子",
        },
        Case {
            src: "ID = (f) -- comment",
            kinds: &[
                TokenKind::IDENT,
                TokenKind::EQUAL,
                TokenKind::LPAREN,
                TokenKind::IDENT,
                TokenKind::RPAREN,
                TokenKind::EOF,
            ],
            note: "定義の記号とコメント",
        },
    ];

    for c in cases {
        let kinds: Vec<TokenKind> = lexer::lex(c.src)
            .expect("lex")
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds, c.kinds, "{}", c.note);
    }
}

#[test]
/// 想定外の文字はレキサの段階で報告される。
fn lexer_rejects_unknown_characters() {
    let err = lexer::lex("x # y").expect_err("unexpected char");
    assert_eq!(err.code(), "LEX001");
    assert_eq!(err.position(), Some(2));
}

#[test]
/// 適用は左結合、ラムダ本体は右端まで伸びる。
fn application_and_lambda_shape() {
    let t = parse_expr("a b c");
    let TermKind::App { func, arg } = t.kind() else {
        panic!("expected application");
    };
    assert_eq!(arg.to_string(), "c");
    assert_eq!(func.to_string(), "a b");

    let t = parse_expr("\\x y. x y");
    let TermKind::Abs { param, body } = t.kind() else {
        panic!("expected abstraction");
    };
    assert_eq!(param, "x");
    assert!(matches!(body.kind(), TermKind::Abs { .. }));
}

#[test]
/// 表示は最小限の括弧で正規化される。
fn display_normalizes_layout() {
    struct Case {
        src: &'static str,
        want: &'static str,
    }
    let cases = [
        Case { src: "λx.x", want: "\\x. x" },
        Case { src: "\\x. \\y. x", want: "\\x y. x" },
        Case { src: "((a b) c)", want: "a b c" },
        Case { src: "a (b c)", want: "a (b c)" },
        Case { src: "(\\x. x) y", want: "(\\x. x) y" },
        Case { src: "f \\x. x", want: "f (\\x. x)" },
        Case { src: "\\f. f (\\x. x) y", want: "\\f. f (\\x. x) y" },
        Case { src: "42", want: "42" },
    ];
    for c in cases {
        assert_eq!(parse_expr(c.src).to_string(), c.want, "src: {}", c.src);
    }
}

#[test]
/// 表示した文字列を再び解析すると α 同値な項に戻る。
fn print_then_parse_is_alpha_equivalent() {
    let sources = [
        "\\x y z. x z (y z)",
        "(\\x. x x) (\\x. x x)",
        "\\f. (\\x. f (x x)) (\\x. f (x x))",
        "a (\\b. b) (c d)",
        "\\n f x. f (n f x)",
        "x' y''",
    ];
    for src in sources {
        let t = parse_expr(src);
        let again = parse_expr(&t.to_string());
        assert_alpha_eq(&again, &t, src);
    }
    // 手で組み立てた項でも同じ
    let built = Term::abs(
        "x",
        Term::app(Term::var("x"), Term::abs("y", Term::app(Term::var("y"), Term::var("x")))),
    );
    assert_alpha_eq(&parse_expr(&built.to_string()), &built, "built");
}

#[test]
/// 構文エラーはコードと位置と期待内容を持つ。
fn syntax_errors_carry_position_and_expectation() {
    struct Case {
        src: &'static str,
        code: &'static str,
        pos: usize,
    }
    let cases = [
        Case { src: "\\x y x", code: "PAR001", pos: 6 },
        Case { src: "\\. x", code: "PAR002", pos: 1 },
        Case { src: "(x", code: "PAR001", pos: 2 },
        Case { src: "x )", code: "PAR090", pos: 2 },
        Case { src: "", code: "PAR004", pos: 0 },
        Case { src: "\\x. ", code: "PAR003", pos: 4 },
    ];
    for c in cases {
        let err = parser::parse_expr(c.src).expect_err(c.src);
        assert_eq!(err.code(), c.code, "src: {:?} -> {}", c.src, err);
        assert_eq!(err.position(), Some(c.pos), "src: {:?} -> {}", c.src, err);
    }
    let err = parser::parse_expr("\\x y x").expect_err("missing dot");
    assert!(err
        .expected()
        .starts_with("expected '.' after lambda parameters"));
}

#[test]
/// 定義ヘッダの引数はラムダに脱糖され、予約語や数字は名前にできない。
fn definition_headers() {
    let d = parser::parse_definition("TWICE f x = f (f x)").expect("def");
    assert_eq!(d.name, "TWICE");
    assert_eq!(d.params, vec!["f".to_string(), "x".to_string()]);
    assert_eq!(d.term().to_string(), "\\f x. f (f x)");

    for bad in ["type = x", "3 = x", "reduce x = x"] {
        let err = parser::parse_definition(bad).expect_err(bad);
        assert_eq!(err.code(), "PAR005", "{bad}");
    }
    let err = parser::parse_definition("ID \\x. x").expect_err("missing =");
    assert_eq!(err.code(), "PAR001");
}
