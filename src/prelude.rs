// パス: src/prelude.rs
// 役割: 起動時に定義環境へ読み込む標準ライブラリと Church 数の生成
// 意図: 標準定義を表面構文のテキストとして一箇所に並べ、説明文と一緒に引けるようにする
// 関連ファイル: src/definitions.rs, src/repl/printer.rs
//! 標準ライブラリ
//!
//! 各項目は `(名前, 定義本体, 説明)`。本体は通常の式として解析される。
//! 前方参照も許される（名前解決は簡約時に遅延して行われるため）。

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::term::Term;

/// 数字名から自動生成する Church 数の上限。
pub const MAX_NUMERAL: usize = 10_000;

pub const PRELUDE: &[(&str, &str, &str)] = &[
    ("I", "\\x. x", "identity"),
    ("K", "\\x y. x", "constant"),
    ("S", "\\x y z. x z (y z)", "substitution"),
    ("B", "\\x y z. x (y z)", "composition"),
    ("C", "\\x y z. x z y", "flip"),
    ("W", "\\x y. x y y", "duplication"),
    ("T", "\\x y. y x", "thrush"),
    ("M", "\\x. x x", "mockingbird (self application)"),
    ("Y", "\\f. (\\x. f (x x)) (\\x. f (x x))", "fixed-point combinator"),
    ("OMEGA", "(\\x. x x) (\\x. x x)", "divergent term"),
    ("TRUE", "\\x y. x", "Church true"),
    ("FALSE", "\\x y. y", "Church false"),
    ("IF", "\\b t e. b t e", "conditional"),
    ("AND", "\\p q. p q p", "conjunction"),
    ("OR", "\\p q. p p q", "disjunction"),
    ("NOT", "\\p. p FALSE TRUE", "negation"),
    ("PAIR", "\\x y f. f x y", "pair constructor"),
    ("FST", "\\p. p TRUE", "first projection"),
    ("SND", "\\p. p FALSE", "second projection"),
    ("ZERO", "\\f x. x", "Church numeral 0"),
    ("ONE", "\\f x. f x", "Church numeral 1"),
    ("TWO", "\\f x. f (f x)", "Church numeral 2"),
    ("THREE", "\\f x. f (f (f x))", "Church numeral 3"),
    ("FOUR", "\\f x. f (f (f (f x)))", "Church numeral 4"),
    ("FIVE", "\\f x. f (f (f (f (f x))))", "Church numeral 5"),
    ("SUCC", "\\n f x. f (n f x)", "successor"),
    ("PRED", "\\n f x. n (\\g h. h (g f)) (\\u. x) (\\u. u)", "predecessor"),
    ("ADD", "\\m n f x. m f (n f x)", "addition"),
    ("SUB", "\\m n. n PRED m", "truncated subtraction"),
    ("MULT", "\\m n f. m (n f)", "multiplication"),
    ("POW", "\\b e. e b", "exponentiation"),
    ("ISZERO", "\\n. n (\\x. FALSE) TRUE", "zero test"),
    ("LEQ", "\\m n. ISZERO (SUB m n)", "less than or equal"),
    ("EQ", "\\m n. AND (LEQ m n) (LEQ n m)", "numeral equality"),
    ("NIL", "PAIR TRUE TRUE", "empty list"),
    ("CONS", "\\h t. PAIR FALSE (PAIR h t)", "list constructor"),
    ("ISNIL", "FST", "empty list test"),
    ("HEAD", "\\l. FST (SND l)", "first element"),
    ("TAIL", "\\l. SND (SND l)", "rest of the list"),
    (
        "FACT",
        "Y (\\f n. IF (ISZERO n) ONE (MULT n (f (PRED n))))",
        "factorial via Y",
    ),
];

static INDEX: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    PRELUDE.iter().map(|(name, _, doc)| (*name, *doc)).collect()
});

/// 標準定義の一行説明。
pub fn describe(name: &str) -> Option<&'static str> {
    INDEX.get(name).copied()
}

/// 数字だけの名前を Church 数の値として読む。
pub fn numeral_value(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<usize>().ok().filter(|n| *n <= MAX_NUMERAL)
}

/// `\f x. f (f (... x))`
pub fn church_numeral(n: usize) -> Term {
    let body = (0..n).fold(Term::var("x"), |acc, _| Term::app(Term::var("f"), acc));
    Term::abs_many(&["f", "x"], body)
}
