// パス: src/combinator.rs
// 役割: ブラケット抽象によるラムダ項からコンビネータ項への変換
// 意図: `compile` コマンドの変換規則（primitive / eta / turner）を一箇所に置く
// 関連ファイル: src/session.rs, src/search.rs, tests/combinator.rs
//! ブラケット抽象
//!
//! 内側のラムダから順に `[x] M` を計算して抽象を消す。
//! 生成される `S K I B C` は定義環境の同名定義を指す。
//!
//! - primitive: `[x] x = I`, `[x] (M N) = S [x]M [x]N`, それ以外の原子 `c` は `K c`。
//! - eta: primitive に加えて x が自由出現しない項はまるごと `K M`、`[x] (M x) = M`。
//! - turner: eta に加えて `[x] (M N) = B M [x]N`（x ∉ FV(M)）、`C [x]M N`（x ∉ FV(N)）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::term::{Term, TermKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Primitive,
    Eta,
    #[default]
    Turner,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Primitive, Algorithm::Eta, Algorithm::Turner];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Primitive => "primitive",
            Algorithm::Eta => "eta",
            Algorithm::Turner => "turner",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown algorithm `{}` (expected primitive, eta or turner)", s))
    }
}

/// 項に含まれる全てのラムダを取り除く。
pub fn compile(term: &Term, algo: Algorithm) -> Term {
    match term.kind() {
        TermKind::Var { .. } => term.resolve(),
        TermKind::App { func, arg } => Term::app(compile(&func, algo), compile(&arg, algo)),
        TermKind::Abs { param, body } => abstract_var(&param, &compile(&body, algo), algo),
    }
}

fn comb(name: &str) -> Term {
    Term::var(name)
}

fn app2(f: &str, a: Term, b: Term) -> Term {
    Term::app(Term::app(comb(f), a), b)
}

/// `[x] t`。`t` はラムダを含まない前提だが、含んでいれば先に変換する。
fn abstract_var(x: &str, t: &Term, algo: Algorithm) -> Term {
    let kind = t.kind();
    if let TermKind::Abs { .. } = kind {
        return abstract_var(x, &compile(t, algo), algo);
    }
    if let TermKind::Var { name } = &kind {
        if name == x {
            return comb("I");
        }
    }
    match algo {
        Algorithm::Primitive => match kind {
            TermKind::App { func, arg } => {
                app2("S", abstract_var(x, &func, algo), abstract_var(x, &arg, algo))
            }
            _ => Term::app(comb("K"), t.resolve()),
        },
        Algorithm::Eta | Algorithm::Turner => {
            if !t.occurs_free(x) {
                return Term::app(comb("K"), t.resolve());
            }
            let TermKind::App { func, arg } = kind else {
                // 自由に出現する以上、x 自身か適用しかない
                return comb("I");
            };
            let x_in_func = func.occurs_free(x);
            if !x_in_func && is_var_named(&arg, x) {
                return func.resolve();
            }
            if algo == Algorithm::Turner {
                if !x_in_func {
                    return app2("B", func.resolve(), abstract_var(x, &arg, algo));
                }
                if !arg.occurs_free(x) {
                    return app2("C", abstract_var(x, &func, algo), arg.resolve());
                }
            }
            app2("S", abstract_var(x, &func, algo), abstract_var(x, &arg, algo))
        }
    }
}

fn is_var_named(t: &Term, x: &str) -> bool {
    matches!(t.kind(), TermKind::Var { name } if name == x)
}
