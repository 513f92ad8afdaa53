// パス: src/search.rs
// 役割: 与えられた基底から目的の振る舞いを持つコンビネータ項を総当たりで探す
// 意図: `search x y = body using S K I` を、小さい項から順に簡約して比較する形で実現する
// 関連ファイル: src/reducer.rs, src/session.rs, tests/combinator.rs
//! コンビネータ探索
//!
//! 葉の数 1, 2, ... の適用木を基底の名前で列挙し、候補 `X` について
//! `X p1 ... pn` と目標の本体をそれぞれ正規化して α 同値なら採用する。
//! 引数 `p1 ... pn` は同名の定義や基底の名前があっても、それらと区別される束縛変数として扱う。

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use tracing::debug;

use crate::definitions::Definitions;
use crate::errors::ReduceError;
use crate::reducer::{FreeVariables, Reducer, Status};
use crate::subst::substitute;
use crate::term::Term;

pub struct SearchQuery<'q> {
    pub params: &'q [String],
    pub body: &'q Term,
    pub basis: &'q [String],
    /// 候補の葉の数の上限。
    pub max_size: usize,
    /// 候補 1 つあたりの簡約ステップ上限。
    pub max_steps: usize,
    pub free_variables: FreeVariables,
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    pub found: Option<Term>,
    /// 試した候補の数。
    pub tried: usize,
    /// 目標の本体が上限内に正規形を持ったか。
    pub target_normalized: bool,
}

pub fn search(defs: &Definitions, query: &SearchQuery<'_>) -> Result<SearchResult, ReduceError> {
    let (params, body) = opaque_params(defs, query);
    let target = Reducer::new(defs, query.max_steps)
        .free_variables(query.free_variables)
        .normalize_under(&body, &params)?;
    if target.status != Status::Normal {
        return Ok(SearchResult {
            found: None,
            tried: 0,
            target_normalized: false,
        });
    }
    let basis: Vec<Term> = query.basis.iter().map(Term::var).collect();
    let mut tried = 0usize;
    let mut check = |candidate: Term| -> ControlFlow<Result<Term, ReduceError>> {
        tried += 1;
        let args = params.iter().map(Term::var);
        let applied = Term::apply_all(candidate.deep_copy(), args);
        let outcome = Reducer::new(defs, query.max_steps)
            .free_variables(query.free_variables)
            .normalize_under(&applied, &params);
        match outcome {
            Err(e) => ControlFlow::Break(Err(e)),
            Ok(r) if r.status == Status::Normal && r.term.alpha_eq(&target.term) => {
                ControlFlow::Break(Ok(candidate))
            }
            Ok(_) => ControlFlow::Continue(()),
        }
    };
    let mut found = None;
    for size in 1..=query.max_size {
        match each_term(size, &basis, &mut check) {
            ControlFlow::Break(Ok(term)) => {
                found = Some(term);
                break;
            }
            ControlFlow::Break(Err(e)) => return Err(e),
            ControlFlow::Continue(()) => {}
        }
    }
    debug!(tried, found = found.is_some(), "search finished");
    Ok(SearchResult {
        found,
        tried,
        target_normalized: true,
    })
}

/// 基底と同名の引数を別名に置き換えた (引数, 目標の本体)。
/// 候補の葉と引数が同じ名前のままだと区別できないため。
fn opaque_params(defs: &Definitions, query: &SearchQuery<'_>) -> (Vec<String>, Term) {
    let mut avoid: BTreeSet<String> = query.body.free_vars();
    avoid.extend(query.params.iter().cloned());
    avoid.extend(query.basis.iter().cloned());
    let mut body = query.body.deep_copy();
    let mut params = Vec::with_capacity(query.params.len());
    for p in query.params {
        if !query.basis.contains(p) {
            params.push(p.clone());
            continue;
        }
        let fresh = defs.fresh_binder(p, &avoid);
        avoid.insert(fresh.clone());
        body = substitute(&body, p, &Term::var(fresh.clone()));
        params.push(fresh);
    }
    (params, body)
}

type Visit<'f> = dyn FnMut(Term) -> ControlFlow<Result<Term, ReduceError>> + 'f;

/// 葉が `size` 個の適用木を左の葉が少ない順に列挙する。
fn each_term(
    size: usize,
    basis: &[Term],
    f: &mut Visit<'_>,
) -> ControlFlow<Result<Term, ReduceError>> {
    if size == 1 {
        for leaf in basis {
            f(leaf.clone())?;
        }
        return ControlFlow::Continue(());
    }
    for left in 1..size {
        each_term(left, basis, &mut |l: Term| {
            each_term(size - left, basis, &mut |r: Term| f(Term::app(l.clone(), r)))
        })?;
    }
    ControlFlow::Continue(())
}
