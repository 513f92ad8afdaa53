// パス: src/subst.rs
// 役割: 捕獲回避代入 body[x := arg] を実装する
// 意図: 必要な箇所だけ新ノードを作り、変化のない部分グラフは参照で再利用する
// 関連ファイル: src/term.rs, src/reducer.rs
//! 捕獲回避代入
//!
//! 束縛子 `y` が `arg` の自由変数で、かつ本体に `x` が自由出現する場合に限り、
//! `y` を `'` を付け足した新しい名前へ付け替えてから代入する。

use std::collections::{BTreeSet, HashMap};

use crate::term::{Term, TermKind};

/// `avoid` に含まれない `base'`, `base''`, ... のうち最初のもの。
pub fn fresh_name(base: &str, avoid: &BTreeSet<String>) -> String {
    let mut name = format!("{}'", base);
    while avoid.contains(&name) {
        name.push('\'');
    }
    name
}

/// `body` 中の自由な `var` を `arg` に置き換えた項を返す。
pub fn substitute(body: &Term, var: &str, arg: &Term) -> Term {
    Substitution::new(var, arg).run(body)
}

/// 後順走査の作業単位。
enum Frame {
    Enter(Term),
    Rebuild(Term),
    /// 付け替えた本体 `renamed` の結果を新しい束縛子 `fresh` で包む。
    Rename { node: Term, fresh: String, renamed: Term },
}

struct Substitution<'a> {
    var: &'a str,
    arg: &'a Term,
    arg_fv: BTreeSet<String>,
    // ノード同一性ごとの結果。None は「変化なし」。
    memo: HashMap<usize, (Term, Option<Term>)>,
}

impl<'a> Substitution<'a> {
    fn new(var: &'a str, arg: &'a Term) -> Self {
        Self {
            var,
            arg,
            arg_fv: arg.free_vars(),
            memo: HashMap::new(),
        }
    }

    fn run(&mut self, body: &Term) -> Term {
        let mut frames = vec![Frame::Enter(body.clone())];
        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Enter(t) => self.enter(t, &mut frames),
                Frame::Rebuild(node) => {
                    let out = match node.kind() {
                        TermKind::App { func, arg } => {
                            let f = self.result(&func);
                            let a = self.result(&arg);
                            if f.is_none() && a.is_none() {
                                None
                            } else {
                                Some(Term::app(f.unwrap_or(func), a.unwrap_or(arg)))
                            }
                        }
                        TermKind::Abs { param, body } => {
                            self.result(&body).map(|b| Term::abs(param, b))
                        }
                        TermKind::Var { .. } => None,
                    };
                    self.memo.insert(node.node_id(), (node, out));
                }
                Frame::Rename {
                    node,
                    fresh,
                    renamed,
                } => {
                    let inner = self.result(&renamed).unwrap_or(renamed);
                    let out = Some(Term::abs(fresh, inner));
                    self.memo.insert(node.node_id(), (node, out));
                }
            }
        }
        self.result(body).unwrap_or_else(|| body.clone())
    }

    fn enter(&mut self, t: Term, frames: &mut Vec<Frame>) {
        let node = t.resolve();
        if self.memo.contains_key(&node.node_id()) {
            return;
        }
        match node.kind() {
            TermKind::Var { name } => {
                let out = (name == self.var).then(|| self.arg.clone());
                self.memo.insert(node.node_id(), (node, out));
            }
            TermKind::App { func, arg } => {
                frames.push(Frame::Rebuild(node));
                frames.push(Frame::Enter(arg));
                frames.push(Frame::Enter(func));
            }
            TermKind::Abs { param, body } => {
                if param == self.var {
                    self.memo.insert(node.node_id(), (node, None));
                } else if self.arg_fv.contains(&param) && body.occurs_free(self.var) {
                    let mut avoid = body.free_vars();
                    avoid.extend(self.arg_fv.iter().cloned());
                    avoid.insert(self.var.to_string());
                    let fresh = fresh_name(&param, &avoid);
                    let renamed = substitute(&body, &param, &Term::var(fresh.clone()));
                    frames.push(Frame::Rename {
                        node,
                        fresh,
                        renamed: renamed.clone(),
                    });
                    frames.push(Frame::Enter(renamed));
                } else {
                    frames.push(Frame::Rebuild(node));
                    frames.push(Frame::Enter(body));
                }
            }
        }
    }

    fn result(&self, t: &Term) -> Option<Term> {
        self.memo
            .get(&t.resolve().node_id())
            .and_then(|(_, out)| out.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 捕獲が起きる束縛子だけが付け替えられる。
    fn renames_capturing_binder() {
        let body = Term::abs("y", Term::var("x"));
        let out = substitute(&body, "x", &Term::var("y"));
        assert_eq!(out.to_string(), "\\y'. y");
    }

    #[test]
    /// 付け替え先の名前が既に使われていればさらに `'` を足す。
    fn fresh_name_skips_used_names() {
        // \y. x y'  に x := y
        let body = Term::abs("y", Term::app(Term::var("x"), Term::var("y'")));
        let out = substitute(&body, "x", &Term::var("y"));
        assert_eq!(out.to_string(), "\\y''. y y'");
    }

    #[test]
    /// 変数が出現しない部分はノードをそのまま共有する。
    fn unchanged_subterms_are_shared() {
        let untouched = Term::app(Term::var("a"), Term::var("b"));
        let body = Term::app(untouched.clone(), Term::var("x"));
        let out = substitute(&body, "x", &Term::var("c"));
        match out.kind() {
            TermKind::App { func, .. } => assert!(func.ptr_eq(&untouched)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    /// 同名の束縛子で遮蔽された出現は置き換えない。
    fn shadowed_occurrences_are_kept() {
        let body = Term::abs("x", Term::var("x"));
        let out = substitute(&body, "x", &Term::var("z"));
        assert!(out.ptr_eq(&body));
    }
}
