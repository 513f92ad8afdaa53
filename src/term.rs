// パス: src/term.rs
// 役割: 共有可能なラムダ項グラフ（変数・抽象・適用）を定義する
// 意図: 簡約と型推論が共通に読む項表現と、その比較・表示を一箇所にまとめる
// 関連ファイル: src/subst.rs, src/reducer.rs, src/parser/expr.rs
//! 項モデル
//!
//! - `Term` は参照カウント付きノードへのハンドル。複製しても同じノードを指す。
//! - ノードの中身は `TermKind` か、簡約済みの別ノードへの転送（`Forward`）。
//!   転送は簡約器だけが書き込み、共有している全ての親が同じ結果を観測する。
//! - `PartialEq` は α 同値、`ptr_eq` はノード同一性。

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// 項の形。3 種類で閉じている。
#[derive(Clone, Debug)]
pub enum TermKind {
    Var { name: String },
    Abs { param: String, body: Term },
    App { func: Term, arg: Term },
}

enum Slot {
    Ready(TermKind),
    Forward(Term),
}

struct Node {
    slot: RefCell<Slot>,
    normal: Cell<bool>,
}

/// 項グラフのノードへのハンドル。
#[derive(Clone)]
pub struct Term(Rc<Node>);

impl Term {
    fn from_kind(kind: TermKind) -> Self {
        Term(Rc::new(Node {
            slot: RefCell::new(Slot::Ready(kind)),
            normal: Cell::new(false),
        }))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::from_kind(TermKind::Var { name: name.into() })
    }

    pub fn abs(param: impl Into<String>, body: Term) -> Self {
        Self::from_kind(TermKind::Abs {
            param: param.into(),
            body,
        })
    }

    pub fn app(func: Term, arg: Term) -> Self {
        Self::from_kind(TermKind::App { func, arg })
    }

    /// `\p1 p2 ... . body` を入れ子の単一引数抽象に展開する。
    pub fn abs_many<S: AsRef<str>>(params: &[S], body: Term) -> Self {
        params
            .iter()
            .rev()
            .fold(body, |acc, p| Term::abs(p.as_ref(), acc))
    }

    /// `head a1 a2 ...` を左結合の適用に畳み込む。
    pub fn apply_all<I: IntoIterator<Item = Term>>(head: Term, args: I) -> Self {
        args.into_iter().fold(head, Term::app)
    }

    /// 転送を辿って実体ノードを返す。辿った転送は実体へ直接向け直す。
    pub fn resolve(&self) -> Term {
        let mut cur = self.clone();
        let mut visited: Vec<Term> = Vec::new();
        loop {
            let next = match &*cur.0.slot.borrow() {
                Slot::Forward(t) => t.clone(),
                Slot::Ready(_) => break,
            };
            visited.push(cur);
            cur = next;
        }
        // 最後の転送はすでに実体を指している
        visited.pop();
        for node in visited {
            *node.0.slot.borrow_mut() = Slot::Forward(cur.clone());
        }
        cur
    }

    /// 実体ノードの形（子はハンドルの複製なので安価）。
    pub fn kind(&self) -> TermKind {
        let node = self.resolve();
        let slot = node.0.slot.borrow();
        match &*slot {
            Slot::Ready(kind) => kind.clone(),
            Slot::Forward(_) => unreachable!("resolve は転送ノードを返さない"),
        }
    }

    /// 同一ノードかどうか（転送は辿らない）。
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn node_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn is_forwarded(&self) -> bool {
        matches!(&*self.0.slot.borrow(), Slot::Forward(_))
    }

    /// このノードの中身を `target` で置き換える。`target` を他に参照する者がいなければ
    /// 中身をそのまま移し、共有されていれば実体への転送にする。呼び出し側が循環を防ぐ。
    pub(crate) fn forward_to(&self, target: Term) {
        let resolved = target.resolve();
        drop(target);
        let (slot, normal) = match Rc::try_unwrap(resolved.0) {
            Ok(mut node) => {
                let normal = node.normal.get();
                (std::mem::replace(node.slot.get_mut(), Slot::empty()), normal)
            }
            Err(shared) => (Slot::Forward(Term(shared)), false),
        };
        *self.0.slot.borrow_mut() = slot;
        self.0.normal.set(normal);
    }

    pub(crate) fn is_normal(&self) -> bool {
        self.0.normal.get()
    }

    pub(crate) fn mark_normal(&self) {
        self.0.normal.set(true);
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind(), TermKind::Var { .. })
    }

    /// 自由変数の集合。共有部分木は一度だけ調べる。
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut memo: HashMap<usize, (Term, Rc<BTreeSet<String>>)> = HashMap::new();
        let mut stack = vec![(self.resolve(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&node.node_id()) {
                continue;
            }
            let kind = node.kind();
            if !expanded {
                stack.push((node, true));
                match kind {
                    TermKind::Var { .. } => {}
                    TermKind::Abs { body, .. } => stack.push((body.resolve(), false)),
                    TermKind::App { func, arg } => {
                        stack.push((arg.resolve(), false));
                        stack.push((func.resolve(), false));
                    }
                }
                continue;
            }
            let set = match kind {
                TermKind::Var { name } => Rc::new(BTreeSet::from([name])),
                TermKind::Abs { param, body } => {
                    let inner = memo_get(&memo, &body);
                    if inner.contains(&param) {
                        let mut s = (*inner).clone();
                        s.remove(&param);
                        Rc::new(s)
                    } else {
                        inner
                    }
                }
                TermKind::App { func, arg } => {
                    let f = memo_get(&memo, &func);
                    let a = memo_get(&memo, &arg);
                    if a.is_subset(&f) {
                        f
                    } else {
                        Rc::new(f.union(&a).cloned().collect())
                    }
                }
            };
            memo.insert(node.node_id(), (node, set));
        }
        (*memo_get(&memo, self)).clone()
    }

    /// `name` が自由に出現するか。
    pub fn occurs_free(&self, name: &str) -> bool {
        // 一度調べたノードは文脈によらず結果が同じなので再訪しない
        let mut seen: HashMap<usize, Term> = HashMap::new();
        let mut stack = vec![self.resolve()];
        while let Some(node) = stack.pop() {
            if seen.contains_key(&node.node_id()) {
                continue;
            }
            match node.kind() {
                TermKind::Var { name: n } => {
                    if n == name {
                        return true;
                    }
                }
                TermKind::Abs { param, body } => {
                    if param != name {
                        stack.push(body.resolve());
                    }
                }
                TermKind::App { func, arg } => {
                    stack.push(arg.resolve());
                    stack.push(func.resolve());
                }
            }
            seen.insert(node.node_id(), node);
        }
        false
    }

    /// 転送を解消した木構造の複製。共有は複製後も保たれる。
    pub fn deep_copy(&self) -> Term {
        let mut memo: HashMap<usize, (Term, Term)> = HashMap::new();
        let mut stack = vec![(self.resolve(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&node.node_id()) {
                continue;
            }
            let kind = node.kind();
            if !expanded {
                stack.push((node, true));
                match kind {
                    TermKind::Var { .. } => {}
                    TermKind::Abs { body, .. } => stack.push((body.resolve(), false)),
                    TermKind::App { func, arg } => {
                        stack.push((arg.resolve(), false));
                        stack.push((func.resolve(), false));
                    }
                }
                continue;
            }
            let copied = |t: &Term| memo.get(&t.resolve().node_id()).map(|(_, c)| c.clone());
            let copy = match kind {
                TermKind::Var { name } => Some(Term::var(name)),
                TermKind::Abs { param, body } => copied(&body).map(|b| Term::abs(param, b)),
                TermKind::App { func, arg } => match (copied(&func), copied(&arg)) {
                    (Some(f), Some(a)) => Some(Term::app(f, a)),
                    _ => None,
                },
            };
            // 子は必ず先に複製されている
            if let Some(copy) = copy {
                memo.insert(node.node_id(), (node, copy));
            }
        }
        match memo.get(&self.resolve().node_id()) {
            Some((_, copy)) => copy.clone(),
            None => self.resolve(),
        }
    }

    /// 束縛変数の一貫した付け替えを同一視する比較。
    pub fn alpha_eq(&self, other: &Term) -> bool {
        enum Step {
            Compare(Term, Term),
            Unbind,
        }
        let mut left: Vec<String> = Vec::new();
        let mut right: Vec<String> = Vec::new();
        let mut stack = vec![Step::Compare(self.clone(), other.clone())];
        while let Some(step) = stack.pop() {
            let (a, b) = match step {
                Step::Unbind => {
                    left.pop();
                    right.pop();
                    continue;
                }
                Step::Compare(a, b) => (a, b),
            };
            match (a.kind(), b.kind()) {
                (TermKind::Var { name: x }, TermKind::Var { name: y }) => {
                    // 最も内側の束縛位置（de Bruijn 添字）で比較する
                    let ix = left.iter().rposition(|n| *n == x);
                    let iy = right.iter().rposition(|n| *n == y);
                    let same = match (ix, iy) {
                        (Some(i), Some(j)) => left.len() - i == right.len() - j,
                        (None, None) => x == y,
                        _ => false,
                    };
                    if !same {
                        return false;
                    }
                }
                (TermKind::Abs { param: p, body: bp }, TermKind::Abs { param: q, body: bq }) => {
                    left.push(p);
                    right.push(q);
                    stack.push(Step::Unbind);
                    stack.push(Step::Compare(bp, bq));
                }
                (TermKind::App { func: f1, arg: a1 }, TermKind::App { func: f2, arg: a2 }) => {
                    stack.push(Step::Compare(a1, a2));
                    stack.push(Step::Compare(f1, f2));
                }
                _ => return false,
            }
        }
        true
    }

    /// ノード数（共有部分は出現ごとに数える）。
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.clone()];
        while let Some(t) = stack.pop() {
            count += 1;
            match t.kind() {
                TermKind::Var { .. } => {}
                TermKind::Abs { body, .. } => stack.push(body),
                TermKind::App { func, arg } => {
                    stack.push(arg);
                    stack.push(func);
                }
            }
        }
        count
    }
}

fn memo_get(
    memo: &HashMap<usize, (Term, Rc<BTreeSet<String>>)>,
    t: &Term,
) -> Rc<BTreeSet<String>> {
    memo.get(&t.resolve().node_id())
        .map(|(_, set)| set.clone())
        .unwrap_or_default()
}

impl Slot {
    fn empty() -> Self {
        Slot::Ready(TermKind::Var {
            name: String::new(),
        })
    }

    /// 中身を空にし、子へのハンドルを `out` に移す。
    fn detach(&mut self, out: &mut Vec<Term>) {
        match std::mem::replace(self, Slot::empty()) {
            Slot::Forward(t) => out.push(t),
            Slot::Ready(TermKind::Var { .. }) => {}
            Slot::Ready(TermKind::Abs { body, .. }) => out.push(body),
            Slot::Ready(TermKind::App { func, arg }) => {
                out.push(func);
                out.push(arg);
            }
        }
    }
}

// 長い転送列や深い項を再帰せずに解放する。
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.slot.get_mut().detach(&mut pending);
        while let Some(Term(rc)) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(rc) {
                node.slot.get_mut().detach(&mut pending);
            }
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.alpha_eq(other)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term({})", self)
    }
}

/// 表示位置。引数位置では適用と抽象を括弧で囲む。
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Top,
    Func,
    Arg,
}

enum Piece {
    Term(Term, Position),
    Text(&'static str),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Term(self.clone(), Position::Top)];
        while let Some(piece) = stack.pop() {
            let (t, pos) = match piece {
                Piece::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Piece::Term(t, pos) => (t, pos),
            };
            match t.kind() {
                TermKind::Var { name } => f.write_str(&name)?,
                TermKind::Abs { param, body } => {
                    if pos != Position::Top {
                        f.write_str("(")?;
                        stack.push(Piece::Text(")"));
                    }
                    // 連続する抽象は `\x y. e` にまとめる
                    write!(f, "\\{}", param)?;
                    let mut body = body;
                    while let TermKind::Abs {
                        param: next,
                        body: inner,
                    } = body.kind()
                    {
                        write!(f, " {}", next)?;
                        body = inner;
                    }
                    f.write_str(". ")?;
                    stack.push(Piece::Term(body, Position::Top));
                }
                TermKind::App { func, arg } => {
                    if pos == Position::Arg {
                        f.write_str("(")?;
                        stack.push(Piece::Text(")"));
                    }
                    stack.push(Piece::Term(arg, Position::Arg));
                    stack.push(Piece::Text(" "));
                    stack.push(Piece::Term(func, Position::Func));
                }
            }
        }
        Ok(())
    }
}
