// パス: src/reducer.rs
// 役割: 正規順序のグラフ簡約（β 簡約とグローバル名の展開）
// 意図: 共有ノードを書き換えて結果を全ての親に見せ、同じ仕事を二度しない
// 関連ファイル: src/term.rs, src/subst.rs, src/definitions.rs, tests/reducer.rs
//! 簡約器
//!
//! - 最左最外（正規順序）。捨てられる引数は評価しない。
//! - 1 ステップは「β 簡約 1 回」または「グローバル名の展開 1 回」。
//! - 簡約結果で元の適用ノードを書き換えて共有させる（結果が他からも参照されていれば転送）。
//! - 定義は 1 回の簡約ごとに複製してから展開するので、環境に保存された項は変わらない。
//!   自分を名前で参照しない定義は、その簡約の中で 1 つの複製を全参照が共有する。
//! - 大域の名前と同じ束縛子は、本体へ入る前に新しい名前へ付け替える。
//! - 上限に達した・割り込まれた場合も、その時点の項を `Reduction` として返す。
//!
//! 1 回の要求ごとに `Reducer` を作って消費する（終了状態から再開しない）。

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::definitions::Definitions;
use crate::errors::ReduceError;
use crate::subst::substitute;
use crate::term::{Term, TermKind};

/// ステップ間に問い合わせる外部からの停止要求。
pub trait Interrupt {
    fn interrupted(&self) -> bool;
}

impl Interrupt for AtomicBool {
    fn interrupted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// 決して割り込まない。
pub struct NeverInterrupt;

impl Interrupt for NeverInterrupt {
    fn interrupted(&self) -> bool {
        false
    }
}

static NEVER: NeverInterrupt = NeverInterrupt;

/// 定義にない自由変数の扱い。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeVariables {
    /// 記号定数として残す。
    #[default]
    Symbolic,
    /// `UnboundVariable` で失敗する。
    Reject,
}

/// 簡約の終了状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Normal,
    StepLimitExceeded,
    Interrupted,
}

impl Status {
    pub fn code(self) -> Option<&'static str> {
        match self {
            Status::Normal => None,
            Status::StepLimitExceeded => Some("EVAL100"),
            Status::Interrupted => Some("EVAL101"),
        }
    }
}

/// 簡約結果。`status` が `Normal` 以外なら `term` は途中経過。
#[derive(Clone, Debug)]
pub struct Reduction {
    pub term: Term,
    pub steps: usize,
    pub status: Status,
}

enum Halt {
    Limit,
    Interrupted,
    Failed(ReduceError),
}

impl From<ReduceError> for Halt {
    fn from(e: ReduceError) -> Self {
        Halt::Failed(e)
    }
}

/// ラムダ束縛名の永続リスト。グローバル名の展開を抑止する判定に使う。
#[derive(Clone, Default)]
struct Scope(Option<Rc<Binder>>);

struct Binder {
    name: String,
    next: Scope,
}

// 深く入れ子になった束縛の列を再帰せずに解放する。
impl Drop for Binder {
    fn drop(&mut self) {
        let mut next = self.next.0.take();
        while let Some(rc) = next {
            next = match Rc::try_unwrap(rc) {
                Ok(mut binder) => binder.next.0.take(),
                Err(_) => None,
            };
        }
    }
}

impl Scope {
    fn bind(&self, name: &str) -> Scope {
        Scope(Some(Rc::new(Binder {
            name: name.to_string(),
            next: self.clone(),
        })))
    }

    fn binds(&self, name: &str) -> bool {
        let mut cur = &self.0;
        while let Some(b) = cur {
            if b.name == name {
                return true;
            }
            cur = &b.next.0;
        }
        false
    }
}

enum Task {
    Visit(Term, Scope),
    Seal(Term),
}

type Observer<'a> = &'a mut (dyn FnMut(usize, &Term) + 'a);

pub struct Reducer<'a> {
    defs: &'a Definitions,
    max_steps: usize,
    free_variables: FreeVariables,
    interrupt: &'a dyn Interrupt,
    observer: Option<Observer<'a>>,
    root: Option<Term>,
    steps: usize,
    /// この簡約で作った定義の複製（再帰しない定義のみ）。
    instances: HashMap<String, Term>,
}

impl<'a> Reducer<'a> {
    pub fn new(defs: &'a Definitions, max_steps: usize) -> Self {
        Self {
            defs,
            max_steps,
            free_variables: FreeVariables::Symbolic,
            interrupt: &NEVER,
            observer: None,
            root: None,
            steps: 0,
            instances: HashMap::new(),
        }
    }

    pub fn free_variables(mut self, policy: FreeVariables) -> Self {
        self.free_variables = policy;
        self
    }

    pub fn interrupt(mut self, flag: &'a dyn Interrupt) -> Self {
        self.interrupt = flag;
        self
    }

    /// 各ステップの直後に (ステップ数, 全体の項) を受け取る。
    pub fn observe(mut self, observer: Observer<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// β 正規形まで簡約する。
    pub fn normalize(self, term: &Term) -> Result<Reduction, ReduceError> {
        self.run(term, &[], true)
    }

    /// `binders` を束縛済みの名前として扱いながら正規形まで簡約する。
    /// 大域の名前と重なる束縛名は簡約の間だけ別名に置き換える。
    pub fn normalize_under(self, term: &Term, binders: &[String]) -> Result<Reduction, ReduceError> {
        let mut avoid: BTreeSet<String> = term.free_vars();
        avoid.extend(binders.iter().cloned());
        let mut term = term.clone();
        let mut names = Vec::with_capacity(binders.len());
        let mut renamed = Vec::new();
        for b in binders {
            if !self.defs.shadows_global(b) {
                names.push(b.clone());
                continue;
            }
            let fresh = self.defs.fresh_binder(b, &avoid);
            avoid.insert(fresh.clone());
            term = substitute(&term, b, &Term::var(fresh.clone()));
            names.push(fresh.clone());
            renamed.push((b.clone(), fresh));
        }
        let mut reduction = self.run(&term, &names, true)?;
        for (b, fresh) in renamed.iter().rev() {
            reduction.term = substitute(&reduction.term, fresh, &Term::var(b.clone()));
        }
        Ok(reduction)
    }

    /// 弱頭部正規形まで簡約する。
    pub fn whnf(self, term: &Term) -> Result<Reduction, ReduceError> {
        self.run(term, &[], false)
    }

    fn run(mut self, term: &Term, binders: &[String], full: bool) -> Result<Reduction, ReduceError> {
        self.root = Some(term.clone());
        let scope = binders
            .iter()
            .fold(Scope::default(), |scope, b| scope.bind(b));
        let outcome = if full {
            self.full(term, scope)
        } else {
            self.head(term, &scope)
        };
        let status = match outcome {
            Ok(()) => Status::Normal,
            Err(Halt::Limit) => Status::StepLimitExceeded,
            Err(Halt::Interrupted) => Status::Interrupted,
            Err(Halt::Failed(e)) => {
                debug!(steps = self.steps, error = %e, "reduction failed");
                return Err(e);
            }
        };
        debug!(steps = self.steps, ?status, "reduction finished");
        Ok(Reduction {
            term: term.resolve(),
            steps: self.steps,
            status,
        })
    }

    fn tick(&mut self) -> Result<(), Halt> {
        if self.interrupt.interrupted() {
            return Err(Halt::Interrupted);
        }
        if self.steps >= self.max_steps {
            return Err(Halt::Limit);
        }
        self.steps += 1;
        Ok(())
    }

    /// `node` を `target` への転送に書き換える。
    fn rewrite(&mut self, node: &Term, target: Term) -> Result<(), Halt> {
        if target.resolve().ptr_eq(node) {
            return Err(Halt::Failed(ReduceError::InternalInvariantViolation {
                detail: format!("rewriting `{}` would make it refer to itself", node),
            }));
        }
        node.forward_to(target);
        if let (Some(observer), Some(root)) = (self.observer.as_mut(), self.root.as_ref()) {
            observer(self.steps, root);
        }
        Ok(())
    }

    /// 名前 `name` の展開先と、それが既存の複製の再利用かどうか。
    fn unfold_target(&mut self, name: &str, at: &Term) -> Option<(Term, bool)> {
        if let Some(shared) = self.instances.get(name) {
            // 評価中の複製そのものに戻ってきた場合は新しく複製する
            if !shared.resolve().ptr_eq(at) {
                return Some((shared.clone(), true));
            }
        }
        let fresh = self.defs.instantiate(name)?;
        if !self.defs.is_recursive(name) {
            self.instances.insert(name.to_string(), fresh.clone());
        }
        Some((fresh, false))
    }

    /// 大域の名前を捕獲しうる束縛子を付け替え、(束縛名, 本体) を返す。
    fn hygienic_binder(&self, abs: &Term, param: String, body: Term) -> (String, Term) {
        if !self.defs.shadows_global(&param) {
            return (param, body);
        }
        let fresh = self.defs.fresh_binder(&param, &body.free_vars());
        let renamed = substitute(&body, &param, &Term::var(fresh.clone()));
        abs.forward_to(Term::abs(fresh.clone(), renamed.clone()));
        (fresh, renamed)
    }

    /// 背骨をたどって頭部の redex を潰し、弱頭部正規形にする。
    fn head(&mut self, term: &Term, scope: &Scope) -> Result<(), Halt> {
        let mut spine: Vec<Term> = Vec::new();
        let mut cur = term.resolve();
        loop {
            if spine.is_empty() && cur.is_normal() {
                return Ok(());
            }
            match cur.kind() {
                TermKind::App { func, .. } => {
                    spine.push(cur);
                    cur = func.resolve();
                }
                TermKind::Abs { param, body } => {
                    let Some(app) = spine.pop() else {
                        return Ok(());
                    };
                    let TermKind::App { arg, .. } = app.kind() else {
                        return Err(Halt::Failed(ReduceError::InternalInvariantViolation {
                            detail: "spine entry is not an application".into(),
                        }));
                    };
                    self.tick()?;
                    let reduct = substitute(&body, &param, &arg);
                    self.rewrite(&app, reduct)?;
                    settle(&spine, term);
                    cur = app.resolve();
                }
                TermKind::Var { name } => {
                    if scope.binds(&name) {
                        return Ok(());
                    }
                    let Some((definition, reused)) = self.unfold_target(&name, &cur) else {
                        return match self.free_variables {
                            FreeVariables::Symbolic => Ok(()),
                            FreeVariables::Reject => {
                                Err(ReduceError::UnboundVariable { name }.into())
                            }
                        };
                    };
                    if reused {
                        // 同じ簡約の中で作った複製を指すだけなので 1 ステップに数えない
                        trace!(name = %name, "share");
                        cur.forward_to(definition);
                    } else {
                        self.tick()?;
                        trace!(name = %name, steps = self.steps, "unfold");
                        self.rewrite(&cur, definition)?;
                    }
                    settle(&spine, term);
                    cur = cur.resolve();
                }
            }
        }
    }

    /// 正規順序で項全体を正規化する。明示的なスタックで深い項にも耐える。
    fn full(&mut self, term: &Term, scope: Scope) -> Result<(), Halt> {
        let mut tasks = vec![Task::Visit(term.clone(), scope)];
        while let Some(task) = tasks.pop() {
            let (node, scope) = match task {
                Task::Seal(node) => {
                    node.resolve().mark_normal();
                    continue;
                }
                Task::Visit(node, scope) => (node, scope),
            };
            if node.resolve().is_normal() {
                continue;
            }
            self.head(&node, &scope)?;
            let whnf = node.resolve();
            match whnf.kind() {
                TermKind::Var { .. } => whnf.mark_normal(),
                TermKind::Abs { param, body } => {
                    let (param, body) = self.hygienic_binder(&whnf, param, body);
                    tasks.push(Task::Seal(whnf));
                    tasks.push(Task::Visit(body, scope.bind(&param)));
                }
                TermKind::App { .. } => {
                    // 頭部は動かない変数。引数を左から順に正規化する。
                    let mut args = Vec::new();
                    let mut cur = whnf;
                    while let TermKind::App { func, arg } = cur.kind() {
                        tasks.push(Task::Seal(cur));
                        args.push(arg);
                        cur = func.resolve();
                    }
                    for arg in args {
                        tasks.push(Task::Visit(arg, scope.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// 書き換えた位置へ親から届く転送を縮める。背骨が空なら簡約対象の根から。
fn settle(spine: &[Term], term: &Term) {
    match spine.last() {
        Some(parent) => {
            if let TermKind::App { func, .. } = parent.kind() {
                func.resolve();
            }
        }
        None => {
            term.resolve();
        }
    }
}

/// 既定の設定で正規形まで簡約する。
pub fn normalize(defs: &Definitions, term: &Term, max_steps: usize) -> Result<Reduction, ReduceError> {
    Reducer::new(defs, max_steps).normalize(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn reduce(defs: &Definitions, src: &str, max: usize) -> Reduction {
        normalize(defs, &parse_expr(src).expect("parse"), max).expect("reduce")
    }

    #[test]
    /// k ステップで止まり、途中の項を返す。
    fn step_limit_returns_partial_term() {
        let defs = Definitions::new();
        let done = reduce(&defs, "(\\x. x) ((\\y. y) z)", 2);
        assert_eq!(done.status, Status::Normal);
        assert_eq!(done.steps, 2);
        assert_eq!(done.term.to_string(), "z");
        let partial = reduce(&defs, "(\\x. x) ((\\y. y) z)", 1);
        assert_eq!(partial.status, Status::StepLimitExceeded);
        assert_eq!(partial.steps, 1);
        assert_eq!(partial.term.to_string(), "(\\y. y) z");
    }

    #[test]
    /// 共有された引数は一度だけ簡約される。
    fn shared_argument_is_reduced_once() {
        let defs = Definitions::new();
        let twice = reduce(&defs, "(\\x. \\f. f x x) ((\\y. y) ((\\z. z) w))", 100);
        let once = reduce(&defs, "(\\x. \\f. f x) ((\\y. y) ((\\z. z) w))", 100);
        assert_eq!(twice.term.to_string(), "\\f. f w w");
        assert_eq!(twice.steps, once.steps);
        assert_eq!(once.steps, 3);
    }

    #[test]
    /// 割り込みフラグが立っていれば最初のステップ前に止まる。
    fn interrupt_is_polled_between_steps() {
        let defs = Definitions::new();
        let flag = AtomicBool::new(true);
        let term = parse_expr("(\\x. x) y").expect("parse");
        let r = Reducer::new(&defs, 10)
            .interrupt(&flag)
            .normalize(&term)
            .expect("reduce");
        assert_eq!(r.status, Status::Interrupted);
        assert_eq!(r.steps, 0);
        assert_eq!(r.term.to_string(), "(\\x. x) y");
    }

    #[test]
    /// 厳格モードでは未定義の自由変数で失敗する。
    fn strict_mode_rejects_unknown_names() {
        let defs = Definitions::new();
        let term = parse_expr("\\x. x y").expect("parse");
        let err = Reducer::new(&defs, 10)
            .free_variables(FreeVariables::Reject)
            .normalize(&term)
            .expect_err("unbound");
        assert_eq!(
            err,
            ReduceError::UnboundVariable {
                name: "y".to_string()
            }
        );
    }

    #[test]
    /// 観測者は各ステップ後の全体の項を受け取る。
    fn observer_sees_each_step() {
        let defs = Definitions::new();
        let term = parse_expr("(\\x. x) ((\\y. y) z)").expect("parse");
        let mut seen = Vec::new();
        let mut record = |n: usize, t: &Term| seen.push(format!("{n}: {t}"));
        let r = Reducer::new(&defs, 10)
            .observe(&mut record)
            .normalize(&term)
            .expect("reduce");
        assert_eq!(r.status, Status::Normal);
        assert_eq!(seen, vec!["1: (\\y. y) z", "2: z"]);
    }
}
