// パス: src/typesys.rs
// 役割: 型表現・置換・型環境・単一化・一般化/インスタンス化・型表示
// 意図: 推論器（infer.rs）が項の形に依存せず使える型の基礎操作をまとめる
// 関連ファイル: src/infer.rs, src/definitions.rs, tests/infer.rs
//! 型システム（typesys）
//!
//! - 型は型変数・基底型・関数型の 3 種類。
//! - 置換は型変数番号から型への写像で、`compose` により合成する。
//! - 単一化はオカーズチェック付きで、失敗は `UnifyError` として型のまま返す。
//!   文字列化は呼び出し側（infer.rs）が変数名を揃えて行う。

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// 型変数を一意に識別するための構造体。
pub struct TVar {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// 型コンストラクタの名前を表す構造体。
pub struct TCon {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// 関数型の引数と戻り値を保持する構造体。
pub struct TFun {
    pub arg: Box<Type>,
    pub ret: Box<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    TVar(TVar),
    TCon(TCon),
    TFun(TFun),
}

impl Type {
    pub fn var(id: i64) -> Self {
        Type::TVar(TVar { id })
    }

    pub fn con(name: impl Into<String>) -> Self {
        Type::TCon(TCon { name: name.into() })
    }

    pub fn fun(arg: Type, ret: Type) -> Self {
        Type::TFun(TFun {
            arg: Box::new(arg),
            ret: Box::new(ret),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// 全称型変数を含む型スキーム。
pub struct Scheme {
    pub vars: Vec<TVar>,
    pub ty: Type,
}

impl Scheme {
    /// 量化変数を持たないスキーム。
    pub fn mono(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            ty,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty_type(&self.ty))
    }
}

// 置換
pub type Subst = HashMap<i64, Type>;

/// 型に含まれる自由型変数集合を求める。
pub fn ftv(t: &Type) -> BTreeSet<i64> {
    let mut out = BTreeSet::new();
    collect_ftv(t, &mut out);
    out
}

fn collect_ftv(t: &Type, out: &mut BTreeSet<i64>) {
    match t {
        Type::TVar(TVar { id }) => {
            out.insert(*id);
        }
        Type::TCon(_) => {}
        Type::TFun(TFun { arg, ret }) => {
            collect_ftv(arg, out);
            collect_ftv(ret, out);
        }
    }
}

fn occurs(id: i64, t: &Type) -> bool {
    match t {
        Type::TVar(TVar { id: other }) => *other == id,
        Type::TCon(_) => false,
        Type::TFun(TFun { arg, ret }) => occurs(id, arg) || occurs(id, ret),
    }
}

/// 型に置換を適用する。
pub fn apply_subst_t(s: &Subst, t: &Type) -> Type {
    match t {
        Type::TVar(TVar { id }) => s.get(id).cloned().unwrap_or_else(|| t.clone()),
        Type::TCon(_) => t.clone(),
        Type::TFun(TFun { arg, ret }) => Type::fun(apply_subst_t(s, arg), apply_subst_t(s, ret)),
    }
}

/// スキームに置換を適用する（量化変数は置換しない）。
pub fn apply_subst_s(s: &Subst, sc: &Scheme) -> Scheme {
    if sc.vars.is_empty() {
        return Scheme::mono(apply_subst_t(s, &sc.ty));
    }
    let mut s2 = s.clone();
    for tv in &sc.vars {
        s2.remove(&tv.id);
    }
    Scheme {
        vars: sc.vars.clone(),
        ty: apply_subst_t(&s2, &sc.ty),
    }
}

/// 2つの置換を合成する。
pub fn compose(a: &Subst, b: &Subst) -> Subst {
    // a ∘ b（先に b を適用してから a）
    let mut out: Subst = b.iter().map(|(k, v)| (*k, apply_subst_t(a, v))).collect();
    for (k, v) in a {
        out.entry(*k).or_insert_with(|| v.clone());
    }
    out
}

#[derive(Clone, Debug, Default)]
/// 推論中の仮定集合。
///
/// `locals` はラムダ束縛と未定義の自由識別子、`recursive` は推論途中の
/// グローバル定義（自分自身の本体の中では単相）を保持する。
pub struct TypeEnv {
    pub locals: HashMap<String, Scheme>,
    pub recursive: HashMap<String, Scheme>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// 名前と型スキームを局所環境へ追加した新しい環境を返す。
    pub fn extended(&self, name: impl Into<String>, sch: Scheme) -> Self {
        let mut next = self.clone();
        next.locals.insert(name.into(), sch);
        next
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Scheme> {
        self.locals.get(name)
    }

    pub fn lookup_recursive(&self, name: &str) -> Option<&Scheme> {
        self.recursive.get(name)
    }

    /// 局所束縛を除き、推論途中の定義だけを残した環境。
    pub fn recursive_only(&self) -> Self {
        Self {
            locals: HashMap::new(),
            recursive: self.recursive.clone(),
        }
    }

    pub fn apply(&self, s: &Subst) -> Self {
        Self {
            locals: self
                .locals
                .iter()
                .map(|(k, v)| (k.clone(), apply_subst_s(s, v)))
                .collect(),
            recursive: self
                .recursive
                .iter()
                .map(|(k, v)| (k.clone(), apply_subst_s(s, v)))
                .collect(),
        }
    }

    fn ftv(&self) -> BTreeSet<i64> {
        let mut out = BTreeSet::new();
        for sch in self.locals.values().chain(self.recursive.values()) {
            let mut vars = ftv(&sch.ty);
            for tv in &sch.vars {
                vars.remove(&tv.id);
            }
            out.extend(vars);
        }
        out
    }
}

#[derive(Clone, Debug, Default)]
/// 新しい型変数番号を供給する構造体。
pub struct TVarSupply {
    next: i64,
}

impl TVarSupply {
    pub fn new() -> Self {
        Self { next: 0 }
    }
    /// 未使用の型変数を生成する。
    pub fn fresh(&mut self) -> TVar {
        let id = self.next;
        self.next += 1;
        TVar { id }
    }
    pub fn fresh_type(&mut self) -> Type {
        Type::TVar(self.fresh())
    }
}

/// 環境外の型変数を量化してスキームを作る。
pub fn generalize(env: &TypeEnv, ty: Type) -> Scheme {
    let env_vars = env.ftv();
    let vars: Vec<TVar> = ftv(&ty)
        .difference(&env_vars)
        .map(|id| TVar { id: *id })
        .collect();
    Scheme { vars, ty }
}

/// スキームの束縛変数を新しい型変数で置き換える。
pub fn instantiate(sc: &Scheme, supply: &mut TVarSupply) -> Type {
    if sc.vars.is_empty() {
        return sc.ty.clone();
    }
    let sub: Subst = sc
        .vars
        .iter()
        .map(|tv| (tv.id, supply.fresh_type()))
        .collect();
    apply_subst_t(&sub, &sc.ty)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// 単一化が失敗したときの情報。
pub enum UnifyError {
    /// 構成子が一致しない（期待, 実際）。
    Mismatch(Type, Type),
    /// 型変数が束縛先の型に出現する。
    Occurs(TVar, Type),
}

/// 2 つの型を等しくする最汎の置換を求める。
pub fn unify(t1: &Type, t2: &Type) -> Result<Subst, UnifyError> {
    match (t1, t2) {
        (Type::TVar(tv), t) | (t, Type::TVar(tv)) => bind(*tv, t),
        (Type::TCon(a), Type::TCon(b)) if a.name == b.name => Ok(Subst::new()),
        (Type::TFun(a), Type::TFun(b)) => {
            let s1 = unify(&a.arg, &b.arg)?;
            let s2 = unify(&apply_subst_t(&s1, &a.ret), &apply_subst_t(&s1, &b.ret))?;
            Ok(compose(&s2, &s1))
        }
        (x, y) => Err(UnifyError::Mismatch(x.clone(), y.clone())),
    }
}

/// 型変数と型を結び付けて置換とする。
pub fn bind(tv: TVar, t: &Type) -> Result<Subst, UnifyError> {
    if let Type::TVar(other) = t {
        if *other == tv {
            return Ok(Subst::new());
        }
    }
    if occurs(tv.id, t) {
        return Err(UnifyError::Occurs(tv, t.clone()));
    }
    Ok(Subst::from([(tv.id, t.clone())]))
}

/// 型変数の表示名（a..z, a1..z1, ...）。
fn var_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    match index / 26 {
        0 => letter.to_string(),
        n => format!("{}{}", letter, n),
    }
}

fn pp_type(t: &Type, names: &mut HashMap<i64, String>, out: &mut String) {
    match t {
        Type::TVar(TVar { id }) => {
            let next = names.len();
            let name = names.entry(*id).or_insert_with(|| var_name(next));
            out.push_str(name);
        }
        Type::TCon(TCon { name }) => out.push_str(name),
        Type::TFun(TFun { arg, ret }) => {
            if matches!(**arg, Type::TFun(_)) {
                out.push('(');
                pp_type(arg, names, out);
                out.push(')');
            } else {
                pp_type(arg, names, out);
            }
            out.push_str(" -> ");
            pp_type(ret, names, out);
        }
    }
}

/// 型変数を出現順に a, b, c… と名付けて表示する。
pub fn pretty_type(t: &Type) -> String {
    let mut names = HashMap::new();
    let mut out = String::new();
    pp_type(t, &mut names, &mut out);
    out
}

/// 2 つの型を同じ変数名割当で表示する（エラー報告用）。
pub fn pretty_pair(a: &Type, b: &Type) -> (String, String) {
    let mut names = HashMap::new();
    let mut left = String::new();
    let mut right = String::new();
    pp_type(a, &mut names, &mut left);
    pp_type(b, &mut names, &mut right);
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: i64) -> Type {
        Type::var(id)
    }

    #[test]
    /// 関数型の単一化は引数・戻り値を順に解く。
    fn unify_arrows() {
        let s = unify(&Type::fun(v(0), v(1)), &Type::fun(v(2), Type::con("Nat")))
            .expect("unify");
        assert_eq!(apply_subst_t(&s, &v(1)), Type::con("Nat"));
        assert_eq!(apply_subst_t(&s, &v(0)), apply_subst_t(&s, &v(2)));
    }

    #[test]
    /// オカーズチェックと構成子不一致。
    fn unify_failures() {
        assert!(matches!(
            unify(&v(0), &Type::fun(v(0), v(1))),
            Err(UnifyError::Occurs(TVar { id: 0 }, _))
        ));
        assert!(matches!(
            unify(&Type::con("Nat"), &Type::fun(v(0), v(1))),
            Err(UnifyError::Mismatch(_, _))
        ));
    }

    #[test]
    /// 環境に自由な変数は量化されない。
    fn generalize_respects_environment() {
        let env = TypeEnv::new().extended("x", Scheme::mono(v(0)));
        let sch = generalize(&env, Type::fun(v(0), v(1)));
        assert_eq!(sch.vars, vec![TVar { id: 1 }]);
        let mut supply = TVarSupply::new();
        supply.fresh();
        supply.fresh();
        let inst = instantiate(&sch, &mut supply);
        assert_eq!(inst, Type::fun(v(0), v(2)));
    }

    #[test]
    /// 表示は右結合で、引数位置の矢印だけ括弧を付ける。
    fn pretty_printing() {
        let t = Type::fun(Type::fun(v(7), v(3)), Type::fun(v(7), v(3)));
        assert_eq!(pretty_type(&t), "(a -> b) -> a -> b");
        assert_eq!(var_name(27), "b1");
    }
}
