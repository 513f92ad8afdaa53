// パス: src/infer.rs
// 役割: ラムダ項に対する Hindley–Milner 型推論（Algorithm W）
// 意図: 項の主型スキームを算出し、定義環境の名前を多相に使えるようにする
// 関連ファイル: src/typesys.rs, src/definitions.rs, tests/infer.rs
//! 型推論モジュール
//!
//! - 変数: 局所束縛 → 推論途中の定義（単相） → 定義環境（スキームをインスタンス化）の順に引く。
//! - 定義環境の名前は必要になった時点で推論し、外側に推論途中の定義がなければ
//!   スキームを環境にキャッシュする。
//! - 束縛も定義もない識別子は、名前ごとに 1 つの新しい型変数を割り当てる
//!   （厳格モードでは `UnboundVariable`）。
//! - 推論と簡約は独立しており、型の付かない項も簡約はできる。
//! - 数字名の Church 数は本体をたどらず、既知の主型を直接使う。
//! - 推論は項の深さだけ再帰するので、`MAX_DEPTH` を超える項は `TooDeep` で打ち切る。

use tracing::debug;

use crate::definitions::Definitions;
use crate::errors::TypeError;
use crate::prelude;
use crate::reducer::FreeVariables;
use crate::term::{Term, TermKind};
use crate::typesys::*;

impl From<UnifyError> for TypeError {
    fn from(e: UnifyError) -> Self {
        match e {
            UnifyError::Mismatch(expected, found) => {
                let (expected, found) = pretty_pair(&expected, &found);
                TypeError::TypeMismatch { expected, found }
            }
            UnifyError::Occurs(tv, ty) => {
                let (var, ty) = pretty_pair(&Type::TVar(tv), &ty);
                TypeError::InfiniteType { var, ty }
            }
        }
    }
}

/// 推論する項の入れ子の上限。
pub const MAX_DEPTH: usize = 400;

/// 型変数供給源と定義環境を束ねる推論器。
pub struct Inferencer<'a> {
    defs: &'a Definitions,
    supply: TVarSupply,
    free_variables: FreeVariables,
    depth: usize,
}

impl<'a> Inferencer<'a> {
    pub fn new(defs: &'a Definitions, free_variables: FreeVariables) -> Self {
        Self {
            defs,
            supply: TVarSupply::new(),
            free_variables,
            depth: 0,
        }
    }

    /// 項の主型スキーム。
    pub fn infer_term(&mut self, term: &Term) -> Result<Scheme, TypeError> {
        let env = self.open_env(term, TypeEnv::new())?;
        let (s, t) = self.infer(&env, term)?;
        let sch = generalize(&TypeEnv::new(), apply_subst_t(&s, &t));
        debug!(scheme = %sch, "inferred term");
        Ok(sch)
    }

    /// `name = term` を、本体中の `name` を自分自身として推論する。
    pub fn infer_definition(&mut self, name: &str, term: &Term) -> Result<Scheme, TypeError> {
        let (_, sch) = self.infer_binding(name, term, &TypeEnv::new())?;
        debug!(name, scheme = %sch, "inferred definition");
        Ok(sch)
    }

    /// 束縛も定義もない自由識別子に型変数を割り当てた環境を作る。
    fn open_env(&mut self, term: &Term, mut env: TypeEnv) -> Result<TypeEnv, TypeError> {
        for name in term.free_vars() {
            if env.lookup_local(&name).is_some()
                || env.lookup_recursive(&name).is_some()
                || self.defs.contains(&name)
            {
                continue;
            }
            if self.free_variables == FreeVariables::Reject {
                return Err(TypeError::UnboundVariable { name });
            }
            let tv = self.supply.fresh_type();
            env.locals.insert(name, Scheme::mono(tv));
        }
        Ok(env)
    }

    fn infer(&mut self, env: &TypeEnv, term: &Term) -> Result<(Subst, Type), TypeError> {
        if self.depth >= MAX_DEPTH {
            return Err(TypeError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let out = self.infer_kind(env, term);
        self.depth -= 1;
        out
    }

    fn infer_kind(&mut self, env: &TypeEnv, term: &Term) -> Result<(Subst, Type), TypeError> {
        match term.kind() {
            TermKind::Var { name } => self.infer_var(env, &name),
            TermKind::Abs { param, body } => {
                let tv = self.supply.fresh_type();
                let inner = env.extended(param, Scheme::mono(tv.clone()));
                let (s, t_body) = self.infer(&inner, &body)?;
                let ty = Type::fun(apply_subst_t(&s, &tv), t_body);
                Ok((s, ty))
            }
            TermKind::App { func, arg } => {
                let (s1, t_func) = self.infer(env, &func)?;
                let (s2, t_arg) = self.infer(&env.apply(&s1), &arg)?;
                let t_res = self.supply.fresh_type();
                let s3 = unify(
                    &Type::fun(t_arg, t_res.clone()),
                    &apply_subst_t(&s2, &t_func),
                )?;
                let s = compose(&s3, &compose(&s2, &s1));
                Ok((s, apply_subst_t(&s3, &t_res)))
            }
        }
    }

    fn infer_var(&mut self, env: &TypeEnv, name: &str) -> Result<(Subst, Type), TypeError> {
        if let Some(sch) = env.lookup_local(name).or_else(|| env.lookup_recursive(name)) {
            return Ok((Subst::new(), instantiate(sch, &mut self.supply)));
        }
        if self.defs.contains(name) {
            return self.infer_global(env, name);
        }
        // open_env で割り当て済みのはず
        Err(TypeError::UnboundVariable {
            name: name.to_string(),
        })
    }

    fn infer_global(&mut self, env: &TypeEnv, name: &str) -> Result<(Subst, Type), TypeError> {
        if let Some(sch) = self.defs.cached_scheme(name) {
            return Ok((Subst::new(), instantiate(&sch, &mut self.supply)));
        }
        if self.defs.entry(name).is_none() {
            if let Some(n) = prelude::numeral_value(name) {
                return Ok((Subst::new(), self.numeral_type(n)));
            }
        }
        let Some(term) = self.defs.lookup(name) else {
            return Err(TypeError::Internal {
                detail: format!("definition `{}` disappeared during inference", name),
            });
        };
        let (s, sch) = self.infer_binding(name, &term, env)?;
        if env.recursive.is_empty() {
            self.defs.cache_scheme(name, sch.clone());
        }
        Ok((s, instantiate(&sch, &mut self.supply)))
    }

    /// Church 数 `n` の主型。
    fn numeral_type(&mut self, n: usize) -> Type {
        let a = self.supply.fresh_type();
        let b = self.supply.fresh_type();
        match n {
            // a -> b -> b
            0 => Type::fun(a, Type::fun(b.clone(), b)),
            // (a -> b) -> a -> b
            1 => Type::fun(Type::fun(a.clone(), b.clone()), Type::fun(a, b)),
            // (a -> a) -> a -> a
            _ => Type::fun(Type::fun(a.clone(), a.clone()), Type::fun(a.clone(), a)),
        }
    }

    /// 定義本体を推論して一般化する。外側の推論途中の定義に自由な型変数は量化しない。
    fn infer_binding(
        &mut self,
        name: &str,
        term: &Term,
        outer: &TypeEnv,
    ) -> Result<(Subst, Scheme), TypeError> {
        let self_ty = self.supply.fresh_type();
        let mut env = outer.recursive_only();
        env.recursive
            .insert(name.to_string(), Scheme::mono(self_ty.clone()));
        let env = self.open_env(term, env)?;
        let (s1, t) = self.infer(&env, term)?;
        let s2 = unify(&apply_subst_t(&s1, &self_ty), &t)?;
        let s = compose(&s2, &s1);
        let ty = apply_subst_t(&s, &t);
        let sch = generalize(&outer.recursive_only().apply(&s), ty);
        Ok((s, sch))
    }
}

/// 項の主型を `a -> a` 形式の文字列で返す。
pub fn infer_type_str(
    defs: &Definitions,
    term: &Term,
    free_variables: FreeVariables,
) -> Result<String, TypeError> {
    let sch = Inferencer::new(defs, free_variables).infer_term(term)?;
    Ok(sch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn type_of(defs: &Definitions, src: &str) -> Result<String, TypeError> {
        infer_type_str(defs, &parse_expr(src).expect("parse"), FreeVariables::Symbolic)
    }

    #[test]
    /// 自己適用はオカーズチェックで失敗する。
    fn self_application_is_infinite() {
        let defs = Definitions::new();
        assert_eq!(
            type_of(&defs, "\\x. x x"),
            Err(TypeError::InfiniteType {
                var: "a".into(),
                ty: "a -> b".into()
            })
        );
    }

    #[test]
    /// 自由識別子は名前ごとに同じ型変数を共有する。
    fn free_identifiers_share_a_variable() {
        let defs = Definitions::new();
        assert_eq!(type_of(&defs, "\\f. f u u").as_deref(), Ok("(a -> a -> b) -> b"));
    }

    #[test]
    /// 自分自身を参照する定義は本体の中で単相として扱われる。
    fn recursive_definition_is_monomorphic_inside() {
        let defs = Definitions::new();
        let term = parse_expr("\\n. F n").expect("parse");
        let sch = Inferencer::new(&defs, FreeVariables::Reject)
            .infer_definition("F", &term)
            .expect("infer");
        assert_eq!(sch.to_string(), "a -> b");
    }

    #[test]
    /// 数字名は本体をたどらずに Church 数の主型を得る。
    fn numerals_use_their_known_types() {
        let defs = Definitions::new();
        for (src, want) in [
            ("0", "a -> b -> b"),
            ("1", "(a -> b) -> a -> b"),
            ("2", "(a -> a) -> a -> a"),
            ("10000", "(a -> a) -> a -> a"),
        ] {
            assert_eq!(type_of(&defs, src).as_deref(), Ok(want), "{src}");
        }
    }

    #[test]
    /// 深すぎる項は再帰で溢れる前に TooDeep で止まる。
    fn overly_deep_terms_are_refused() {
        let defs = Definitions::new();
        let mut body = Term::var("x");
        for _ in 0..100_000 {
            body = Term::app(Term::var("f"), body);
        }
        let err = Inferencer::new(&defs, FreeVariables::Symbolic)
            .infer_term(&body)
            .expect_err("too deep");
        assert_eq!(err, TypeError::TooDeep { limit: MAX_DEPTH });
        assert_eq!(err.code(), "TYPE003");
    }
}
