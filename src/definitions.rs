// パス: src/definitions.rs
// 役割: 名前から定義本体（と推論済み型スキームのキャッシュ）への環境
// 意図: 簡約器と推論器が読むだけの共有状態を、書き込み口を `define` に絞って提供する
// 関連ファイル: src/prelude.rs, src/reducer.rs, src/infer.rs, src/session.rs
//! 定義環境
//!
//! - 同名の再定義は後勝ち。以前の定義は名前から辿れなくなる。
//! - 数字だけの名前は、ユーザ定義がなければ Church 数として解決する。
//! - 型スキームは推論時に遅延計算してキャッシュし、`define` のたびに全消去する
//!   （スキームは他の定義へ推移的に依存するため）。
//! - 定義本体に現れる名前の集合と、名前ごとの再帰の有無も同じ規則でキャッシュする。

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::errors::SyntaxError;
use crate::parser::parse_expr;
use crate::prelude::{self, PRELUDE};
use crate::subst::fresh_name;
use crate::term::Term;
use crate::typesys::Scheme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Prelude,
    User,
}

#[derive(Clone, Debug)]
pub struct Entry {
    pub term: Term,
    pub origin: Origin,
}

#[derive(Debug, Default)]
pub struct Definitions {
    entries: HashMap<String, Entry>,
    schemes: RefCell<HashMap<String, Scheme>>,
    free_names: RefCell<Option<BTreeSet<String>>>,
    recursive: RefCell<HashMap<String, bool>>,
}

impl Definitions {
    /// 空の環境（数字名の Church 数だけは常に解決される）。
    pub fn new() -> Self {
        Self::default()
    }

    /// 標準ライブラリを読み込んだ環境。
    pub fn with_prelude() -> Result<Self, SyntaxError> {
        let mut defs = Self::new();
        for (name, src, _) in PRELUDE {
            let term = parse_expr(src)?;
            defs.entries.insert(
                name.to_string(),
                Entry {
                    term,
                    origin: Origin::Prelude,
                },
            );
        }
        debug!(count = defs.entries.len(), "prelude loaded");
        Ok(defs)
    }

    /// 定義を追加または置換する。置き換えた以前の本体を返す。
    pub fn define(&mut self, name: impl Into<String>, term: Term) -> Option<Term> {
        self.schemes.borrow_mut().clear();
        self.free_names.borrow_mut().take();
        self.recursive.borrow_mut().clear();
        self.entries
            .insert(
                name.into(),
                Entry {
                    term,
                    origin: Origin::User,
                },
            )
            .map(|old| old.term)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name) || prelude::numeral_value(name).is_some()
    }

    /// 保存されている本体。数字名は都度生成する。
    pub fn lookup(&self, name: &str) -> Option<Term> {
        match self.entries.get(name) {
            Some(entry) => Some(entry.term.clone()),
            None => prelude::numeral_value(name).map(prelude::church_numeral),
        }
    }

    /// 簡約用の新しい複製。保存された本体そのものは書き換えさせない。
    pub fn instantiate(&self, name: &str) -> Option<Term> {
        match self.entries.get(name) {
            Some(entry) => Some(entry.term.deep_copy()),
            None => prelude::numeral_value(name).map(prelude::church_numeral),
        }
    }

    /// この名前の束縛子の下に定義を展開すると、定義中の自由な名前を捕獲してしまうか。
    /// 定義された名前と、いずれかの定義本体に自由に現れる名前が該当する。
    pub fn shadows_global(&self, name: &str) -> bool {
        if self.contains(name) {
            return true;
        }
        let mut cache = self.free_names.borrow_mut();
        let names = cache.get_or_insert_with(|| {
            self.entries
                .values()
                .flat_map(|e| e.term.free_vars())
                .collect()
        });
        names.contains(name)
    }

    /// `base` から作る、`avoid` にも大域の名前にも当たらない束縛子名。
    pub fn fresh_binder(&self, base: &str, avoid: &BTreeSet<String>) -> String {
        let mut name = fresh_name(base, avoid);
        while avoid.contains(&name) || self.shadows_global(&name) {
            name.push('\'');
        }
        name
    }

    /// 定義が名前を通じて（相互に）自分自身を参照するか。
    pub fn is_recursive(&self, name: &str) -> bool {
        if let Some(known) = self.recursive.borrow().get(name) {
            return *known;
        }
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<String> = match self.entries.get(name) {
            Some(entry) => entry.term.free_vars().into_iter().collect(),
            None => Vec::new(),
        };
        let mut found = false;
        while let Some(next) = stack.pop() {
            if next == name {
                found = true;
                break;
            }
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(entry) = self.entries.get(&next) {
                stack.extend(entry.term.free_vars());
            }
        }
        self.recursive.borrow_mut().insert(name.to_string(), found);
        found
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// 名前の昇順に並べた定義一覧。
    pub fn entries(&self) -> Vec<(&str, &Entry)> {
        let mut out: Vec<(&str, &Entry)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cached_scheme(&self, name: &str) -> Option<Scheme> {
        self.schemes.borrow().get(name).cloned()
    }

    pub fn cache_scheme(&self, name: &str, scheme: Scheme) {
        self.schemes.borrow_mut().insert(name.to_string(), scheme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesys::Type;

    #[test]
    /// 再定義は後勝ちで、スキームのキャッシュも消える。
    fn redefinition_replaces_and_clears_cache() {
        let mut defs = Definitions::new();
        assert!(defs.define("ID", Term::var("a")).is_none());
        defs.cache_scheme("ID", Scheme::mono(Type::var(0)));
        let old = defs.define("ID", Term::var("b"));
        assert_eq!(old.map(|t| t.to_string()), Some("a".to_string()));
        assert_eq!(defs.lookup("ID").map(|t| t.to_string()), Some("b".into()));
        assert!(defs.cached_scheme("ID").is_none());
    }

    #[test]
    /// 複製は保存本体と別ノード。
    fn instantiate_copies() {
        let defs = Definitions::with_prelude().expect("prelude");
        let a = defs.instantiate("K").expect("K");
        let stored = defs.lookup("K").expect("K");
        assert!(!a.ptr_eq(&stored));
        assert_eq!(a, stored);
        assert!(defs.contains("42"));
        assert_eq!(defs.entry("K").map(|e| e.origin), Some(Origin::Prelude));
    }

    #[test]
    /// 再帰の判定は名前を辿り、Y 経由の再帰は名前の再帰に数えない。
    fn recursion_is_detected_through_names() {
        let mut defs = Definitions::with_prelude().expect("prelude");
        assert!(!defs.is_recursive("FACT"));
        assert!(!defs.is_recursive("42"));
        defs.define("LOOP", Term::app(Term::var("I"), Term::var("LOOP")));
        defs.define("EVEN", Term::var("ODD"));
        defs.define("ODD", Term::var("EVEN"));
        assert!(defs.is_recursive("LOOP"));
        assert!(defs.is_recursive("EVEN"));
        assert!(!defs.is_recursive("I"));
    }

    #[test]
    /// 定義名と定義本体の自由な名前は大域の名前として扱う。
    fn global_names_include_free_names_of_bodies() {
        let mut defs = Definitions::new();
        defs.define("P", Term::app(Term::var("I"), Term::var("z")));
        assert!(defs.shadows_global("P"));
        assert!(defs.shadows_global("z"));
        assert!(defs.shadows_global("7"));
        assert!(!defs.shadows_global("q"));
        let avoid = BTreeSet::from(["z'".to_string()]);
        assert_eq!(defs.fresh_binder("z", &avoid), "z''");
        defs.define("Q", Term::var("w"));
        assert!(defs.shadows_global("w"));
    }
}
