// パス: src/lib.rs
// 役割: クレートのルート（モジュールの配線と再公開）
// 意図: 項・簡約・型推論・セッションの各層を外部から使える最小限の API で公開する
// 関連ファイル: src/term.rs, src/reducer.rs, src/infer.rs, src/session.rs
//! CombinatorX (Rust) ルートモジュール
//!
//! 目的:
//! - 型なしラムダ計算とコンビネータ論理の対話的な評価器を提供する。
//! - 簡約は共有を保つグラフ簡約、型は Hindley–Milner 推論で求める。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 定義環境を書き換えるのは `session` の `def` だけ。
//! - 簡約と型推論は互いに独立しており、型の付かない項も評価できる。

pub mod combinator;
pub mod config;
pub mod definitions;
pub mod errors;
pub mod infer;
pub mod lexer;
pub mod parser;
pub mod prelude;
pub mod reducer;
pub mod repl;
pub mod search;
pub mod session;
pub mod subst;
pub mod term;
pub mod typesys;

// 便利な再エクスポート（項・エラー・パーサ・セッションは直接参照可）
pub use crate::config::SessionConfig;
pub use crate::definitions::Definitions;
pub use crate::errors::*;
pub use crate::parser::{parse_definition, parse_equation, parse_expr};
pub use crate::reducer::{normalize, FreeVariables, Reducer, Reduction, Status};
pub use crate::session::{Outcome, Session};
pub use crate::term::{Term, TermKind};
