// パス: src/repl/mod.rs
// 役割: REPL モジュールのファサードと再公開
// 意図: 対話ループの入口だけを公開し、入出力の細部は隠す
// 関連ファイル: src/repl/cmd.rs, src/repl/printer.rs, src/bin/combinatorx.rs
//! CombinatorX の対話環境を構成するモジュール群をまとめたファサード。
//!
//! - `cmd`: メインループ
//! - `line_editor`: rustyline による行入力と履歴
//! - `printer`: ユーザー向けの表示ロジック

pub mod cmd;
mod line_editor;
mod printer;

pub use cmd::{run_batch, run_repl};
