// パス: src/repl/printer.rs
// 役割: REPL のヘルプ・実行結果・エラーの表示
// 意図: `Outcome` の人間向けの書式を一箇所に集める（`--json` は別経路）
// 関連ファイル: src/repl/cmd.rs, src/session.rs
//! REPL で用いるヘルプメッセージと結果出力を集約したモジュール。
//! 通常の結果は標準出力、警告と打ち切りの注記は標準エラーへ書く。

use std::io::{self, Write};

use crate::definitions::{Definitions, Origin};
use crate::errors::Error;
use crate::prelude;
use crate::reducer::Status;
use crate::session::{EvalMode, Outcome};

pub(crate) const HELP_TEXT: &str = concat!(
    "利用可能なコマンド:\n",
    "  EXPR                      正規形まで評価（上限は set steps）\n",
    "  def NAME [ARGS] = EXPR    定義を追加・置換\n",
    "  type EXPR                 主型を表示\n",
    "  reduce EXPR               正規形とステップ数を表示（上限は set max-steps）\n",
    "  trace EXPR                各ステップの項を表示（上限は set trace）\n",
    "  compile EXPR              ラムダを S K I B C に変換\n",
    "  algo [primitive|eta|turner] 変換アルゴリズムの表示・切替\n",
    "  search ARGS = EXPR using NAMES  基底から条件を満たす項を探索\n",
    "  set [KEY [VALUE]]         設定の表示・変更（steps, max-steps, trace, strict, types, search-size, search-steps）\n",
    "  lib | macros              定義一覧\n",
    "  help                      ヘルプ（本メッセージ）\n",
    "  quit | exit               終了\n",
    "\n",
    "例:\n",
    "  > AND TRUE FALSE          -- \\x y. y\n",
    "  > reduce ADD ONE TWO      -- \\f x. f (f (f x))\n",
    "  > type \\x. x              -- a -> a\n",
    "  > def TWICE f x = f (f x)\n",
);

/// ヘルプメッセージを任意のライターへ描画する。
pub(crate) fn render_help<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HELP_TEXT.as_bytes())
}

/// 実行結果を書き出す。
pub(crate) fn render_outcome<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    outcome: &Outcome,
) -> io::Result<()> {
    match outcome {
        Outcome::Defined { name, warning, .. } => {
            if let Some(w) = warning {
                writeln!(err, "warning: {} is defined but has no type: {}", name, w)?;
            }
            Ok(())
        }
        Outcome::Typed { expr, scheme } => writeln!(out, "{} : {}", expr, scheme),
        Outcome::Reduced {
            term,
            steps,
            status,
            mode,
        } => {
            writeln!(out, "{}", term)?;
            if *mode == EvalMode::Reduce {
                writeln!(out, "-- {} step{}", steps, if *steps == 1 { "" } else { "s" })?;
            }
            render_status(err, *status, *steps)
        }
        Outcome::Trace {
            lines,
            steps,
            status,
        } => {
            for line in lines {
                writeln!(out, "{}", line)?;
            }
            render_status(err, *status, *steps)
        }
        Outcome::Compiled { term, .. } => writeln!(out, "{}", term),
        Outcome::AlgorithmSet { algorithm, .. } => writeln!(out, "algorithm: {}", algorithm),
        Outcome::Searched {
            found,
            tried,
            target_normalized,
        } => match found {
            Some(term) => writeln!(out, "found: {} ({} tried)", term, tried),
            None if !target_normalized => {
                writeln!(err, "search: the target has no normal form within the step limit")
            }
            None => writeln!(out, "not found ({} tried)", tried),
        },
        Outcome::Setting { key, value } => writeln!(out, "{} = {}", key, value),
        Outcome::Settings { settings } => {
            for (key, value) in settings {
                writeln!(out, "{} = {}", key, value)?;
            }
            Ok(())
        }
        Outcome::Help => render_help(out),
        Outcome::PassThrough { command, .. } => writeln!(
            out,
            "`{}` is provided by the visual front end and is not available here",
            command
        ),
        Outcome::Empty => Ok(()),
    }
}

fn render_status<E: Write>(err: &mut E, status: Status, steps: usize) -> io::Result<()> {
    let Some(code) = status.code() else {
        return Ok(());
    };
    let what = match status {
        Status::Interrupted => "interrupted",
        _ => "step limit reached",
    };
    writeln!(
        err,
        "[{}] {} after {} steps; the term above is partially reduced",
        code, what, steps
    )
}

/// エラーを標準エラー向けに書き出す。
pub(crate) fn render_error<E: Write>(err: &mut E, e: &Error) -> io::Result<()> {
    writeln!(err, "{}", e)
}

/// 定義一覧を `NAME = body` 形式で書き出す。標準ライブラリには説明を添える。
pub(crate) fn render_definitions<W: Write>(out: &mut W, defs: &Definitions) -> io::Result<()> {
    for (name, entry) in defs.entries() {
        match (entry.origin, prelude::describe(name)) {
            (Origin::Prelude, Some(desc)) => {
                writeln!(out, "  {} = {}    -- {}", name, entry.term, desc)?
            }
            _ => writeln!(out, "  {} = {}", name, entry.term)?,
        }
    }
    Ok(())
}
