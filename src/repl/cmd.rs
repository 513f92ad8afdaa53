// パス: src/repl/cmd.rs
// 役割: REPL のメインループ（行の読み取り、複数行入力、セッションへの委譲、表示）
// 意図: 入力元と出力先を差し替え可能にしてループ全体をテストできるようにする
// 関連ファイル: src/session.rs, src/repl/printer.rs, src/repl/line_editor.rs
//! CombinatorX REPL の対話ループ。
//! 行の解釈と実行は `Session` に任せ、ここでは入出力と終了判定だけを扱う。

use std::io::{self, Write};

use serde_json::json;

use crate::errors::Error;
use crate::session::{Outcome, Session};

use super::line_editor::{LineEditor, ReadResult};
use super::printer::{render_definitions, render_error, render_outcome};

/// 対話セッションを開始し、`quit` か EOF まで入力を処理し続ける。
///
/// # Examples
/// ```no_run
/// use combinatorx::{config::SessionConfig, session::Session};
/// # fn main() -> Result<(), combinatorx::errors::Error> {
/// let session = Session::new(SessionConfig::default())?;
/// combinatorx::repl::run_repl(session);
/// # Ok(())
/// # }
/// ```
pub fn run_repl(mut session: Session) {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut editor = match LineEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            let _ = writeln!(stderr, "端末を初期化できませんでした: {}", e);
            return;
        }
    };
    if let Err(err) = run_repl_with(&mut editor, &mut session, &mut stdout, &mut stderr) {
        let _ = writeln!(stderr, "REPL 実行中にエラーが発生しました: {}", err);
    }
}

pub(crate) trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
    fn add_history(&mut self, entry: &str);
    fn save_history(&mut self) -> io::Result<()>;
}

impl ReplLineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        LineEditor::add_history(self, entry);
    }

    fn save_history(&mut self) -> io::Result<()> {
        LineEditor::save_history(self)
    }
}

fn run_repl_with<S, W, E>(
    editor: &mut S,
    session: &mut Session,
    out: &mut W,
    err: &mut E,
) -> io::Result<()>
where
    S: ReplLineSource,
    W: Write,
    E: Write,
{
    writeln!(
        out,
        "CombinatorX REPL (Rust) :: help でコマンド一覧 :: quit で終了"
    )?;
    let mut buffer = String::new();

    'repl: loop {
        buffer.clear();
        let mut prompt = "> ";
        let mut first_line = true;
        let input = loop {
            match editor.read_line(prompt) {
                Ok(ReadResult::Line(line)) => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    if needs_more_input(&buffer) {
                        prompt = ".. ";
                        first_line = false;
                        continue;
                    }
                    break join_lines(&buffer);
                }
                Ok(ReadResult::Eof) => {
                    if first_line && buffer.trim().is_empty() {
                        writeln!(out)?;
                        break 'repl;
                    }
                    break join_lines(&buffer);
                }
                Ok(ReadResult::Interrupted) => {
                    continue 'repl;
                }
                Err(e) => {
                    writeln!(err, "入力エラー: {}", e)?;
                    break 'repl;
                }
            }
        };

        if input.is_empty() {
            continue;
        }

        editor.add_history(&input);

        match session.execute(&input) {
            Ok(Outcome::PassThrough { command, .. }) if is_quit(&command) => break,
            Ok(Outcome::PassThrough { command, .. }) if is_listing(&command) => {
                render_definitions(out, session.definitions())?
            }
            Ok(outcome) => render_outcome(out, err, &outcome)?,
            Err(e) => render_error(err, &e)?,
        }
    }

    if let Err(e) = editor.save_history() {
        writeln!(err, "ヒストリーの保存に失敗しました: {}", e)?;
    }

    Ok(())
}

/// `-e` で渡された行を順に実行する。失敗した行の数を返す。
///
/// `json` が真なら 1 行につき 1 つの JSON オブジェクトを書き、エラーも
/// `{"kind": "error", ...}` として標準出力へ出す。
pub fn run_batch<W: Write, E: Write>(
    session: &mut Session,
    lines: &[String],
    json: bool,
    out: &mut W,
    err: &mut E,
) -> io::Result<usize> {
    let mut failures = 0;
    for line in lines {
        let result = session.execute(line);
        if result.is_err() {
            failures += 1;
        }
        if json {
            writeln!(out, "{}", to_json(&result))?;
        }
        match result {
            Ok(Outcome::PassThrough { command, .. }) if is_quit(&command) => break,
            _ if json => {}
            Ok(Outcome::PassThrough { command, .. }) if is_listing(&command) => {
                render_definitions(out, session.definitions())?
            }
            Ok(outcome) => render_outcome(out, err, &outcome)?,
            Err(e) => render_error(err, &e)?,
        }
    }
    Ok(failures)
}

fn to_json(result: &Result<Outcome, Error>) -> String {
    let error = |code: &str, message: String| {
        json!({ "kind": "error", "code": code, "message": message }).to_string()
    };
    match result {
        Ok(outcome) => serde_json::to_string(outcome)
            .unwrap_or_else(|e| error("CMD090", format!("cannot encode result: {}", e))),
        Err(e) => error(e.code(), e.to_string()),
    }
}

fn is_quit(command: &str) -> bool {
    matches!(command, "quit" | "exit")
}

fn is_listing(command: &str) -> bool {
    matches!(command, "lib" | "macros")
}

/// 継続行は空白 1 つでつなぐ（コマンド判定は先頭の単語だけを見る）。
fn join_lines(buffer: &str) -> String {
    buffer
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 開き括弧が閉じていなければ次の行を待つ。`--` 以降はコメント。
fn needs_more_input(src: &str) -> bool {
    let mut depth = 0i32;
    for line in src.lines() {
        let code = match line.find("--") {
            Some(i) => &line[..i],
            None => line,
        };
        for ch in code.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }
    }
    depth > 0
}
