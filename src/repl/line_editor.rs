// パス: src/repl/line_editor.rs
// 役割: rustyline を包んだ行入力と履歴の永続化
// 意図: REPL ループからは `ReadResult` だけが見えるようにする
// 関連ファイル: src/repl/cmd.rs
use std::env;
use std::io;
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

/// 行入力が返す 3 種類の結果を表す列挙体。
pub enum ReadResult {
    Line(String),
    Eof,
    Interrupted,
}

/// 履歴付きの行編集。
pub struct LineEditor {
    inner: DefaultEditor,
    history: Option<PathBuf>,
}

impl LineEditor {
    /// 保存済みの履歴を読み込み、新しいエディタを構築する。
    pub fn new() -> io::Result<Self> {
        let mut inner = DefaultEditor::new().map_err(into_io)?;
        let history = history_path();
        if let Some(path) = &history {
            // 初回起動時はファイルがないので失敗しても続ける
            if let Err(e) = inner.load_history(path) {
                debug!(path = %path.display(), error = %e, "history not loaded");
            }
        }
        Ok(Self { inner, history })
    }

    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        match self.inner.readline(prompt) {
            Ok(line) => Ok(ReadResult::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadResult::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadResult::Eof),
            Err(e) => Err(into_io(e)),
        }
    }

    pub fn add_history(&mut self, entry: &str) {
        if let Err(e) = self.inner.add_history_entry(entry) {
            debug!(error = %e, "history entry dropped");
        }
    }

    /// 現在の履歴内容をファイルへ書き出す。
    pub fn save_history(&mut self) -> io::Result<()> {
        let Some(path) = &self.history else {
            return Ok(());
        };
        self.inner.save_history(path).map_err(into_io)
    }
}

fn into_io(e: ReadlineError) -> io::Error {
    match e {
        ReadlineError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

/// `COMBINATORX_HISTORY_FILE`、なければホームディレクトリの既定ファイル。
fn history_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("COMBINATORX_HISTORY_FILE") {
        return Some(PathBuf::from(path));
    }
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .map(|home| home.join(".combinatorx_history"))
}
