// パス: src/errors.rs
// 役割: 構文・型・簡約・コマンドの各エラー型を定義する
// 意図: すべての失敗を `[CODE] メッセージ` 形式で境界まで運ぶ
// 関連ファイル: src/parser/mod.rs, src/infer.rs, src/reducer.rs, src/session.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。
//!
//! - 構文エラーは位置情報を持つ `ErrorInfo` の newtype。
//! - 型・簡約・セッション境界のエラーは `thiserror` の列挙型。
//! - ステップ上限と割り込みはエラーではなく `reducer::Status` で表す。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,      // バイトオフセット（任意）
    pub line: Option<usize>,     // 1-origin（任意）
    pub col: Option<usize>,      // 1-origin（任意）
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
            snippet: None,
        }
    }
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), Some(p)) => write!(
                f,
                "[{}] {} @line={},col={} @pos={}",
                self.code, self.msg, l, c, p
            )?,
            (Some(l), Some(c), None) => {
                write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?
            }
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = " ".repeat(c.saturating_sub(1)) + "^";
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

/// 字句解析・構文解析の失敗。`msg` は「何が期待されていたか」を人間向けに述べる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError(pub ErrorInfo);

impl SyntaxError {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self(ErrorInfo::new(code, msg, pos))
    }
    pub fn at_with_snippet(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
        snippet: impl Into<String>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col).with_snippet(snippet))
    }
    pub fn code(&self) -> &'static str {
        self.0.code
    }
    /// 問題のあったバイト位置。
    pub fn position(&self) -> Option<usize> {
        self.0.pos
    }
    /// 期待されていた内容（例: "expected '.' after lambda parameters"）。
    pub fn expected(&self) -> &str {
        &self.0.msg
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for SyntaxError {}

/// 型推論の失敗。型は表示用に整形済みの文字列で保持する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("[TYPE010] unbound variable: {name}")]
    UnboundVariable { name: String },
    #[error("[TYPE001] type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("[TYPE002] infinite type: {var} occurs in {ty}")]
    InfiniteType { var: String, ty: String },
    #[error("[TYPE003] term is nested more than {limit} levels deep and cannot be typed")]
    TooDeep { limit: usize },
    #[error("[TYPE090] internal invariant violated during inference: {detail}")]
    Internal { detail: String },
}

impl TypeError {
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::UnboundVariable { .. } => "TYPE010",
            TypeError::TypeMismatch { .. } => "TYPE001",
            TypeError::InfiniteType { .. } => "TYPE002",
            TypeError::TooDeep { .. } => "TYPE003",
            TypeError::Internal { .. } => "TYPE090",
        }
    }
}

/// 簡約の失敗。部分結果を返せる停止（上限・割り込み）はここに含めない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("[EVAL010] unbound variable: {name}")]
    UnboundVariable { name: String },
    #[error("[EVAL090] internal invariant violated during reduction: {detail}")]
    InternalInvariantViolation { detail: String },
}

impl ReduceError {
    pub fn code(&self) -> &'static str {
        match self {
            ReduceError::UnboundVariable { .. } => "EVAL010",
            ReduceError::InternalInvariantViolation { .. } => "EVAL090",
        }
    }
}

/// セッション境界で報告されるエラーの総称。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Reduce(#[from] ReduceError),
    #[error("[CMD001] {message}")]
    Command { message: String },
}

impl Error {
    pub fn command(message: impl Into<String>) -> Self {
        Error::Command {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Syntax(e) => e.code(),
            Error::Type(e) => e.code(),
            Error::Reduce(e) => e.code(),
            Error::Command { .. } => "CMD001",
        }
    }
}
