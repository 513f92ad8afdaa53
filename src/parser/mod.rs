// パス: src/parser/mod.rs
// 役割: トークン列からラムダ項を生成する再帰下降パーサのエントリポイント
// 意図: 式の解析と定義ヘッダの解析を共通のトークン操作の上に載せる
// 関連ファイル: src/parser/expr.rs, src/parser/definition.rs, src/lexer.rs
//! 構文解析モジュール
//!
//! 文法:
//! ```text
//! expr        := lambda | application
//! lambda      := ('\' | 'λ') ident+ '.' expr
//! application := atom+ lambda?
//! atom        := ident | numeral | '(' expr ')'
//! definition  := ident ident* '=' expr
//! ```
//! - 適用は左結合、ラムダ本体は可能な限り右へ伸びる。
//! - 自由な識別子は名前のまま `Var` として残し、定義環境での解決は簡約・型推論時に行う。

use crate::errors::SyntaxError;
use crate::lexer::{lex, LineMap, Token, TokenKind};
use crate::term::Term;

mod definition;
mod expr;

pub use definition::{Definition, Equation};

/// セッションのコマンド語。定義名には使えない。
pub const KEYWORDS: &[&str] = &[
    "def", "type", "reduce", "trace", "compile", "algo", "search", "set", "help", "doc",
    "theme", "macros", "lib", "matrix", "quit", "exit",
];

/// 括弧とラムダの入れ子の上限。これを超える入力は構文エラーにする。
pub const MAX_NESTING: usize = 500;

pub struct Parser<'a> {
    src: &'a str,
    lines: LineMap,
    ts: Vec<Token>,
    i: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// 字句解析済みのトークン列からパーサを構築する。
    pub fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            lines: LineMap::new(src),
            ts: tokens,
            i: 0,
            depth: 0,
        }
    }

    pub(super) fn peek(&self) -> &Token {
        // lex は必ず EOF で終わるので末尾で止まる
        &self.ts[self.i.min(self.ts.len() - 1)]
    }

    pub(super) fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if t.kind != TokenKind::EOF {
            self.i += 1;
        }
        t
    }

    pub(super) fn pop(&mut self, kind: TokenKind, expected: &str) -> Result<Token, SyntaxError> {
        if self.peek().kind != kind {
            return Err(self.error_here("PAR001", expected));
        }
        Ok(self.pop_any())
    }

    pub(super) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        (self.peek().kind == kind).then(|| self.pop_any())
    }

    /// 現在位置のトークンを指す構文エラーを作る。
    pub(super) fn error_here(&self, code: &'static str, expected: &str) -> SyntaxError {
        let t = self.peek();
        let found = if t.kind == TokenKind::EOF {
            t.kind.describe().to_string()
        } else {
            format!("{} '{}'", t.kind.describe(), t.value)
        };
        SyntaxError::at_with_snippet(
            code,
            format!("{}, found {}", expected, found),
            Some(t.pos),
            Some(t.line),
            Some(t.col),
            self.lines.line_text(self.src, t.line).to_string(),
        )
    }

    pub(super) fn expect_eof(&self) -> Result<(), SyntaxError> {
        if self.peek().kind != TokenKind::EOF {
            return Err(self.error_here("PAR090", "expected end of input"));
        }
        Ok(())
    }
}

fn parser_for(src: &str) -> Result<Parser<'_>, SyntaxError> {
    let ts = lex(src)?;
    Ok(Parser::new(src, ts))
}

/// 1 つの式を解析する。入力全体を消費しなければエラー。
pub fn parse_expr(src: &str) -> Result<Term, SyntaxError> {
    let mut p = parser_for(src)?;
    if p.peek().kind == TokenKind::EOF {
        return Err(p.error_here("PAR004", "expected an expression"));
    }
    let t = p.parse_expr()?;
    p.expect_eof()?;
    Ok(t)
}

/// `NAME params = body` を解析する。
pub fn parse_definition(src: &str) -> Result<Definition, SyntaxError> {
    let mut p = parser_for(src)?;
    let d = p.parse_definition()?;
    p.expect_eof()?;
    Ok(d)
}

/// `params = body` を解析する（`search` の目標式）。
pub fn parse_equation(src: &str) -> Result<Equation, SyntaxError> {
    let mut p = parser_for(src)?;
    let eq = p.parse_equation()?;
    p.expect_eof()?;
    Ok(eq)
}
