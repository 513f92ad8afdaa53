// パス: src/lexer.rs
// 役割: ラムダ式の字句解析器とトークン定義を提供する
// 意図: 構文解析に必要な位置付きトークンを生成する
// 関連ファイル: src/parser/mod.rs, src/errors.rs, tests/lexer_parser.rs
//! 字句解析モジュール
//!
//! - `\` と `λ` を抽象の開始、`.` を束縛子の区切りとして扱う。
//! - 識別子は英字または `_` で始まり、英数字・`_`・`'` が続く。
//! - 数字列は Church 数の名前として `NUMBER` トークンになる。
//! - `--` から行末まではコメント。
//! - すべてのトークンに行・列・バイト位置を記録し、診断情報と連携させる。

use crate::errors::SyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    LAMBDA, // `\` または `λ`
    DOT,
    EQUAL,
    LPAREN,
    RPAREN,
    IDENT,
    NUMBER,
}

impl TokenKind {
    /// エラーメッセージ用の表記。
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::EOF => "end of input",
            TokenKind::LAMBDA => "'\\'",
            TokenKind::DOT => "'.'",
            TokenKind::EQUAL => "'='",
            TokenKind::LPAREN => "'('",
            TokenKind::RPAREN => "')'",
            TokenKind::IDENT => "identifier",
            TokenKind::NUMBER => "numeral",
        }
    }
}

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
pub(crate) struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    pub(crate) fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + ch.len_utf8());
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置（文字単位）を返す。
    pub(crate) fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let end = pos.min(src.len());
        let col = src.get(start..end).map_or(0, |s| s.chars().count()) + 1;
        (idx + 1, col)
    }

    /// 指定行に対応するテキスト断片を返す（改行は除去する）。
    pub(crate) fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.starts.get(i)) else {
            return "";
        };
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_rest(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\''
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            self.consume_trivia();
            let Some(ch) = self.peek_char() else {
                break;
            };
            self.lex_token(ch)?;
        }
        self.push(TokenKind::EOF, self.src.len(), self.src.len());
        Ok(self.tokens)
    }

    fn consume_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance_char();
                }
                Some('-') if self.src[self.cursor..].starts_with("--") => {
                    while let Some(ch) = self.advance_char() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_token(&mut self, ch: char) -> Result<(), SyntaxError> {
        let start = self.cursor;
        let single = match ch {
            '\\' | 'λ' => Some(TokenKind::LAMBDA),
            '.' => Some(TokenKind::DOT),
            '=' => Some(TokenKind::EQUAL),
            '(' => Some(TokenKind::LPAREN),
            ')' => Some(TokenKind::RPAREN),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance_char();
            self.push(kind, start, self.cursor);
            return Ok(());
        }
        if ch.is_ascii_digit() {
            self.take_while(|c| c.is_ascii_digit());
            if self.peek_char().is_some_and(is_ident_rest) {
                return Err(self.err(
                    "LEX002",
                    "expected a separator after numeral (identifiers cannot start with a digit)",
                    self.cursor,
                ));
            }
            self.push(TokenKind::NUMBER, start, self.cursor);
            return Ok(());
        }
        if is_letter(ch) {
            self.take_while(is_ident_rest);
            self.push(TokenKind::IDENT, start, self.cursor);
            return Ok(());
        }
        Err(self.err(
            "LEX001",
            format!("unexpected character {:?}", ch),
            start,
        ))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.advance_char();
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let (line, col) = self.line_map.locate(self.src, start);
        self.tokens.push(Token {
            kind,
            value: self.src[start..end].into(),
            pos: start,
            line,
            col,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }

    fn err(&self, code: &'static str, message: impl Into<String>, pos: usize) -> SyntaxError {
        let (line, col) = self.line_map.locate(self.src, pos);
        SyntaxError::at_with_snippet(
            code,
            message,
            Some(pos),
            Some(line),
            Some(col),
            self.line_map.line_text(self.src, line).to_string(),
        )
    }
}

/// ソース全体をトークン列へ変換する。末尾には必ず `EOF` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(src).run()
}
