// パス: src/parser/definition.rs
// 役割: `NAME params = body` 形式の定義ヘッダを解析する
// 意図: `def` と `search` が同じ「引数付き等式」の構文を共有する
// 関連ファイル: src/parser/mod.rs, src/session.rs, src/search.rs

use super::*;

/// `def` の右辺まで含めた構文。
#[derive(Clone, Debug)]
pub struct Definition {
    pub name: String,
    pub params: Vec<String>,
    pub body: Term,
}

impl Definition {
    /// 引数を抽象に戻した定義本体。
    pub fn term(&self) -> Term {
        Term::abs_many(&self.params, self.body.clone())
    }
}

/// 名前なしの `params = body`。
#[derive(Clone, Debug)]
pub struct Equation {
    pub params: Vec<String>,
    pub body: Term,
}

impl<'a> Parser<'a> {
    pub(super) fn parse_definition(&mut self) -> Result<Definition, SyntaxError> {
        if self.peek().kind == TokenKind::NUMBER {
            return Err(self.error_here("PAR005", "expected a name (numerals are reserved)"));
        }
        if self.peek().kind == TokenKind::IDENT && KEYWORDS.contains(&self.peek().value.as_str())
        {
            return Err(self.error_here("PAR005", "expected a name (command words are reserved)"));
        }
        let name = self.pop(TokenKind::IDENT, "expected definition name")?.value;
        let Equation { params, body } = self.parse_equation()?;
        Ok(Definition { name, params, body })
    }

    pub(super) fn parse_equation(&mut self) -> Result<Equation, SyntaxError> {
        let mut params = Vec::new();
        while let Some(t) = self.accept(TokenKind::IDENT) {
            params.push(t.value);
        }
        self.pop(TokenKind::EQUAL, "expected '=' after definition name and parameters")?;
        if self.peek().kind == TokenKind::EOF {
            return Err(self.error_here("PAR003", "expected an expression after '='"));
        }
        let body = self.parse_expr()?;
        Ok(Equation { params, body })
    }
}
