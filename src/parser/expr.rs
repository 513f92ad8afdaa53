// パス: src/parser/expr.rs
// 役割: ラムダ・適用・原子式の解析を `Parser` に実装する
// 意図: 式の結合規則（適用は左結合、ラムダは右へ最大限伸びる）をここに閉じ込める
// 関連ファイル: src/parser/mod.rs, src/parser/definition.rs, src/term.rs

use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_expr(&mut self) -> Result<Term, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("PAR006", "expression nested too deeply"));
        }
        self.depth += 1;
        let out = match self.peek().kind {
            TokenKind::LAMBDA => self.parse_lambda(),
            _ => self.parse_application(),
        };
        self.depth -= 1;
        out
    }

    fn parse_lambda(&mut self) -> Result<Term, SyntaxError> {
        self.pop(TokenKind::LAMBDA, "expected '\\'")?;
        let mut params = Vec::new();
        while let Some(t) = self.accept(TokenKind::IDENT) {
            params.push(t.value);
        }
        if params.is_empty() {
            return Err(self.error_here("PAR002", "expected identifier after lambda"));
        }
        self.pop(TokenKind::DOT, "expected '.' after lambda parameters")?;
        let body = self.parse_expr()?;
        Ok(Term::abs_many(&params, body))
    }

    fn parse_application(&mut self) -> Result<Term, SyntaxError> {
        let mut head = self.parse_atom()?;
        loop {
            match self.peek().kind {
                TokenKind::IDENT | TokenKind::NUMBER | TokenKind::LPAREN => {
                    let arg = self.parse_atom()?;
                    head = Term::app(head, arg);
                }
                // `f \x. x` は f (\x. x)
                TokenKind::LAMBDA => {
                    let arg = self.parse_lambda()?;
                    return Ok(Term::app(head, arg));
                }
                _ => return Ok(head),
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Term, SyntaxError> {
        match self.peek().kind {
            TokenKind::IDENT | TokenKind::NUMBER => Ok(Term::var(self.pop_any().value)),
            TokenKind::LPAREN => {
                self.pop_any();
                let inner = self.parse_expr()?;
                self.pop(TokenKind::RPAREN, "expected ')' to close '('")?;
                Ok(inner)
            }
            _ => Err(self.error_here("PAR003", "expected an expression")),
        }
    }
}
