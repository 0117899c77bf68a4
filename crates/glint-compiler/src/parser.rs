//! Parser à descente récursive sur le flux de tokens produit par `lexer`.

use crate::ast::{BinOp, Expr, FuncDecl, Stmt};
use crate::error::CompileError;
use crate::lexer::{TokKind, Token};

pub struct Parser {
    toks: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(toks: Vec<Token>) -> Self {
        Self { toks, pos: 0 }
    }

    /// Parse une suite de déclarations de fonction de premier niveau. Toute
    /// séquence de tokens qui ne démarre pas une déclaration `func` est
    /// silencieusement sautée, si bien qu'un fichier peut porter des
    /// commentaires ou des constructions non supportées entre les
    /// fonctions sans faire échouer la compilation.
    pub fn parse_program(&mut self) -> Result<Vec<FuncDecl>, CompileError> {
        let mut funcs = Vec::new();
        while !self.check(&TokKind::Eof) {
            if self.check(&TokKind::KwFunc) {
                funcs.push(self.parse_func_decl()?);
            } else {
                self.skip_to_next_func();
            }
        }
        Ok(funcs)
    }

    fn skip_to_next_func(&mut self) {
        while !self.check(&TokKind::Eof) && !self.check(&TokKind::KwFunc) {
            self.advance();
        }
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, CompileError> {
        let line = self.peek().line;
        self.expect(&TokKind::KwFunc)?;
        let name = self.expect_ident()?;
        self.expect(&TokKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if self.matches(&TokKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(&TokKind::RParen)?;
        let body = self.parse_block()?;
        Ok(FuncDecl { name, params, body, line })
    }

    /// Un paramètre est un ou deux identifiants : `name` ou `label name`.
    /// Labels et types sont ignorés ; seul le dernier identifiant est
    /// conservé.
    fn parse_param(&mut self) -> Result<String, CompileError> {
        let first = self.expect_ident()?;
        if let TokKind::Ident(_) = self.peek().kind {
            self.expect_ident()
        } else {
            Ok(first)
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(&TokKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokKind::RBrace) && !self.check(&TokKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match &self.peek().kind {
            TokKind::KwLet => self.parse_let(),
            TokKind::KwReturn => self.parse_return(),
            TokKind::KwIf => self.parse_if(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.expect(&TokKind::KwLet)?;
        let name = self.expect_ident().map_err(|_| CompileError::InvalidLet {
            message: "expected identifier after 'let'".into(),
            line: Some(line),
        })?;
        self.expect(&TokKind::Assign).map_err(|_| CompileError::InvalidLet {
            message: format!("expected '=' after 'let {name}'"),
            line: Some(line),
        })?;
        let expr = self.parse_expr()?;
        self.consume_semicolon();
        Ok(Stmt::LetDecl { name, expr, line })
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.expect(&TokKind::KwReturn)?;
        let expr = if self.check(&TokKind::Semicolon) || self.check(&TokKind::RBrace) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.consume_semicolon();
        Ok(Stmt::Return { expr, line })
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.expect(&TokKind::KwIf)?;
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.matches(&TokKind::KwElse) {
            if self.check(&TokKind::KwIf) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If { cond, then_body, else_body, line })
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        let expr = self.parse_expr()?;
        self.consume_semicolon();
        Ok(Stmt::ExprStmt { expr, line })
    }

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_eq()
    }

    fn parse_eq(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_add()?;
        while self.matches(&TokKind::EqEq) {
            let rhs = self.parse_add()?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op: BinOp::Eq, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_primary()?;
        while self.matches(&TokKind::Plus) {
            let rhs = self.parse_primary()?;
            lhs = Expr::Binary { lhs: Box::new(lhs), op: BinOp::Add, rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let line = self.peek().line;
        match self.peek().kind.clone() {
            TokKind::Str(s) => {
                self.advance();
                Ok(Expr::StrLit(s))
            }
            TokKind::Int(n) => {
                self.advance();
                Ok(Expr::IntLit(n))
            }
            TokKind::KwTrue => {
                self.advance();
                Ok(Expr::BoolLit(true))
            }
            TokKind::KwFalse => {
                self.advance();
                Ok(Expr::BoolLit(false))
            }
            TokKind::Ident(name) => {
                self.advance();
                if self.matches(&TokKind::LParen) {
                    let args = self.parse_call_args()?;
                    self.expect(&TokKind::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokKind::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(&TokKind::RParen)?;
                Ok(e)
            }
            other => Err(CompileError::UnsupportedConstruct {
                message: format!("unexpected {other} in expression position"),
                line: Some(line),
            }),
        }
    }

    /// Les labels d'argument (`id: expr`) sont acceptés et retirés.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.check(&TokKind::RParen) {
            return Ok(args);
        }
        loop {
            if let TokKind::Ident(_) = self.peek().kind {
                if self.peek_is_colon_after_ident() {
                    self.advance(); // le label
                    self.advance(); // le ':'
                }
            }
            args.push(self.parse_expr()?);
            if self.matches(&TokKind::Comma) {
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn peek_is_colon_after_ident(&self) -> bool {
        self.toks.get(self.pos + 1).map(|t| t.kind == TokKind::Colon).unwrap_or(false)
    }

    fn consume_semicolon(&mut self) {
        self.matches(&TokKind::Semicolon);
    }

    fn peek(&self) -> &Token {
        &self.toks[self.pos]
    }

    fn advance(&mut self) -> &Token {
        let t = &self.toks[self.pos];
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn matches(&mut self, kind: &TokKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokKind) -> Result<&Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let line = self.peek().line;
            Err(CompileError::UnsupportedConstruct {
                message: format!("expected {kind} but found {}", self.peek().kind),
                line: Some(line),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.peek().kind.clone() {
            TokKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => {
                let line = self.peek().line;
                Err(CompileError::UnsupportedConstruct {
                    message: format!("expected identifier but found {other}"),
                    line: Some(line),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Vec<FuncDecl> {
        let toks = Lexer::new(src).tokenize().unwrap();
        Parser::new(toks).parse_program().unwrap()
    }

    #[test]
    fn parses_return_with_binary_add() {
        let funcs = parse("func main() { return 1 + 2 }");
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "main");
        assert!(matches!(funcs[0].body[0], Stmt::Return { .. }));
    }

    #[test]
    fn parses_labeled_param_and_call_args() {
        let funcs = parse(r#"func greet(_ name) { log("Hola " + name) }"#);
        assert_eq!(funcs[0].params, vec!["name".to_string()]);
    }

    #[test]
    fn skips_unknown_top_level_tokens() {
        let funcs = parse("garbage tokens here func main() { return 1 }");
        assert_eq!(funcs.len(), 1);
    }

    #[test]
    fn parses_if_else() {
        let funcs = parse(
            r#"func main() { if x == "Rafa" { setText(id: "t", text: "ok") } else { setText(id: "t", text: "no") } }"#,
        );
        assert!(matches!(funcs[0].body[0], Stmt::If { .. }));
    }
}
