//! AST transitoire construit par le parser et consommé par le codegen.
//! Jamais persisté : seul `glint-bytecode::Program` survit à la
//! compilation.

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    LetDecl { name: String, expr: Expr, line: u32 },
    ExprStmt { expr: Expr, line: u32 },
    Return { expr: Option<Expr>, line: u32 },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>, line: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Eq,
}

#[derive(Debug, Clone)]
pub enum Expr {
    StrLit(String),
    IntLit(i64),
    BoolLit(bool),
    Ident(String),
    Call { name: String, args: Vec<Expr> },
    Binary { lhs: Box<Expr>, op: BinOp, rhs: Box<Expr> },
}
