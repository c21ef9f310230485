use std::convert::{AsMut, AsRef};
use std::fmt;
use std::rc::Rc;

use proto_span::Span;

/// A node in the AST with an associated span.
#[derive(Debug, Clone)]
pub struct Node<T> {
    value: T,
    span: Span,
}

impl<T> Node<T> {
    pub fn new(value: T, span: impl Into<Span>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, Span) {
        (self.value, self.span)
    }

    pub const fn span(&self) -> &Span {
        &self.span
    }

    pub const fn inner(&self) -> &T {
        &self.value
    }

    pub fn map<U, F>(self, f: F) -> Node<U>
    where
        F: FnOnce(T) -> U,
    {
        Node {
            value: f(self.value),
            span: self.span,
        }
    }
}

impl<T> AsRef<T> for Node<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> AsMut<T> for Node<T> {
    fn as_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> PartialEq for Node<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Node<Statement>>,
}

impl Program {
    pub const fn new(statements: Vec<Node<Statement>>) -> Self {
        Self { statements }
    }

    /// Function declarations at the top level, in source order.
    pub fn functions(&self) -> impl Iterator<Item = &Rc<FunctionDecl>> {
        self.statements.iter().filter_map(|stmt| {
            if let Statement::Function(func) = stmt.as_ref() {
                Some(func)
            } else {
                None
            }
        })
    }
}

/// A function literal or declaration. The body is shared between every
/// closure created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub params: Vec<Node<String>>,
    pub body: Rc<Vec<Node<Statement>>>,
}

impl FunctionDecl {
    pub fn new(
        name: Option<String>,
        params: Vec<Node<String>>,
        body: Vec<Node<Statement>>,
    ) -> Self {
        Self {
            name,
            params,
            body: Rc::new(body),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declare {
        kind: DeclKind,
        name: Node<String>,
        init: Option<Node<Expr>>,
    },
    Function(Rc<FunctionDecl>),
    Return(Option<Node<Expr>>),
    If {
        cond: Node<Expr>,
        then_branch: Box<Node<Statement>>,
        else_branch: Option<Box<Node<Statement>>>,
    },
    While {
        cond: Node<Expr>,
        body: Box<Node<Statement>>,
    },
    Block(Vec<Node<Statement>>),
    Expr(Node<Expr>),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    This,
    /// Object literal; entries keep source order.
    Object(Vec<(String, Node<Expr>)>),
    Function(Rc<FunctionDecl>),
    Member {
        object: Box<Node<Expr>>,
        property: String,
    },
    Index {
        object: Box<Node<Expr>>,
        index: Box<Node<Expr>>,
    },
    Call {
        callee: Box<Node<Expr>>,
        args: Vec<Node<Expr>>,
    },
    New {
        callee: Box<Node<Expr>>,
        args: Vec<Node<Expr>>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Node<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node<Expr>>,
        right: Box<Node<Expr>>,
    },
    /// `target = value`, or a compound assignment when `op` is set.
    Assign {
        target: Box<Node<Expr>>,
        op: Option<BinaryOp>,
        value: Box<Node<Expr>>,
    },
    Delete(Box<Node<Expr>>),
}

impl Expr {
    /// Short source-like rendering of simple access paths, used in error messages.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Identifier(name) => Some(name.clone()),
            Self::This => Some("this".to_string()),
            Self::Member { object, property } => {
                let base = object.inner().describe()?;
                Some(format!("{base}.{property}"))
            }
            Self::Index { object, index } => {
                let base = object.inner().describe()?;
                match index.inner() {
                    Self::Literal(Literal::String(key)) => Some(format!("{base}[{key:?}]")),
                    other => Some(format!("{base}[{}]", other.describe()?)),
                }
            }
            _ => None,
        }
    }

    pub const fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Member { .. } | Self::Index { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Instanceof,
    In,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Instanceof => "instanceof",
            Self::In => "in",
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Node<Expr>> {
        Box::new(Node::new(Expr::Identifier(name.to_string()), Span::default()))
    }

    #[test]
    fn describes_member_paths() {
        let expr = Expr::Member {
            object: Box::new(Node::new(
                Expr::Member {
                    object: ident("r"),
                    property: "shape".into(),
                },
                Span::default(),
            )),
            property: "getArea".into(),
        };
        assert_eq!(expr.describe().as_deref(), Some("r.shape.getArea"));
    }

    #[test]
    fn call_results_have_no_description() {
        let expr = Expr::Member {
            object: Box::new(Node::new(
                Expr::Call {
                    callee: ident("make"),
                    args: Vec::new(),
                },
                Span::default(),
            )),
            property: "x".into(),
        };
        assert_eq!(expr.describe(), None);
    }
}
