//! Tree-walking evaluation of parsed programs against an [`Engine`].

pub mod function;
pub mod scope;

use std::cmp::Ordering;
use std::rc::Rc;

use tracing::debug;

use proto_ast::nodes::{
    BinaryOp, DeclKind, Expr, FunctionDecl, Literal, Node, Program, Statement, UnaryOp,
};

use crate::runtime::engine::with_stack;
use crate::runtime::{Engine, Receiver, RuntimeError, RuntimeResult, Value, inspect};

pub use function::ScriptFunction;
pub use scope::ScopeRef;

enum Flow {
    Normal(Value),
    Return(Value),
}

pub struct Interpreter<'e> {
    engine: &'e Engine,
}

impl<'e> Interpreter<'e> {
    pub const fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Run a top-level program and return the value of its last statement,
    /// `undefined` when that statement produces none.
    pub fn run(&self, program: &Program, scope: &ScopeRef) -> RuntimeResult<Value> {
        debug!(statements = program.statements.len(), "running program");
        self.hoist(&program.statements, scope)?;
        let mut last = Value::Undefined;
        for statement in &program.statements {
            match self.execute(statement, scope)? {
                Flow::Normal(value) => last = value,
                Flow::Return(value) => return Ok(value),
            }
        }
        Ok(last)
    }

    /// Run a function body; falls off the end as `undefined`.
    pub fn run_body(&self, body: &[Node<Statement>], scope: &ScopeRef) -> RuntimeResult<Value> {
        self.hoist(body, scope)?;
        for statement in body {
            if let Flow::Return(value) = self.execute(statement, scope)? {
                return Ok(value);
            }
        }
        Ok(Value::Undefined)
    }

    /// Function declarations are bound before any statement of their block runs.
    fn hoist(&self, statements: &[Node<Statement>], scope: &ScopeRef) -> RuntimeResult<()> {
        for statement in statements {
            if let Statement::Function(decl) = statement.inner() {
                let name = decl.name.clone().unwrap_or_default();
                let function = self.make_function(decl, decl.name.clone(), scope);
                self.declare_var(&name, Some(function), scope)?;
            }
        }
        Ok(())
    }

    fn declare_var(&self, name: &str, value: Option<Value>, scope: &ScopeRef) -> RuntimeResult<()> {
        if scope.declare_var(name, value.clone())? {
            return Ok(());
        }
        let global = self.engine.global();
        match value {
            Some(value) => self.engine.set(&Value::Object(global.clone()), name, value),
            None if !global.has_own(name) => {
                global.set_own(name, Value::Undefined);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn execute(&self, statement: &Node<Statement>, scope: &ScopeRef) -> RuntimeResult<Flow> {
        with_stack(|| self.execute_statement(statement, scope))
    }

    fn execute_statement(&self, statement: &Node<Statement>, scope: &ScopeRef) -> RuntimeResult<Flow> {
        match statement.inner() {
            Statement::Declare { kind, name, init } => {
                let value = match init {
                    Some(init) => Some(self.evaluate_named(init, name.inner(), scope)?),
                    None => None,
                };
                match kind {
                    DeclKind::Var => self.declare_var(name.inner(), value, scope)?,
                    DeclKind::Let => scope.declare(name.inner(), value.unwrap_or_default(), true)?,
                    DeclKind::Const => {
                        scope.declare(name.inner(), value.unwrap_or_default(), false)?;
                    }
                }
                Ok(Flow::Normal(Value::Undefined))
            }
            Statement::Function(_) | Statement::Empty => Ok(Flow::Normal(Value::Undefined)),
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond, scope)?.truthy() {
                    self.execute(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, scope)
                } else {
                    Ok(Flow::Normal(Value::Undefined))
                }
            }
            Statement::While { cond, body } => {
                let mut last = Value::Undefined;
                while self.evaluate(cond, scope)?.truthy() {
                    match self.execute(body, scope)? {
                        Flow::Normal(value) => last = value,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(last))
            }
            Statement::Block(statements) => {
                let block = scope.child();
                self.hoist(statements, &block)?;
                let mut last = Value::Undefined;
                for statement in statements {
                    match self.execute(statement, &block)? {
                        Flow::Normal(value) => last = value,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(last))
            }
            Statement::Expr(expr) => Ok(Flow::Normal(self.evaluate(expr, scope)?)),
        }
    }

    fn make_function(&self, decl: &Rc<FunctionDecl>, name: Option<String>, scope: &ScopeRef) -> Value {
        let body = ScriptFunction::new(Rc::clone(decl), scope.clone());
        Value::Function(self.engine.new_function(name, Rc::new(body)))
    }

    /// Anonymous function literals take the name of the binding or key they
    /// are assigned to.
    fn evaluate_named(&self, expr: &Node<Expr>, name: &str, scope: &ScopeRef) -> RuntimeResult<Value> {
        match expr.inner() {
            Expr::Function(decl) if decl.name.is_none() => {
                Ok(self.make_function(decl, Some(name.to_string()), scope))
            }
            _ => self.evaluate(expr, scope),
        }
    }

    fn evaluate(&self, expr: &Node<Expr>, scope: &ScopeRef) -> RuntimeResult<Value> {
        with_stack(|| self.evaluate_expr(expr, scope))
    }

    fn evaluate_expr(&self, expr: &Node<Expr>, scope: &ScopeRef) -> RuntimeResult<Value> {
        match expr.inner() {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::from(s.as_str()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Identifier(name) => self.lookup(name, scope),
            Expr::This => Ok(scope
                .this()
                .unwrap_or_else(|| Value::Object(self.engine.global().clone()))),
            Expr::Object(entries) => {
                let object = Value::Object(self.engine.new_object());
                for (key, value) in entries {
                    let value = self.evaluate_named(value, key, scope)?;
                    self.engine.set(&object, key, value)?;
                }
                Ok(object)
            }
            Expr::Function(decl) => Ok(self.make_function(decl, decl.name.clone(), scope)),
            Expr::Member { object, property } => {
                let base = self.evaluate(object, scope)?;
                self.engine.get(&base, property)
            }
            Expr::Index { object, index } => {
                let base = self.evaluate(object, scope)?;
                let key = self.property_key(index, scope)?;
                self.engine.get(&base, &key)
            }
            Expr::Call { callee, args } => self.evaluate_call(callee, args, scope),
            Expr::New { callee, args } => {
                let constructor = self.evaluate(callee, scope)?;
                let args = self.evaluate_args(args, scope)?;
                if !constructor.is_callable() {
                    return Err(RuntimeError::NotConstructor {
                        callee: describe(callee, &constructor),
                    });
                }
                self.engine.construct(&constructor, &args)
            }
            Expr::Unary { op, expr } => self.evaluate_unary(*op, expr, scope),
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, scope)?;
                match op {
                    BinaryOp::And if !left.truthy() => Ok(left),
                    BinaryOp::Or if left.truthy() => Ok(left),
                    BinaryOp::And | BinaryOp::Or => self.evaluate(right, scope),
                    _ => {
                        let right = self.evaluate(right, scope)?;
                        self.binary(*op, &left, &right)
                    }
                }
            }
            Expr::Assign { target, op, value } => self.assign(target, *op, value, scope),
            Expr::Delete(target) => match target.inner() {
                Expr::Member { object, property } => {
                    let base = self.evaluate(object, scope)?;
                    self.engine.delete(&base, property)?;
                    Ok(Value::Bool(true))
                }
                Expr::Index { object, index } => {
                    let base = self.evaluate(object, scope)?;
                    let key = self.property_key(index, scope)?;
                    self.engine.delete(&base, &key)?;
                    Ok(Value::Bool(true))
                }
                // bindings are not deletable
                Expr::Identifier(_) => Ok(Value::Bool(false)),
                _ => {
                    self.evaluate(target, scope)?;
                    Ok(Value::Bool(true))
                }
            },
        }
    }

    fn lookup(&self, name: &str, scope: &ScopeRef) -> RuntimeResult<Value> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        let global = Value::Object(self.engine.global().clone());
        if name == "globalThis" {
            return Ok(global);
        }
        if self.engine.get_own(&global, name)?.is_some() {
            return self.engine.get(&global, name);
        }
        Err(RuntimeError::UnboundIdentifier {
            name: name.to_string(),
        })
    }

    fn property_key(&self, index: &Node<Expr>, scope: &ScopeRef) -> RuntimeResult<String> {
        Ok(self.evaluate(index, scope)?.to_display_string())
    }

    fn evaluate_args(&self, args: &[Node<Expr>], scope: &ScopeRef) -> RuntimeResult<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(arg, scope)).collect()
    }

    /// Calls spelled `a.b(...)` or `a[k](...)` bind `a` as receiver; any other
    /// callee runs with the global receiver.
    fn evaluate_call(
        &self,
        callee: &Node<Expr>,
        args: &[Node<Expr>],
        scope: &ScopeRef,
    ) -> RuntimeResult<Value> {
        match callee.inner() {
            Expr::Member { object, property } => {
                let receiver = self.evaluate(object, scope)?;
                let args = self.evaluate_args(args, scope)?;
                self.engine
                    .invoke_described(&receiver, property, &args, || {
                        describe_member(callee, property)
                    })
            }
            Expr::Index { object, index } => {
                let receiver = self.evaluate(object, scope)?;
                let key = self.property_key(index, scope)?;
                let args = self.evaluate_args(args, scope)?;
                self.engine
                    .invoke_described(&receiver, &key, &args, || describe_member(callee, &key))
            }
            _ => {
                let function = self.evaluate(callee, scope)?;
                let args = self.evaluate_args(args, scope)?;
                if !function.is_callable() {
                    return Err(RuntimeError::NotCallable {
                        callee: describe(callee, &function),
                    });
                }
                self.engine.call(&function, Receiver::Global, &args)
            }
        }
    }

    fn evaluate_unary(&self, op: UnaryOp, expr: &Node<Expr>, scope: &ScopeRef) -> RuntimeResult<Value> {
        if op == UnaryOp::Typeof {
            // `typeof` of an undeclared name is not an error
            let value = match expr.inner() {
                Expr::Identifier(name) => match self.lookup(name, scope) {
                    Err(RuntimeError::UnboundIdentifier { .. }) => Value::Undefined,
                    other => other?,
                },
                _ => self.evaluate(expr, scope)?,
            };
            return Ok(Value::from(value.type_of()));
        }
        let value = self.evaluate(expr, scope)?;
        Ok(match op {
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::Typeof => Value::from(value.type_of()),
        })
    }

    fn assign(
        &self,
        target: &Node<Expr>,
        op: Option<BinaryOp>,
        value: &Node<Expr>,
        scope: &ScopeRef,
    ) -> RuntimeResult<Value> {
        match target.inner() {
            Expr::Identifier(name) => {
                let value = match op {
                    None => self.evaluate_named(value, name, scope)?,
                    Some(op) => {
                        let current = self.lookup(name, scope)?;
                        let rhs = self.evaluate(value, scope)?;
                        self.binary(op, &current, &rhs)?
                    }
                };
                if !scope.assign(name, value.clone())? {
                    let global = Value::Object(self.engine.global().clone());
                    self.engine.set(&global, name, value.clone())?;
                }
                Ok(value)
            }
            Expr::Member { object, property } => {
                let base = self.evaluate(object, scope)?;
                self.assign_field(&base, property, op, value, scope)
            }
            Expr::Index { object, index } => {
                let base = self.evaluate(object, scope)?;
                let key = self.property_key(index, scope)?;
                self.assign_field(&base, &key, op, value, scope)
            }
            _ => Err(RuntimeError::type_error("Invalid assignment target")),
        }
    }

    fn assign_field(
        &self,
        base: &Value,
        key: &str,
        op: Option<BinaryOp>,
        value: &Node<Expr>,
        scope: &ScopeRef,
    ) -> RuntimeResult<Value> {
        let value = match op {
            None => self.evaluate(value, scope)?,
            Some(op) => {
                let current = self.engine.get(base, key)?;
                let rhs = self.evaluate(value, scope)?;
                self.binary(op, &current, &rhs)?
            }
        };
        self.engine.set(base, key, value.clone())?;
        Ok(value)
    }

    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
        Ok(match op {
            BinaryOp::Add if concatenates(left) || concatenates(right) => Value::from(format!(
                "{}{}",
                left.to_display_string(),
                right.to_display_string()
            )),
            BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
            BinaryOp::LtEq => Value::Bool(matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::GtEq => Value::Bool(matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
            BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
            BinaryOp::Instanceof => Value::Bool(self.instance_of(left, right)?),
            BinaryOp::In => {
                let key = left.to_display_string();
                if right.field_holder().is_none() {
                    return Err(RuntimeError::type_error(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        inspect(right)
                    )));
                }
                Value::Bool(self.engine.has_property(right, &key)?)
            }
            BinaryOp::And if left.truthy() => right.clone(),
            BinaryOp::Or if !left.truthy() => right.clone(),
            BinaryOp::And | BinaryOp::Or => left.clone(),
        })
    }

    fn instance_of(&self, value: &Value, constructor: &Value) -> RuntimeResult<bool> {
        let Value::Function(function) = constructor else {
            return Err(RuntimeError::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        };
        if value.field_holder().is_none() {
            return Ok(false);
        }
        let Some(prototype) = function.prototype() else {
            return Err(RuntimeError::type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        self.engine.is_in_chain(&prototype, value)
    }
}

/// Reference values convert to strings under `+`.
const fn concatenates(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Object(_) | Value::Function(_)
    )
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Some(a.cmp(b));
    }
    left.to_number().partial_cmp(&right.to_number())
}

fn describe(expr: &Node<Expr>, value: &Value) -> String {
    expr.inner().describe().unwrap_or_else(|| inspect(value))
}

fn describe_member(callee: &Node<Expr>, key: &str) -> String {
    callee
        .inner()
        .describe()
        .unwrap_or_else(|| format!("(intermediate value).{key}"))
}
