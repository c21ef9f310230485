pub mod grammar;

pub use grammar::{ParserError, parse};

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use proto_ast::nodes::{BinaryOp, DeclKind, Expr, Literal, Node, Program, Statement};
    use proto_lexer::tokenize;

    use super::*;

    fn parse_source(source: &str) -> Program {
        let tokens = tokenize(source).unwrap_or_else(|errors| panic!("lex failed: {errors:?}"));
        parse(&tokens).unwrap_or_else(|errors| panic!("parse failed: {errors:?}"))
    }

    fn parse_errors(source: &str) -> Vec<ParserError> {
        let tokens = tokenize(source).unwrap_or_else(|errors| panic!("lex failed: {errors:?}"));
        match parse(&tokens) {
            Ok(program) => panic!("expected parse failure, got {program:?}"),
            Err(errors) => errors,
        }
    }

    fn single_expr(source: &str) -> Expr {
        let program = parse_source(source);
        assert_eq!(program.statements.len(), 1, "{program:?}");
        match program.statements[0].inner() {
            Statement::Expr(expr) => expr.inner().clone(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn bare_braces_read_as_object_literal() {
        match single_expr("{foo: 1, bar: true}") {
            Expr::Object(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["foo", "bar"]);
                assert_eq!(entries[1].1.inner(), &Expr::Literal(Literal::Bool(true)));
            }
            other => panic!("expected object literal, got {other:?}"),
        }
    }

    #[test]
    fn braces_with_statements_read_as_block() {
        let program = parse_source("{ x = 1; y = 2 }");
        match program.statements[0].inner() {
            Statement::Block(body) => assert_eq!(body.len(), 2),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn object_literal_keys_accept_strings_numbers_and_keywords() {
        match single_expr("({'a b': 1, 2: 2, new: 3, __proto__: null})") {
            Expr::Object(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["a b", "2", "new", "__proto__"]);
            }
            other => panic!("expected object literal, got {other:?}"),
        }
    }

    #[test]
    fn method_call_keeps_member_callee() {
        match single_expr("r.getArea()") {
            Expr::Call { callee, args } => {
                assert!(args.is_empty());
                assert_eq!(callee.inner().describe().as_deref(), Some("r.getArea"));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn new_binds_member_chain_and_arguments() {
        match single_expr("new shapes.Rect(3, 4).width") {
            Expr::Member { object, property } => {
                assert_eq!(property, "width");
                match object.inner() {
                    Expr::New { callee, args } => {
                        assert_eq!(callee.inner().describe().as_deref(), Some("shapes.Rect"));
                        assert_eq!(args.len(), 2);
                    }
                    other => panic!("expected new, got {other:?}"),
                }
            }
            other => panic!("expected member access, got {other:?}"),
        }
    }

    #[test]
    fn new_without_arguments() {
        match single_expr("new Foo") {
            Expr::New { args, .. } => assert!(args.is_empty()),
            other => panic!("expected new, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        match single_expr("1 + 2 * 3") {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.inner(),
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match single_expr("a = b.c = 3") {
            Expr::Assign { target, value, op } => {
                assert_eq!(op, None);
                assert_eq!(target.inner(), &Expr::Identifier("a".into()));
                assert!(matches!(value.inner(), Expr::Assign { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn compound_assignment_records_operator() {
        match single_expr("o['n'] += 1") {
            Expr::Assign { target, op, .. } => {
                assert_eq!(op, Some(BinaryOp::Add));
                assert!(matches!(target.inner(), Expr::Index { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn rejects_assignment_to_call_result() {
        let errors = parse_errors("f() = 1");
        assert!(!errors.is_empty());
    }

    #[test]
    fn delete_and_typeof_are_prefix_operators() {
        assert!(matches!(single_expr("delete o.foo"), Expr::Delete(_)));
        assert!(matches!(single_expr("typeof o"), Expr::Unary { .. }));
    }

    #[test]
    fn declarations_functions_and_control_flow() {
        let program = parse_source(
            "var a = 1; let b; const c = 2
             function Rect(w, h) { this.w = w; this.h = h }
             if (a < c) { b = a } else b = c
             while (a < 3) a += 1
             return",
        );
        let kinds: Vec<&str> = program
            .statements
            .iter()
            .map(|stmt| match stmt.inner() {
                Statement::Declare { kind, .. } => match kind {
                    DeclKind::Var => "var",
                    DeclKind::Let => "let",
                    DeclKind::Const => "const",
                },
                Statement::Function(_) => "function",
                Statement::If { .. } => "if",
                Statement::While { .. } => "while",
                Statement::Return(_) => "return",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["var", "let", "const", "function", "if", "while", "return"]
        );
        assert_eq!(program.functions().count(), 1);
    }

    #[test]
    fn function_expression_with_name_and_params() {
        match single_expr("(function area(w, h) { return w * h })") {
            Expr::Function(decl) => {
                assert_eq!(decl.name.as_deref(), Some("area"));
                let params: Vec<_> = decl.params.iter().map(Node::inner).cloned().collect();
                assert_eq!(params, vec!["w".to_string(), "h".to_string()]);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn const_requires_initializer() {
        let errors = parse_errors("const x;");
        assert!(!errors.is_empty());
    }

    #[test]
    fn unclosed_block_is_reported_at_end_of_input() {
        let errors = parse_errors("function f() {");
        assert!(errors.iter().any(|e| e.at_end_of_input), "{errors:?}");
    }

    #[test]
    fn stray_token_is_not_end_of_input() {
        let errors = parse_errors("var = 3");
        assert!(errors.iter().any(|e| !e.at_end_of_input), "{errors:?}");
    }

    #[test]
    fn statement_spans_cover_their_source() {
        let source = "var o = {foo: 1};\no.foo";
        let program = parse_source(source);
        let texts: Vec<_> = program
            .statements
            .iter()
            .map(|stmt| stmt.span().slice(source))
            .collect();
        assert_eq!(texts, vec!["var o = {foo: 1};", "o.foo"]);
    }

    #[test]
    fn moderate_nesting_parses() {
        let source = format!("{}1{}", "(".repeat(64), ")".repeat(64));
        assert_eq!(single_expr(&source), Expr::Literal(Literal::Number(1.0)));
    }

    #[test]
    fn excessive_nesting_is_a_syntax_error() {
        let depth = grammar::MAX_NESTING + 1;
        let errors = parse_errors(&format!("{}1{}", "[".repeat(depth), "]".repeat(depth)));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("nested deeper than"), "{errors:?}");
        assert!(!errors[0].at_end_of_input);
    }
}
