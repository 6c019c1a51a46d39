use crate::{
    error::{ParseError, ParseResult},
    frontend::{
        ast::{Block, Expression, File, FunctionDecl, Parameter, Statement},
        intern::InternedSymbol,
        lexer::{Keyword, Token, TokenKind},
    },
};

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Parses a token stream (as produced by the lexer, EOF-terminated) into
    /// a file of function declarations. The first mismatch aborts the parse.
    pub fn parse(tokens: Vec<Token>) -> ParseResult<File> {
        let mut parser = Self { tokens, current: 0 };

        let mut functions = Vec::new();

        while !parser.is_at_end() {
            functions.push(parser.parse_function_decl()?);
        }

        Ok(File { functions })
    }

    fn peek(&self) -> Token {
        self.tokens[self.current]
    }

    /// The grammar is LL(2): one statement form (assignment) needs to see
    /// past an identifier.
    fn peek_next(&self) -> Token {
        if self.current + 1 < self.tokens.len() {
            self.tokens[self.current + 1]
        } else {
            self.tokens[self.tokens.len() - 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();

        if !self.is_at_end() {
            self.current += 1;
        }

        token
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }

        false
    }

    fn error(&self, message: &'static str) -> ParseError {
        let token = self.peek();

        ParseError {
            message,
            line: token.line,
            column: token.column,
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &'static str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        Err(self.error(message))
    }

    fn expect_keyword(&mut self, keyword: Keyword, message: &'static str) -> ParseResult<Token> {
        self.expect(TokenKind::Keyword(keyword), message)
    }

    /// 'fun' IDENT '(' params? ')' (':' IDENT)? block
    fn parse_function_decl(&mut self) -> ParseResult<FunctionDecl> {
        self.expect_keyword(Keyword::Fun, "Expect 'fun' for function declaration.")?;
        let name = self.expect(TokenKind::Identifier, "Expect function name.")?;

        self.expect(TokenKind::OpenParen, "Expect '(' after function name.")?;

        let mut parameters = Vec::new();

        if !self.check(TokenKind::CloseParen) {
            parameters.push(self.parse_parameter()?);

            while self.match_kind(TokenKind::Comma) {
                parameters.push(self.parse_parameter()?);
            }
        }

        self.expect(TokenKind::CloseParen, "Expect ')' after parameters.")?;

        let return_type = if self.match_kind(TokenKind::Colon) {
            self.expect(TokenKind::Identifier, "Expect return type.")?.lexeme
        } else {
            InternedSymbol::new("Unit")
        };

        let body = self.parse_block()?;

        Ok(FunctionDecl {
            name,
            parameters,
            return_type,
            body,
        })
    }

    // argc: Int
    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let name = self.expect(TokenKind::Identifier, "Expect parameter name.")?;
        self.expect(TokenKind::Colon, "Expect ':' after parameter name.")?;
        let ty = self.expect(TokenKind::Identifier, "Expect parameter type.")?;

        Ok(Parameter {
            name,
            ty: ty.lexeme,
        })
    }

    // '{' statement* '}', with stray semicolons consumed as separators
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect(TokenKind::OpenBrace, "Expect '{' before block.")?;

        let mut statements = Vec::new();

        while !self.check(TokenKind::CloseBrace) && !self.is_at_end() {
            if self.match_kind(TokenKind::Semicolon) {
                continue;
            }

            statements.push(self.parse_statement()?);
        }

        self.expect(TokenKind::CloseBrace, "Expect '}' after block.")?;

        Ok(Block { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        if self.check(TokenKind::Keyword(Keyword::Val)) || self.check(TokenKind::Keyword(Keyword::Var))
        {
            return self.parse_var_decl();
        }

        if self.match_kind(TokenKind::Keyword(Keyword::If)) {
            return self.parse_if_statement();
        }

        if self.match_kind(TokenKind::Keyword(Keyword::While)) {
            return self.parse_while_statement();
        }

        if self.check(TokenKind::Keyword(Keyword::Return)) {
            return self.parse_return_statement();
        }

        if self.check(TokenKind::Keyword(Keyword::Break)) {
            return Ok(Statement::Break(self.advance()));
        }

        if self.check(TokenKind::Keyword(Keyword::Continue)) {
            return Ok(Statement::Continue(self.advance()));
        }

        if self.check(TokenKind::OpenBrace) {
            return Ok(Statement::Block(self.parse_block()?));
        }

        // An identifier directly followed by '=' can only start an
        // assignment; everything else is an expression statement
        if self.check(TokenKind::Identifier) && self.peek_next().kind == TokenKind::Equals {
            let name = self.advance();
            self.advance();
            let value = self.parse_expression()?;

            return Ok(Statement::Assignment { name, value });
        }

        Ok(Statement::Expression(self.parse_expression()?))
    }

    /// ('val'|'var') IDENT (':' IDENT)? '=' expression
    fn parse_var_decl(&mut self) -> ParseResult<Statement> {
        let is_immutable = self.advance().kind == TokenKind::Keyword(Keyword::Val);

        let name = self.expect(TokenKind::Identifier, "Expect variable name.")?;

        let declared_type = if self.match_kind(TokenKind::Colon) {
            Some(self.expect(TokenKind::Identifier, "Expect type name.")?.lexeme)
        } else {
            None
        };

        self.expect(TokenKind::Equals, "Expect '=' for variable initialization.")?;
        let initializer = self.parse_expression()?;

        Ok(Statement::VarDecl {
            name,
            declared_type,
            initializer,
            is_immutable,
        })
    }

    /// 'if' '(' expression ')' statement ('else' statement)?
    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::OpenParen, "Expect '(' after 'if'.")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::CloseParen, "Expect ')' after condition.")?;

        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_kind(TokenKind::Keyword(Keyword::Else)) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// 'while' '(' expression ')' statement
    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::OpenParen, "Expect '(' after 'while'.")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::CloseParen, "Expect ')' after condition.")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Statement::While { condition, body })
    }

    /// 'return' expression?, where '}' ';' and EOF mark a value-less return
    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();

        let value = if self.check(TokenKind::CloseBrace)
            || self.check(TokenKind::Semicolon)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        Ok(Statement::Return { keyword, value })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_logical_and()?;

        while self.check(TokenKind::LogicalOr) {
            let operator = self.advance();
            let right = self.parse_logical_and()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_equality()?;

        while self.check(TokenKind::LogicalAnd) {
            let operator = self.advance();
            let right = self.parse_equality()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_comparison()?;

        while self.check(TokenKind::DoubleEquals) || self.check(TokenKind::NotEquals) {
            let operator = self.advance();
            let right = self.parse_comparison()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_term()?;

        while self.check(TokenKind::LessThan)
            || self.check(TokenKind::LessThanOrEqualTo)
            || self.check(TokenKind::GreaterThan)
            || self.check(TokenKind::GreaterThanOrEqualTo)
        {
            let operator = self.advance();
            let right = self.parse_term()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_factor()?;

        while self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
            let operator = self.advance();
            let right = self.parse_factor()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_unary()?;

        while self.check(TokenKind::Asterisk)
            || self.check(TokenKind::Slash)
            || self.check(TokenKind::Percent)
        {
            let operator = self.advance();
            let right = self.parse_unary()?;

            expression = Expression::Binary {
                left: Box::new(expression),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
            let operator = self.advance();
            let operand = self.parse_unary()?;

            return Ok(Expression::Unary {
                operator,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        if self.check(TokenKind::Keyword(Keyword::True))
            || self.check(TokenKind::Keyword(Keyword::False))
            || self.check(TokenKind::Keyword(Keyword::Null))
            || self.check(TokenKind::IntegerLiteral)
            || self.check(TokenKind::FloatLiteral)
            || self.check(TokenKind::StringLiteral)
        {
            return Ok(Expression::Literal(self.advance()));
        }

        if self.check(TokenKind::Identifier) {
            let name = self.advance();

            if self.match_kind(TokenKind::OpenParen) {
                let mut arguments = Vec::new();

                if !self.check(TokenKind::CloseParen) {
                    arguments.push(self.parse_expression()?);

                    while self.match_kind(TokenKind::Comma) {
                        arguments.push(self.parse_expression()?);
                    }
                }

                self.expect(TokenKind::CloseParen, "Expect ')' after arguments.")?;

                return Ok(Expression::Call {
                    callee: name,
                    arguments,
                });
            }

            return Ok(Expression::Variable(name));
        }

        if self.match_kind(TokenKind::OpenParen) {
            let expression = self.parse_expression()?;
            self.expect(TokenKind::CloseParen, "Expect ')' after expression.")?;

            return Ok(Expression::Grouping(Box::new(expression)));
        }

        Err(self.error("Expect expression."))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(source: &str) -> ParseResult<File> {
        Parser::parse(Lexer::new(source).tokenize())
    }

    #[test]
    fn basic_function() {
        let file = parse("fun main() { val x = 42 }").unwrap();

        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].name.lexeme.value(), "main");
        assert_eq!(file.functions[0].return_type.value(), "Unit");
        assert_eq!(file.functions[0].body.statements.len(), 1);
    }

    #[test]
    fn parameters_and_return_type() {
        let file = parse("fun add(a: Int, b: Int): Int { return a + b }").unwrap();

        let function = &file.functions[0];
        assert_eq!(function.parameters.len(), 2);
        assert_eq!(function.parameters[0].name.lexeme.value(), "a");
        assert_eq!(function.parameters[1].ty.value(), "Int");
        assert_eq!(function.return_type.value(), "Int");
    }

    #[test]
    fn expression_precedence() {
        let file = parse("fun test() { val x = 1 + 2 * 3 }").unwrap();

        let Statement::VarDecl { initializer, .. } = &file.functions[0].body.statements[0] else {
            panic!("expected a var declaration");
        };

        // (1 + (2 * 3)): the addition is the root, the product its right child
        let Expression::Binary {
            operator, right, ..
        } = initializer
        else {
            panic!("expected a binary initializer");
        };
        assert_eq!(operator.kind, TokenKind::Plus);

        let Expression::Binary { operator, .. } = right.as_ref() else {
            panic!("expected a nested binary expression");
        };
        assert_eq!(operator.kind, TokenKind::Asterisk);
    }

    #[test]
    fn comparison_binds_tighter_than_logical_and() {
        let file = parse("fun test() { val x = 1 < 2 && true }").unwrap();

        let Statement::VarDecl { initializer, .. } = &file.functions[0].body.statements[0] else {
            panic!("expected a var declaration");
        };

        let Expression::Binary { operator, .. } = initializer else {
            panic!("expected a binary initializer");
        };
        assert_eq!(operator.kind, TokenKind::LogicalAnd);
    }

    #[test]
    fn if_else_statement() {
        let file = parse("fun test() { if (true) { return 1 } else { return 0 } }").unwrap();

        let Statement::If { else_branch, .. } = &file.functions[0].body.statements[0] else {
            panic!("expected an if statement");
        };
        assert!(else_branch.is_some());
    }

    #[test]
    fn assignment_needs_two_tokens_of_lookahead() {
        let file = parse("fun test() { var x = 1\n x = 2\n x + 1 }").unwrap();

        let statements = &file.functions[0].body.statements;
        assert!(matches!(statements[0], Statement::VarDecl { .. }));
        assert!(matches!(statements[1], Statement::Assignment { .. }));
        assert!(matches!(statements[2], Statement::Expression(_)));
    }

    #[test]
    fn return_without_value_before_brace() {
        let file = parse("fun test() { return }").unwrap();

        let Statement::Return { value, .. } = &file.functions[0].body.statements[0] else {
            panic!("expected a return statement");
        };
        assert!(value.is_none());
    }

    #[test]
    fn semicolons_separate_statements() {
        let file = parse("fun test(c: Boolean) { var x = 10; if (c) { x = 20 }; x = 30 }").unwrap();

        assert_eq!(file.functions[0].body.statements.len(), 3);
    }

    #[test]
    fn call_with_empty_and_multiple_arguments() {
        let file = parse("fun test() { f()\n g(1, 2, 3) }").unwrap();

        let statements = &file.functions[0].body.statements;

        let Statement::Expression(Expression::Call { arguments, .. }) = &statements[0] else {
            panic!("expected a call");
        };
        assert!(arguments.is_empty());

        let Statement::Expression(Expression::Call { arguments, .. }) = &statements[1] else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn break_and_continue_statements() {
        let file = parse("fun test() { while (true) { break\n continue } }").unwrap();

        let Statement::While { body, .. } = &file.functions[0].body.statements[0] else {
            panic!("expected a while statement");
        };
        let Statement::Block(block) = body.as_ref() else {
            panic!("expected a block body");
        };
        assert!(matches!(block.statements[0], Statement::Break(_)));
        assert!(matches!(block.statements[1], Statement::Continue(_)));
    }

    #[test]
    fn mismatch_aborts_with_a_static_message() {
        let error = parse("fun main( { }").unwrap_err();

        assert_eq!(error.message, "Expect parameter name.");
        assert_eq!(error.line, 1);
    }

    #[test]
    fn invalid_token_surfaces_as_parse_error() {
        let error = parse("fun main() { val x = 1 & 2 }").unwrap_err();

        assert_eq!(error.message, "Expect expression.");
    }

    #[test]
    fn reserved_keyword_in_statement_position_fails() {
        assert!(parse("fun main() { class }").is_err());
    }
}
