//! AST to SSA lowering.
//!
//! There is no alloca/load/store stage and no separate dominance analysis:
//! the generator threads an *environment* (variable name -> current SSA
//! value) through the walk. Assignments rebind names; control-flow merges
//! reconcile the environments of their predecessors, emitting a phi exactly
//! where two predecessors disagree on a variable's value. Loop headers
//! create their phis up front and backpatch the back-edge incomings once the
//! body is lowered.

use std::collections::BTreeMap;

use crate::{
    frontend::{
        ast::{Block, Expression, File, FunctionDecl, Statement},
        intern::InternedSymbol,
        lexer::{Keyword, Token, TokenKind},
    },
    middle::{
        semantic::FunctionSignatures,
        ssa::{builder::FunctionBuilder, BinaryOp, BlockId, InstrId, Module, Type, Value},
        ty,
    },
};

/// Maps each source variable to the SSA value that currently represents it.
/// Ordered so that header phi creation is deterministic.
type Environment = BTreeMap<InternedSymbol, Value>;

struct LoopContext {
    header: BlockId,
    exit: BlockId,
    header_phis: BTreeMap<InternedSymbol, InstrId>,
    /// Blocks that branched to the exit via `break`, with their environments
    breaks: Vec<(BlockId, Environment)>,
}

/// Lowers a checked file into an SSA module. Only call this on programs the
/// semantic analyzer accepted; lowering assumes names resolve, types fit,
/// and literals are in range.
pub fn generate(file: &File, signatures: &FunctionSignatures) -> Module {
    let mut module = Module::default();

    for function in &file.functions {
        module.functions.push(lower_function(function, signatures));
    }

    module
}

fn lower_type(ty: ty::Type) -> Type {
    match ty {
        ty::Type::Int => Type::I32,
        ty::Type::Boolean => Type::I1,
        ty::Type::Unit => Type::Void,
        _ => unreachable!("types without an IR representation are rejected during analysis"),
    }
}

fn lower_function(function: &FunctionDecl, signatures: &FunctionSignatures) -> super::Function {
    let signature = signatures
        .get(&function.name.lexeme)
        .expect("every lowered function was declared during analysis");

    let parameters = function
        .parameters
        .iter()
        .map(|parameter| {
            (
                parameter.name.lexeme,
                lower_type(ty::Type::from_name(parameter.ty.value())),
            )
        })
        .collect();

    let builder = FunctionBuilder::new(
        function.name.lexeme,
        lower_type(signature.return_type),
        parameters,
    );

    let mut context = FunctionLoweringContext {
        env: builder.argument_values().into_iter().collect(),
        builder,
        signatures,
        loops: Vec::new(),
    };

    context.lower_block(&function.body);

    // Safety net: well-typed programs that always return never reach this,
    // but every block must end terminated
    if !context.builder.is_terminated(context.builder.insert_point()) {
        let value = match context.builder.function().return_type {
            Type::Void => None,
            Type::I32 => Some(context.builder.i32_constant(0)),
            Type::I1 => Some(context.builder.i1_constant(false)),
        };
        context.builder.create_ret(value);
    }

    context.builder.finish()
}

struct FunctionLoweringContext<'a> {
    builder: FunctionBuilder,
    env: Environment,
    signatures: &'a FunctionSignatures,
    loops: Vec<LoopContext>,
}

impl<'a> FunctionLoweringContext<'a> {
    fn lower_block(&mut self, block: &Block) {
        for statement in &block.statements {
            // Anything after a terminator is unreachable; emitting it would
            // leave instructions behind the block's terminator
            if self.builder.is_terminated(self.builder.insert_point()) {
                break;
            }

            self.lower_statement(statement);
        }
    }

    fn lower_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => {
                // Bindings introduced inside the block go out of scope with
                // it; mutations of outer variables persist. Without this,
                // dead inner bindings would grow loop-header phis whose
                // incomings fail the dominance rule.
                let outer: Vec<InternedSymbol> = self.env.keys().copied().collect();
                self.lower_block(block);
                self.env.retain(|name, _| outer.contains(name));
            }
            Statement::VarDecl {
                name, initializer, ..
            } => {
                let value = self.lower_expression(initializer);
                self.env.insert(name.lexeme, value);
            }
            Statement::Assignment { name, value } => {
                let value = self.lower_expression(value);
                self.env.insert(name.lexeme, value);
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref()),
            Statement::While { condition, body } => self.lower_while(condition, body),
            Statement::Return { value, .. } => {
                let value = value.as_ref().map(|value| self.lower_expression(value));
                self.builder.create_ret(value);
            }
            Statement::Break(_) => self.lower_break(),
            Statement::Continue(_) => self.lower_continue(),
            Statement::Expression(expression) => {
                self.lower_expression(expression);
            }
        }
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then_branch: &Statement,
        else_branch: Option<&Statement>,
    ) {
        let condition = self.lower_expression(condition);

        let then_block = self.builder.create_block("if.then");
        let else_block = self.builder.create_block("if.else");
        let merge_block = self.builder.create_block("if.merge");

        self.builder.create_cond_br(condition, then_block, else_block);
        let env_before = self.env.clone();

        self.builder.set_insert_point(then_block);
        self.lower_statement(then_branch);
        let then_out = self.builder.insert_point();
        let then_env = self.env.clone();
        let then_flows = !self.builder.is_terminated(then_out);
        if then_flows {
            self.builder.create_br(merge_block);
        }

        self.builder.set_insert_point(else_block);
        self.env = env_before;
        if let Some(else_branch) = else_branch {
            self.lower_statement(else_branch);
        }
        let else_out = self.builder.insert_point();
        let else_env = self.env.clone();
        let else_flows = !self.builder.is_terminated(else_out);
        if else_flows {
            self.builder.create_br(merge_block);
        }

        self.builder.set_insert_point(merge_block);

        let mut predecessors = Vec::new();
        if then_flows {
            predecessors.push((then_out, then_env));
        }
        if else_flows {
            predecessors.push((else_out, else_env));
        }
        self.phi_merge(predecessors);
    }

    fn lower_while(&mut self, condition: &Expression, body: &Statement) {
        let preheader = self.builder.insert_point();
        let header = self.builder.create_block("while.header");
        let body_block = self.builder.create_block("while.body");
        let exit = self.builder.create_block("while.exit");

        self.builder.create_br(header);
        self.builder.set_insert_point(header);

        // One phi per live variable, initial incoming from the preheader;
        // the back edges are filled in once the body is lowered
        let env_before = self.env.clone();
        let mut header_phis = BTreeMap::new();

        for (name, value) in &env_before {
            let ty = self.builder.function().value_type(*value);
            let phi = self.builder.create_phi(ty);
            self.builder.add_incoming(phi, preheader, *value);
            header_phis.insert(*name, phi);
            self.env.insert(*name, Value::Instruction(phi));
        }

        let condition = self.lower_expression(condition);
        let condition_out = self.builder.insert_point();
        self.builder.create_cond_br(condition, body_block, exit);

        self.loops.push(LoopContext {
            header,
            exit,
            header_phis: header_phis.clone(),
            breaks: Vec::new(),
        });

        self.builder.set_insert_point(body_block);
        self.lower_statement(body);
        let body_out = self.builder.insert_point();
        let body_flows = !self.builder.is_terminated(body_out);
        if body_flows {
            self.builder.create_br(header);
        }

        let context = self.loops.pop().unwrap();

        if body_flows {
            for (name, phi) in &header_phis {
                self.builder.add_incoming(*phi, body_out, self.env[name]);
            }
        }

        // After the loop the header's value is the effective one even when
        // the body never ran
        self.builder.set_insert_point(exit);
        self.env = env_before;
        for (name, phi) in &header_phis {
            self.env.insert(*name, Value::Instruction(*phi));
        }

        if !context.breaks.is_empty() {
            // Only variables that exist outside the loop survive it; body
            // locals captured by a break's environment are dead here
            let mut predecessors = vec![(condition_out, self.env.clone())];
            predecessors.extend(
                context
                    .breaks
                    .into_iter()
                    .map(|(block, mut env)| {
                        env.retain(|name, _| header_phis.contains_key(name));
                        (block, env)
                    }),
            );
            self.phi_merge(predecessors);
        }
    }

    fn lower_break(&mut self) {
        let block = self.builder.insert_point();
        let env = self.env.clone();

        let context = self
            .loops
            .last_mut()
            .expect("analysis rejects break outside of a loop");
        context.breaks.push((block, env));

        let exit = context.exit;
        self.builder.create_br(exit);
    }

    fn lower_continue(&mut self) {
        let block = self.builder.insert_point();

        let context = self
            .loops
            .last()
            .expect("analysis rejects continue outside of a loop");
        let header = context.header;
        let phis: Vec<(InternedSymbol, InstrId)> = context
            .header_phis
            .iter()
            .map(|(name, phi)| (*name, *phi))
            .collect();

        for (name, phi) in phis {
            self.builder.add_incoming(phi, block, self.env[&name]);
        }

        self.builder.create_br(header);
    }

    /// Reconciles the environments of a merge block's predecessors. Each
    /// entry is a predecessor that actually branches into the merge block
    /// (paths ending in ret, break, or continue are not passed in). A phi is
    /// emitted exactly when the predecessors disagree on a variable that all
    /// of them define; a variable missing from some predecessor is dead past
    /// the merge (its scope ended), so the first definition is adopted.
    fn phi_merge(&mut self, predecessors: Vec<(BlockId, Environment)>) {
        if predecessors.is_empty() {
            return;
        }

        let mut names: Vec<InternedSymbol> = Vec::new();
        for (_, env) in &predecessors {
            for name in env.keys() {
                if !names.contains(name) {
                    names.push(*name);
                }
            }
        }

        for name in names {
            let incomings: Vec<(BlockId, Value)> = predecessors
                .iter()
                .filter_map(|(block, env)| env.get(&name).map(|value| (*block, *value)))
                .collect();

            let (_, first) = incomings[0];
            let defined_everywhere = incomings.len() == predecessors.len();
            let all_same = incomings.iter().all(|(_, value)| *value == first);

            if all_same || !defined_everywhere {
                self.env.insert(name, first);
            } else {
                let ty = self.builder.function().value_type(first);
                let phi = self.builder.create_phi(ty);

                for (block, value) in incomings {
                    self.builder.add_incoming(phi, block, value);
                }

                self.env.insert(name, Value::Instruction(phi));
            }
        }
    }

    fn lower_expression(&mut self, expression: &Expression) -> Value {
        match expression {
            Expression::Binary {
                left,
                operator,
                right,
            } => self.lower_binary(left, operator, right),
            Expression::Unary { operator, operand } => {
                let operand = self.lower_expression(operand);

                match operator.kind {
                    TokenKind::Bang => self.builder.create_not(operand),
                    TokenKind::Minus => {
                        let zero = self.builder.i32_constant(0);
                        self.builder.create_binary(BinaryOp::Sub, zero, operand)
                    }
                    _ => unreachable!("parser only produces '!' and '-' unary operators"),
                }
            }
            Expression::Literal(token) => self.lower_literal(token),
            Expression::Variable(name) => self.env[&name.lexeme],
            Expression::Call { callee, arguments } => self.lower_call(callee, arguments),
            Expression::Grouping(inner) => self.lower_expression(inner),
        }
    }

    fn lower_binary(&mut self, left: &Expression, operator: &Token, right: &Expression) -> Value {
        // Short-circuit operators lower to control flow, not instructions
        if operator.kind == TokenKind::LogicalAnd {
            return self.lower_short_circuit(left, right, false);
        }
        if operator.kind == TokenKind::LogicalOr {
            return self.lower_short_circuit(left, right, true);
        }

        let left = self.lower_expression(left);
        let right = self.lower_expression(right);

        let op = match operator.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Asterisk => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::SDiv,
            TokenKind::Percent => BinaryOp::SRem,
            TokenKind::DoubleEquals => BinaryOp::ICmpEq,
            TokenKind::NotEquals => BinaryOp::ICmpNe,
            TokenKind::LessThan => BinaryOp::ICmpLt,
            TokenKind::LessThanOrEqualTo => BinaryOp::ICmpLe,
            TokenKind::GreaterThan => BinaryOp::ICmpGt,
            TokenKind::GreaterThanOrEqualTo => BinaryOp::ICmpGe,
            _ => unreachable!("not a binary operator token"),
        };

        self.builder.create_binary(op, left, right)
    }

    /// `a && b` evaluates `b` only when `a` is true; `a || b` only when `a`
    /// is false. The skipping edge contributes the short-circuit constant to
    /// the merge phi. The start block is captured after the left operand so
    /// nested short-circuits keep one incoming per real predecessor.
    fn lower_short_circuit(
        &mut self,
        left: &Expression,
        right: &Expression,
        is_or: bool,
    ) -> Value {
        let left = self.lower_expression(left);
        let start = self.builder.insert_point();

        let (rhs_label, merge_label) = if is_or {
            ("or.rhs", "or.merge")
        } else {
            ("and.rhs", "and.merge")
        };
        let rhs_block = self.builder.create_block(rhs_label);
        let merge_block = self.builder.create_block(merge_label);

        if is_or {
            self.builder.create_cond_br(left, merge_block, rhs_block);
        } else {
            self.builder.create_cond_br(left, rhs_block, merge_block);
        }

        self.builder.set_insert_point(rhs_block);
        let right = self.lower_expression(right);
        let rhs_out = self.builder.insert_point();
        self.builder.create_br(merge_block);

        self.builder.set_insert_point(merge_block);
        let phi = self.builder.create_phi(Type::I1);
        let skipped = self.builder.i1_constant(is_or);
        self.builder.add_incoming(phi, start, skipped);
        self.builder.add_incoming(phi, rhs_out, right);

        Value::Instruction(phi)
    }

    fn lower_literal(&mut self, token: &Token) -> Value {
        match token.kind {
            TokenKind::IntegerLiteral => {
                let value = token
                    .lexeme
                    .value()
                    .parse::<i32>()
                    .expect("analysis range-checks integer literals");
                self.builder.i32_constant(value)
            }
            TokenKind::Keyword(Keyword::True) => self.builder.i1_constant(true),
            TokenKind::Keyword(Keyword::False) => self.builder.i1_constant(false),
            _ => unreachable!("analysis rejects float, string, and null literals"),
        }
    }

    fn lower_call(&mut self, callee: &Token, arguments: &[Expression]) -> Value {
        let arguments = arguments
            .iter()
            .map(|argument| self.lower_expression(argument))
            .collect();

        // The callee's return type comes from the analyzer's function table,
        // so user-defined Unit functions lower to void calls
        let signature = self
            .signatures
            .get(&callee.lexeme)
            .expect("analysis rejects calls to undefined functions");

        self.builder
            .create_call(lower_type(signature.return_type), callee.lexeme, arguments)
    }
}
