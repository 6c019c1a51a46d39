//! Renders the SSA module in its textual form: `%<id>` for instruction
//! results, `%<name>` for parameters, decimal for constants, phi incomings
//! in insertion order.

use core::fmt::Write;

use itertools::Itertools;

use crate::middle::ssa::{BinaryOp, Function, Instruction, InstructionKind, Module, Type, Value};

impl Module {
    pub fn dump(&self) -> String {
        let mut out = String::new();

        for function in &self.functions {
            function.dump_into(&mut out);
        }

        out
    }
}

impl Function {
    fn dump_into(&self, out: &mut String) {
        let parameters = self
            .arguments
            .iter()
            .map(|argument| format!("{} %{}", argument.ty, argument.name))
            .join(", ");

        let _ = writeln!(
            out,
            "define {} @{}({}) {{",
            self.return_type, self.name, parameters
        );

        for block in self.blocks.iter() {
            let _ = writeln!(out, "{}:", block.label);

            for instr in &block.instructions {
                let _ = writeln!(out, "  {}", self.format_instruction(&self.instructions[*instr]));
            }
        }

        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }

    fn format_value(&self, value: Value) -> String {
        match value {
            Value::Constant(constant) => constant.value.to_string(),
            Value::Argument(id) => format!("%{}", self.arguments[id].name),
            Value::Instruction(id) => format!(
                "%{}",
                self.instructions[id]
                    .id
                    .expect("only value-producing instructions appear as operands")
            ),
            Value::Function(name) => format!("@{name}"),
        }
    }

    fn format_instruction(&self, instruction: &Instruction) -> String {
        let name = |i: &Instruction| format!("%{}", i.id.expect("value instruction has an id"));

        match &instruction.kind {
            InstructionKind::Binary { op, left, right } => format!(
                "{} = {} {} {}, {}",
                name(instruction),
                binary_op_name(*op),
                self.value_type(*left),
                self.format_value(*left),
                self.format_value(*right),
            ),
            InstructionKind::Not { operand } => format!(
                "{} = not {} {}",
                name(instruction),
                self.value_type(*operand),
                self.format_value(*operand),
            ),
            InstructionKind::Phi { incomings } => format!(
                "{} = phi {} {}",
                name(instruction),
                instruction.ty,
                incomings
                    .iter()
                    .map(|(block, value)| format!(
                        "[ {}, %{} ]",
                        self.format_value(*value),
                        self.blocks[*block].label
                    ))
                    .join(", "),
            ),
            InstructionKind::Call { callee, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| {
                        format!("{} {}", self.value_type(*argument), self.format_value(*argument))
                    })
                    .join(", ");

                let call = format!(
                    "call {} {}({})",
                    instruction.ty,
                    self.format_value(*callee),
                    arguments
                );

                match instruction.ty {
                    Type::Void => call,
                    _ => format!("{} = {}", name(instruction), call),
                }
            }
            InstructionKind::Br { target } => {
                format!("br label %{}", self.blocks[*target].label)
            }
            InstructionKind::CondBr {
                condition,
                then_block,
                else_block,
            } => format!(
                "condbr i1 {}, label %{}, label %{}",
                self.format_value(*condition),
                self.blocks[*then_block].label,
                self.blocks[*else_block].label,
            ),
            InstructionKind::Ret { value: Some(value) } => format!(
                "ret {} {}",
                self.value_type(*value),
                self.format_value(*value)
            ),
            InstructionKind::Ret { value: None } => "ret void".to_owned(),
        }
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::SDiv => "sdiv",
        BinaryOp::SRem => "srem",
        BinaryOp::ICmpEq => "icmp eq",
        BinaryOp::ICmpNe => "icmp ne",
        BinaryOp::ICmpLt => "icmp lt",
        BinaryOp::ICmpLe => "icmp le",
        BinaryOp::ICmpGt => "icmp gt",
        BinaryOp::ICmpGe => "icmp ge",
    }
}
