//! Emits the SSA module as textual LLVM IR. The mapping is mostly one to
//! one; the differences from the custom printer are LLVM's spellings
//! (signed icmp predicates, `xor` for boolean not, `br i1` for conditional
//! branches) and `declare` lines for external callees such as the runtime's
//! print functions.

use std::collections::BTreeMap;

use core::fmt::Write;

use itertools::Itertools;

use crate::{
    frontend::intern::InternedSymbol,
    middle::ssa::{BinaryOp, Function, Instruction, InstructionKind, Module, Type, Value},
};

pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    let mut externals: BTreeMap<InternedSymbol, (Type, Vec<Type>)> = BTreeMap::new();

    let defined: Vec<InternedSymbol> = module.functions.iter().map(|f| f.name).collect();

    for function in &module.functions {
        emit_function(function, &mut out);

        // Record calls to functions this module does not define so they can
        // be declared for the linker
        for instruction in function.instructions.iter() {
            if let InstructionKind::Call { callee, arguments } = &instruction.kind {
                let Value::Function(name) = callee else {
                    unreachable!("call targets are function values");
                };

                if !defined.contains(name) {
                    let argument_types =
                        arguments.iter().map(|a| function.value_type(*a)).collect();
                    externals.insert(*name, (instruction.ty, argument_types));
                }
            }
        }
    }

    for (name, (return_type, argument_types)) in externals {
        let _ = writeln!(
            out,
            "declare {} @{}({})",
            llvm_type(return_type),
            name,
            argument_types.iter().map(|ty| llvm_type(*ty)).join(", ")
        );
    }

    out
}

fn emit_function(function: &Function, out: &mut String) {
    let parameters = function
        .arguments
        .iter()
        .map(|argument| format!("{} %{}", llvm_type(argument.ty), argument.name))
        .join(", ");

    let _ = writeln!(
        out,
        "define {} @{}({}) {{",
        llvm_type(function.return_type),
        function.name,
        parameters
    );

    for block in function.blocks.iter() {
        let _ = writeln!(out, "{}:", block.label);

        for instr in &block.instructions {
            let _ = writeln!(out, "  {}", emit_instruction(function, &function.instructions[*instr]));
        }
    }

    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn llvm_type(ty: Type) -> &'static str {
    match ty {
        Type::I32 => "i32",
        Type::I1 => "i1",
        Type::Void => "void",
    }
}

fn value_ref(function: &Function, value: Value) -> String {
    match value {
        Value::Constant(constant) => constant.value.to_string(),
        Value::Argument(id) => format!("%{}", function.arguments[id].name),
        Value::Instruction(id) => format!(
            "%t{}",
            function.instructions[id]
                .id
                .expect("only value-producing instructions appear as operands")
        ),
        Value::Function(name) => format!("@{name}"),
    }
}

fn emit_instruction(function: &Function, instruction: &Instruction) -> String {
    let result = |i: &Instruction| format!("%t{}", i.id.expect("value instruction has an id"));

    match &instruction.kind {
        InstructionKind::Binary { op, left, right } => {
            let ty = llvm_type(function.value_type(*left));
            let left = value_ref(function, *left);
            let right = value_ref(function, *right);

            match binary_op(*op) {
                LlvmBinaryOp::Arithmetic(name) => {
                    format!("{} = {} {} {}, {}", result(instruction), name, ty, left, right)
                }
                LlvmBinaryOp::Comparison(predicate) => format!(
                    "{} = icmp {} {} {}, {}",
                    result(instruction),
                    predicate,
                    ty,
                    left,
                    right
                ),
            }
        }
        InstructionKind::Not { operand } => format!(
            "{} = xor i1 {}, true",
            result(instruction),
            value_ref(function, *operand)
        ),
        InstructionKind::Phi { incomings } => format!(
            "{} = phi {} {}",
            result(instruction),
            llvm_type(instruction.ty),
            incomings
                .iter()
                .map(|(block, value)| format!(
                    "[ {}, %{} ]",
                    value_ref(function, *value),
                    function.blocks[*block].label
                ))
                .join(", ")
        ),
        InstructionKind::Call { callee, arguments } => {
            let arguments = arguments
                .iter()
                .map(|argument| {
                    format!(
                        "{} {}",
                        llvm_type(function.value_type(*argument)),
                        value_ref(function, *argument)
                    )
                })
                .join(", ");

            let call = format!(
                "call {} {}({})",
                llvm_type(instruction.ty),
                value_ref(function, *callee),
                arguments
            );

            match instruction.ty {
                Type::Void => call,
                _ => format!("{} = {}", result(instruction), call),
            }
        }
        InstructionKind::Br { target } => {
            format!("br label %{}", function.blocks[*target].label)
        }
        InstructionKind::CondBr {
            condition,
            then_block,
            else_block,
        } => format!(
            "br i1 {}, label %{}, label %{}",
            value_ref(function, *condition),
            function.blocks[*then_block].label,
            function.blocks[*else_block].label
        ),
        InstructionKind::Ret { value: Some(value) } => format!(
            "ret {} {}",
            llvm_type(function.value_type(*value)),
            value_ref(function, *value)
        ),
        InstructionKind::Ret { value: None } => "ret void".to_owned(),
    }
}

enum LlvmBinaryOp {
    Arithmetic(&'static str),
    Comparison(&'static str),
}

fn binary_op(op: BinaryOp) -> LlvmBinaryOp {
    match op {
        BinaryOp::Add => LlvmBinaryOp::Arithmetic("add"),
        BinaryOp::Sub => LlvmBinaryOp::Arithmetic("sub"),
        BinaryOp::Mul => LlvmBinaryOp::Arithmetic("mul"),
        BinaryOp::SDiv => LlvmBinaryOp::Arithmetic("sdiv"),
        BinaryOp::SRem => LlvmBinaryOp::Arithmetic("srem"),
        BinaryOp::ICmpEq => LlvmBinaryOp::Comparison("eq"),
        BinaryOp::ICmpNe => LlvmBinaryOp::Comparison("ne"),
        BinaryOp::ICmpLt => LlvmBinaryOp::Comparison("slt"),
        BinaryOp::ICmpLe => LlvmBinaryOp::Comparison("sle"),
        BinaryOp::ICmpGt => LlvmBinaryOp::Comparison("sgt"),
        BinaryOp::ICmpGe => LlvmBinaryOp::Comparison("sge"),
    }
}
