//! The SSA intermediate representation. Control structures are reduced to
//! labeled blocks and branches; every value has exactly one defining
//! instruction, and variables that differ across control-flow paths are
//! joined by phi instructions at merge points.
//!
//! Ownership is strict-tree: a module owns its functions, a function owns
//! its blocks, arguments, and an instruction arena; operands are copyable
//! handles (`Value`) into that arena.

use crate::{
    frontend::intern::InternedSymbol,
    index::{simple_index, IndexVec},
};

pub mod ast_lowering;
pub mod builder;
pub mod pretty_print;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    I32,
    I1,
    Void,
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Type::I32 => "i32",
            Type::I1 => "i1",
            Type::Void => "void",
        })
    }
}

simple_index! {
    /// Identifies a basic block within its function
    pub struct BlockId;
}

simple_index! {
    /// Identifies an instruction within its function's arena
    pub struct InstrId;
}

simple_index! {
    /// Identifies a function argument
    pub struct ArgId;
}

/// A copyable handle to anything that can appear as an operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Constant(Constant),
    Argument(ArgId),
    Instruction(InstrId),
    /// Only valid as the target of a call
    Function(InternedSymbol),
}

/// Constants are plain values and may be freely duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub ty: Type,
    pub value: i32,
}

impl Constant {
    pub fn i32(value: i32) -> Self {
        Self {
            ty: Type::I32,
            value,
        }
    }

    pub fn i1(value: i32) -> Self {
        Self {
            ty: Type::I1,
            value,
        }
    }
}

/// The SSA definition of a function parameter.
#[derive(Debug, Clone, Copy)]
pub struct Argument {
    pub name: InternedSymbol,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    ICmpEq,
    ICmpNe,
    ICmpLt,
    ICmpLe,
    ICmpGt,
    ICmpGe,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::ICmpEq
                | BinaryOp::ICmpNe
                | BinaryOp::ICmpLt
                | BinaryOp::ICmpLe
                | BinaryOp::ICmpGt
                | BinaryOp::ICmpGe
        )
    }
}

#[derive(Debug)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Void for terminators and void-returning calls
    pub ty: Type,
    /// Fresh numeric identifier, assigned in increasing order to every
    /// value-producing instruction; terminators and void calls have none
    pub id: Option<u32>,
    /// Back-reference to the owning block
    pub block: BlockId,
}

#[derive(Debug)]
pub enum InstructionKind {
    Binary {
        op: BinaryOp,
        left: Value,
        right: Value,
    },
    /// Logical not, the only unary instruction
    Not {
        operand: Value,
    },
    /// Incomings are kept in insertion order, one per predecessor
    Phi {
        incomings: Vec<(BlockId, Value)>,
    },
    Call {
        callee: Value,
        arguments: Vec<Value>,
    },
    Br {
        target: BlockId,
    },
    CondBr {
        condition: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret {
        value: Option<Value>,
    },
}

impl InstructionKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionKind::Br { .. } | InstructionKind::CondBr { .. } | InstructionKind::Ret { .. }
        )
    }
}

#[derive(Debug)]
pub struct BasicBlock {
    /// Unique within the owning function
    pub label: String,
    /// Ordered instruction ids into the function's arena
    pub instructions: Vec<InstrId>,
}

#[derive(Debug)]
pub struct Function {
    pub name: InternedSymbol,
    pub return_type: Type,
    pub arguments: IndexVec<ArgId, Argument>,
    /// The first block is the entry
    pub blocks: IndexVec<BlockId, BasicBlock>,
    pub instructions: IndexVec<InstrId, Instruction>,
}

impl Function {
    pub fn value_type(&self, value: Value) -> Type {
        match value {
            Value::Constant(constant) => constant.ty,
            Value::Argument(id) => self.arguments[id].ty,
            Value::Instruction(id) => self.instructions[id].ty,
            Value::Function(_) => unreachable!("function operands are only valid as call targets"),
        }
    }

    /// A block is terminated iff its last instruction is br, condbr, or ret.
    pub fn terminator(&self, block: BlockId) -> Option<&Instruction> {
        let last = *self.blocks[block].instructions.last()?;
        let instruction = &self.instructions[last];

        instruction.kind.is_terminator().then_some(instruction)
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator(block).is_some()
    }

    /// The predecessors of `block`, in block order.
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks
            .indices()
            .filter(|b| match self.terminator(*b).map(|t| &t.kind) {
                Some(InstructionKind::Br { target }) => *target == block,
                Some(InstructionKind::CondBr {
                    then_block,
                    else_block,
                    ..
                }) => *then_block == block || *else_block == block,
                _ => false,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}
