use hashbrown::HashMap;

use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec},
    middle::ssa::{
        Argument, BasicBlock, BinaryOp, BlockId, Constant, Function, InstrId, Instruction,
        InstructionKind, Type, Value,
    },
};

/// Builds one function: keeps a current insertion block and a fresh-id
/// counter, and checks the IR's structural invariants as instructions are
/// appended (operand types match signatures, phis sit at block starts,
/// nothing follows a terminator).
#[derive(Debug)]
pub struct FunctionBuilder {
    function: Function,
    insert_point: BlockId,
    next_id: u32,
    label_uses: HashMap<String, u32>,
}

impl FunctionBuilder {
    /// Creates the function together with its entry block, which starts out
    /// as the insertion point.
    pub fn new(
        name: InternedSymbol,
        return_type: Type,
        parameters: Vec<(InternedSymbol, Type)>,
    ) -> Self {
        let mut arguments = IndexVec::new();

        for (name, ty) in parameters {
            arguments.push(Argument { name, ty });
        }

        let mut builder = Self {
            function: Function {
                name,
                return_type,
                arguments,
                blocks: IndexVec::new(),
                instructions: IndexVec::new(),
            },
            insert_point: BlockId::new(0),
            next_id: 0,
            label_uses: HashMap::new(),
        };

        let entry = builder.create_block("entry");
        builder.set_insert_point(entry);

        builder
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn finish(self) -> Function {
        self.function
    }

    pub fn argument_values(&self) -> Vec<(InternedSymbol, Value)> {
        self.function
            .arguments
            .enumerate()
            .map(|(id, argument)| (argument.name, Value::Argument(id)))
            .collect()
    }

    /// Labels are uniqued with a numeric suffix so sibling constructs can
    /// both ask for e.g. `if.then`.
    pub fn create_block(&mut self, label: &str) -> BlockId {
        let uses = self.label_uses.entry(label.to_owned()).or_insert(0);
        let unique = if *uses == 0 {
            label.to_owned()
        } else {
            format!("{label}{uses}")
        };
        *uses += 1;

        self.function.blocks.push(BasicBlock {
            label: unique,
            instructions: Vec::new(),
        })
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.insert_point = block;
    }

    pub fn insert_point(&self) -> BlockId {
        self.insert_point
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.function.is_terminated(block)
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn append(&mut self, kind: InstructionKind, ty: Type, id: Option<u32>) -> InstrId {
        let block = self.insert_point;

        assert!(
            !self.function.is_terminated(block),
            "cannot append to terminated block {}",
            self.function.blocks[block].label
        );

        if let InstructionKind::Phi { .. } = kind {
            assert!(
                self.function.blocks[block]
                    .instructions
                    .iter()
                    .all(|i| matches!(self.function.instructions[*i].kind, InstructionKind::Phi { .. })),
                "phi instructions must come first in their block"
            );
        }

        let instr = self.function.instructions.push(Instruction {
            kind,
            ty,
            id,
            block,
        });
        self.function.blocks[block].instructions.push(instr);

        instr
    }

    fn append_value(&mut self, kind: InstructionKind, ty: Type) -> Value {
        let id = self.fresh_id();
        Value::Instruction(self.append(kind, ty, Some(id)))
    }

    pub fn create_binary(&mut self, op: BinaryOp, left: Value, right: Value) -> Value {
        let left_ty = self.function.value_type(left);
        let right_ty = self.function.value_type(right);

        assert_eq!(left_ty, right_ty, "binary operands must share a type");
        if op.is_comparison() {
            // Equality also compares booleans; ordering is integer-only,
            // which the type checker already guarantees
            assert!(matches!(left_ty, Type::I32 | Type::I1));
        } else {
            assert_eq!(left_ty, Type::I32, "arithmetic requires i32 operands");
        }

        let ty = if op.is_comparison() { Type::I1 } else { Type::I32 };

        self.append_value(InstructionKind::Binary { op, left, right }, ty)
    }

    pub fn create_not(&mut self, operand: Value) -> Value {
        assert_eq!(self.function.value_type(operand), Type::I1);

        self.append_value(InstructionKind::Not { operand }, Type::I1)
    }

    /// Creates a phi with no incomings; they are backpatched one
    /// predecessor at a time via [`Self::add_incoming`].
    pub fn create_phi(&mut self, ty: Type) -> InstrId {
        let id = self.fresh_id();

        self.append(
            InstructionKind::Phi {
                incomings: Vec::new(),
            },
            ty,
            Some(id),
        )
    }

    pub fn add_incoming(&mut self, phi: InstrId, block: BlockId, value: Value) {
        assert_eq!(
            self.function.value_type(value),
            self.function.instructions[phi].ty,
            "phi incoming type must match the phi's type"
        );

        let InstructionKind::Phi { incomings } = &mut self.function.instructions[phi].kind else {
            panic!("add_incoming called on a non-phi instruction");
        };

        incomings.push((block, value));
    }

    pub fn create_call(
        &mut self,
        return_type: Type,
        callee: InternedSymbol,
        arguments: Vec<Value>,
    ) -> Value {
        let kind = InstructionKind::Call {
            callee: Value::Function(callee),
            arguments,
        };

        if return_type == Type::Void {
            Value::Instruction(self.append(kind, Type::Void, None))
        } else {
            self.append_value(kind, return_type)
        }
    }

    pub fn create_br(&mut self, target: BlockId) {
        self.append(InstructionKind::Br { target }, Type::Void, None);
    }

    pub fn create_cond_br(&mut self, condition: Value, then_block: BlockId, else_block: BlockId) {
        assert_eq!(self.function.value_type(condition), Type::I1);

        self.append(
            InstructionKind::CondBr {
                condition,
                then_block,
                else_block,
            },
            Type::Void,
            None,
        );
    }

    pub fn create_ret(&mut self, value: Option<Value>) {
        if let Some(value) = value {
            assert_eq!(
                self.function.value_type(value),
                self.function.return_type,
                "return value type must match the function signature"
            );
        }

        self.append(InstructionKind::Ret { value }, Type::Void, None);
    }

    pub fn i32_constant(&self, value: i32) -> Value {
        Value::Constant(Constant::i32(value))
    }

    pub fn i1_constant(&self, value: bool) -> Value {
        Value::Constant(Constant::i1(value as i32))
    }
}
