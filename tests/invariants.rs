//! Structural checks over generated IR: every block terminated exactly once,
//! phi incomings matching real predecessors, unique instruction ids, and
//! defs dominating uses.

use std::collections::{BTreeMap, BTreeSet};

use kotlite::{
    frontend::{lexer::Lexer, parser::Parser},
    index::Index,
    middle::{
        semantic::SemanticAnalyzer,
        ssa::{ast_lowering, BlockId, Function, InstructionKind, Module, Value},
    },
};

const PROGRAMS: &[&str] = &[
    "fun main() { val x = 1 + 2 * 3 }",
    "fun test(c: Boolean): Int { var x = 10; if (c) { x = 20 } else { x = 30 }; return x }",
    "fun test(a: Boolean, b: Boolean): Boolean { return a && b }",
    "fun test(a: Boolean, b: Boolean): Boolean { return a || b }",
    "fun test(a: Boolean, b: Boolean, c: Boolean): Boolean { return a && (b || c) }",
    "fun sum(n: Int): Int { var s = 0; var i = 0; while (i < n) { s = s + i; i = i + 1 }; return s }",
    "fun f(c: Boolean): Int { if (c) { return 1 } else { return 2 } }",
    "fun f(c: Boolean): Int { var x = 1; if (c) { return 0 } else { x = 2 }; return x }",
    "fun f(c: Boolean) { if (c) { print_i32(1) } }",
    "fun f(a: Boolean): Int { var i = 0; while (a && i < 3) { i = i + 1 }; return i }",
    "fun f(n: Int): Int { var x = 0; while (true) { if (n > 5) { x = 99; break }; x = 1 }; return x }",
    "fun f(n: Int): Int { var s = 0; var i = 0; while (i < n) { i = i + 1; if (i == 3) { continue }; s = s + i }; return s }",
    "fun f(n: Int): Int {\n\
     \x20   var total = 0\n\
     \x20   var i = 0\n\
     \x20   while (i < n) {\n\
     \x20       var j = 0\n\
     \x20       while (j < i) {\n\
     \x20           if (j % 2 == 0) { total = total + j } else { total = total - 1 }\n\
     \x20           j = j + 1\n\
     \x20       }\n\
     \x20       i = i + 1\n\
     \x20   }\n\
     \x20   return total\n\
     }",
    "fun abs(x: Int): Int { if (x < 0) { return -x }; return x }\n\
     fun main() { print_i32(abs(-5)) }",
    "fun f(n: Int): Int { var i = 0; while (i < n) { if (i == 7) { break }; i = i + 1 }; return i }",
    "fun f(a: Boolean, b: Boolean): Boolean { return a == b && a != b }",
];

fn modules() -> Vec<Module> {
    PROGRAMS
        .iter()
        .map(|source| {
            let file = Parser::parse(Lexer::new(source).tokenize()).expect("source should parse");

            let mut analyzer = SemanticAnalyzer::new();
            analyzer.analyze(&file);
            assert!(
                analyzer.errors().is_empty(),
                "unexpected semantic errors for {source:?}: {:#?}",
                analyzer.errors()
            );

            ast_lowering::generate(&file, &analyzer.function_signatures())
        })
        .collect()
}

/// dom(entry) = {entry}; dom(b) = {b} ∪ ⋂ dom(preds). Unreachable blocks
/// keep the full set, which makes their checks vacuous.
fn dominators(function: &Function) -> BTreeMap<BlockId, BTreeSet<BlockId>> {
    let all: BTreeSet<BlockId> = function.blocks.indices().collect();
    let entry = BlockId::new(0);

    let mut dom: BTreeMap<BlockId, BTreeSet<BlockId>> = function
        .blocks
        .indices()
        .map(|b| {
            if b == entry {
                (b, BTreeSet::from([b]))
            } else {
                (b, all.clone())
            }
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;

        for block in function.blocks.indices() {
            if block == entry {
                continue;
            }

            let mut next: Option<BTreeSet<BlockId>> = None;
            for pred in function.predecessors(block) {
                next = Some(match next {
                    None => dom[&pred].clone(),
                    Some(acc) => acc.intersection(&dom[&pred]).copied().collect(),
                });
            }

            let mut next = next.unwrap_or_else(|| all.clone());
            next.insert(block);

            if next != dom[&block] {
                dom.insert(block, next);
                changed = true;
            }
        }
    }

    dom
}

fn defining_block(function: &Function, value: Value) -> Option<BlockId> {
    match value {
        Value::Instruction(id) => Some(function.instructions[id].block),
        // Constants, arguments, and function references dominate everything
        _ => None,
    }
}

#[test]
fn t1_every_block_is_terminated_exactly_once() {
    for module in modules() {
        for function in &module.functions {
            for (block_id, block) in function.blocks.enumerate() {
                assert!(
                    function.is_terminated(block_id),
                    "block {} of @{} is not terminated",
                    block.label,
                    function.name
                );

                let terminators = block
                    .instructions
                    .iter()
                    .filter(|i| function.instructions[**i].kind.is_terminator())
                    .count();
                assert_eq!(
                    terminators, 1,
                    "block {} of @{} has {} terminators",
                    block.label, function.name, terminators
                );
            }
        }
    }
}

#[test]
fn t2_phi_incomings_match_predecessors() {
    for module in modules() {
        for function in &module.functions {
            for (block_id, block) in function.blocks.enumerate() {
                let predecessors: BTreeSet<BlockId> =
                    function.predecessors(block_id).into_iter().collect();

                for instr in &block.instructions {
                    let InstructionKind::Phi { incomings } = &function.instructions[*instr].kind
                    else {
                        continue;
                    };

                    let incoming_blocks: BTreeSet<BlockId> =
                        incomings.iter().map(|(b, _)| *b).collect();

                    assert_eq!(
                        incoming_blocks.len(),
                        incomings.len(),
                        "phi in {} of @{} has duplicate incomings",
                        block.label,
                        function.name
                    );
                    assert_eq!(
                        incoming_blocks, predecessors,
                        "phi in {} of @{} does not cover its predecessors",
                        block.label, function.name
                    );
                }
            }
        }
    }
}

#[test]
fn t3_definitions_dominate_uses() {
    for module in modules() {
        for function in &module.functions {
            let dom = dominators(function);

            for (block_id, block) in function.blocks.enumerate() {
                for instr in &block.instructions {
                    let instruction = &function.instructions[*instr];

                    let check = |value: Value, use_block: BlockId| {
                        if let Some(def_block) = defining_block(function, value) {
                            assert!(
                                dom[&use_block].contains(&def_block),
                                "value defined in {} does not dominate its use in {} (@{})",
                                function.blocks[def_block].label,
                                function.blocks[use_block].label,
                                function.name
                            );
                        }
                    };

                    match &instruction.kind {
                        InstructionKind::Binary { left, right, .. } => {
                            check(*left, block_id);
                            check(*right, block_id);
                        }
                        InstructionKind::Not { operand } => check(*operand, block_id),
                        // A phi's incoming must be available at the end of
                        // the predecessor it flows in from
                        InstructionKind::Phi { incomings } => {
                            for (pred, value) in incomings {
                                check(*value, *pred);
                            }
                        }
                        InstructionKind::Call { arguments, .. } => {
                            for argument in arguments {
                                check(*argument, block_id);
                            }
                        }
                        InstructionKind::CondBr { condition, .. } => check(*condition, block_id),
                        InstructionKind::Ret { value: Some(value) } => check(*value, block_id),
                        InstructionKind::Br { .. } | InstructionKind::Ret { value: None } => {}
                    }
                }
            }
        }
    }
}

#[test]
fn t4_instruction_ids_are_unique_and_increasing() {
    for module in modules() {
        for function in &module.functions {
            let ids: Vec<u32> = function
                .instructions
                .iter()
                .filter_map(|instruction| instruction.id)
                .collect();

            for window in ids.windows(2) {
                assert!(
                    window[0] < window[1],
                    "ids are not strictly increasing in @{}",
                    function.name
                );
            }
        }
    }
}

#[test]
fn phis_only_appear_at_the_start_of_a_block() {
    for module in modules() {
        for function in &module.functions {
            for block in function.blocks.iter() {
                let mut seen_non_phi = false;

                for instr in &block.instructions {
                    match function.instructions[*instr].kind {
                        InstructionKind::Phi { .. } => assert!(
                            !seen_non_phi,
                            "phi after non-phi in {} of @{}",
                            block.label, function.name
                        ),
                        _ => seen_non_phi = true,
                    }
                }
            }
        }
    }
}
