//! Property-based invariants over generated trigger programs.

use proptest::prelude::*;

use trig_asm::{parse_triggers, serialize_triggers, ActionKind, ConditionKind, NumberModifier};
use trig_vm::prelude::*;

const R0: Register = RESERVED_REGISTERS;

fn simple_instruction() -> impl Strategy<Value = Vec<Instruction>> {
    prop_oneof![
        (0..4usize, 0u32..1000).prop_map(|(r, value)| vec![Instruction::SetReg {
            register: R0 + r,
            value,
        }]),
        (0..4usize, 1u32..100).prop_map(|(r, amount)| vec![Instruction::IncReg {
            register: R0 + r,
            amount,
        }]),
        (0..4usize, 1u32..100).prop_map(|(r, amount)| vec![Instruction::DecReg {
            register: R0 + r,
            amount,
        }]),
        (0u32..2000).prop_map(|milliseconds| vec![Instruction::Wait { milliseconds }]),
        (20u32..30, any::<bool>()).prop_map(|(switch, state)| vec![Instruction::SetSw {
            switch,
            state,
        }]),
        (-3i32..=3).prop_map(|offset| vec![Instruction::Jmp {
            target: JumpTarget::Relative(offset),
        }]),
        (0..4usize, 0u32..5, -3i32..=3).prop_map(|(r, value, offset)| vec![
            Instruction::JmpIfEq {
                register: R0 + r,
                value,
                target: JumpTarget::Relative(offset),
            }
        ]),
        (0u32..50, 0..4usize).prop_map(|(value, r)| vec![
            Instruction::Push {
                source: PushSource::Literal(value),
            },
            Instruction::Pop {
                register: Some(R0 + r),
            },
        ]),
    ]
}

fn program() -> impl Strategy<Value = Vec<Instruction>> {
    prop::collection::vec(simple_instruction(), 0..12)
        .prop_map(|groups| groups.into_iter().flatten().collect())
}

fn compile_bytes(ir: &[Instruction], batch: u32) -> Vec<u8> {
    let mut map = MapData::blank();
    let compiler = Compiler::new(Config {
        copy_batch_size: batch,
        ..Config::default()
    });
    compiler.compile(ir, &mut map).expect("compilation failed");
    map.triggers.unwrap().bytes().to_vec()
}

proptest! {
    /// Identical input and configuration produce identical bytes.
    #[test]
    fn emission_is_deterministic(ir in program(), batch in prop::sample::select(vec![1u32, 8, 64, 8192])) {
        let first = compile_bytes(&ir, batch);
        let second = compile_bytes(&ir, batch);
        prop_assert_eq!(first, second);
    }

    /// The emitted chunk survives a parse/serialize round trip.
    #[test]
    fn chunk_round_trips(ir in program()) {
        let bytes = compile_bytes(&ir, 8);
        let triggers = parse_triggers(&bytes).expect("parse");
        prop_assert_eq!(serialize_triggers(&triggers), bytes);
    }

    /// Every counter rewrite lands on an emitted address or past the end of
    /// the program (the open program-end address).
    #[test]
    fn jumps_stay_inside_the_program(ir in program(), batch in prop::sample::select(vec![1u32, 8, 256])) {
        let compiler = Compiler::new(Config {
            copy_batch_size: batch,
            ..Config::default()
        });
        let mut map = MapData::blank();
        compiler.compile(&ir, &mut map).expect("compilation failed");
        let triggers = parse_triggers(map.triggers.as_ref().unwrap().bytes()).expect("parse");

        let counter = compiler.registers().lookup(REG_INSTRUCTION_COUNTER).unwrap();
        let addresses: Vec<u32> = triggers
            .iter()
            .filter_map(|t| {
                let test = &t.conditions[0];
                (test.kind == ConditionKind::Deaths
                    && test.player == counter.player as u32
                    && test.unit == counter.unit)
                    .then_some(test.quantity)
            })
            .collect();
        let end = addresses.iter().copied().max().unwrap_or(0);

        for trigger in &triggers {
            for action in &trigger.actions {
                if action.kind == ActionKind::SetDeaths
                    && action.player == counter.player as u32
                    && action.arg1 == counter.unit
                    && action.modifier == NumberModifier::SetTo as u8
                {
                    let dest = action.arg0;
                    prop_assert!(
                        addresses.contains(&dest) || dest >= end,
                        "jump to {} missing from {:?}",
                        dest,
                        addresses
                    );
                }
            }
        }
    }

    /// Every program ends in the hyper-trigger tail that keeps the engine
    /// ticking at frame rate.
    #[test]
    fn hyper_triggers_close_the_program(ir in program()) {
        let bytes = compile_bytes(&ir, 8);
        let triggers = parse_triggers(&bytes).expect("parse");
        prop_assert!(triggers.len() >= DEFAULT_HYPER_TRIGGER_COUNT);
        for hyper in &triggers[triggers.len() - DEFAULT_HYPER_TRIGGER_COUNT..] {
            prop_assert_eq!(hyper.conditions[0].kind, ConditionKind::Always);
            prop_assert_eq!(hyper.actions[0].kind, ActionKind::PreserveTrigger);
            prop_assert!(hyper.actions[1..]
                .iter()
                .all(|a| a.kind == ActionKind::Wait && a.milliseconds == 0));
        }
    }
}

#[test]
fn batch_size_only_changes_the_drain_granularity() {
    let ir = [
        Instruction::Push {
            source: PushSource::Literal(9),
        },
        Instruction::Pop { register: Some(R0) },
    ];

    let small = parse_triggers(&compile_bytes(&ir, 1)).unwrap();
    let large = parse_triggers(&compile_bytes(&ir, 8192)).unwrap();

    // Same shape, different number of drain steps.
    let drains = |triggers: &[trig_asm::Trigger]| {
        triggers
            .iter()
            .filter(|t| {
                t.actions
                    .iter()
                    .any(|a| a.modifier == NumberModifier::Subtract as u8)
            })
            .count()
    };
    assert_eq!(drains(&small), 1);
    assert_eq!(drains(&large), 14); // 8192 down to 1
}
