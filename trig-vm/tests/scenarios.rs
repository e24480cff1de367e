//! End-to-end lowering scenarios against an in-memory scenario map.

use rstest::rstest;
use trig_asm::{parse_triggers, ActionKind, ConditionKind, NumericComparison, Trigger};
use trig_vm::prelude::*;

const H: usize = DEFAULT_HYPER_TRIGGER_COUNT;

/// First register handle that is free for user code.
const R0: Register = RESERVED_REGISTERS;

fn compile(ir: &[Instruction]) -> (Vec<Trigger>, Compiler) {
    compile_with(ir, Config::default(), MapData::blank())
}

fn compile_batch8(ir: &[Instruction]) -> (Vec<Trigger>, Compiler) {
    let config = Config {
        copy_batch_size: 8,
        ..Config::default()
    };
    compile_with(ir, config, MapData::blank())
}

fn compile_with(ir: &[Instruction], config: Config, mut map: MapData) -> (Vec<Trigger>, Compiler) {
    let compiler = Compiler::new(config);
    let count = compiler.compile(ir, &mut map).expect("compilation failed");
    let triggers = parse_triggers(map.triggers.as_ref().unwrap().bytes()).expect("parse");
    assert_eq!(triggers.len(), count);
    (triggers, compiler)
}

fn is_hyper(trigger: &Trigger) -> bool {
    trigger.conditions[0].kind == ConditionKind::Always
        && trigger.actions[0].kind == ActionKind::PreserveTrigger
        && trigger.actions[1..]
            .iter()
            .all(|a| a.kind == ActionKind::Wait && a.milliseconds == 0)
}

/// The address a trigger answers to, read back from its counter test.
fn address_of(trigger: &Trigger, compiler: &Compiler) -> Option<u32> {
    let ic = compiler.registers().lookup(REG_INSTRUCTION_COUNTER).unwrap();
    let test = &trigger.conditions[0];
    (test.kind == ConditionKind::Deaths
        && test.player == ic.player as u32
        && test.unit == ic.unit
        && test.comparison == NumericComparison::Exactly as u8)
        .then_some(test.quantity)
}

#[test]
fn set_reg_emits_one_trigger_plus_hypers() {
    let (triggers, compiler) = compile(&[Instruction::SetReg {
        register: R0,
        value: 5,
    }]);
    assert_eq!(triggers.len(), 1 + H);

    let body = &triggers[0];
    assert_eq!(address_of(body, &compiler), Some(0));

    let r0 = compiler.registers().lookup(R0).unwrap();
    let set = &body.actions[1];
    assert_eq!(set.kind, ActionKind::SetDeaths);
    assert_eq!(set.player, r0.player as u32);
    assert_eq!(set.arg1, r0.unit);
    assert_eq!(set.arg0, 5);

    assert!(triggers[1..].iter().all(is_hyper));
}

#[test]
fn push_pop_emits_the_drain_fanout() {
    let (triggers, compiler) = compile_batch8(&[
        Instruction::Push {
            source: PushSource::Literal(3),
        },
        Instruction::Pop { register: Some(R0) },
    ]);

    // Head trigger, four drain steps (8, 4, 2, 1), the finisher, hypers.
    assert_eq!(triggers.len(), 1 + 4 + 1 + H);

    let head = &triggers[0];
    assert_eq!(address_of(head, &compiler), Some(0));
    // Stack cell := 3, destination := 0, jump to the drain address.
    assert_eq!(head.actions[1].arg0, 3);
    assert_eq!(head.actions[2].arg0, 0);
    assert_eq!(head.actions[3].arg0, 1);

    let r0 = compiler.registers().lookup(R0).unwrap();
    let mut steps = Vec::new();
    for drain in &triggers[1..5] {
        assert_eq!(address_of(drain, &compiler), Some(1));
        // dec stack cell, inc destination by the same step
        let dec = &drain.actions[1];
        let inc = &drain.actions[2];
        assert_eq!(dec.arg0, inc.arg0);
        assert_eq!(inc.player, r0.player as u32);
        assert_eq!(inc.arg1, r0.unit);
        steps.push(dec.arg0);
    }
    assert_eq!(steps, vec![8, 4, 2, 1]);

    let finisher = &triggers[5];
    assert_eq!(address_of(finisher, &compiler), Some(1));
    assert_eq!(finisher.conditions[1].quantity, 0);
    assert_eq!(
        finisher.conditions[1].comparison,
        NumericComparison::Exactly as u8
    );
}

#[test]
fn add_drains_left_into_right() {
    let (triggers, compiler) = compile_batch8(&[
        Instruction::Push {
            source: PushSource::Literal(2),
        },
        Instruction::Push {
            source: PushSource::Literal(3),
        },
        Instruction::Add,
    ]);

    assert_eq!(triggers.len(), 1 + 4 + 1 + H);

    let head = &triggers[0];
    assert_eq!(head.actions[1].arg0, 2);
    assert_eq!(head.actions[2].arg0, 3);

    // The two pushed cells are adjacent; the drain moves the upper cell
    // (holding 3) into the lower one (holding 2).
    let upper = (head.actions[2].player, head.actions[2].arg1);
    let lower = (head.actions[1].player, head.actions[1].arg1);
    for drain in &triggers[1..5] {
        assert_eq!(address_of(drain, &compiler), Some(1));
        let dec = &drain.actions[1];
        let inc = &drain.actions[2];
        assert_eq!((dec.player, dec.arg1), upper);
        assert_eq!((inc.player, inc.arg1), lower);
    }

    // Finisher resumes past the add block.
    let finisher = &triggers[5];
    assert_eq!(finisher.actions[1].arg0, 2);
}

#[test]
fn jmp_if_eq_splits_into_complementary_triggers() {
    let (triggers, compiler) = compile(&[
        Instruction::JmpIfEq {
            register: R0,
            value: 0,
            target: JumpTarget::Relative(2),
        },
        Instruction::SetReg {
            register: R0,
            value: 1,
        },
        Instruction::Jmp {
            target: JumpTarget::Relative(0),
        },
    ]);

    assert_eq!(triggers.len(), 3 + H);

    let taken = &triggers[0];
    let fallthrough = &triggers[1];
    let looped = &triggers[2];

    assert_eq!(address_of(taken, &compiler), Some(0));
    assert_eq!(address_of(fallthrough, &compiler), Some(0));
    assert_eq!(address_of(looped, &compiler), Some(1));

    // r == 0 side, patched to the loop head's address.
    assert_eq!(taken.conditions[1].quantity, 0);
    assert_eq!(taken.conditions[1].comparison, NumericComparison::Exactly as u8);
    assert_eq!(taken.actions[1].arg0, 1);

    // r >= 1 side sets the register, then follows to the same address.
    assert_eq!(fallthrough.conditions[1].quantity, 1);
    assert_eq!(
        fallthrough.conditions[1].comparison,
        NumericComparison::AtLeast as u8
    );
    assert_eq!(fallthrough.actions[2].arg0, 1);

    // The final jump loops forever.
    assert_eq!(looped.actions[1].arg0, 1);
}

#[test]
fn events_precede_code_and_keep_their_owner() {
    let mut map = MapData::blank();
    map.add_location("Arena");

    let ir = [
        Instruction::Event {
            switch: RESERVED_SWITCHES as u32,
            conditions: 1,
        },
        Instruction::BringCond {
            player: 1,
            comparison: NumericComparison::AtLeast,
            unit: 0,
            location: "Arena".into(),
            quantity: 1,
        },
        Instruction::DisplayMsg {
            audience: Audience::Player(0),
            message: "hi".into(),
        },
    ];
    let (triggers, _) = compile_with(&ir, Config::default(), map);

    assert_eq!(triggers.len(), 2 + H);

    let event = &triggers[0];
    // Floating: no counter test, gated on the events mutex instead.
    assert_eq!(event.conditions[0].kind, ConditionKind::Switch);
    assert_eq!(event.conditions[1].kind, ConditionKind::Bring);
    assert_eq!(event.conditions[1].player, 1);
    // Owned by the observed player, not the triggers owner.
    assert_eq!(event.execution_mask[1], 1);
    assert_eq!(event.execution_mask[0], 0);
    // Latches the event switch.
    assert_eq!(event.actions[1].kind, ActionKind::SetSwitch);
    assert_eq!(event.actions[1].arg0, RESERVED_SWITCHES as u32);

    // The body lowers inline on the main trigger.
    let body = &triggers[1];
    assert_eq!(body.actions[1].kind, ActionKind::DisplayTextMessage);
}

#[test]
fn multiply_routine_is_shared_and_reachable() {
    let (triggers, compiler) = compile_batch8(&[
        Instruction::Push {
            source: PushSource::Literal(7),
        },
        Instruction::Push {
            source: PushSource::Literal(6),
        },
        Instruction::Mul,
        Instruction::Push {
            source: PushSource::Literal(2),
        },
        Instruction::Mul,
    ]);

    // Every jump lands on an existing address (or the open program end).
    let addresses: Vec<u32> = triggers
        .iter()
        .filter_map(|t| address_of(t, &compiler))
        .collect();
    let max = addresses.iter().copied().max().unwrap();

    let ic = compiler.registers().lookup(REG_INSTRUCTION_COUNTER).unwrap();
    for trigger in &triggers {
        for action in &trigger.actions {
            if action.kind == ActionKind::SetDeaths
                && action.player == ic.player as u32
                && action.arg1 == ic.unit
                && action.modifier == trig_asm::NumberModifier::SetTo as u8
                && action.arg0 != 0
            {
                let dest = action.arg0;
                assert!(
                    addresses.contains(&dest) || dest > max,
                    "jump to {dest} has no trigger"
                );
            }
        }
    }

    // The indirect-jump drains are floating and mutex-guarded.
    let floating: Vec<_> = triggers
        .iter()
        .filter(|t| !is_hyper(t) && address_of(t, &compiler).is_none())
        .collect();
    assert!(!floating.is_empty());
    for hop in floating {
        assert_eq!(hop.conditions[0].kind, ConditionKind::Switch);
    }
}

#[test]
fn empty_ir_yields_only_hyper_triggers() {
    let (triggers, _) = compile(&[]);
    assert_eq!(triggers.len(), H);
    assert!(triggers.iter().all(is_hyper));
}

#[test]
fn infinite_loop_is_a_single_trigger() {
    let (triggers, compiler) = compile(&[Instruction::Jmp {
        target: JumpTarget::Absolute(0),
    }]);
    assert_eq!(triggers.len(), 1 + H);

    let looped = &triggers[0];
    assert_eq!(address_of(looped, &compiler), Some(0));
    assert_eq!(looped.actions[1].arg0, 0);
}

#[rstest]
#[case(1, 1)]
#[case(8, 4)]
#[case(64, 7)]
#[case(8192, 14)]
fn drain_step_count_follows_the_batch(#[case] batch: u32, #[case] steps: usize) {
    let (triggers, _) = compile_with(
        &[
            Instruction::Push {
                source: PushSource::Literal(3),
            },
            Instruction::Pop { register: Some(R0) },
        ],
        Config {
            copy_batch_size: batch,
            ..Config::default()
        },
        MapData::blank(),
    );
    assert_eq!(triggers.len(), 1 + steps + 1 + H);
}

#[test]
fn stack_top_sentinel_follows_the_stack_pointer() {
    let (triggers, compiler) = compile(&[
        Instruction::Push {
            source: PushSource::Literal(1),
        },
        Instruction::SetReg {
            register: REG_STACK_TOP,
            value: 9,
        },
    ]);

    let cells = compiler.registers().len();
    let top = compiler.registers().lookup(cells - 1).unwrap();
    let body = &triggers[0];
    // Both the push and the symbolic write hit the same (live) top cell.
    assert_eq!(body.actions[1].player, top.player as u32);
    assert_eq!(body.actions[1].arg1, top.unit);
    assert_eq!(body.actions[2].player, top.player as u32);
    assert_eq!(body.actions[2].arg1, top.unit);
    assert_eq!(body.actions[2].arg0, 9);
}

#[test]
fn effects_for_other_players_take_the_one_tick_detour() {
    let (triggers, compiler) = compile(&[Instruction::DisplayMsg {
        audience: Audience::Player(3),
        message: "for player four".into(),
    }]);

    // Head (jump out), settle (wait + resume), the effect record, hypers;
    // the resume trigger itself carries nothing and is pruned.
    assert_eq!(triggers.len(), 3 + H);

    let settle = &triggers[1];
    assert_eq!(settle.actions[1].kind, ActionKind::Wait);

    let effect = &triggers[2];
    assert_eq!(address_of(effect, &compiler), Some(1));
    assert_eq!(effect.actions[1].kind, ActionKind::DisplayTextMessage);
    assert_eq!(effect.execution_mask[3], 1);
    assert_eq!(effect.execution_mask[0], 0);
}

#[test]
fn broadcast_effects_execute_for_all_players() {
    let (triggers, _) = compile(&[Instruction::EndGame {
        audience: Audience::All,
        kind: EndGameKind::Draw,
    }]);

    let draw = triggers
        .iter()
        .find(|t| t.actions.iter().any(|a| a.kind == ActionKind::Draw))
        .expect("draw trigger");
    assert!(draw.execution_mask[..8].iter().all(|&b| b == 1));
}

#[test]
fn preserved_triggers_follow_the_generated_ones() {
    let mut map = MapData::blank();
    let mut existing = Trigger::default();
    existing.execute_for(4);
    existing.conditions[0] = trig_asm::Condition::always();
    existing.actions[0] = trig_asm::Action::victory();
    map.triggers
        .as_mut()
        .unwrap()
        .set_bytes(trig_asm::serialize_triggers(&[existing.clone()]));

    let config = Config {
        preserve_triggers: true,
        ..Config::default()
    };
    let compiler = Compiler::new(config);
    let count = compiler
        .compile(
            &[Instruction::SetReg {
                register: R0,
                value: 1,
            }],
            &mut map,
        )
        .unwrap();

    let triggers = parse_triggers(map.triggers.as_ref().unwrap().bytes()).unwrap();
    assert_eq!(triggers.len(), count + 1);
    assert_eq!(triggers.last().unwrap(), &existing);
}

#[test]
fn missing_chunks_are_rejected_up_front() {
    let mut map = MapData::blank();
    map.strings = None;
    let err = Compiler::new(Config::default())
        .compile(&[], &mut map)
        .unwrap_err();
    assert_eq!(err, CodegenError::MissingChunk(ChunkKind::Strings));

    let mut map = MapData::blank();
    map.triggers = None;
    let err = Compiler::new(Config::default())
        .compile(&[], &mut map)
        .unwrap_err();
    assert_eq!(err, CodegenError::MissingChunk(ChunkKind::Triggers));
}

#[test]
fn unknown_locations_fail_with_their_name() {
    let err = Compiler::new(Config::default())
        .compile(
            &[Instruction::Ping {
                audience: Audience::Player(0),
                location: "Nowhere".into(),
            }],
            &mut MapData::blank(),
        )
        .unwrap_err();
    match err {
        CodegenError::LocationNotFound { name, ir } => {
            assert_eq!(name, "Nowhere");
            assert_eq!(ir, Some(0));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn division_is_not_implemented() {
    let err = Compiler::new(Config::default())
        .compile(&[Instruction::Div], &mut MapData::blank())
        .unwrap_err();
    assert!(matches!(
        err,
        CodegenError::NotImplemented { ir: Some(0), .. }
    ));
}

#[test]
fn stack_misuse_is_caught_at_compile_time() {
    // Popping an empty stack underflows.
    let err = Compiler::new(Config::default())
        .compile(&[Instruction::Pop { register: None }], &mut MapData::blank())
        .unwrap_err();
    assert_eq!(err, CodegenError::StackUnderflow { ir: Some(0) });

    // A tiny custom map overflows after a few pushes.
    let defs: Vec<RegisterDef> = (0..10)
        .map(|unit| RegisterDef {
            player: 0,
            unit: unit as u16 + 200,
        })
        .collect();
    let compiler = Compiler::with_register_map(Config::default(), defs);
    let ir: Vec<Instruction> = (0..10)
        .map(|_| Instruction::Push {
            source: PushSource::Literal(1),
        })
        .collect();
    let err = compiler.compile(&ir, &mut MapData::blank()).unwrap_err();
    assert!(matches!(err, CodegenError::StackOverflow { .. }));
}

#[test]
fn unit_templates_fill_cuwp_slots() {
    let mut map = MapData::blank();
    map.add_location("Spawn Pad");

    let ir = [
        Instruction::Unit { properties: 2 },
        Instruction::UnitProp {
            kind: UnitPropertyKind::HitPoints,
            value: 250,
        },
        Instruction::UnitProp {
            kind: UnitPropertyKind::Invincible,
            value: 1,
        },
        Instruction::Spawn {
            player: 0,
            unit: 0,
            quantity: Quantity::Literal(4),
            location: "Spawn Pad".into(),
            properties: Some(0),
        },
    ];

    let compiler = Compiler::new(Config::default());
    compiler.compile(&ir, &mut map).unwrap();

    let slots = map.unit_slots.as_ref().unwrap();
    let slot = slots.get(0);
    assert_eq!(slot.owner, 255);
    assert_eq!(slot.hit_points, 100); // clamped
    assert_ne!(slot.state_flags & 0x10, 0); // invincible

    assert!(map.used_unit_slots.as_ref().unwrap().is_used(0));

    let triggers = parse_triggers(map.triggers.as_ref().unwrap().bytes()).unwrap();
    let spawn = triggers
        .iter()
        .flat_map(|t| t.actions.iter())
        .find(|a| a.kind == ActionKind::CreateUnitWithProperties)
        .expect("create-unit action");
    assert_eq!(spawn.modifier, 4);
    assert_eq!(spawn.arg0, 1); // slot 0, one-based in the record
}
