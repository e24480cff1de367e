//! The code generator: three passes from IR to trigger records.
//!
//! Pass 1 pre-emits unit-property templates and event triggers, pass 2
//! discovers jump targets, pass 3 lowers the instruction stream. Every
//! executable trigger gates on the instruction counter holding its address;
//! whichever of its actions rewrites the counter transfers control. Forward
//! jumps are recorded as patch-ups and resolved once every address is known.

use std::collections::{HashMap, HashSet};
use std::mem;

use itertools::iterate;
use tracing::{debug, warn};
use trig_asm::{
    serialize_triggers, Action, ActionFlags, Condition, LocationId, NumberModifier,
    NumericComparison, StringId, SwitchState, Trigger, ANY_LOCATION,
};

use crate::builder::TriggerBuilder;
use crate::config::Config;
use crate::consts::{
    Address, Register, ANY_LOCATION_NAME, MAX_TRIGGER_COUNT, REGISTERS_OWNER, REG_COPY_STORAGE,
    REG_INSTRUCTION_COUNTER, REG_STACK_TOP, SWITCH_PLAYER_BASE, SWITCH_RANDOM_BASE,
};
use crate::error::{ChunkKind, CodegenError, CodegenResult};
use crate::ir::{Instruction, PushSource};
use crate::map::{CuwpSlots, CuwpUsedSlots, LocationTable, MapData, StringTable};
use crate::registers::{RegisterDef, RegisterMap};

mod arith;
mod effects;
mod events;

/// Compiles IR streams against a scenario map.
///
/// The register map is built once at construction and never mutated; each
/// [`compile`] call runs with fresh per-run state, so a `Compiler` can be
/// reused across scenarios.
///
/// [`compile`]: Compiler::compile
#[derive(Debug, Clone)]
pub struct Compiler {
    config: Config,
    regs: RegisterMap,
}

impl Compiler {
    /// A compiler with the default register pool.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            regs: RegisterMap::with_default_pool(),
        }
    }

    /// A compiler with an explicit register map.
    pub fn with_register_map(config: Config, defs: Vec<RegisterDef>) -> Self {
        Self {
            config,
            regs: RegisterMap::from_defs(defs),
        }
    }

    /// The handle → cell binding in use.
    pub fn registers(&self) -> &RegisterMap {
        &self.regs
    }

    /// Lowers `ir` and writes the resulting trigger chunk into `map`,
    /// returning the number of generated records.
    ///
    /// On error nothing is written to the trigger chunk; the string table
    /// and unit-property slots may already hold entries for the part of the
    /// stream that was processed.
    pub fn compile(&self, ir: &[Instruction], map: &mut MapData) -> CodegenResult<usize> {
        if !(1..=8).contains(&self.config.triggers_owner) {
            return Err(CodegenError::malformed("triggers owner must be in 1..=8"));
        }

        let strings = map
            .strings
            .as_mut()
            .ok_or(CodegenError::MissingChunk(ChunkKind::Strings))?;
        let locations = map
            .locations
            .as_ref()
            .ok_or(CodegenError::MissingChunk(ChunkKind::Locations))?;
        let unit_slots = map
            .unit_slots
            .as_mut()
            .ok_or(CodegenError::MissingChunk(ChunkKind::UnitProperties))?;
        let used_unit_slots = map
            .used_unit_slots
            .as_mut()
            .ok_or(CodegenError::MissingChunk(ChunkKind::UnitPropertiesUsed))?;
        if map.triggers.is_none() {
            return Err(CodegenError::MissingChunk(ChunkKind::Triggers));
        }

        let owner = self.config.triggers_owner;
        if let Some(players) = map.player_slots.as_mut() {
            if players.is_human(owner - 1) {
                if self.config.force_computer_owner {
                    warn!(owner, "triggers owner is human; rewriting the slot to computer");
                    players.set_computer(owner - 1);
                } else {
                    warn!(owner, "triggers owner is a human slot; wait-based code will stall");
                }
            }
        }

        let mut batch = self.config.copy_batch_size.max(1);
        if !batch.is_power_of_two() {
            let rounded = 1u32 << (31 - batch.leading_zeros());
            warn!(batch, rounded, "copy batch size is not a power of two");
            batch = rounded;
        }

        let mut emitter = Emitter {
            config: &self.config,
            regs: &self.regs,
            batch,
            strings,
            locations,
            unit_slots,
            used_unit_slots,
            triggers: Vec::new(),
            patchups: Vec::new(),
            jump_targets: HashSet::new(),
            jump_addresses: HashMap::new(),
            stack_pointer: self.regs.len().saturating_sub(1),
            multiply_address: None,
            unit_slot_refs: Vec::new(),
        };
        emitter.run(ir)?;

        let generated = emitter.triggers;
        if generated.len() > MAX_TRIGGER_COUNT {
            warn!(
                count = generated.len(),
                "emitted more triggers than the engine is known to handle well"
            );
        }

        let mut bytes = serialize_triggers(&generated);
        let chunk = map
            .triggers
            .as_mut()
            .ok_or(CodegenError::MissingChunk(ChunkKind::Triggers))?;
        if self.config.preserve_triggers {
            bytes.extend_from_slice(chunk.bytes());
        }
        chunk.set_bytes(bytes);

        debug!(triggers = generated.len(), "compilation finished");
        Ok(generated.len())
    }
}

/// Per-run state of one compilation.
struct Emitter<'a> {
    config: &'a Config,
    regs: &'a RegisterMap,
    batch: u32,
    strings: &'a mut StringTable,
    locations: &'a LocationTable,
    unit_slots: &'a mut CuwpSlots,
    used_unit_slots: &'a mut CuwpUsedSlots,
    triggers: Vec<Trigger>,
    /// `(record index, IR index)` forward references resolved after lowering.
    patchups: Vec<(usize, usize)>,
    jump_targets: HashSet<usize>,
    jump_addresses: HashMap<usize, Address>,
    stack_pointer: usize,
    multiply_address: Option<Address>,
    /// Unit-declaration ordinal → allocated template slot.
    unit_slot_refs: Vec<u32>,
}

impl<'a> Emitter<'a> {
    fn run(&mut self, ir: &[Instruction]) -> CodegenResult<()> {
        self.preemit(ir)?;
        self.discover_jump_targets(ir);
        debug!(
            events = self.triggers.len(),
            jump_targets = self.jump_targets.len(),
            "pre-emission done"
        );

        let mut next_address: Address = 0;
        let mut current = self.builder(Self::alloc(&mut next_address))?;

        if ir.iter().any(|i| matches!(i, Instruction::Mul)) {
            self.emit_multiply_routine(&mut next_address)?;
            self.emit_indirect_jump_code()?;
        }

        for (i, instruction) in ir.iter().enumerate() {
            self.lower(ir, i, instruction, &mut current, &mut next_address)
                .map_err(|e| e.with_ir(i))?;
        }

        self.push(current);

        self.apply_patchups()?;
        self.prune_trailing_noop();
        self.append_hyper_triggers()?;
        Ok(())
    }

    fn discover_jump_targets(&mut self, ir: &[Instruction]) {
        for (i, instruction) in ir.iter().enumerate() {
            if let Some(target) = instruction.jump_target() {
                self.jump_targets.insert(target.resolve(i, ir.len()));
            }
        }
    }

    fn lower(
        &mut self,
        ir: &[Instruction],
        i: usize,
        instruction: &Instruction,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;

        // Jump-target boundary: land the label on a fresh address unless the
        // running trigger is still empty and can take it for free.
        if self.jump_targets.contains(&i) {
            if current.has_changes() {
                let address = Self::alloc(next_address);
                self.jump_addresses.insert(i, address);
                current.jump_to(regs, address)?;
                self.advance(current, address)?;
            } else if let Some(address) = current.address() {
                self.jump_addresses.insert(i, address);
            }
        }

        match instruction {
            Instruction::Push { source } => match *source {
                PushSource::Literal(value) => {
                    let top = self.push_slot()?;
                    current.set_reg(regs, top, value)?;
                }
                PushSource::Register(register) => {
                    let ret = Self::alloc(next_address);
                    let top = self.push_slot()?;
                    let copy_address = self.emit_copy(top, register, next_address, ret)?;

                    current.set_reg(regs, REG_COPY_STORAGE, 0)?;
                    current.jump_to(regs, copy_address)?;
                    self.advance(current, ret)?;
                }
            },

            Instruction::Pop { register } => match *register {
                None => {
                    self.pop_slot()?;
                }
                Some(register) => {
                    let copy_address = Self::alloc(next_address);
                    let top = self.pop_slot()?;

                    current.set_reg(regs, register, 0)?;
                    current.jump_to(regs, copy_address)?;
                    self.advance(current, copy_address)?;

                    for step in self.batches() {
                        let mut copy = self.builder(copy_address)?;
                        copy.test_reg(regs, top, step, NumericComparison::AtLeast)?;
                        copy.dec_reg(regs, top, step)?;
                        copy.inc_reg(regs, register, step)?;
                        self.push(copy);
                    }
                    // `current` was recreated at the copy address by the
                    // advance above; gate it on the drain being finished.
                    current.test_reg(regs, top, 0, NumericComparison::Exactly)?;
                }
            },

            Instruction::SetReg { register, value } => {
                let register = self.resolve_register(*register);
                current.set_reg(regs, register, *value)?;
            }
            Instruction::IncReg { register, amount } => {
                let register = self.resolve_register(*register);
                current.inc_reg(regs, register, *amount)?;
            }
            Instruction::DecReg { register, amount } => {
                let register = self.resolve_register(*register);
                current.dec_reg(regs, register, *amount)?;
            }

            Instruction::CopyReg { dst, src } => {
                let ret = Self::alloc(next_address);
                let dst = self.resolve_register(*dst);
                let src = self.resolve_register(*src);
                let copy_address = self.emit_copy(dst, src, next_address, ret)?;

                current.set_reg(regs, REG_COPY_STORAGE, 0)?;
                current.jump_to(regs, copy_address)?;
                self.advance(current, ret)?;
            }

            Instruction::Add => self.lower_add(current, next_address)?,
            Instruction::Sub => self.lower_sub(current, next_address)?,
            Instruction::Mul => self.lower_mul(current, next_address)?,
            Instruction::MulConst { value } => {
                self.lower_mul_const(current, next_address, *value)?
            }
            Instruction::Div => {
                return Err(CodegenError::NotImplemented {
                    what: "integer division",
                    ir: None,
                })
            }
            Instruction::Rnd256 => self.lower_rnd256(current, next_address)?,

            Instruction::Jmp { target } => {
                let target_ir = target.resolve(i, ir.len());
                let address = Self::alloc(next_address);
                let taken = mem::replace(current, self.builder(address)?);
                self.push_with_target(taken, target_ir);
            }

            Instruction::JmpIfEq { register, value, target } => {
                let register = self.test_register(*register)?;
                let target_ir = target.resolve(i, ir.len());
                let mut if_true = current.clone();

                if *value == 0 {
                    current.test_reg(regs, register, 1, NumericComparison::AtLeast)?;
                    if_true.test_reg(regs, register, 0, NumericComparison::Exactly)?;
                } else {
                    let mut if_false = current.clone();
                    current.test_reg(regs, register, value + 1, NumericComparison::AtLeast)?;
                    if_false.test_reg(regs, register, value - 1, NumericComparison::AtMost)?;
                    current.add_secondary(if_false);
                    if_true.test_reg(regs, register, *value, NumericComparison::Exactly)?;
                }
                self.push_with_target(if_true, target_ir);
            }

            Instruction::JmpIfNotEq { register, value, target } => {
                let register = self.test_register(*register)?;
                let target_ir = target.resolve(i, ir.len());

                if *value == 0 {
                    let mut if_true = current.clone();
                    current.test_reg(regs, register, 0, NumericComparison::Exactly)?;
                    if_true.test_reg(regs, register, 1, NumericComparison::AtLeast)?;
                    self.push_with_target(if_true, target_ir);
                } else {
                    let mut above = current.clone();
                    above.test_reg(regs, register, value + 1, NumericComparison::AtLeast)?;
                    self.push_with_target(above, target_ir);

                    let mut below = current.clone();
                    below.test_reg(regs, register, value - 1, NumericComparison::AtMost)?;
                    self.push_with_target(below, target_ir);

                    current.test_reg(regs, register, *value, NumericComparison::Exactly)?;
                }
            }

            Instruction::JmpIfGrt { register, value, target } => {
                let register = self.test_register(*register)?;
                let target_ir = target.resolve(i, ir.len());

                let mut if_true = current.clone();
                current.test_reg(regs, register, *value, NumericComparison::AtMost)?;
                if_true.test_reg(regs, register, value + 1, NumericComparison::AtLeast)?;
                self.push_with_target(if_true, target_ir);
            }

            Instruction::JmpIfGrtOrEq { register, value, target } => {
                let register = self.test_register(*register)?;
                let target_ir = target.resolve(i, ir.len());

                let mut if_true = current.clone();
                current.test_reg(
                    regs,
                    register,
                    value.saturating_sub(1),
                    NumericComparison::AtMost,
                )?;
                if_true.test_reg(regs, register, *value, NumericComparison::AtLeast)?;
                self.push_with_target(if_true, target_ir);
            }

            Instruction::JmpIfLess { register, value, target } => {
                // `r < 0` can never be taken; the whole instruction
                // evaporates.
                if *value > 0 {
                    let register = self.test_register(*register)?;
                    let target_ir = target.resolve(i, ir.len());

                    let mut if_true = current.clone();
                    current.test_reg(regs, register, *value, NumericComparison::AtLeast)?;
                    if_true.test_reg(regs, register, value - 1, NumericComparison::AtMost)?;
                    self.push_with_target(if_true, target_ir);
                }
            }

            Instruction::JmpIfLessOrEq { register, value, target } => {
                let register = self.test_register(*register)?;
                let target_ir = target.resolve(i, ir.len());

                let mut if_true = current.clone();
                current.test_reg(regs, register, value + 1, NumericComparison::AtLeast)?;
                if_true.test_reg(regs, register, *value, NumericComparison::AtMost)?;
                self.push_with_target(if_true, target_ir);
            }

            Instruction::JmpIfSwSet { switch, target } => {
                let target_ir = target.resolve(i, ir.len());
                let mut if_true = current.clone();
                current.test_switch(*switch, false)?;
                if_true.test_switch(*switch, true)?;
                self.push_with_target(if_true, target_ir);
            }

            Instruction::JmpIfSwNotSet { switch, target } => {
                let target_ir = target.resolve(i, ir.len());
                let mut if_true = current.clone();
                current.test_switch(*switch, true)?;
                if_true.test_switch(*switch, false)?;
                self.push_with_target(if_true, target_ir);
            }

            Instruction::SetSw { switch, state } => {
                let state = if *state {
                    SwitchState::Set
                } else {
                    SwitchState::Clear
                };
                current.set_switch(*switch, state)?;
            }

            Instruction::ChkPlayers => self.lower_chk_players(current, next_address)?,
            Instruction::IsPresent { players } => {
                self.lower_is_present(current, next_address, players)?
            }

            Instruction::Wait { milliseconds } => current.wait(*milliseconds)?,

            _ if instruction.is_preemitted() => {}

            other => self.lower_effect(current, next_address, other)?,
        }
        Ok(())
    }

    fn lower_chk_players(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let owner = self.config.triggers_owner;
        let start = Self::alloc(next_address);

        for player in 0..8u32 {
            current.set_switch(SWITCH_PLAYER_BASE + player, SwitchState::Clear)?;
        }
        current.jump_to(regs, start)?;
        self.advance(current, start)?;

        current.set_switch(SWITCH_PLAYER_BASE + owner as u32 - 1, SwitchState::Set)?;
        current.wait(0)?;

        for player in 0..8u8 {
            if player + 1 == owner {
                continue;
            }
            let mut probe = self.owned_builder(start, player + 1)?;
            probe.set_switch(SWITCH_PLAYER_BASE + player as u32, SwitchState::Set)?;
            self.push(probe);
        }
        Ok(())
    }

    fn lower_is_present(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
        players: &[trig_asm::PlayerId],
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let address = Self::alloc(next_address);
        let ret = Self::alloc(next_address);
        let top = self.push_slot()?;

        current.set_reg(regs, top, 0)?;
        current.jump_to(regs, address)?;
        self.advance(current, ret)?;

        let mut settle = self.builder(address)?;
        settle.wait(0)?;
        settle.jump_to(regs, ret)?;
        self.push(settle);

        for &player in players {
            let mut count = self.builder(address)?;
            count.test_switch(SWITCH_PLAYER_BASE + player as u32, true)?;
            count.inc_reg(regs, top, 1)?;
            self.push(count);
        }
        Ok(())
    }

    fn lower_rnd256(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let address = Self::alloc(next_address);

        for bit in 0..8u32 {
            current.set_switch(SWITCH_RANDOM_BASE + bit, SwitchState::Randomize)?;
        }
        let top = self.push_slot()?;
        current.set_reg(regs, top, 0)?;
        current.jump_to(regs, address)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        for bit in 0..8u32 {
            let mut gather = self.builder(address)?;
            gather.test_switch(SWITCH_RANDOM_BASE + bit, true)?;
            gather.inc_reg(regs, top, 1 << bit)?;
            self.push(gather);
        }

        let mut finish = self.builder(address)?;
        finish.jump_to(regs, ret)?;
        self.push(finish);
        Ok(())
    }

    // Plumbing shared by the lowering routines.

    fn alloc(next_address: &mut Address) -> Address {
        let address = *next_address;
        *next_address += 1;
        address
    }

    fn builder(&self, address: Address) -> CodegenResult<TriggerBuilder> {
        TriggerBuilder::new(self.regs, Some(address), self.config.triggers_owner)
    }

    fn owned_builder(&self, address: Address, owner: u8) -> CodegenResult<TriggerBuilder> {
        TriggerBuilder::new(self.regs, Some(address), owner)
    }

    fn floating_builder(&self, owner: u8) -> CodegenResult<TriggerBuilder> {
        TriggerBuilder::new(self.regs, None, owner)
    }

    /// Emits `current` and restarts it at `address`.
    fn advance(&mut self, current: &mut TriggerBuilder, address: Address) -> CodegenResult<()> {
        let next = self.builder(address)?;
        let done = mem::replace(current, next);
        self.push(done);
        Ok(())
    }

    fn push(&mut self, builder: TriggerBuilder) {
        self.triggers.extend(builder.into_triggers());
    }

    /// Emits `builder` and records a jump patch-up towards `target_ir` for
    /// each of its records.
    fn push_with_target(&mut self, builder: TriggerBuilder, target_ir: usize) {
        for trigger in builder.into_triggers() {
            self.patchups.push((self.triggers.len(), target_ir));
            self.triggers.push(trigger);
        }
    }

    /// Fan-out step sizes, largest first: `batch, batch/2, .., 2, 1`.
    fn batches(&self) -> impl Iterator<Item = u32> {
        iterate(self.batch, |b| b / 2).take_while(|&b| b >= 1)
    }

    /// Fan-out step sizes for unit-count actions, whose count byte caps the
    /// usable batch at 128.
    fn unit_batches(&self) -> impl Iterator<Item = u32> {
        iterate(self.batch.min(128), |b| b / 2).take_while(|&b| b >= 1)
    }

    fn push_slot(&mut self) -> CodegenResult<Register> {
        if self.stack_pointer == 0 {
            return Err(CodegenError::StackOverflow { ir: None });
        }
        let top = self.stack_pointer;
        self.stack_pointer -= 1;
        Ok(top)
    }

    fn pop_slot(&mut self) -> CodegenResult<Register> {
        if self.stack_pointer + 1 >= self.regs.len() {
            return Err(CodegenError::StackUnderflow { ir: None });
        }
        self.stack_pointer += 1;
        Ok(self.stack_pointer)
    }

    /// Translates `REG_STACK_TOP + k` handles to the live stack cell.
    fn resolve_register(&self, register: Register) -> Register {
        if register >= REG_STACK_TOP {
            self.stack_pointer + (register - REG_STACK_TOP) + 1
        } else {
            register
        }
    }

    /// The register a conditional jump reads; only the exact stack top may
    /// be addressed symbolically.
    fn test_register(&self, register: Register) -> CodegenResult<Register> {
        use std::cmp::Ordering;
        match register.cmp(&REG_STACK_TOP) {
            Ordering::Greater => Err(CodegenError::malformed(
                "conditional jump tests past the top of the stack",
            )),
            Ordering::Equal => Ok(self.stack_pointer + 1),
            Ordering::Less => Ok(register),
        }
    }

    /// Consumes a stack-borne quantity operand, returning the drained cell.
    fn stack_quantity(&mut self, register: Register, what: &str) -> CodegenResult<Register> {
        if register != REG_STACK_TOP {
            return Err(CodegenError::malformed(format!(
                "{what} expects its quantity on top of the stack"
            )));
        }
        self.pop_slot()
    }

    fn intern(&mut self, text: &str) -> StringId {
        self.strings.intern(text)
    }

    fn location_id(&mut self, name: &str) -> CodegenResult<LocationId> {
        if name.is_empty() {
            return Err(CodegenError::malformed("empty location name"));
        }
        if name == ANY_LOCATION_NAME {
            return Ok(ANY_LOCATION);
        }
        let not_found = || CodegenError::LocationNotFound {
            name: name.to_owned(),
            ir: None,
        };
        let string = self.strings.find(name).ok_or_else(not_found)?;
        self.locations
            .find_by_string(string + 1)
            .ok_or_else(not_found)
    }

    fn location_id_opt(&mut self, name: Option<&str>) -> CodegenResult<Option<LocationId>> {
        match name {
            Some(name) if !name.is_empty() => Ok(Some(self.location_id(name)?)),
            _ => Ok(None),
        }
    }

    fn apply_patchups(&mut self) -> CodegenResult<()> {
        let counter = self.regs.lookup(REG_INSTRUCTION_COUNTER)?;
        for &(record, target_ir) in &self.patchups {
            let address = self
                .jump_addresses
                .get(&target_ir)
                .copied()
                .ok_or_else(|| {
                    CodegenError::malformed("jump to an instruction that was never lowered")
                        .with_ir(target_ir)
                })?;

            let trigger = &mut self.triggers[record];
            let slot = trigger
                .first_free_action()
                .ok_or(CodegenError::TriggerActionsFull {
                    ir: Some(target_ir),
                })?;

            let mut jump = Action::set_deaths(
                counter.player as u32,
                counter.unit,
                NumberModifier::SetTo,
                address,
            );
            jump.flags = ActionFlags::UNIT_TYPE_USED.bits();
            trigger.actions[slot] = jump;
        }
        Ok(())
    }

    /// Drops a trailing record that carries nothing beyond its preamble. A
    /// record that merely gates on extra conditions (a drain finisher at the
    /// end of the stream) is kept.
    fn prune_trailing_noop(&mut self) {
        if let Some(last) = self.triggers.last() {
            if last.actions[1].is_empty() && last.conditions[1].is_empty() {
                self.triggers.pop();
            }
        }
    }

    /// The always-true, 63-zero-wait tail that forces the engine to evaluate
    /// triggers every frame instead of every two seconds.
    fn append_hyper_triggers(&mut self) -> CodegenResult<()> {
        let owner = self.config.triggers_owner;
        for _ in 0..self.config.hyper_trigger_count {
            let mut hyper = Trigger::default();
            hyper.set_sole_executor(owner - 1);
            hyper.conditions[0] = Condition::always();
            hyper.actions[0] = Action::preserve_trigger();
            for slot in 1..Trigger::ACTION_SLOTS {
                hyper.actions[slot] = Action {
                    player: REGISTERS_OWNER as u32,
                    flags: ActionFlags::UNIT_TYPE_USED.bits(),
                    ..Action::wait(0)
                };
            }
            self.triggers.push(hyper);
        }
        Ok(())
    }
}
