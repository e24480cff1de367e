//! Arithmetic macros: drain fan-outs, the copy macro, the shared multiply
//! routine and the indirect-jump triggers.
//!
//! Everything here is built from one primitive: a family of triggers that
//! moves a register towards zero in power-of-two steps. Each step fires at
//! most once per tick, so a drain of `n` converges in `O(log n)` ticks while
//! the instruction counter stays pinned at the drain's address.

use trig_asm::NumericComparison::{AtLeast, Exactly};
use trig_asm::SwitchState;

use crate::builder::TriggerBuilder;
use crate::consts::{
    Address, Register, REG_COPY_STORAGE, REG_INDIRECT_JUMP, REG_INSTRUCTION_COUNTER,
    REG_MUL_LEFT, REG_MUL_RIGHT, REG_TEMP0, REG_TEMP1, REG_TEMP2,
    SWITCH_ARITHMETIC_UNDERFLOW, SWITCH_INSTRUCTION_COUNTER_MUTEX,
};
use crate::error::{CodegenError, CodegenResult};

use super::Emitter;

impl<'a> Emitter<'a> {
    /// The copy macro: replicate `src` into `dst` without destroying `src`.
    ///
    /// Stage one drains `src` into the scratch cell; its finisher zeroes
    /// `dst` and hands over to stage two, which drains the scratch back into
    /// `src` and `dst` simultaneously, then resumes at `ret`. The caller
    /// must zero the scratch cell before jumping in.
    pub(super) fn emit_copy(
        &mut self,
        dst: Register,
        src: Register,
        next_address: &mut Address,
        ret: Address,
    ) -> CodegenResult<Address> {
        let regs = self.regs;
        let to_storage = Self::alloc(next_address);
        let from_storage = Self::alloc(next_address);

        for step in self.batches() {
            let mut drain = self.builder(to_storage)?;
            drain.test_reg(regs, src, step, AtLeast)?;
            drain.dec_reg(regs, src, step)?;
            drain.inc_reg(regs, REG_COPY_STORAGE, step)?;
            self.push(drain);
        }

        let mut handover = self.builder(to_storage)?;
        handover.test_reg(regs, src, 0, Exactly)?;
        handover.set_reg(regs, dst, 0)?;
        handover.jump_to(regs, from_storage)?;
        self.push(handover);

        for step in self.batches() {
            let mut restore = self.builder(from_storage)?;
            restore.test_reg(regs, REG_COPY_STORAGE, step, AtLeast)?;
            restore.dec_reg(regs, REG_COPY_STORAGE, step)?;
            restore.inc_reg(regs, src, step)?;
            restore.inc_reg(regs, dst, step)?;
            self.push(restore);
        }

        let mut finish = self.builder(from_storage)?;
        finish.test_reg(regs, REG_COPY_STORAGE, 0, Exactly)?;
        finish.jump_to(regs, ret)?;
        self.push(finish);

        Ok(to_storage)
    }

    /// `Add`: drain the lower stack cell into the one above it.
    pub(super) fn lower_add(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let add_address = Self::alloc(next_address);
        current.jump_to(regs, add_address)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        let left = self.pop_slot()?;
        let right = left + 1;

        for step in self.batches() {
            let mut add = self.builder(add_address)?;
            add.test_reg(regs, left, step, AtLeast)?;
            add.dec_reg(regs, left, step)?;
            add.inc_reg(regs, right, step)?;
            self.push(add);
        }

        let mut finish = self.builder(add_address)?;
        finish.test_reg(regs, left, 0, Exactly)?;
        finish.jump_to(regs, ret)?;
        self.push(finish);
        Ok(())
    }

    /// `Sub`: drain both cells in lockstep; what remains of the upper cell
    /// is the difference. Going below zero raises the underflow switch.
    pub(super) fn lower_sub(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let sub_address = Self::alloc(next_address);
        current.set_switch(SWITCH_ARITHMETIC_UNDERFLOW, SwitchState::Clear)?;
        current.jump_to(regs, sub_address)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        let left = self.pop_slot()?;
        let right = left + 1;

        for step in self.batches() {
            let mut sub = self.builder(sub_address)?;
            sub.test_reg(regs, left, step, AtLeast)?;
            sub.test_reg(regs, right, step, AtLeast)?;
            sub.dec_reg(regs, left, step)?;
            sub.dec_reg(regs, right, step)?;
            self.push(sub);
        }

        let mut exact = self.builder(sub_address)?;
        exact.test_reg(regs, left, 0, Exactly)?;
        exact.set_switch(SWITCH_ARITHMETIC_UNDERFLOW, SwitchState::Clear)?;
        exact.jump_to(regs, ret)?;
        self.push(exact);

        let mut underflow = self.builder(sub_address)?;
        underflow.test_reg(regs, left, 1, AtLeast)?;
        underflow.test_reg(regs, right, 0, Exactly)?;
        underflow.set_switch(SWITCH_ARITHMETIC_UNDERFLOW, SwitchState::Set)?;
        underflow.jump_to(regs, ret)?;
        self.push(underflow);
        Ok(())
    }

    /// `Mul`: trampoline into the shared multiply routine.
    ///
    /// Stage one moves both stack operands into the multiply registers,
    /// stage two plants the return address and calls the routine, stage
    /// three drains the product back onto the stack.
    pub(super) fn lower_mul(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let entry = self
            .multiply_address
            .ok_or_else(|| CodegenError::malformed("multiply routine was not emitted"))?;

        let left = self.pop_slot()?;
        let right = left + 1;

        let move_left = Self::alloc(next_address);
        let move_right = Self::alloc(next_address);
        let unload = Self::alloc(next_address);

        current.set_reg(regs, REG_MUL_LEFT, 0)?;
        current.set_reg(regs, REG_MUL_RIGHT, 0)?;
        current.jump_to(regs, move_left)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        for step in self.batches() {
            let mut drain = self.builder(move_left)?;
            drain.test_reg(regs, left, step, AtLeast)?;
            drain.dec_reg(regs, left, step)?;
            drain.inc_reg(regs, REG_MUL_LEFT, step)?;
            self.push(drain);
        }
        let mut left_done = self.builder(move_left)?;
        left_done.test_reg(regs, left, 0, Exactly)?;
        left_done.jump_to(regs, move_right)?;
        self.push(left_done);

        for step in self.batches() {
            let mut drain = self.builder(move_right)?;
            drain.test_reg(regs, right, step, AtLeast)?;
            drain.dec_reg(regs, right, step)?;
            drain.inc_reg(regs, REG_MUL_RIGHT, step)?;
            self.push(drain);
        }
        let mut call = self.builder(move_right)?;
        call.test_reg(regs, right, 0, Exactly)?;
        call.set_reg(regs, REG_INDIRECT_JUMP, unload)?;
        call.jump_to(regs, entry)?;
        self.push(call);

        for step in self.batches() {
            let mut drain = self.builder(unload)?;
            drain.test_reg(regs, REG_MUL_RIGHT, step, AtLeast)?;
            drain.dec_reg(regs, REG_MUL_RIGHT, step)?;
            drain.inc_reg(regs, right, step)?;
            self.push(drain);
        }
        let mut unload_done = self.builder(unload)?;
        unload_done.test_reg(regs, REG_MUL_RIGHT, 0, Exactly)?;
        unload_done.jump_to(regs, ret)?;
        self.push(unload_done);
        Ok(())
    }

    /// `MulConst`: shift-and-add fast path for factors `2^n` and `2^n + 1`.
    ///
    /// The stack operand is split into both multiply registers in one pass;
    /// one half is pumped back shifted, the other verbatim when the factor
    /// is odd.
    pub(super) fn lower_mul_const(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
        value: u32,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let num_shifts: u32 = (1u32..32).filter(|&bit| value & (1 << bit) != 0).sum();
        let is_odd = value % 2 == 1;
        let operand = self.stack_pointer + 1;

        let split = Self::alloc(next_address);
        let pump = Self::alloc(next_address);

        current.set_reg(regs, REG_MUL_LEFT, 0)?;
        current.set_reg(regs, REG_MUL_RIGHT, 0)?;
        current.jump_to(regs, split)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        for step in self.batches() {
            let mut drain = self.builder(split)?;
            drain.test_reg(regs, operand, step, AtLeast)?;
            drain.dec_reg(regs, operand, step)?;
            drain.inc_reg(regs, REG_MUL_LEFT, step)?;
            drain.inc_reg(regs, REG_MUL_RIGHT, step)?;
            self.push(drain);
        }
        let mut split_done = self.builder(split)?;
        split_done.test_reg(regs, operand, 0, Exactly)?;
        split_done.jump_to(regs, pump)?;
        self.push(split_done);

        for step in self.batches() {
            let mut shifted = self.builder(pump)?;
            shifted.test_reg(regs, REG_MUL_LEFT, step, AtLeast)?;
            shifted.dec_reg(regs, REG_MUL_LEFT, step)?;
            shifted.inc_reg(regs, operand, ((step as u64) << num_shifts) as u32)?;
            self.push(shifted);
        }

        let mut pump_done = self.builder(pump)?;
        pump_done.test_reg(regs, REG_MUL_LEFT, 0, Exactly)?;
        if is_odd {
            let odd = Self::alloc(next_address);
            pump_done.jump_to(regs, odd)?;
            self.push(pump_done);

            for step in self.batches() {
                let mut add_back = self.builder(odd)?;
                add_back.test_reg(regs, REG_MUL_RIGHT, step, AtLeast)?;
                add_back.dec_reg(regs, REG_MUL_RIGHT, step)?;
                add_back.inc_reg(regs, operand, step)?;
                self.push(add_back);
            }
            let mut odd_done = self.builder(odd)?;
            odd_done.test_reg(regs, REG_MUL_RIGHT, 0, Exactly)?;
            odd_done.jump_to(regs, ret)?;
            self.push(odd_done);
        } else {
            pump_done.jump_to(regs, ret)?;
            self.push(pump_done);
        }
        Ok(())
    }

    /// Returns through [`REG_INDIRECT_JUMP`]: raise the mutex and zero the
    /// counter so the always-resident drain triggers take over.
    fn do_indirect_jump(&self, trigger: &mut TriggerBuilder) -> CodegenResult<()> {
        trigger.set_switch(SWITCH_INSTRUCTION_COUNTER_MUTEX, SwitchState::Set)?;
        trigger.set_reg(self.regs, REG_INSTRUCTION_COUNTER, 0)
    }

    /// The always-resident triggers that drain [`REG_INDIRECT_JUMP`] into
    /// the instruction counter while the mutex switch is raised.
    pub(super) fn emit_indirect_jump_code(&mut self) -> CodegenResult<()> {
        let regs = self.regs;
        let owner = self.config.triggers_owner;

        for step in self.batches() {
            let mut hop = self.floating_builder(owner)?;
            hop.test_switch(SWITCH_INSTRUCTION_COUNTER_MUTEX, true)?;
            hop.test_reg(regs, REG_INDIRECT_JUMP, step, AtLeast)?;
            hop.dec_reg(regs, REG_INDIRECT_JUMP, step)?;
            hop.inc_reg(regs, REG_INSTRUCTION_COUNTER, step)?;
            self.push(hop);
        }

        let mut release = self.floating_builder(owner)?;
        release.test_switch(SWITCH_INSTRUCTION_COUNTER_MUTEX, true)?;
        release.test_reg(regs, REG_INDIRECT_JUMP, 0, Exactly)?;
        release.set_switch(SWITCH_INSTRUCTION_COUNTER_MUTEX, SwitchState::Clear)?;
        self.push(release);
        Ok(())
    }

    /// The shared multiply routine, emitted once and reached through a
    /// planted [`REG_INDIRECT_JUMP`] return address.
    ///
    /// Shift-and-add over the high bits of the right operand: count them
    /// into `TEMP0`, seed the accumulator copy in `TEMP2`, then double the
    /// live operand once per counted bit, bouncing between the two multiply
    /// registers (`TEMP1` remembers which one is live). The finisher drains
    /// the accumulator into the result and jumps back indirectly.
    pub(super) fn emit_multiply_routine(
        &mut self,
        next_address: &mut Address,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let classify = Self::alloc(next_address);
        let right_to_left = Self::alloc(next_address);
        let left_to_right = Self::alloc(next_address);
        let check = Self::alloc(next_address);
        let merge = Self::alloc(next_address);
        let finish = Self::alloc(next_address);

        let entry = Self::alloc(next_address);
        self.multiply_address = Some(entry);

        let mut prepare = self.builder(entry)?;
        prepare.set_reg(regs, REG_TEMP0, 0)?;
        prepare.set_reg(regs, REG_TEMP1, 0)?;
        prepare.jump_to(regs, classify)?;
        self.push(prepare);

        // x * 0 and 0 * x short-circuit to zero, x * 1 to x itself.
        let mut zero_right = self.builder(classify)?;
        zero_right.test_reg(regs, REG_MUL_RIGHT, 0, Exactly)?;
        self.do_indirect_jump(&mut zero_right)?;
        self.push(zero_right);

        let mut zero_left = self.builder(classify)?;
        zero_left.test_reg(regs, REG_MUL_LEFT, 0, Exactly)?;
        zero_left.set_reg(regs, REG_MUL_RIGHT, 0)?;
        self.do_indirect_jump(&mut zero_left)?;
        self.push(zero_left);

        let mut one_left = self.builder(classify)?;
        one_left.test_reg(regs, REG_MUL_LEFT, 1, Exactly)?;
        self.do_indirect_jump(&mut one_left)?;
        self.push(one_left);

        // Count the high bits of the right operand into TEMP0.
        for step in self.batches().take_while(|&step| step >= 2) {
            let mut count = self.builder(classify)?;
            count.test_reg(regs, REG_MUL_RIGHT, step, AtLeast)?;
            count.dec_reg(regs, REG_MUL_RIGHT, step)?;
            count.inc_reg(regs, REG_TEMP0, step.trailing_zeros())?;
            self.push(count);
        }

        let seed_copy = self.emit_copy(REG_TEMP2, REG_MUL_LEFT, next_address, check)?;

        let mut low_bit_set = self.builder(classify)?;
        low_bit_set.test_reg(regs, REG_MUL_RIGHT, 1, Exactly)?;
        low_bit_set.set_reg(regs, REG_TEMP2, 0)?;
        low_bit_set.jump_to(regs, seed_copy)?;
        self.push(low_bit_set);

        let mut low_bit_clear = self.builder(classify)?;
        low_bit_clear.test_reg(regs, REG_MUL_RIGHT, 0, Exactly)?;
        low_bit_clear.set_reg(regs, REG_TEMP2, 0)?;
        low_bit_clear.jump_to(regs, check)?;
        self.push(low_bit_clear);

        // One doubling pass in each direction.
        for step in self.batches() {
            let mut double = self.builder(right_to_left)?;
            double.test_reg(regs, REG_MUL_RIGHT, step, AtLeast)?;
            double.dec_reg(regs, REG_MUL_RIGHT, step)?;
            double.inc_reg(regs, REG_MUL_LEFT, step * 2)?;
            self.push(double);
        }
        let mut now_left = self.builder(right_to_left)?;
        now_left.test_reg(regs, REG_MUL_RIGHT, 0, Exactly)?;
        now_left.set_reg(regs, REG_TEMP1, 0)?;
        now_left.jump_to(regs, check)?;
        self.push(now_left);

        for step in self.batches() {
            let mut double = self.builder(left_to_right)?;
            double.test_reg(regs, REG_MUL_LEFT, step, AtLeast)?;
            double.dec_reg(regs, REG_MUL_LEFT, step)?;
            double.inc_reg(regs, REG_MUL_RIGHT, step * 2)?;
            self.push(double);
        }
        let mut now_right = self.builder(left_to_right)?;
        now_right.test_reg(regs, REG_MUL_LEFT, 0, Exactly)?;
        now_right.set_reg(regs, REG_TEMP1, 1)?;
        now_right.jump_to(regs, check)?;
        self.push(now_right);

        // Merge the live operand into the result before finishing.
        for step in self.batches() {
            let mut move_over = self.builder(merge)?;
            move_over.test_reg(regs, REG_MUL_LEFT, step, AtLeast)?;
            move_over.dec_reg(regs, REG_MUL_LEFT, step)?;
            move_over.inc_reg(regs, REG_MUL_RIGHT, step)?;
            self.push(move_over);
        }
        let mut merged = self.builder(merge)?;
        merged.test_reg(regs, REG_MUL_LEFT, 0, Exactly)?;
        merged.jump_to(regs, finish)?;
        self.push(merged);

        // Loop check: either keep doubling or run the finisher, picking the
        // path that matches where the live operand currently sits.
        let mut done_in_left = self.builder(check)?;
        done_in_left.test_reg(regs, REG_TEMP0, 0, Exactly)?;
        done_in_left.test_reg(regs, REG_TEMP1, 0, Exactly)?;
        done_in_left.jump_to(regs, merge)?;
        self.push(done_in_left);

        let mut done_in_right = self.builder(check)?;
        done_in_right.test_reg(regs, REG_TEMP0, 0, Exactly)?;
        done_in_right.test_reg(regs, REG_TEMP1, 1, Exactly)?;
        done_in_right.jump_to(regs, finish)?;
        self.push(done_in_right);

        let mut again_from_left = self.builder(check)?;
        again_from_left.test_reg(regs, REG_TEMP0, 1, AtLeast)?;
        again_from_left.test_reg(regs, REG_TEMP1, 0, Exactly)?;
        again_from_left.dec_reg(regs, REG_TEMP0, 1)?;
        again_from_left.set_reg(regs, REG_MUL_RIGHT, 0)?;
        again_from_left.jump_to(regs, left_to_right)?;
        self.push(again_from_left);

        let mut again_from_right = self.builder(check)?;
        again_from_right.test_reg(regs, REG_TEMP0, 1, AtLeast)?;
        again_from_right.test_reg(regs, REG_TEMP1, 1, Exactly)?;
        again_from_right.dec_reg(regs, REG_TEMP0, 1)?;
        again_from_right.set_reg(regs, REG_MUL_LEFT, 0)?;
        again_from_right.jump_to(regs, right_to_left)?;
        self.push(again_from_right);

        // Finisher: the accumulated seed joins the result, then control
        // returns through the indirect-jump register.
        for step in self.batches() {
            let mut fold = self.builder(finish)?;
            fold.test_reg(regs, REG_TEMP2, step, AtLeast)?;
            fold.dec_reg(regs, REG_TEMP2, step)?;
            fold.inc_reg(regs, REG_MUL_RIGHT, step)?;
            self.push(fold);
        }
        let mut ret = self.builder(finish)?;
        ret.test_reg(regs, REG_TEMP2, 0, Exactly)?;
        self.do_indirect_jump(&mut ret)?;
        self.push(ret);
        Ok(())
    }
}
