//! Fluent accumulator over one trigger address.

use trig_asm::{
    Action, ActionFlags, Condition, LocationId, NumberModifier, NumericComparison, PlayerId,
    ResourceType, ScoreType, StringId, SwitchId, SwitchState, Trigger, UnitId,
};

use crate::consts::{Address, Register, REGISTERS_OWNER, REG_INSTRUCTION_COUNTER};
use crate::error::{CodegenError, CodegenResult};
use crate::registers::RegisterMap;

#[derive(Debug, Clone)]
struct Pending {
    trigger: Trigger,
    conditions: usize,
    actions: usize,
}

/// Accumulates conditions and actions on one trigger record (plus optional
/// sibling records at the same address).
///
/// An addressed builder starts with the instruction-counter test in
/// condition slot 0 and `PreserveTrigger` in action slot 0; a floating one
/// (event and indirect-jump triggers) gets only the preserve action. Neither
/// preamble counts as a change: a builder whose [`has_changes`] is still
/// `false` at emission time encodes no work and is dropped.
///
/// Forked conditionals attach the complement record via [`add_secondary`];
/// from then on every mutation applies to all sibling records, so the fall
/// through path keeps advancing the instruction counter on both sides of the
/// split.
///
/// [`has_changes`]: TriggerBuilder::has_changes
/// [`add_secondary`]: TriggerBuilder::add_secondary
#[derive(Debug, Clone)]
pub struct TriggerBuilder {
    records: Vec<Pending>,
    address: Option<Address>,
    has_changes: bool,
}

impl TriggerBuilder {
    /// Starts a builder at `address` (or floating, for `None`) executed by
    /// the 1-based `owner`.
    pub fn new(
        regs: &RegisterMap,
        address: Option<Address>,
        owner: u8,
    ) -> CodegenResult<Self> {
        let mut trigger = Trigger::default();
        trigger.set_sole_executor(owner - 1);

        let mut builder = Self {
            records: vec![Pending {
                trigger,
                conditions: 0,
                actions: 0,
            }],
            address,
            has_changes: false,
        };

        if let Some(address) = address {
            builder.test_reg(regs, REG_INSTRUCTION_COUNTER, address, NumericComparison::Exactly)?;
        }
        builder.preserve_trigger()?;
        builder.has_changes = false;
        Ok(builder)
    }

    /// The address this builder's records answer to, if any.
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Whether anything beyond the preamble was accumulated.
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Replaces the execution mask with the 1-based `owner`.
    pub fn set_owner(&mut self, owner: u8) {
        for record in &mut self.records {
            record.trigger.set_sole_executor(owner - 1);
        }
    }

    /// Marks all eight player slots as executors.
    pub fn execute_for_all_players(&mut self) {
        for record in &mut self.records {
            for player in 0..8 {
                record.trigger.execute_for(player);
            }
        }
    }

    /// Adopts `other`'s records as siblings; subsequent mutations apply to
    /// them too.
    pub fn add_secondary(&mut self, other: TriggerBuilder) {
        self.has_changes |= other.has_changes;
        self.records.extend(other.records);
    }

    /// The finished records.
    pub fn into_triggers(self) -> Vec<Trigger> {
        self.records.into_iter().map(|r| r.trigger).collect()
    }

    /// Appends `condition` to every sibling record.
    pub fn push_condition(&mut self, condition: Condition) -> CodegenResult<()> {
        for record in &mut self.records {
            if record.conditions >= Trigger::CONDITION_SLOTS {
                return Err(CodegenError::TriggerConditionsFull { ir: None });
            }
            record.trigger.conditions[record.conditions] = condition;
            record.conditions += 1;
        }
        self.has_changes = true;
        Ok(())
    }

    /// Appends `action` to every sibling record.
    pub fn push_action(&mut self, action: Action) -> CodegenResult<()> {
        for record in &mut self.records {
            if record.actions >= Trigger::ACTION_SLOTS {
                return Err(CodegenError::TriggerActionsFull { ir: None });
            }
            record.trigger.actions[record.actions] = action;
            record.actions += 1;
        }
        self.has_changes = true;
        Ok(())
    }

    // Conditions.

    /// Tests a virtual register against `value`.
    pub fn test_reg(
        &mut self,
        regs: &RegisterMap,
        register: Register,
        value: u32,
        comparison: NumericComparison,
    ) -> CodegenResult<()> {
        let cell = regs.lookup(register)?;
        self.push_condition(Condition::deaths(
            cell.player as u32,
            cell.unit,
            comparison,
            value,
        ))
    }

    /// Tests a global switch for `expected`.
    pub fn test_switch(&mut self, switch: SwitchId, expected: bool) -> CodegenResult<()> {
        let mut condition = Condition::switch_state(switch, expected);
        condition.player = REGISTERS_OWNER as u32;
        self.push_condition(condition)
    }

    /// Appends an always-true condition.
    pub fn always(&mut self) -> CodegenResult<()> {
        self.push_condition(Condition::always())
    }

    // Actions.

    /// Sets a virtual register to `value`.
    pub fn set_reg(
        &mut self,
        regs: &RegisterMap,
        register: Register,
        value: u32,
    ) -> CodegenResult<()> {
        self.reg_action(regs, register, NumberModifier::SetTo, value)
    }

    /// Adds `amount` to a virtual register.
    pub fn inc_reg(
        &mut self,
        regs: &RegisterMap,
        register: Register,
        amount: u32,
    ) -> CodegenResult<()> {
        self.reg_action(regs, register, NumberModifier::Add, amount)
    }

    /// Subtracts `amount` from a virtual register, saturating at zero.
    pub fn dec_reg(
        &mut self,
        regs: &RegisterMap,
        register: Register,
        amount: u32,
    ) -> CodegenResult<()> {
        self.reg_action(regs, register, NumberModifier::Subtract, amount)
    }

    /// Transfers control to `address` by rewriting the instruction counter.
    pub fn jump_to(&mut self, regs: &RegisterMap, address: Address) -> CodegenResult<()> {
        self.set_reg(regs, REG_INSTRUCTION_COUNTER, address)
    }

    fn reg_action(
        &mut self,
        regs: &RegisterMap,
        register: Register,
        modifier: NumberModifier,
        amount: u32,
    ) -> CodegenResult<()> {
        let cell = regs.lookup(register)?;
        let mut action = Action::set_deaths(cell.player as u32, cell.unit, modifier, amount);
        action.flags = ActionFlags::UNIT_TYPE_USED.bits();
        self.push_action(action)
    }

    /// Drives a global switch into `state`.
    pub fn set_switch(&mut self, switch: SwitchId, state: SwitchState) -> CodegenResult<()> {
        self.push_action(Action::set_switch(switch, state))
    }

    /// Suspends the executing player's trigger queue.
    pub fn wait(&mut self, milliseconds: u32) -> CodegenResult<()> {
        self.push_action(Action::wait(milliseconds))
    }

    /// Shows an interned string to the executing player.
    pub fn display_msg(&mut self, text: StringId) -> CodegenResult<()> {
        self.push_action(Action::display_text(text))
    }

    /// Re-arms the record for the next tick.
    pub fn preserve_trigger(&mut self) -> CodegenResult<()> {
        self.push_action(Action::preserve_trigger())
    }

    // A few engine-native conveniences used by several lowering sites; the
    // long tail of engine actions is pushed directly via `push_action`.

    /// Rewrites a player's resource stock.
    pub fn set_resources(
        &mut self,
        player: PlayerId,
        modifier: NumberModifier,
        resource: ResourceType,
        amount: u32,
    ) -> CodegenResult<()> {
        self.push_action(Action::set_resources(player, modifier, resource, amount))
    }

    /// Rewrites a player's score.
    pub fn set_score(
        &mut self,
        player: PlayerId,
        modifier: NumberModifier,
        score: ScoreType,
        amount: u32,
    ) -> CodegenResult<()> {
        self.push_action(Action::set_score(player, modifier, score, amount))
    }

    /// Rewrites a death-counter cell directly.
    pub fn set_deaths(
        &mut self,
        player: PlayerId,
        unit: UnitId,
        modifier: NumberModifier,
        amount: u32,
    ) -> CodegenResult<()> {
        self.push_action(Action::set_deaths(player as u32, unit, modifier, amount))
    }

    /// Rewrites the countdown timer.
    pub fn set_countdown(&mut self, modifier: NumberModifier, seconds: u32) -> CodegenResult<()> {
        self.push_action(Action::set_countdown_timer(modifier, seconds))
    }

    /// Creates units, optionally from a unit-property template slot.
    pub fn create_unit(
        &mut self,
        player: PlayerId,
        unit: UnitId,
        count: u8,
        location: LocationId,
        properties: Option<u32>,
    ) -> CodegenResult<()> {
        self.push_action(Action::create_unit(player, unit, count, location, properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trig_asm::{ActionKind, ConditionKind};

    fn regs() -> RegisterMap {
        RegisterMap::with_default_pool()
    }

    #[test]
    fn addressed_builder_carries_the_preamble() {
        let regs = regs();
        let builder = TriggerBuilder::new(&regs, Some(7), 1).unwrap();
        assert!(!builder.has_changes());

        let triggers = builder.into_triggers();
        assert_eq!(triggers.len(), 1);

        let ic = regs.lookup(REG_INSTRUCTION_COUNTER).unwrap();
        let test = &triggers[0].conditions[0];
        assert_eq!(test.kind, ConditionKind::Deaths);
        assert_eq!(test.player, ic.player as u32);
        assert_eq!(test.unit, ic.unit);
        assert_eq!(test.quantity, 7);
        assert_eq!(test.comparison, NumericComparison::Exactly as u8);

        assert_eq!(triggers[0].actions[0].kind, ActionKind::PreserveTrigger);
        assert_eq!(triggers[0].execution_mask[0], 1);
    }

    #[test]
    fn floating_builder_has_no_counter_test() {
        let regs = regs();
        let builder = TriggerBuilder::new(&regs, None, 3).unwrap();
        let triggers = builder.into_triggers();
        assert!(triggers[0].conditions[0].is_empty());
        assert_eq!(triggers[0].execution_mask[2], 1);
    }

    #[test]
    fn mutations_apply_to_all_siblings() {
        let regs = regs();
        let mut primary = TriggerBuilder::new(&regs, Some(0), 1).unwrap();
        let mut secondary = primary.clone();

        primary.test_reg(&regs, 10, 5, NumericComparison::AtLeast).unwrap();
        secondary.test_reg(&regs, 10, 3, NumericComparison::AtMost).unwrap();
        primary.add_secondary(secondary);

        primary.jump_to(&regs, 42).unwrap();

        let triggers = primary.into_triggers();
        assert_eq!(triggers.len(), 2);
        for trigger in &triggers {
            let jump = &trigger.actions[1];
            assert_eq!(jump.kind, ActionKind::SetDeaths);
            assert_eq!(jump.arg0, 42);
        }
    }

    #[test]
    fn slot_exhaustion_is_reported() {
        let regs = regs();
        let mut builder = TriggerBuilder::new(&regs, Some(0), 1).unwrap();
        for _ in 0..15 {
            builder.always().unwrap();
        }
        assert!(matches!(
            builder.always().unwrap_err(),
            CodegenError::TriggerConditionsFull { .. }
        ));

        for _ in 0..63 {
            builder.wait(0).unwrap();
        }
        assert!(matches!(
            builder.wait(0).unwrap_err(),
            CodegenError::TriggerActionsFull { .. }
        ));
    }
}
