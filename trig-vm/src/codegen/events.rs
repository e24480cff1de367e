//! Pass 1: unit-property templates and event triggers.
//!
//! Both live at the front of the IR stream. Unit templates are packed into
//! free `UPRP` slots; events become floating triggers (no instruction
//! counter test) that watch their condition list whenever the events mutex
//! is down and latch the event's switch.

use trig_asm::{
    Condition, UnitProperties, UnitPropertyFields, UnitSpecialFields, UnitStateFlags,
};

use crate::consts::SWITCH_EVENTS_MUTEX;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{Instruction, UnitPropertyKind};

use super::Emitter;

impl<'a> Emitter<'a> {
    pub(super) fn preemit(&mut self, ir: &[Instruction]) -> CodegenResult<()> {
        let mut i = 0;
        while i < ir.len() {
            match ir[i] {
                Instruction::Unit { properties } => {
                    self.preemit_unit(ir, i, properties as usize)
                        .map_err(|e| e.with_ir(i))?;
                    i += properties as usize + 1;
                }
                Instruction::Event { switch, conditions } => {
                    self.preemit_event(ir, i, switch, conditions as usize)
                        .map_err(|e| e.with_ir(i))?;
                    i += conditions as usize + 1;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn preemit_unit(
        &mut self,
        ir: &[Instruction],
        at: usize,
        properties: usize,
    ) -> CodegenResult<()> {
        if properties == 0 {
            return Err(CodegenError::malformed("unit template with zero properties"));
        }

        let slot = self
            .used_unit_slots
            .find_free()
            .ok_or(CodegenError::CuwpExhausted { ir: None })?;
        self.used_unit_slots.set_used(slot, true);

        let mut template = UnitProperties {
            owner: 255,
            valid_special: (UnitSpecialFields::HALLUCINATED | UnitSpecialFields::INVINCIBLE)
                .bits(),
            ..UnitProperties::default()
        };

        for entry in 1..=properties {
            let Some(Instruction::UnitProp { kind, value }) = ir.get(at + entry) else {
                return Err(CodegenError::malformed("unit property list is truncated"));
            };
            apply_property(&mut template, *kind, *value);
        }

        self.unit_slots.set(slot, template);
        self.unit_slot_refs.push(slot as u32);
        Ok(())
    }

    fn preemit_event(
        &mut self,
        ir: &[Instruction],
        at: usize,
        switch: trig_asm::SwitchId,
        conditions: usize,
    ) -> CodegenResult<()> {
        if conditions == 0 {
            return Err(CodegenError::malformed("event with zero conditions"));
        }

        let mut event = self.floating_builder(self.config.triggers_owner)?;
        event.test_switch(SWITCH_EVENTS_MUTEX, false)?;
        event.set_switch(switch, trig_asm::SwitchState::Set)?;

        for entry in 1..=conditions {
            let Some(condition) = ir.get(at + entry) else {
                return Err(CodegenError::malformed("event condition list is truncated"));
            };
            self.append_event_condition(&mut event, condition)?;
        }

        self.push(event);
        Ok(())
    }

    /// Appends one watched condition. Conditions that name a player also
    /// move the trigger onto that player, since `bring`, `accumulate` and
    /// the `most`/`least` family are evaluated per owner.
    fn append_event_condition(
        &mut self,
        event: &mut crate::builder::TriggerBuilder,
        condition: &Instruction,
    ) -> CodegenResult<()> {
        match condition {
            Instruction::BringCond {
                player,
                comparison,
                unit,
                location,
                quantity,
            } => {
                let location = self.location_id(location)?;
                event.set_owner(player + 1);
                event.push_condition(Condition::bring(
                    *player,
                    *comparison,
                    *unit,
                    location,
                    *quantity,
                ))
            }
            Instruction::AccumCond {
                player,
                comparison,
                resource,
                quantity,
            } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::accumulate(
                    *player,
                    *comparison,
                    *resource,
                    *quantity,
                ))
            }
            Instruction::LeastResCond { player, resource } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::least_resources(*player, *resource))
            }
            Instruction::MostResCond { player, resource } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::most_resources(*player, *resource))
            }
            Instruction::ScoreCond {
                player,
                comparison,
                score,
                quantity,
            } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::score(*player, *comparison, *score, *quantity))
            }
            Instruction::LowScoreCond { player, score } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::lowest_score(*player, *score))
            }
            Instruction::HiScoreCond { player, score } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::highest_score(*player, *score))
            }
            Instruction::TimeCond { comparison, quantity } => {
                event.push_condition(Condition::elapsed_time(*comparison, *quantity))
            }
            Instruction::CmdCond {
                player,
                comparison,
                unit,
                quantity,
            } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::command(*player, *comparison, *unit, *quantity))
            }
            Instruction::CmdLeastCond { player, unit, location } => {
                let location = self.location_id_opt(location.as_deref())?;
                event.set_owner(player + 1);
                event.push_condition(Condition::command_the_least(*player, *unit, location))
            }
            Instruction::CmdMostCond { player, unit, location } => {
                let location = self.location_id_opt(location.as_deref())?;
                event.set_owner(player + 1);
                event.push_condition(Condition::command_the_most(*player, *unit, location))
            }
            Instruction::KillCond {
                player,
                comparison,
                unit,
                quantity,
            } => event.push_condition(Condition::kills(*player, *comparison, *unit, *quantity)),
            Instruction::KillLeastCond { player, unit } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::least_kills(*player, *unit))
            }
            Instruction::KillMostCond { player, unit } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::most_kills(*player, *unit))
            }
            Instruction::DeathCond {
                player,
                comparison,
                unit,
                quantity,
            } => event.push_condition(Condition::deaths(
                *player as u32,
                *unit,
                *comparison,
                *quantity,
            )),
            Instruction::CountdownCond { comparison, quantity } => {
                event.push_condition(Condition::countdown(*comparison, *quantity))
            }
            Instruction::OpponentsCond {
                player,
                comparison,
                quantity,
            } => {
                event.set_owner(player + 1);
                event.push_condition(Condition::opponents(*player, *comparison, *quantity))
            }
            _ => Err(CodegenError::malformed(
                "event refers to an instruction that is not a condition",
            )),
        }
    }

    /// Resolves a unit-declaration ordinal to its allocated template slot.
    pub(super) fn unit_slot(&self, ordinal: usize) -> CodegenResult<u32> {
        self.unit_slot_refs
            .get(ordinal)
            .copied()
            .ok_or_else(|| CodegenError::malformed("spawn refers to an undeclared unit template"))
    }
}

fn apply_property(template: &mut UnitProperties, kind: UnitPropertyKind, value: u32) {
    let state = |template: &mut UnitProperties,
                 flag: UnitStateFlags,
                 special: UnitSpecialFields| {
        if value != 0 {
            template.state_flags |= flag.bits();
            template.valid_special |= special.bits();
        }
    };

    match kind {
        UnitPropertyKind::Cloaked => {
            state(template, UnitStateFlags::CLOAKED, UnitSpecialFields::CLOAK)
        }
        UnitPropertyKind::Burrowed => {
            state(template, UnitStateFlags::BURROWED, UnitSpecialFields::BURROW)
        }
        UnitPropertyKind::InTransit => {
            state(template, UnitStateFlags::IN_TRANSIT, UnitSpecialFields::IN_TRANSIT)
        }
        UnitPropertyKind::Hallucinated => {
            state(template, UnitStateFlags::HALLUCINATED, UnitSpecialFields::HALLUCINATED)
        }
        UnitPropertyKind::Invincible => {
            state(template, UnitStateFlags::INVINCIBLE, UnitSpecialFields::INVINCIBLE)
        }
        UnitPropertyKind::HitPoints => {
            template.hit_points = value.min(100) as u8;
            template.valid_fields |= UnitPropertyFields::HIT_POINTS.bits();
        }
        UnitPropertyKind::ShieldPoints => {
            template.shield_points = value.min(100) as u8;
            template.valid_fields |= UnitPropertyFields::SHIELD_POINTS.bits();
        }
        UnitPropertyKind::Energy => {
            template.energy = value.min(100) as u8;
            template.valid_fields |= UnitPropertyFields::ENERGY.bits();
        }
        UnitPropertyKind::ResourceAmount => {
            template.resource_amount = value;
            template.valid_fields |= UnitPropertyFields::RESOURCE_AMOUNT.bits();
        }
        UnitPropertyKind::HangarCount => {
            template.hangar_count = value as u16;
            template.valid_fields |= UnitPropertyFields::HANGAR_COUNT.bits();
        }
    }
}
