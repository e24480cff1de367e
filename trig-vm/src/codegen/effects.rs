//! Lowering of the observable side effects: messages, units, resources,
//! scores, death counters, the countdown timer and presentation actions.
//!
//! Two shapes recur. An effect aimed at a player other than the triggers
//! owner needs a one-tick detour so a record owned by *that* player can
//! fire while the instruction counter is pinned ([`Emitter::split_effect`]).
//! An effect whose quantity lives on the stack needs a drain fan-out that
//! performs the engine action in power-of-two portions as the stack cell
//! empties.

use trig_asm::NumericComparison::{AtLeast, Exactly};
use trig_asm::{Action, NumberModifier, PlayerId};

use crate::builder::TriggerBuilder;
use crate::consts::{Address, Register};
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{Audience, Instruction, LeaderboardKind, ModifyKind, Quantity};

use super::Emitter;

/// Engine unit counts are a byte; 0 means "all units".
fn unit_count(value: u32) -> u8 {
    value.min(255) as u8
}

impl<'a> Emitter<'a> {
    pub(super) fn lower_effect(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
        instruction: &Instruction,
    ) -> CodegenResult<()> {
        match instruction {
            Instruction::DisplayMsg { audience, message } => {
                let text = self.intern(message);
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.display_msg(text)
                })
            }

            Instruction::EndGame { audience, kind } => {
                let kind = *kind;
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(match kind {
                        crate::ir::EndGameKind::Victory => Action::victory(),
                        crate::ir::EndGameKind::Defeat => Action::defeat(),
                        crate::ir::EndGameKind::Draw => Action::draw(),
                    })
                })
            }

            Instruction::CenterView { audience, location } => {
                let location = self.location_id(location)?;
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::center_view(location))
                })
            }

            Instruction::Ping { audience, location } => {
                let location = self.location_id(location)?;
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::minimap_ping(location))
                })
            }

            Instruction::Talk {
                audience,
                unit,
                milliseconds,
            } => {
                let (unit, milliseconds) = (*unit, *milliseconds);
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::talking_portrait(unit, milliseconds))
                })
            }

            Instruction::AiScript {
                audience,
                script,
                location,
            } => {
                let location = self.location_id_opt(location.as_deref())?;
                let script = *script;
                self.split_effect(current, next_address, *audience, move |effect, player| {
                    effect.push_action(Action::run_ai_script(player, script, location))
                })
            }

            Instruction::SetAlly {
                audience,
                target,
                status,
            } => {
                let (target, status) = (*target, *status);
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::set_alliance_status(target, status))
                })
            }

            Instruction::SetObj { audience, text } => {
                let text = self.intern(text);
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::set_mission_objectives(text))
                })
            }

            Instruction::PlayWav {
                audience,
                name,
                milliseconds,
            } => {
                let wav = self.intern_wav_path(name);
                let milliseconds = *milliseconds;
                self.split_effect(current, next_address, *audience, move |effect, _| {
                    effect.push_action(Action::play_wav(wav, milliseconds))
                })
            }

            Instruction::Spawn {
                player,
                unit,
                quantity,
                location,
                properties,
            } => {
                let location = self.location_id(location)?;
                let properties = match properties {
                    Some(ordinal) => Some(self.unit_slot(*ordinal)?),
                    None => None,
                };
                let (player, unit) = (*player, *unit);
                match *quantity {
                    Quantity::Literal(count) => current.create_unit(
                        player,
                        unit,
                        unit_count(count),
                        location,
                        properties,
                    ),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "spawn")?;
                        self.unit_fanout(current, cell, move |count| {
                            Action::create_unit(player, unit, count, location, properties)
                        })
                    }
                }
            }

            Instruction::Kill {
                player,
                unit,
                quantity,
                location,
            } => {
                let location = self.location_id_opt(location.as_deref())?;
                let (player, unit) = (*player, *unit);
                match *quantity {
                    Quantity::Literal(count) => current.push_action(Action::kill_unit(
                        player,
                        unit,
                        unit_count(count),
                        location,
                    )),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "kill")?;
                        self.unit_fanout(current, cell, move |count| {
                            Action::kill_unit(player, unit, count, location)
                        })
                    }
                }
            }

            Instruction::Remove {
                player,
                unit,
                quantity,
                location,
            } => {
                let location = self.location_id_opt(location.as_deref())?;
                let (player, unit) = (*player, *unit);
                match *quantity {
                    Quantity::Literal(count) => current.push_action(Action::remove_unit(
                        player,
                        unit,
                        unit_count(count),
                        location,
                    )),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "remove")?;
                        self.unit_fanout(current, cell, move |count| {
                            Action::remove_unit(player, unit, count, location)
                        })
                    }
                }
            }

            Instruction::Move {
                player,
                unit,
                quantity,
                src_location,
                dst_location,
            } => {
                let src = self.location_id(src_location)?;
                let dst = self.location_id(dst_location)?;
                let (player, unit) = (*player, *unit);
                match *quantity {
                    Quantity::Literal(count) => current.push_action(Action::move_unit(
                        player,
                        unit,
                        unit_count(count),
                        src,
                        dst,
                    )),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "move")?;
                        self.unit_fanout(current, cell, move |count| {
                            Action::move_unit(player, unit, count, src, dst)
                        })
                    }
                }
            }

            Instruction::Order {
                player,
                unit,
                order,
                src_location,
                dst_location,
            } => {
                let src = self.location_id(src_location)?;
                let dst = self.location_id(dst_location)?;
                current.push_action(Action::order(*player, *unit, *order, src, dst))
            }

            Instruction::Modify {
                player,
                unit,
                kind,
                quantity,
                amount,
                location,
            } => {
                let location = self.location_id(location)?;
                let (player, unit, kind, amount) = (*player, *unit, *kind, *amount);
                let action = move |count: u8| match kind {
                    ModifyKind::HitPoints => {
                        Action::modify_hit_points(player, unit, count, amount, location)
                    }
                    ModifyKind::Energy => {
                        Action::modify_energy(player, unit, count, amount, location)
                    }
                    ModifyKind::ShieldPoints => {
                        Action::modify_shield_points(player, unit, count, amount, location)
                    }
                    ModifyKind::HangarCount => {
                        Action::modify_hangar_count(player, unit, count, amount, location)
                    }
                };
                match *quantity {
                    Quantity::Literal(count) => current.push_action(action(unit_count(count))),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "modify")?;
                        self.unit_fanout(current, cell, action)
                    }
                }
            }

            Instruction::Give {
                src_player,
                dst_player,
                unit,
                quantity,
                location,
            } => {
                let location = self.location_id(location)?;
                let (src, dst, unit) = (*src_player, *dst_player, *unit);
                match *quantity {
                    Quantity::Literal(count) => current.push_action(Action::give_units(
                        src,
                        dst,
                        unit,
                        unit_count(count),
                        location,
                    )),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "give")?;
                        self.unit_fanout(current, cell, move |count| {
                            Action::give_units(src, dst, unit, count, location)
                        })
                    }
                }
            }

            Instruction::MoveLoc {
                player,
                unit,
                src_location,
                dst_location,
            } => {
                let src = self.location_id(src_location)?;
                let dst = self.location_id(dst_location)?;
                current.push_action(Action::move_location(*player, *unit, src, dst))
            }

            Instruction::SetResource {
                player,
                resource,
                quantity,
            } => {
                let (player, resource) = (*player, *resource);
                match *quantity {
                    Quantity::Literal(amount) => current.set_resources(
                        player,
                        NumberModifier::SetTo,
                        resource,
                        amount,
                    ),
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "set-resource")?;
                        self.reset_then_drain(
                            current,
                            next_address,
                            cell,
                            Action::set_resources(player, NumberModifier::SetTo, resource, 0),
                            move |amount| {
                                Action::set_resources(
                                    player,
                                    NumberModifier::Add,
                                    resource,
                                    amount,
                                )
                            },
                        )
                    }
                }
            }

            Instruction::IncResource {
                player,
                resource,
                quantity,
            } => self.resource_step(
                current,
                *quantity,
                "add-resource",
                *player,
                *resource,
                NumberModifier::Add,
            ),
            Instruction::DecResource {
                player,
                resource,
                quantity,
            } => self.resource_step(
                current,
                *quantity,
                "take-resource",
                *player,
                *resource,
                NumberModifier::Subtract,
            ),

            Instruction::SetScore {
                player,
                score,
                quantity,
            } => {
                let (player, score) = (*player, *score);
                match *quantity {
                    Quantity::Literal(amount) => {
                        current.set_score(player, NumberModifier::SetTo, score, amount)
                    }
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "set-score")?;
                        self.reset_then_drain(
                            current,
                            next_address,
                            cell,
                            Action::set_score(player, NumberModifier::SetTo, score, 0),
                            move |amount| {
                                Action::set_score(player, NumberModifier::Add, score, amount)
                            },
                        )
                    }
                }
            }

            Instruction::IncScore {
                player,
                score,
                quantity,
            } => self.score_step(current, *quantity, "add-score", *player, *score, NumberModifier::Add),
            Instruction::DecScore {
                player,
                score,
                quantity,
            } => self.score_step(
                current,
                *quantity,
                "take-score",
                *player,
                *score,
                NumberModifier::Subtract,
            ),

            Instruction::SetDeaths {
                player,
                unit,
                quantity,
            } => {
                let (player, unit) = (*player, *unit);
                match *quantity {
                    Quantity::Literal(amount) => {
                        current.set_deaths(player, unit, NumberModifier::SetTo, amount)
                    }
                    Quantity::Register(register) => {
                        let cell = self.stack_quantity(register, "set-deaths")?;
                        self.reset_then_drain(
                            current,
                            next_address,
                            cell,
                            Action::set_deaths(player as u32, unit, NumberModifier::SetTo, 0),
                            move |amount| {
                                Action::set_deaths(
                                    player as u32,
                                    unit,
                                    NumberModifier::Add,
                                    amount,
                                )
                            },
                        )
                    }
                }
            }

            Instruction::IncDeaths {
                player,
                unit,
                quantity,
            } => self.deaths_step(
                current,
                *quantity,
                "add-deaths",
                *player,
                *unit,
                NumberModifier::Add,
            ),
            Instruction::DecDeaths {
                player,
                unit,
                quantity,
            } => self.deaths_step(
                current,
                *quantity,
                "take-deaths",
                *player,
                *unit,
                NumberModifier::Subtract,
            ),

            Instruction::SetCountdown { quantity } => match *quantity {
                Quantity::Literal(seconds) => {
                    current.set_countdown(NumberModifier::SetTo, seconds)
                }
                Quantity::Register(register) => {
                    let cell = self.stack_quantity(register, "set-countdown")?;
                    self.reset_then_drain(
                        current,
                        next_address,
                        cell,
                        Action::set_countdown_timer(NumberModifier::SetTo, 0),
                        |seconds| Action::set_countdown_timer(NumberModifier::Add, seconds),
                    )
                }
            },
            Instruction::AddCountdown { quantity } => match *quantity {
                Quantity::Literal(seconds) => current.set_countdown(NumberModifier::Add, seconds),
                Quantity::Register(register) => {
                    let cell = self.stack_quantity(register, "add-countdown")?;
                    self.amount_fanout(current, cell, |seconds| {
                        Action::set_countdown_timer(NumberModifier::Add, seconds)
                    })
                }
            },
            Instruction::SubCountdown { quantity } => match *quantity {
                Quantity::Literal(seconds) => {
                    current.set_countdown(NumberModifier::Subtract, seconds)
                }
                Quantity::Register(register) => {
                    let cell = self.stack_quantity(register, "take-countdown")?;
                    self.amount_fanout(current, cell, |seconds| {
                        Action::set_countdown_timer(NumberModifier::Subtract, seconds)
                    })
                }
            },

            Instruction::PauseCountdown { unpause } => current.push_action(if *unpause {
                Action::unpause_timer()
            } else {
                Action::pause_timer()
            }),
            Instruction::PauseGame { unpause } => current.push_action(if *unpause {
                Action::unpause_game()
            } else {
                Action::pause_game()
            }),
            Instruction::MuteUnitSpeech { unmute } => current.push_action(if *unmute {
                Action::unmute_unit_speech()
            } else {
                Action::mute_unit_speech()
            }),

            Instruction::SetDoodad {
                player,
                unit,
                state,
                location,
            } => {
                let location = self.location_id(location)?;
                current.push_action(Action::set_doodad_state(*player, *unit, *state, location))
            }

            Instruction::SetInvincible {
                player,
                unit,
                state,
                location,
            } => {
                let location = self.location_id(location)?;
                current.push_action(Action::set_invincibility(*player, *unit, *state, location))
            }

            Instruction::NextScen { name } => {
                let text = self.intern(name);
                current.push_action(Action::set_next_scenario(text))
            }

            Instruction::Leaderboard { text, kind } => {
                let text = self.intern(text);
                let action = match kind {
                    LeaderboardKind::Control { unit } => Action::leaderboard_control(text, *unit),
                    LeaderboardKind::ControlAtLocation { unit, location } => {
                        let location = self.location_id(location)?;
                        Action::leaderboard_control_at(text, *unit, location)
                    }
                    LeaderboardKind::Greed => Action::leaderboard_greed(text),
                    LeaderboardKind::Kills { unit } => Action::leaderboard_kills(text, *unit),
                    LeaderboardKind::Points { score } => Action::leaderboard_points(text, *score),
                    LeaderboardKind::Resources { resource } => {
                        Action::leaderboard_resources(text, *resource)
                    }
                };
                current.push_action(action)
            }

            Instruction::LeaderboardCpu { state } => {
                current.push_action(Action::leaderboard_computer_players(*state))
            }

            Instruction::Transmission {
                text,
                unit,
                location,
                amount,
                modifier,
                wav_name,
                wav_milliseconds,
            } => {
                let text = self.intern(text);
                let wav = self.intern_wav_path(wav_name);
                let location = self.location_id(location)?;
                current.push_action(Action::transmission(
                    text,
                    *unit,
                    location,
                    *amount,
                    *modifier,
                    wav,
                    *wav_milliseconds,
                ))
            }

            _ => Err(CodegenError::NotImplemented {
                what: "unknown instruction",
                ir: None,
            }),
        }
    }

    fn resource_step(
        &mut self,
        current: &mut TriggerBuilder,
        quantity: Quantity,
        what: &str,
        player: PlayerId,
        resource: trig_asm::ResourceType,
        modifier: NumberModifier,
    ) -> CodegenResult<()> {
        match quantity {
            Quantity::Literal(amount) => {
                current.set_resources(player, modifier, resource, amount)
            }
            Quantity::Register(register) => {
                let cell = self.stack_quantity(register, what)?;
                self.amount_fanout(current, cell, move |amount| {
                    Action::set_resources(player, modifier, resource, amount)
                })
            }
        }
    }

    fn score_step(
        &mut self,
        current: &mut TriggerBuilder,
        quantity: Quantity,
        what: &str,
        player: PlayerId,
        score: trig_asm::ScoreType,
        modifier: NumberModifier,
    ) -> CodegenResult<()> {
        match quantity {
            Quantity::Literal(amount) => current.set_score(player, modifier, score, amount),
            Quantity::Register(register) => {
                let cell = self.stack_quantity(register, what)?;
                self.amount_fanout(current, cell, move |amount| {
                    Action::set_score(player, modifier, score, amount)
                })
            }
        }
    }

    fn deaths_step(
        &mut self,
        current: &mut TriggerBuilder,
        quantity: Quantity,
        what: &str,
        player: PlayerId,
        unit: trig_asm::UnitId,
        modifier: NumberModifier,
    ) -> CodegenResult<()> {
        match quantity {
            Quantity::Literal(amount) => current.set_deaths(player, unit, modifier, amount),
            Quantity::Register(register) => {
                let cell = self.stack_quantity(register, what)?;
                self.amount_fanout(current, cell, move |amount| {
                    Action::set_deaths(player as u32, unit, modifier, amount)
                })
            }
        }
    }

    /// Runs `make` inline when the audience is the triggers owner; otherwise
    /// detours through a one-tick wait so a record owned by the target
    /// player (or by everyone) can observe the pinned address and fire.
    fn split_effect(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
        audience: Audience,
        make: impl FnOnce(&mut TriggerBuilder, PlayerId) -> CodegenResult<()>,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let owner = self.config.triggers_owner;

        if let Audience::Player(player) = audience {
            if player + 1 == owner {
                return make(current, player);
            }
        }

        let address = Self::alloc(next_address);
        current.jump_to(regs, address)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        let mut settle = self.builder(address)?;
        settle.wait(0)?;
        settle.jump_to(regs, ret)?;
        self.push(settle);

        let (player, all) = match audience {
            Audience::All => (owner - 1, true),
            Audience::Player(player) => (player, false),
        };

        let mut effect = self.owned_builder(address, player + 1)?;
        make(&mut effect, player)?;
        if all {
            effect.execute_for_all_players();
        }
        self.push(effect);
        Ok(())
    }

    /// Drains a stack cell at the current address, performing `action_for`
    /// with each drained portion. The running trigger is gated on the cell
    /// reaching zero.
    fn amount_fanout(
        &mut self,
        current: &mut TriggerBuilder,
        cell: Register,
        action_for: impl Fn(u32) -> Action,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let address = current
            .address()
            .ok_or_else(|| CodegenError::malformed("drain outside of addressed code"))?;

        for step in self.batches() {
            let mut fan = self.builder(address)?;
            fan.test_reg(regs, cell, step, AtLeast)?;
            fan.dec_reg(regs, cell, step)?;
            fan.push_action(action_for(step))?;
            self.push(fan);
        }
        current.test_reg(regs, cell, 0, Exactly)
    }

    /// Like [`amount_fanout`], but for unit counts, whose actions carry the
    /// quantity in a byte.
    ///
    /// [`amount_fanout`]: Emitter::amount_fanout
    fn unit_fanout(
        &mut self,
        current: &mut TriggerBuilder,
        cell: Register,
        action_for: impl Fn(u8) -> Action,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let address = current
            .address()
            .ok_or_else(|| CodegenError::malformed("drain outside of addressed code"))?;

        for step in self.unit_batches() {
            let mut fan = self.builder(address)?;
            fan.test_reg(regs, cell, step, AtLeast)?;
            fan.dec_reg(regs, cell, step)?;
            fan.push_action(action_for(step as u8))?;
            self.push(fan);
        }
        current.test_reg(regs, cell, 0, Exactly)
    }

    /// `SetTo` semantics for a stack-borne amount: reset the target, then
    /// drain additively at a dedicated address and resume when empty.
    fn reset_then_drain(
        &mut self,
        current: &mut TriggerBuilder,
        next_address: &mut Address,
        cell: Register,
        reset: Action,
        action_for: impl Fn(u32) -> Action,
    ) -> CodegenResult<()> {
        let regs = self.regs;
        let address = Self::alloc(next_address);

        current.push_action(reset)?;
        current.jump_to(regs, address)?;

        let ret = Self::alloc(next_address);
        self.advance(current, ret)?;

        for step in self.batches() {
            let mut fan = self.builder(address)?;
            fan.test_reg(regs, cell, step, AtLeast)?;
            fan.dec_reg(regs, cell, step)?;
            fan.push_action(action_for(step))?;
            self.push(fan);
        }

        let mut finish = self.builder(address)?;
        finish.test_reg(regs, cell, 0, Exactly)?;
        finish.jump_to(regs, ret)?;
        self.push(finish);
        Ok(())
    }

    fn intern_wav_path(&mut self, name: &str) -> trig_asm::StringId {
        let path = format!("staredit\\wav\\{name}");
        self.intern(&path)
    }
}
