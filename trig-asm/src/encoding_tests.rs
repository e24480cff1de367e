#![allow(clippy::cast_possible_truncation)]

use crate::*;
use proptest::prelude::*;
use rstest::rstest;
use strum::IntoEnumIterator;

#[test]
fn record_widths_match_the_chunk_layout() {
    assert_eq!(Condition::LEN, 20);
    assert_eq!(Action::LEN, 32);
    assert_eq!(UnitProperties::LEN, 20);
    assert_eq!(Trigger::LEN, 2400);
}

#[test]
fn condition_kind_discriminants_round_trip() {
    for kind in ConditionKind::iter() {
        assert_eq!(ConditionKind::try_from(kind as u8), Ok(kind));
    }
    assert_eq!(
        ConditionKind::try_from(24),
        Err(DecodeError::ConditionKind(24))
    );
}

#[test]
fn action_kind_discriminants_round_trip() {
    for kind in ActionKind::iter() {
        assert_eq!(ActionKind::try_from(kind as u8), Ok(kind));
    }
    assert_eq!(ActionKind::try_from(58), Err(DecodeError::ActionKind(58)));
}

#[test]
fn payload_discriminants_round_trip() {
    for resource in ResourceType::iter() {
        assert_eq!(ResourceType::try_from(resource as u8), Ok(resource));
    }
    for score in ScoreType::iter() {
        assert_eq!(ScoreType::try_from(score as u8), Ok(score));
    }
    for status in AllianceStatus::iter() {
        assert_eq!(AllianceStatus::try_from(status as u8), Ok(status));
    }
}

#[test]
fn condition_field_offsets_are_bit_exact() {
    let condition = Condition {
        location: 0x0403_0201,
        player: 0x0807_0605,
        quantity: 0x0c0b_0a09,
        unit: 0x0e0d,
        comparison: 0x0f,
        kind: ConditionKind::Deaths,
        arg: 0x11,
        flags: 0x12,
        mask: 0x1413,
    };
    let bytes = condition.to_bytes();
    assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[4..8], &[0x05, 0x06, 0x07, 0x08]);
    assert_eq!(&bytes[8..12], &[0x09, 0x0a, 0x0b, 0x0c]);
    assert_eq!(&bytes[12..14], &[0x0d, 0x0e]);
    assert_eq!(bytes[14], 0x0f);
    assert_eq!(bytes[15], ConditionKind::Deaths as u8);
    assert_eq!(bytes[16], 0x11);
    assert_eq!(bytes[17], 0x12);
    assert_eq!(&bytes[18..20], &[0x13, 0x14]);
}

#[test]
fn action_field_offsets_are_bit_exact() {
    let action = Action {
        location: 0x0403_0201,
        text: 0x0807_0605,
        wav: 0x0c0b_0a09,
        milliseconds: 0x100f_0e0d,
        player: 0x1413_1211,
        arg0: 0x1817_1615,
        arg1: 0x1a19,
        kind: ActionKind::SetDeaths,
        modifier: 0x1c,
        flags: 0x1d,
        pad: 0x1e,
        mask: 0x201f,
    };
    let bytes = action.to_bytes();
    assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[4..8], &[0x05, 0x06, 0x07, 0x08]);
    assert_eq!(&bytes[8..12], &[0x09, 0x0a, 0x0b, 0x0c]);
    assert_eq!(&bytes[12..16], &[0x0d, 0x0e, 0x0f, 0x10]);
    assert_eq!(&bytes[16..20], &[0x11, 0x12, 0x13, 0x14]);
    assert_eq!(&bytes[20..24], &[0x15, 0x16, 0x17, 0x18]);
    assert_eq!(&bytes[24..26], &[0x19, 0x1a]);
    assert_eq!(bytes[26], ActionKind::SetDeaths as u8);
    assert_eq!(bytes[27], 0x1c);
    assert_eq!(bytes[28], 0x1d);
    assert_eq!(bytes[29], 0x1e);
    assert_eq!(&bytes[30..32], &[0x1f, 0x20]);
}

#[rstest]
#[case(Condition::bring(1, NumericComparison::AtLeast, 0, 5, 1), 6)]
#[case(Condition::command_the_least(2, 7, Some(0)), 1)]
#[case(Condition::command_the_most(2, 7, None), 0)]
fn condition_location_references_are_one_based(
    #[case] condition: Condition,
    #[case] encoded: u32,
) {
    assert_eq!(condition.location, encoded);
}

#[rstest]
#[case(Action::display_text(0), 1)]
#[case(Action::comment(41), 42)]
#[case(Action::set_mission_objectives(7), 8)]
#[case(Action::set_next_scenario(12), 13)]
fn action_string_references_are_one_based(#[case] action: Action, #[case] encoded: u32) {
    assert_eq!(action.text, encoded);
}

#[rstest]
#[case(Action::kill_unit(0, 1, 2, None), ActionKind::KillUnit, 0)]
#[case(Action::kill_unit(0, 1, 2, Some(9)), ActionKind::KillUnitAtLocation, 10)]
#[case(Action::remove_unit(0, 1, 2, None), ActionKind::RemoveUnit, 0)]
#[case(Action::remove_unit(0, 1, 2, Some(0)), ActionKind::RemoveUnitAtLocation, 1)]
#[case(Action::run_ai_script(3, 0x4a_45_4c_4c, None), ActionKind::RunAiScript, 0)]
#[case(Action::run_ai_script(3, 0x4a_45_4c_4c, Some(2)), ActionKind::RunAiScriptAtLocation, 3)]
fn optional_locations_pick_the_at_location_kind(
    #[case] action: Action,
    #[case] kind: ActionKind,
    #[case] location: u32,
) {
    assert_eq!(action.kind, kind);
    assert_eq!(action.location, location);
}

#[test]
fn empty_slots_serialize_to_zero_bytes() {
    assert_eq!(Condition::default().to_bytes(), [0u8; Condition::LEN]);
    assert_eq!(Action::default().to_bytes(), [0u8; Action::LEN]);
    assert_eq!(Trigger::default().to_bytes(), [0u8; Trigger::LEN]);
}

#[test]
fn unknown_discriminants_fail_to_parse() {
    let mut bytes = [0u8; Condition::LEN];
    bytes[15] = 0xff;
    assert_eq!(
        Condition::from_bytes(&bytes),
        Err(DecodeError::ConditionKind(0xff))
    );

    let mut bytes = [0u8; Action::LEN];
    bytes[26] = 0xff;
    assert_eq!(Action::from_bytes(&bytes), Err(DecodeError::ActionKind(0xff)));
}

#[test]
fn chunk_must_be_whole_records() {
    let err = parse_triggers(&[0u8; Trigger::LEN + 1]).unwrap_err();
    assert_eq!(
        err,
        DecodeError::TruncatedChunk {
            len: Trigger::LEN + 1,
            record: Trigger::LEN,
        }
    );
}

fn condition_kind_strategy() -> impl Strategy<Value = ConditionKind> {
    prop::sample::select(ConditionKind::iter().collect::<Vec<_>>())
}

fn action_kind_strategy() -> impl Strategy<Value = ActionKind> {
    prop::sample::select(ActionKind::iter().collect::<Vec<_>>())
}

prop_compose! {
    fn condition_strategy()(
        location in any::<u32>(),
        player in any::<u32>(),
        quantity in any::<u32>(),
        unit in any::<u16>(),
        comparison in any::<u8>(),
        kind in condition_kind_strategy(),
        arg in any::<u8>(),
        flags in any::<u8>(),
        mask in any::<u16>(),
    ) -> Condition {
        Condition { location, player, quantity, unit, comparison, kind, arg, flags, mask }
    }
}

prop_compose! {
    fn action_strategy()(
        location in any::<u32>(),
        text in any::<u32>(),
        wav in any::<u32>(),
        milliseconds in any::<u32>(),
        player in any::<u32>(),
        arg0 in any::<u32>(),
        arg1 in any::<u16>(),
        kind in action_kind_strategy(),
        modifier in any::<u8>(),
        flags in any::<u8>(),
        pad in any::<u8>(),
        mask in any::<u16>(),
    ) -> Action {
        Action {
            location, text, wav, milliseconds, player, arg0, arg1,
            kind, modifier, flags, pad, mask,
        }
    }
}

proptest! {
    #[test]
    fn condition_codec_round_trips(condition in condition_strategy()) {
        let bytes = condition.to_bytes();
        prop_assert_eq!(Condition::from_bytes(&bytes), Ok(condition));
    }

    #[test]
    fn action_codec_round_trips(action in action_strategy()) {
        let bytes = action.to_bytes();
        prop_assert_eq!(Action::from_bytes(&bytes), Ok(action));
    }

    #[test]
    fn trigger_chunk_round_trips(
        conditions in prop::collection::vec(condition_strategy(), 0..=4),
        actions in prop::collection::vec(action_strategy(), 0..=6),
        owner in 0u8..8,
        copies in 1usize..4,
    ) {
        let mut trigger = Trigger::default();
        for (slot, condition) in trigger.conditions.iter_mut().zip(&conditions) {
            *slot = *condition;
        }
        for (slot, action) in trigger.actions.iter_mut().zip(&actions) {
            *slot = *action;
        }
        trigger.execute_for(owner);

        let chunk = serialize_triggers(&vec![trigger.clone(); copies]);
        prop_assert_eq!(chunk.len(), copies * Trigger::LEN);

        let parsed = parse_triggers(&chunk).unwrap();
        prop_assert_eq!(parsed, vec![trigger; copies]);
    }

    #[test]
    fn unit_properties_codec_round_trips(
        valid_special in any::<u16>(),
        valid_fields in any::<u16>(),
        owner in any::<u8>(),
        hit_points in any::<u8>(),
        shield_points in any::<u8>(),
        energy in any::<u8>(),
        resource_amount in any::<u32>(),
        hangar_count in any::<u16>(),
        state_flags in any::<u16>(),
    ) {
        let slot = UnitProperties {
            valid_special,
            valid_fields,
            owner,
            hit_points,
            shield_points,
            energy,
            resource_amount,
            hangar_count,
            state_flags,
            pad: 0,
        };
        prop_assert_eq!(UnitProperties::from_bytes(&slot.to_bytes()), Ok(slot));
    }
}
