mod common;

use std::rc::Rc;

use common::{base_defs, instructions, ops};
use vcruise_engine::session::HeadlessSession;
use vcruise_engine::value::ValueTag;
use vcruise_engine::GameDefinitions;
use vcruise_engine::{GameState, ScriptError, ScriptOp::*, StackValue};

fn session() -> HeadlessSession {
    HeadlessSession::new(base_defs())
}

fn ints(session: &HeadlessSession) -> Vec<i32> {
    session
        .runtime
        .stack()
        .values()
        .iter()
        .map(|value| match value {
            StackValue::Integer(value) => *value,
            StackValue::Text(text) => panic!("unexpected string {text}"),
        })
        .collect()
}

#[test]
fn arithmetic_leaves_result_and_returns_to_idle() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[(Number, 3), (Number, 4), (Add, 0)]))
        .unwrap();
    assert_eq!(ints(&session), vec![7]);
    assert_eq!(session.runtime.state(), GameState::Idle);
    assert_eq!(session.runtime.call_depth(), 0);
}

#[test]
fn operands_pop_in_push_order() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[
            (Number, 10),
            (Number, 3),
            (Sub, 0),
            (Number, 17),
            (Number, 5),
            (Mod, 0),
            (Number, 2),
            (Number, 9),
            (CmpLt, 0),
        ]))
        .unwrap();
    assert_eq!(ints(&session), vec![7, 2, 1]);
}

#[test]
fn bit_and_byte_helpers() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[
            (Number, 0b1010),
            (Number, 1),
            (BitLoad, 0),
            (Number, 0),
            (Number, 4),
            (BitSet1, 0),
            (Number, 0x1234_5678),
            (Number, 1),
            (ExtractByte, 0),
            (Number, 0),
            (Number, 0xab),
            (Number, 2),
            (InsertByte, 0),
            (Number, 4729),
            (Number, 2),
            (GetDigit, 0),
        ]))
        .unwrap();
    assert_eq!(ints(&session), vec![1, 16, 0x56, 0x00ab_0000, 7]);
}

#[test]
fn variables_are_scoped_to_the_room() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[
            (Number, 41),
            (Number, 12),
            (VarStore, 0),
            (Number, 1),
            (Number, 12),
            (VarAddAndStore, 0),
            (Number, 0x1234),
            (Number, 5),
            (HiSet, 0),
            (Number, 0x00ff),
            (Number, 5),
            (LoSet, 0),
            (Number, 99),
            (Number, 3),
            (VarGlobalStore, 0),
            (Number, 12),
            (VarLoad, 0),
        ]))
        .unwrap();
    assert_eq!(ints(&session), vec![42]);
    assert_eq!(session.runtime.variable(12), 42);
    assert_eq!(session.runtime.variable(5), 0x1234_00ff);
    assert_eq!(session.runtime.global(3), 99);
}

#[test]
fn check_value_pops_on_match_and_skips_otherwise() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[
            (Number, 5),
            (CheckValue, 5),
            (Number, 100),
            (Number, 6),
            (CheckValue, 5),
            (Number, 200),
            (Number, 300),
        ]))
        .unwrap();
    assert_eq!(ints(&session), vec![100, 6, 300]);
}

#[test]
fn jump_moves_within_the_script() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[(Number, 1), (Jump, 3), (Number, 2), (Number, 3)]))
        .unwrap();
    assert_eq!(ints(&session), vec![1, 3]);

    let err = session
        .runtime
        .run_instructions(instructions(&[(Jump, 9)]))
        .unwrap_err();
    assert!(matches!(err, ScriptError::InvalidArgument { op: "Jump", .. }));
}

#[test]
fn functions_push_frames_and_return() {
    let mut defs = base_defs();
    defs.scripts.functions = vec![
        Some(ops(&[(Number, 2), (Mul, 0), (Return, 0), (Number, 999)])),
        None,
    ];
    let mut session = HeadlessSession::new(defs);
    session
        .runtime
        .run_instructions(instructions(&[(Number, 21), (Fn, 0), (Number, 1)]))
        .unwrap();
    assert_eq!(ints(&session), vec![42, 1]);
    assert_eq!(session.runtime.call_depth(), 0);

    let err = session
        .runtime
        .run_instructions(instructions(&[(Fn, 1)]))
        .unwrap_err();
    assert_eq!(
        err,
        ScriptError::InvalidFunction {
            op: "Fn",
            index: 1
        }
    );
}

#[test]
fn return_from_the_outermost_frame_terminates() {
    let mut session = session();
    session
        .runtime
        .run_instructions(instructions(&[(Number, 1), (Return, 0), (Number, 2)]))
        .unwrap();
    assert_eq!(ints(&session), vec![1]);
    assert_eq!(session.runtime.state(), GameState::Idle);
}

#[test]
fn stack_errors_name_the_opcode() {
    let mut session = session();
    let err = session
        .runtime
        .run_instructions(instructions(&[(Number, 1), (Add, 0)]))
        .unwrap_err();
    assert_eq!(
        err,
        ScriptError::StackUnderflow {
            op: "Add",
            needed: 2,
            available: 1
        }
    );

    let mut defs = GameDefinitions::default();
    defs.scripts.strings.push("text".to_string());
    let mut session = HeadlessSession::new(defs);
    let err = session
        .runtime
        .run_instructions(instructions(&[(String, 0), (Number, 1), (Add, 0)]))
        .unwrap_err();
    assert_eq!(
        err,
        ScriptError::TypeMismatch {
            op: "Add",
            expected: ValueTag::Integer,
            found: ValueTag::Text
        }
    );
    // A failed pop leaves the operands in place.
    assert_eq!(session.runtime.stack().len(), 2);
}

#[test]
fn division_by_zero_is_reported() {
    let mut session = session();
    let err = session
        .runtime
        .run_instructions(instructions(&[(Number, 1), (Number, 0), (Div, 0)]))
        .unwrap_err();
    assert_eq!(err, ScriptError::DivideByZero { op: "Div" });
}

#[test]
fn puzzle_opcodes_are_unimplemented() {
    let mut session = session();
    let err = session
        .runtime
        .run_instructions(instructions(&[(PuzzleInit, 0)]))
        .unwrap_err();
    assert_eq!(err, ScriptError::Unimplemented { op: "PuzzleInit" });
}

#[test]
fn unresolved_names_report_kind_and_room() {
    let mut defs = base_defs();
    let index = common::add_string(&mut defs, "no_such_anim");
    let mut session = HeadlessSession::new(defs);
    let err = session
        .runtime
        .run_instructions(instructions(&[(AnimName, index)]))
        .unwrap_err();
    assert_eq!(
        err,
        ScriptError::UnresolvedName {
            op: "AnimName",
            kind: "animation",
            name: "no_such_anim".to_string(),
            room: common::ROOM
        }
    );
}

#[test]
fn goto_replaces_the_running_script() {
    let mut defs = base_defs();
    common::add_interaction(
        &mut defs,
        common::SCREEN,
        7,
        None,
        ops(&[(Number, 70)]),
    );
    let mut session = HeadlessSession::new(defs);
    session.runtime.start_new_game();
    session
        .runtime
        .activate_script(
            Rc::new(vcruise_engine::Script::new(instructions(&[
                (Number, 1),
                (Number, 7),
                (Goto, 0),
                (Number, 2),
            ]))),
            Default::default(),
        );
    while session.runtime.state() == GameState::Script {
        session.runtime.step_script().unwrap();
    }
    assert_eq!(ints(&session), vec![1, 70]);
}

#[test]
fn random_respects_the_seeded_range() {
    let mut session = session();
    let mut program = Vec::new();
    for _ in 0..20 {
        program.extend(instructions(&[(Number, 4), (Random, 0)]));
    }
    program.extend(instructions(&[(Number, 0), (Random, 0)]));
    session.runtime.run_instructions(program).unwrap();
    let values = ints(&session);
    assert_eq!(values.len(), 21);
    assert!(values[..20].iter().all(|value| (0..4).contains(value)));
    assert_eq!(values[20], 0);
}
