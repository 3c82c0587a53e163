use mmlengine::{NoteOptions, TextSink, TrackController};
use proptest::prelude::*;
use std::io;

type NullController = TrackController<TextSink<io::Sink, io::Sink>>;

fn controller() -> NullController {
    TrackController::new(TextSink::with_debug(io::sink(), io::sink()))
}

fn optional(range: std::ops::Range<i32>) -> impl Strategy<Value = Option<i32>> {
    prop_oneof![Just(None), range.prop_map(Some)]
}

proptest! {
    #[test]
    fn note_advances_by_exactly_its_step(
        start in -10_000i32..10_000,
        step in 0i32..4_000,
        gate in optional(-100..4_000),
        velocity in optional(-1..256),
        key_delay in optional(-1..500),
        gate_relative in -16i32..64,
        gate_denominator in -8i32..16,
        gate_absolute in -50i32..50,
        key in any::<u8>(),
    ) {
        let mut tc = controller();
        tc.state_mut().gate_relative = gate_relative;
        tc.state_mut().gate_denominator = gate_denominator;
        tc.state_mut().gate_absolute = gate_absolute;
        tc.set_position(start);

        tc.note(key, NoteOptions {
            step: Some(step),
            gate,
            velocity,
            key_delay,
            note_off_velocity: 0,
        }).unwrap();

        prop_assert_eq!(tc.position(), start + step);
    }

    #[test]
    fn default_step_is_the_default_length(
        denominator in 1i32..=192,
        key_delay in 0i32..100,
    ) {
        let mut tc = controller();
        tc.state_mut().default_length = mmlengine::Length(denominator);
        tc.state_mut().key_delay = key_delay;
        let expected = tc.default_length_ticks();

        tc.note(60, NoteOptions::default()).unwrap();

        prop_assert_eq!(tc.position(), expected);
    }

    #[test]
    fn velocity_steps_by_sensitivity(
        sensitivity in -32i32..32,
        ups in 0usize..40,
        downs in 0usize..40,
    ) {
        let mut tc = controller();
        tc.state_mut().velocity_sensitivity = sensitivity;
        for _ in 0..ups {
            tc.increase_velocity();
        }
        for _ in 0..downs {
            tc.decrease_velocity();
        }
        let expected = 100 + sensitivity * (ups as i32 - downs as i32);
        prop_assert_eq!(tc.state().velocity, expected);
    }
}
