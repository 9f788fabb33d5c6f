use std::cell::RefCell;
use std::rc::Rc;

use tileflow::samples::{corridor_flow, corridor_library, demo_project};
use tileflow::{AdvanceStopReason, GenerationError, GenerationStatus, Generator, GeneratorSettings};

fn demo_generator(seed: u64, yield_between_tiles: bool) -> Generator {
    let project = demo_project();
    let settings = GeneratorSettings {
        seed: Some(seed),
        yield_between_tiles,
        ..project.settings.clone()
    };
    Generator::new(&project.flow, &project.library, settings).expect("demo flow is valid")
}

/// Drives a generator one step at a time and returns the fingerprint, if any.
fn step_to_end(generator: &mut Generator) -> Result<Option<u64>, String> {
    for _ in 0..100_000 {
        let result = generator.advance(1);
        match result.stop_reason {
            AdvanceStopReason::Complete => {
                return Ok(generator.dungeon().map(|dungeon| dungeon.graph.fingerprint()));
            }
            AdvanceStopReason::Failed => return Ok(None),
            AdvanceStopReason::Cancelled => return Err("unexpected cancellation".to_string()),
            AdvanceStopReason::Yielded | AdvanceStopReason::BudgetExhausted => {
                if result.steps != 1 {
                    return Err(format!("advance(1) ran {} steps", result.steps));
                }
            }
        }
    }
    Err("generation did not finish".to_string())
}

#[test]
fn test_stepped_generation_matches_one_shot() {
    for seed in 0..6 {
        let one_shot = demo_generator(seed, false).generate().map(|d| d.graph.fingerprint()).ok();
        let stepped = step_to_end(&mut demo_generator(seed, false)).expect("stepping finishes");
        let yielding = step_to_end(&mut demo_generator(seed, true)).expect("stepping finishes");
        assert_eq!(stepped, one_shot, "seed {seed}");
        assert_eq!(yielding, one_shot, "seed {seed}");
    }
}

#[test]
fn test_large_budget_runs_to_completion_in_one_call() {
    let settings = GeneratorSettings { seed: Some(3), ..GeneratorSettings::default() };
    let mut generator =
        Generator::new(&corridor_flow(6), &corridor_library(), settings).expect("valid flow");
    let result = generator.advance(10_000);
    assert_eq!(result.stop_reason, AdvanceStopReason::Complete);
    assert_eq!(generator.status(), GenerationStatus::Complete);
    assert_eq!(generator.advance(10).steps, 0);
}

#[test]
fn test_cancel_then_reset_regenerates_the_same_layout() {
    let settings = GeneratorSettings { seed: Some(99), ..GeneratorSettings::default() };
    let mut fresh =
        Generator::new(&corridor_flow(6), &corridor_library(), settings.clone()).expect("valid");
    let expected = fresh.generate().expect("corridor fits").graph.fingerprint();

    let mut generator =
        Generator::new(&corridor_flow(6), &corridor_library(), settings).expect("valid flow");
    let transitions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&transitions);
    generator.on_status_changed(move |_, next| sink.borrow_mut().push(next));

    assert_eq!(generator.advance(4).stop_reason, AdvanceStopReason::BudgetExhausted);
    generator.cancel();
    assert_eq!(generator.status(), GenerationStatus::Cancelled);
    assert!(generator.dungeon().is_none());
    assert_eq!(generator.error(), Some(&GenerationError::Cancelled));
    let result = generator.advance(5);
    assert_eq!((result.steps, result.stop_reason), (0, AdvanceStopReason::Cancelled));
    assert!(matches!(generator.generate(), Err(GenerationError::Cancelled)));
    assert_eq!(transitions.borrow().last(), Some(&GenerationStatus::Cancelled));

    generator.reset(99);
    assert_eq!(generator.status(), GenerationStatus::NotStarted);
    let regenerated = generator.generate().expect("corridor fits").graph.fingerprint();
    assert_eq!(regenerated, expected);
    assert_eq!(transitions.borrow().last(), Some(&GenerationStatus::Complete));
}

#[test]
fn test_cancel_after_completion_keeps_the_dungeon() {
    let settings = GeneratorSettings { seed: Some(5), ..GeneratorSettings::default() };
    let mut generator =
        Generator::new(&corridor_flow(3), &corridor_library(), settings).expect("valid flow");
    generator.generate().expect("corridor fits");
    generator.cancel();
    assert_eq!(generator.status(), GenerationStatus::Complete);
    assert!(generator.dungeon().is_some());
}
