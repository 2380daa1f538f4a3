//! Misuse of the kernel is reported as a typed error.

use disco_simulation::{
    ProcessContext, ProcessState, ProgrammerError, SimError, SimulationConfig, SimulationRunner,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing_test::traced_test;

fn runner() -> SimulationRunner {
    SimulationRunner::new(SimulationConfig::default()).unwrap()
}

fn programmer_error(result: Result<impl Sized, SimError>) -> ProgrammerError {
    match result {
        Err(SimError::Programmer(error)) => error,
        Err(other) => panic!("expected a programmer error, got {}", other),
        Ok(_) => panic!("expected a programmer error, got Ok"),
    }
}

#[traced_test]
#[test]
fn test_negative_hold_stops_run() {
    let mut sim = runner();
    let p = sim.spawn("p", |cx| async move {
        cx.hold(-1.0).await?;
        Ok(())
    });
    sim.activate(p).unwrap();

    let error = programmer_error(sim.run());
    assert_eq!(error, ProgrammerError::NegativeHold { duration: -1.0 });
    assert!(sim.is_terminated(p));
}

#[test]
fn test_non_finite_hold_is_rejected() {
    let mut sim = runner();
    let p = sim.spawn("p", |cx| async move { cx.hold(f64::NAN).await });
    sim.activate(p).unwrap();

    assert!(matches!(
        programmer_error(sim.run()),
        ProgrammerError::InvalidTime { .. }
    ));
}

#[test]
fn test_double_activation() {
    let sim = runner();
    let p = sim.spawn("p", |_| async move { Ok(()) });
    sim.activate(p).unwrap();

    let error = programmer_error(sim.activate(p));
    assert_eq!(
        error,
        ProgrammerError::DoubleActivation {
            process: p,
            state: ProcessState::Scheduled
        }
    );
    // The pending entry is untouched.
    assert_eq!(sim.scheduled_time(p), Some(0.0));
    assert_eq!(sim.pending_events(), 1);
}

#[test]
fn test_activate_at_infinity_is_rejected() {
    let sim = runner();
    let p = sim.spawn("p", |_| async move { Ok(()) });

    assert!(matches!(
        programmer_error(sim.activate_at(p, f64::INFINITY)),
        ProgrammerError::InvalidTime { .. }
    ));
    assert_eq!(sim.process_state(p).unwrap(), ProcessState::NotStarted);
}

#[test]
fn test_cancel_requires_scheduled_process() {
    let mut sim = runner();
    let p = sim.spawn("p", |cx| async move { cx.passivate().await });

    assert_eq!(
        programmer_error(sim.cancel(p)),
        ProgrammerError::NotScheduled {
            process: p,
            state: ProcessState::NotStarted
        }
    );

    sim.activate(p).unwrap();
    sim.run().unwrap();
    assert_eq!(
        programmer_error(sim.cancel(p)),
        ProgrammerError::NotScheduled {
            process: p,
            state: ProcessState::Passive
        }
    );

    sim.activate(p).unwrap();
    sim.run().unwrap();
    assert_eq!(
        programmer_error(sim.cancel(p)),
        ProgrammerError::Terminated { process: p }
    );
}

#[test]
fn test_terminated_process_cannot_be_activated() {
    let mut sim = runner();
    let p = sim.spawn("p", |_| async move { Ok(()) });
    sim.activate(p).unwrap();
    sim.run().unwrap();

    assert!(sim.is_terminated(p));
    assert_eq!(
        programmer_error(sim.activate(p)),
        ProgrammerError::Terminated { process: p }
    );
    assert_eq!(
        programmer_error(sim.reactivate_at(p, 5.0)),
        ProgrammerError::Terminated { process: p }
    );
}

#[test]
fn test_suspending_another_process_is_rejected() {
    let mut sim = runner();
    let stolen: Rc<RefCell<Option<ProcessContext>>> = Rc::new(RefCell::new(None));

    let victim = sim.spawn("victim", {
        let stolen = stolen.clone();
        move |cx| async move {
            *stolen.borrow_mut() = Some(cx.clone());
            cx.passivate().await
        }
    });
    let thief = sim.spawn("thief", {
        let stolen = stolen.clone();
        move |_| async move {
            let Some(other) = stolen.borrow_mut().take() else {
                panic!("victim ran first and left its context");
            };
            other.hold(1.0).await
        }
    });

    sim.activate(victim).unwrap();
    sim.activate(thief).unwrap();

    assert_eq!(
        programmer_error(sim.run()),
        ProgrammerError::NotCurrent { process: victim }
    );
    assert_eq!(sim.process_state(victim).unwrap(), ProcessState::Passive);
}

#[test]
fn test_foreign_future_is_rejected() {
    let mut sim = runner();
    let p = sim.spawn("p", |_| async move {
        futures::future::pending::<()>().await;
        Ok(())
    });
    sim.activate(p).unwrap();

    assert_eq!(
        programmer_error(sim.run()),
        ProgrammerError::ForeignSuspension { process: p }
    );
    assert!(sim.is_terminated(p));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SimulationConfig::new().with_max_step(-1.0);
    assert!(SimulationRunner::new(config).is_err());
}

#[test]
fn test_activating_the_running_process_is_double_activation() {
    let mut sim = runner();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let p = sim.spawn("self-starter", {
        let errors = errors.clone();
        move |cx| async move {
            let me = cx.id();
            errors.borrow_mut().push(programmer_error(cx.activate(me)));
            errors
                .borrow_mut()
                .push(programmer_error(cx.reactivate_at(me, cx.now() + 3.0)));
            cx.hold(1.0).await?;
            Ok(())
        }
    });
    sim.activate(p).unwrap();
    sim.run().unwrap();

    let expected = ProgrammerError::DoubleActivation {
        process: p,
        state: ProcessState::Active,
    };
    assert_eq!(*errors.borrow(), vec![expected.clone(), expected]);
    // Neither call left an entry behind: the hold alone decided the end.
    assert_eq!(sim.time(), 1.0);
    assert!(sim.is_terminated(p));
}

#[test]
fn test_handle_inside_condition_is_kernel_busy() {
    let mut sim = runner();
    let tank = sim.new_continuous("tank", |_| {});
    let level = sim.new_variable(tank, 0.0).unwrap();
    sim.set_derivatives(tank, move |r| r.set_rate(level, 1.0)).unwrap();
    sim.start(tank).unwrap();

    let seen = Rc::new(RefCell::new(None));
    let p = sim.spawn("watcher", {
        let seen = seen.clone();
        move |cx| async move {
            let handle = cx.handle().clone();
            let first = seen.clone();
            cx.wait_until(move |view| {
                let attempt = handle.state(level);
                first.borrow_mut().get_or_insert(attempt);
                view.state(level) >= 2.0
            })
            .await?;
            Ok(())
        }
    });
    sim.activate(p).unwrap();
    sim.run_until(5.0).unwrap();

    assert_eq!(
        *seen.borrow(),
        Some(Err(SimError::Programmer(ProgrammerError::KernelBusy)))
    );
    assert!(sim.is_terminated(p));
}
