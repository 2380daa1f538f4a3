//! Continuous variables advancing between discrete events.

use disco_simulation::{
    IntegrationMethod, IntegratorConfig, ProgrammerError, SimError, SimulationConfig,
    SimulationRunner,
};
use std::cell::RefCell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;
use tracing_test::traced_test;

fn runner() -> SimulationRunner {
    SimulationRunner::new(SimulationConfig::default()).unwrap()
}

#[traced_test]
#[test]
fn test_exponential_decay_over_hold() {
    let mut sim = runner();
    let decay = sim.new_continuous("decay", |_| {});
    let x = sim.new_variable(decay, 1.0).unwrap();
    sim.set_derivatives(decay, move |r| {
        let state = r.state(x);
        r.set_rate(x, -0.1 * state);
    })
    .unwrap();
    sim.start(decay).unwrap();
    assert_eq!(sim.rate(x).unwrap(), -0.1);

    let seen = Rc::new(RefCell::new(None));
    let p = sim.spawn("observer", {
        let seen = seen.clone();
        move |cx| async move {
            cx.hold(1.0).await?;
            *seen.borrow_mut() = Some(cx.state(x)?);
            Ok(())
        }
    });
    sim.activate(p).unwrap();
    let stats = sim.run().unwrap();

    let value = seen.borrow().unwrap();
    assert!((value - 0.905).abs() < 1e-3, "x(1) = {}", value);
    assert!((value - (-0.1f64).exp()).abs() < 1e-9);
    assert!(stats.integration_steps >= 10);
}

#[test]
fn test_stop_freezes_and_start_resumes() {
    let mut sim = runner();
    let decay = sim.new_continuous("decay", |_| {});
    let x = sim.new_variable(decay, 1.0).unwrap();
    sim.set_derivatives(decay, move |r| {
        let state = r.state(x);
        r.set_rate(x, -0.1 * state);
    })
    .unwrap();

    let samples = Rc::new(RefCell::new(Vec::new()));
    let p = sim.spawn("controller", {
        let samples = samples.clone();
        move |cx| async move {
            cx.start(decay)?;
            cx.hold(1.0).await?;
            cx.stop(decay)?;
            samples.borrow_mut().push(cx.state(x)?);
            cx.hold(5.0).await?;
            samples.borrow_mut().push(cx.state(x)?);
            cx.start(decay)?;
            cx.hold(1.0).await?;
            samples.borrow_mut().push(cx.state(x)?);
            Ok(())
        }
    });
    sim.activate(p).unwrap();
    sim.run().unwrap();

    let samples = samples.borrow();
    assert!((samples[0] - (-0.1f64).exp()).abs() < 1e-9);
    assert_eq!(samples[0], samples[1]);
    assert!((samples[2] - (-0.2f64).exp()).abs() < 1e-9);
    assert_eq!(sim.time(), 7.0);
    assert!(sim.is_active(decay).unwrap());
}

#[test]
fn test_coupled_oscillator_across_continuous_instances() {
    let mut sim = runner();
    let position = sim.new_continuous("position", |_| {});
    let velocity = sim.new_continuous("velocity", |_| {});
    let x = sim.new_variable(position, 1.0).unwrap();
    let y = sim.new_variable(velocity, 0.0).unwrap();
    sim.set_derivatives(position, move |r| {
        let v = r.state(y);
        r.set_rate(x, v);
    })
    .unwrap();
    sim.set_derivatives(velocity, move |r| {
        let p = r.state(x);
        r.set_rate(y, -p);
    })
    .unwrap();
    sim.start(position).unwrap();
    sim.start(velocity).unwrap();

    sim.run_until(FRAC_PI_2).unwrap();

    assert!(sim.state(x).unwrap().abs() < 1e-4, "x = {}", sim.state(x).unwrap());
    assert!((sim.state(y).unwrap() + 1.0).abs() < 1e-4);
    assert_eq!(sim.owner(x).unwrap(), position);
}

#[test]
fn test_run_until_advances_without_events() {
    let mut sim = runner();
    let decay = sim.new_continuous("decay", |_| {});
    let x = sim.new_variable(decay, 1.0).unwrap();
    sim.set_derivatives(decay, move |r| {
        let state = r.state(x);
        r.set_rate(x, -0.1 * state);
    })
    .unwrap();
    sim.start(decay).unwrap();

    // With no events the plain run has nothing to do.
    sim.run().unwrap();
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.state(x).unwrap(), 1.0);

    sim.run_until(1.0).unwrap();
    assert_eq!(sim.time(), 1.0);
    assert!((sim.state(x).unwrap() - (-0.1f64).exp()).abs() < 1e-9);
}

#[traced_test]
#[test]
fn test_wait_until_fires_on_threshold() {
    let config = SimulationConfig::new()
        .with_integrator(IntegratorConfig::default().with_min_step(1e-5));
    let mut sim = SimulationRunner::new(config).unwrap();
    let tank = sim.new_continuous("tank", |_| {});
    let level = sim.new_variable(tank, 0.0).unwrap();
    sim.set_derivatives(tank, move |r| r.set_rate(level, 2.0)).unwrap();

    let fired_at = Rc::new(RefCell::new(None));
    let watcher = sim.spawn("watcher", {
        let fired_at = fired_at.clone();
        move |cx| async move {
            cx.wait_until(move |v| v.state(level) >= 10.0).await?;
            *fired_at.borrow_mut() = Some(cx.now());
            Ok(())
        }
    });
    sim.start(tank).unwrap();
    sim.activate(watcher).unwrap();
    let stats = sim.run_until(100.0).unwrap();

    let at = fired_at.borrow().unwrap();
    assert!(at >= 5.0 - 1e-9 && at <= 5.0 + 1e-5 + 1e-9, "fired at {}", at);
    assert_eq!(stats.state_events, 1);
    assert!(stats.rejected_steps > 0);
    assert_eq!(sim.time(), 100.0);
    assert!(sim.is_terminated(watcher));
}

#[test]
fn test_wait_until_already_true_does_not_suspend() {
    let mut sim = runner();
    let order = Rc::new(RefCell::new(Vec::new()));

    let waiter = sim.spawn("waiter", {
        let order = order.clone();
        move |cx| async move {
            cx.wait_until(|_| true).await?;
            order.borrow_mut().push("waiter");
            Ok(())
        }
    });
    let other = sim.spawn("other", {
        let order = order.clone();
        move |_| async move {
            order.borrow_mut().push("other");
            Ok(())
        }
    });
    sim.activate(waiter).unwrap();
    sim.activate(other).unwrap();
    let stats = sim.run().unwrap();

    assert_eq!(*order.borrow(), vec!["waiter", "other"]);
    assert_eq!(stats.state_events, 0);
}

#[test]
fn test_wait_until_sees_discrete_changes() {
    let mut sim = runner();
    let store = sim.new_continuous("store", |_| {});
    let stock = sim.new_variable(store, 0.0).unwrap();

    let woke = Rc::new(RefCell::new(None));
    let consumer = sim.spawn("consumer", {
        let woke = woke.clone();
        move |cx| async move {
            cx.wait_until(move |v| v.state(stock) > 0.0).await?;
            *woke.borrow_mut() = Some(cx.now());
            Ok(())
        }
    });
    let producer = sim.spawn("producer", move |cx| async move {
        cx.hold(3.0).await?;
        cx.set_state(stock, 1.0)?;
        Ok(())
    });
    sim.activate(consumer).unwrap();
    sim.activate(producer).unwrap();
    sim.run().unwrap();

    assert_eq!(*woke.borrow(), Some(3.0));
}

#[test]
fn test_activate_abandons_wait() {
    let mut sim = runner();
    let resumed = Rc::new(RefCell::new(Vec::new()));

    let waiter = sim.spawn("waiter", {
        let resumed = resumed.clone();
        move |cx| async move {
            cx.wait_until(|v| v.time() > 1e9).await?;
            resumed.borrow_mut().push(cx.now());
            cx.hold(10.0).await?;
            resumed.borrow_mut().push(cx.now());
            Ok(())
        }
    });
    let waker = sim.spawn("waker", move |cx| async move {
        cx.hold(2.0).await?;
        cx.activate(waiter)?;
        Ok(())
    });
    sim.activate(waiter).unwrap();
    sim.activate(waker).unwrap();
    let stats = sim.run().unwrap();

    assert_eq!(*resumed.borrow(), vec![2.0, 12.0]);
    assert_eq!(stats.state_events, 0);
}

#[test]
fn test_euler_method_is_selectable() {
    let config = SimulationConfig::new().with_integrator(
        IntegratorConfig::default()
            .with_method(IntegrationMethod::Euler)
            .with_max_step(0.01),
    );
    let mut sim = SimulationRunner::new(config).unwrap();
    let growth = sim.new_continuous("growth", |_| {});
    let x = sim.new_variable(growth, 1.0).unwrap();
    sim.set_derivatives(growth, move |r| {
        let state = r.state(x);
        r.set_rate(x, state);
    })
    .unwrap();
    sim.start(growth).unwrap();
    sim.run_until(1.0).unwrap();

    let value = sim.state(x).unwrap();
    let e = std::f64::consts::E;
    assert!(value < e);
    assert!(e - value < 0.02, "x(1) = {}", value);
}

#[test]
fn test_foreign_rate_write_fails_run() {
    let sim = runner();
    let owner = sim.new_continuous("owner", |_| {});
    let x = sim.new_variable(owner, 0.0).unwrap();
    let intruder = sim.new_continuous("intruder", move |r| r.set_rate(x, 1.0));

    sim.start(owner).unwrap();
    assert!(matches!(
        sim.start(intruder),
        Err(SimError::Programmer(ProgrammerError::ForeignRate { .. }))
    ));
}

#[test]
fn test_unknown_variable_is_rejected() {
    let first = runner();
    let second = runner();
    let c = first.new_continuous("c", |_| {});
    let x = first.new_variable(c, 1.0).unwrap();

    assert!(matches!(
        second.state(x),
        Err(SimError::Programmer(ProgrammerError::UnknownVariable { .. }))
    ));
    assert!(second.new_variable(c, 0.0).is_err());
    assert!(first.new_variable(c, f64::NAN).is_err());
}

#[test]
fn test_integration_far_from_origin_finishes() {
    let mut sim = runner();
    let ramp = sim.new_continuous("ramp", |_| {});
    let x = sim.new_variable(ramp, 0.0).unwrap();
    sim.set_derivatives(ramp, move |r| r.set_rate(x, 1.0)).unwrap();

    let start = 1e17;
    let p = sim.spawn("late starter", move |cx| async move {
        cx.hold(start).await?;
        cx.start(ramp)?;
        cx.hold(64.0).await?;
        Ok(())
    });
    sim.activate(p).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.time(), start + 64.0);
    assert!((sim.state(x).unwrap() - 64.0).abs() < 1e-9);
}
