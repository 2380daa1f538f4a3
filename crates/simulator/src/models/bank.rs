//! Bank with one waiting line served by several tellers (M/M/c).
//!
//! Customers arrive with exponential interarrival times and join the tail
//! of the line. An idle teller is woken by the arriving customer; a busy
//! teller takes the head of the line as soon as it finishes a service.
//! Each customer is a process that passivates until its teller releases
//! it.

use crate::config::{BankConfig, SimulatorConfig};
use disco_queue::{HeadId, Ring};
use disco_random::Random;
use disco_simulation::{ProcessContext, ProcessId, SimError, SimulationRunner, SimulationStats};
use disco_stats::{report_all, Accumulate, Collector, Count, Tally};
use disco_types::SimTime;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, trace};

/// A customer in the line.
struct Waiting {
    customer: ProcessId,
    arrived: SimTime,
}

/// Model state shared by all processes of one run.
struct Bank {
    line: Ring<Waiting>,
    line_head: HeadId,
    idle: Ring<ProcessId>,
    idle_head: HeadId,
    busy_tellers: usize,
    arrivals_stream: Random,
    service_stream: Random,
    arrivals: Count,
    wait: Tally,
    line_length: Accumulate,
    busy: Accumulate,
}

type Shared = Rc<RefCell<Bank>>;

impl Bank {
    fn new(seed: u64) -> Result<Self, SimError> {
        let mut line = Ring::new();
        let line_head = line.new_head();
        let mut idle = Ring::new();
        let idle_head = idle.new_head();
        Ok(Self {
            line,
            line_head,
            idle,
            idle_head,
            busy_tellers: 0,
            arrivals_stream: Random::new(seed),
            service_stream: Random::new(seed.wrapping_add(1)),
            arrivals: Count::new("arrivals", 0.0),
            wait: Tally::new("wait", 0.0),
            line_length: Accumulate::new("line length", 0.0, 0.0)?,
            busy: Accumulate::new("busy tellers", 0.0, 0.0)?,
        })
    }

    /// Put `customer` at the tail of the line; returns an idle teller to wake.
    fn join(&mut self, customer: ProcessId, now: SimTime) -> Result<Option<ProcessId>, SimError> {
        let link = self.line.insert(Waiting {
            customer,
            arrived: now,
        });
        self.line.append(link, self.line_head)?;
        self.arrivals.increment();
        self.line_length
            .update(now, self.line.cardinal(self.line_head) as f64)?;

        match self.idle.first(self.idle_head) {
            Some(link) => Ok(Some(self.idle.release(link)?)),
            None => Ok(None),
        }
    }

    /// Take the head of the line, or enlist `teller` as idle if there is none.
    ///
    /// Returns the customer and its service time.
    fn next_customer(
        &mut self,
        teller: ProcessId,
        now: SimTime,
        mean_service: f64,
    ) -> Result<Option<(ProcessId, f64)>, SimError> {
        let Some(link) = self.line.first(self.line_head) else {
            let link = self.idle.insert(teller);
            self.idle.append(link, self.idle_head)?;
            return Ok(None);
        };
        let waiting = self.line.release(link)?;
        self.line_length
            .update(now, self.line.cardinal(self.line_head) as f64)?;
        self.wait.update(now - waiting.arrived)?;
        self.set_busy(now, self.busy_tellers + 1)?;
        let service = self.service_stream.exp(mean_service)?;
        Ok(Some((waiting.customer, service)))
    }

    fn set_busy(&mut self, now: SimTime, busy: usize) -> Result<(), SimError> {
        self.busy_tellers = busy;
        self.busy.update(now, busy as f64)?;
        Ok(())
    }
}

async fn generator(cx: ProcessContext, bank: Shared, mean_interarrival: f64) -> Result<(), SimError> {
    loop {
        let delay = bank.borrow_mut().arrivals_stream.exp(mean_interarrival)?;
        cx.hold(delay).await?;
        let id = cx.spawn("customer", {
            let bank = bank.clone();
            move |cx| customer(cx, bank)
        });
        cx.activate(id)?;
    }
}

async fn customer(cx: ProcessContext, bank: Shared) -> Result<(), SimError> {
    let teller = bank.borrow_mut().join(cx.id(), cx.now())?;
    if let Some(teller) = teller {
        trace!(customer = %cx.id(), %teller, "Waking idle teller");
        cx.activate(teller)?;
    }
    // Released by the teller at the end of service.
    cx.passivate().await
}

async fn teller(cx: ProcessContext, bank: Shared, mean_service: f64) -> Result<(), SimError> {
    loop {
        let next = bank
            .borrow_mut()
            .next_customer(cx.id(), cx.now(), mean_service)?;
        let Some((customer, service)) = next else {
            cx.passivate().await?;
            continue;
        };

        cx.hold(service).await?;
        {
            let mut bank = bank.borrow_mut();
            let busy = bank.busy_tellers - 1;
            bank.set_busy(cx.now(), busy)?;
        }
        trace!(teller = %cx.id(), %customer, service, "Served");
        cx.activate(customer)?;
    }
}

/// Outcome of a bank run.
#[derive(Debug, Clone)]
pub struct BankReport {
    /// Simulated time at which the run stopped.
    pub end_time: SimTime,
    /// Customers that arrived.
    pub arrivals: Count,
    /// Time customers spent in line before service.
    pub wait: Tally,
    /// Number of customers in line over time.
    pub line_length: Accumulate,
    /// Number of busy tellers over time.
    pub busy: Accumulate,
    /// Kernel counters.
    pub stats: SimulationStats,
}

impl BankReport {
    /// Customers whose service has started.
    pub fn customers_served(&self) -> u64 {
        self.wait.observations()
    }

    /// Log the collector reports.
    pub fn log(&self) {
        report_all(
            &[&self.arrivals, &self.wait, &self.line_length, &self.busy],
            self.end_time,
        );
    }
}

/// Run the bank model until the configured horizon.
pub fn run_bank(config: &SimulatorConfig, bank_config: &BankConfig) -> Result<BankReport, SimError> {
    config.validate()?;
    bank_config.validate()?;
    info!(
        seed = config.seed,
        horizon = config.horizon,
        tellers = bank_config.tellers,
        utilization = bank_config.utilization(),
        "Starting bank model"
    );

    let mut sim = SimulationRunner::new(config.simulation.clone())?;
    let bank: Shared = Rc::new(RefCell::new(Bank::new(config.seed)?));

    for i in 0..bank_config.tellers {
        let mean_service = bank_config.mean_service;
        let id = sim.spawn(format!("teller {}", i), {
            let bank = bank.clone();
            move |cx| teller(cx, bank, mean_service)
        });
        sim.activate(id)?;
    }
    let mean_interarrival = bank_config.mean_interarrival;
    let id = sim.spawn("generator", {
        let bank = bank.clone();
        move |cx| generator(cx, bank, mean_interarrival)
    });
    sim.activate(id)?;

    let stats = sim.run_until(config.horizon)?;
    let end_time = sim.time();
    let bank = bank.borrow();
    debug!(
        waiting = bank.line.cardinal(bank.line_head),
        busy = bank.busy_tellers,
        "Bank model finished"
    );

    Ok(BankReport {
        end_time,
        arrivals: bank.arrivals.clone(),
        wait: bank.wait.clone(),
        line_length: bank.line_length.clone(),
        busy: bank.busy.clone(),
        stats,
    })
}
