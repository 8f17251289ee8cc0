//! Event sinks of the simulation.

use crate::config::Config;
use crate::model::Person;
use anyhow::{Context, Result};
use std::{
    fmt,
    io::{self, Write},
};

/// Outcome of an interaction between an infectious actor and a partner.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Interaction {
    /// The partner was recorded for infection.
    pub infected: bool,
    /// The partner is immune.
    pub partner_vaccinated: bool,
    /// The partner is already sick, or now sick.
    pub partner_sick: bool,
}

impl Interaction {
    pub fn vaccinated() -> Self {
        Self {
            infected: false,
            partner_vaccinated: true,
            partner_sick: false,
        }
    }

    pub fn already_sick() -> Self {
        Self {
            infected: false,
            partner_vaccinated: false,
            partner_sick: true,
        }
    }

    pub fn infected() -> Self {
        Self {
            infected: true,
            partner_vaccinated: false,
            partner_sick: true,
        }
    }

    pub fn resisted() -> Self {
        Self {
            infected: false,
            partner_vaccinated: false,
            partner_sick: false,
        }
    }
}

/// Receiver of simulation events.
///
/// Calls never alter the simulation state.
pub trait Logger {
    fn log_time_step(&mut self, step: usize, current_infected: usize);

    fn log_interaction(&mut self, actor: &Person, partner: &Person, outcome: Interaction);

    fn log_survival(&mut self, _person: &Person, _survived: bool) {}
}

/// Text event log.
///
/// Writes one line per event and keeps the number of infected people at the
/// start of every step. The first write error is kept and returned by
/// [`EventLog::finish`]; later events are dropped.
pub struct EventLog<W: Write> {
    writer: W,
    infected_series: Vec<usize>,
    error: Option<io::Error>,
}

impl<W: Write> EventLog<W> {
    /// Create a log and write a header line with the run parameters.
    pub fn new(writer: W, cfg: &Config) -> Self {
        let mut log = Self {
            writer,
            infected_series: Vec::new(),
            error: None,
        };
        log.write_line(format_args!(
            "# virus={} mortality_rate={} transmission_prob={} population={} vacc_percentage={} initial_infected={}",
            cfg.virus.name,
            cfg.virus.mortality_rate,
            cfg.virus.transmission_prob,
            cfg.population.size,
            cfg.population.vacc_percentage,
            cfg.population.initial_infected,
        ));
        log
    }

    /// Number of infected people at the start of every logged step.
    pub fn infected_series(&self) -> &[usize] {
        &self.infected_series
    }

    /// Flush the writer and return the infected series.
    pub fn finish(mut self) -> Result<Vec<usize>> {
        if let Some(error) = self.error.take() {
            return Err(error).context("failed to write event");
        }
        self.writer.flush().context("failed to flush writer stream")?;
        Ok(self.infected_series)
    }

    fn write_line(&mut self, args: fmt::Arguments) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = writeln!(self.writer, "{args}") {
            self.error = Some(error);
        }
    }
}

impl<W: Write> Logger for EventLog<W> {
    fn log_time_step(&mut self, step: usize, current_infected: usize) {
        self.infected_series.push(current_infected);
        self.write_line(format_args!("step {step}: {current_infected} infected"));
    }

    fn log_interaction(&mut self, actor: &Person, partner: &Person, outcome: Interaction) {
        let (actor, partner) = (actor.id(), partner.id());
        if outcome.infected {
            self.write_line(format_args!("{actor} infected {partner}"));
        } else if outcome.partner_vaccinated {
            self.write_line(format_args!(
                "{actor} did not infect {partner}: vaccinated"
            ));
        } else if outcome.partner_sick {
            self.write_line(format_args!(
                "{actor} did not infect {partner}: already sick"
            ));
        } else {
            self.write_line(format_args!("{actor} did not infect {partner}"));
        }
    }

    fn log_survival(&mut self, person: &Person, survived: bool) {
        let id = person.id();
        if survived {
            self.write_line(format_args!("{id} survived"));
        } else {
            self.write_line(format_args!("{id} died"));
        }
    }
}
