use crate::config::{Config, PopulationConfig};
use crate::logger::{Interaction, Logger};
use crate::model::{Person, Summary, Virus};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use std::{collections::BTreeSet, rc::Rc};

/// Number of interactions each infectious person performs per step.
pub const INTERACTIONS_PER_STEP: usize = 100;

/// Simulation engine.
///
/// Owns the population, the shared virus and the random number generator,
/// and drives the spread of the virus step by step. Every event is reported
/// to the logger `L`.
pub struct Simulation<L: Logger> {
    virus: Rc<Virus>,
    population: Vec<Person>,
    partner_dist: Uniform<usize>,
    newly_infected: BTreeSet<usize>,
    current_infected: usize,
    total_infected: usize,
    n_steps: usize,
    rng: ChaCha12Rng,
    logger: L,
}

impl<L: Logger> Simulation<L> {
    /// Create a new `Simulation` with a population drawn from `seed`.
    ///
    /// # Errors
    /// Returns an error if the configuration values are invalid.
    pub fn new(cfg: &Config, seed: u64, logger: L) -> Result<Self> {
        cfg.validate().context("invalid simulation parameters")?;

        let mut rng = ChaCha12Rng::seed_from_u64(seed);

        let virus = Rc::new(Virus::from(&cfg.virus));
        let population = create_population(&cfg.population, &virus, &mut rng);
        let partner_dist = Uniform::new(0, population.len())?;

        log::debug!(
            "created population of {} with {} vaccinated",
            population.len(),
            population.iter().filter(|p| p.is_vaccinated()).count()
        );

        Ok(Self {
            virus,
            population,
            partner_dist,
            newly_infected: BTreeSet::new(),
            current_infected: cfg.population.initial_infected,
            total_infected: cfg.population.initial_infected,
            n_steps: 0,
            rng,
            logger,
        })
    }

    pub fn virus(&self) -> &Virus {
        &self.virus
    }

    pub fn population(&self) -> &[Person] {
        &self.population
    }

    pub fn current_infected(&self) -> usize {
        self.current_infected
    }

    /// Ids recorded for infection during the current step.
    pub fn newly_infected(&self) -> &BTreeSet<usize> {
        &self.newly_infected
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn into_logger(self) -> L {
        self.logger
    }

    /// Run steps until nobody is infectious.
    pub fn run(&mut self) {
        while self.should_continue() {
            self.logger.log_time_step(self.n_steps, self.current_infected);
            self.step();
        }

        let summary = self.summary();
        log::info!(
            "simulation ended after {} steps: {} alive, {} dead",
            summary.n_steps,
            summary.n_alive,
            summary.n_dead
        );
    }

    /// Whether another step should run.
    ///
    /// Stops once everyone is dead or no living person is infected.
    pub fn should_continue(&self) -> bool {
        let all_dead = self.population.iter().all(|p| !p.is_alive());
        let some_infected = self.population.iter().any(|p| p.is_infectious());
        !all_dead && some_infected
    }

    /// Perform one step: interactions, then resolution.
    pub fn step(&mut self) {
        self.time_step();
        self.resolve_step();
        self.n_steps += 1;

        log::debug!(
            "step {}: {} infected, {} dead",
            self.n_steps,
            self.current_infected,
            self.population.iter().filter(|p| !p.is_alive()).count()
        );
    }

    /// Let every infectious person interact with random living partners.
    ///
    /// Transmissions are only recorded, so people infected here act from the
    /// next step on.
    pub fn time_step(&mut self) {
        let actors: Vec<usize> = self
            .population
            .iter()
            .filter(|p| p.is_infectious())
            .map(|p| p.id())
            .collect();

        // A lone survivor has nobody to meet.
        let n_alive = self.population.iter().filter(|p| p.is_alive()).count();
        if n_alive < 2 {
            return;
        }

        for actor in actors {
            for _ in 0..INTERACTIONS_PER_STEP {
                let partner = self.draw_partner(actor);
                self.interaction(actor, partner);
            }
        }
    }

    fn draw_partner(&mut self, actor: usize) -> usize {
        loop {
            let i_person = self.partner_dist.sample(&mut self.rng);
            let candidate = &self.population[i_person];
            if candidate.is_alive() && candidate.id() != actor {
                return i_person;
            }
        }
    }

    /// Resolve an interaction between an infectious actor and a partner.
    ///
    /// # Panics
    /// Panics if either person is dead.
    pub fn interaction(&mut self, actor: usize, partner: usize) -> Interaction {
        let actor = &self.population[actor];
        let partner = &self.population[partner];
        assert!(actor.is_alive(), "actor {} is dead", actor.id());
        assert!(partner.is_alive(), "partner {} is dead", partner.id());

        let outcome = if partner.is_vaccinated() {
            Interaction::vaccinated()
        } else if partner.is_infected() {
            Interaction::already_sick()
        } else {
            let roll: f64 = self.rng.random();
            if roll < self.virus.transmission_prob {
                self.newly_infected.insert(partner.id());
                Interaction::infected()
            } else {
                Interaction::resisted()
            }
        };

        self.logger.log_interaction(actor, partner, outcome);
        outcome
    }

    /// Resolve carried-over infections, then apply this step's transmissions.
    pub fn resolve_step(&mut self) {
        for person in self.population.iter_mut().filter(|p| p.is_infectious()) {
            let survived = person.survive_infection(&mut self.rng);
            self.logger.log_survival(person, survived);
        }

        for &id in &self.newly_infected {
            let person = &mut self.population[id];
            debug_assert_eq!(person.id(), id);
            person.infect(Rc::clone(&self.virus));
        }
        self.total_infected += self.newly_infected.len();
        self.newly_infected.clear();

        self.current_infected = self
            .population
            .iter()
            .filter(|p| p.is_infectious())
            .count();
    }

    pub fn summary(&self) -> Summary {
        let n_alive = self.population.iter().filter(|p| p.is_alive()).count();
        Summary {
            n_steps: self.n_steps,
            n_alive,
            n_dead: self.population.len() - n_alive,
            n_vaccinated: self
                .population
                .iter()
                .filter(|p| p.is_alive() && p.is_vaccinated())
                .count(),
            n_infected: self.current_infected,
            total_infected: self.total_infected,
        }
    }
}

/// Build the population: seed cases first, then people vaccinated with
/// probability `vacc_percentage`. Ids equal positions.
fn create_population(
    cfg: &PopulationConfig,
    virus: &Rc<Virus>,
    rng: &mut ChaCha12Rng,
) -> Vec<Person> {
    let mut population = Vec::with_capacity(cfg.size);
    for id in 0..cfg.size {
        if id < cfg.initial_infected {
            population.push(Person::new(id, false, Some(Rc::clone(virus))));
        } else {
            let roll: f64 = rng.random();
            population.push(Person::new(id, roll < cfg.vacc_percentage, None));
        }
    }
    population
}
