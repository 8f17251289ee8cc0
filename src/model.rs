//! Simulation data types.

use crate::config::VirusConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Virus spreading through the population.
///
/// Built once per run and shared by every infected person.
#[derive(Debug, PartialEq, Clone)]
pub struct Virus {
    pub name: String,
    pub mortality_rate: f64,
    pub transmission_prob: f64,
}

impl Virus {
    pub fn new(name: impl Into<String>, mortality_rate: f64, transmission_prob: f64) -> Self {
        Self {
            name: name.into(),
            mortality_rate,
            transmission_prob,
        }
    }
}

impl From<&VirusConfig> for Virus {
    fn from(cfg: &VirusConfig) -> Self {
        Self::new(cfg.name.clone(), cfg.mortality_rate, cfg.transmission_prob)
    }
}

/// Person of the simulation.
///
/// A person is infectious while it carries an infection. Dead people stay in
/// the population without an infection.
#[derive(Debug, Clone)]
pub struct Person {
    id: usize,
    is_vaccinated: bool,
    is_alive: bool,
    infection: Option<Rc<Virus>>,
}

impl Person {
    /// Create a living person.
    pub fn new(id: usize, is_vaccinated: bool, infection: Option<Rc<Virus>>) -> Self {
        Self {
            id,
            is_vaccinated,
            is_alive: true,
            infection,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_vaccinated(&self) -> bool {
        self.is_vaccinated
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn infection(&self) -> Option<&Rc<Virus>> {
        self.infection.as_ref()
    }

    pub fn is_infected(&self) -> bool {
        self.infection.is_some()
    }

    /// Living and carrying an infection.
    pub fn is_infectious(&self) -> bool {
        self.is_alive && self.infection.is_some()
    }

    pub fn infect(&mut self, virus: Rc<Virus>) {
        self.infection = Some(virus);
    }

    /// Resolve the current infection, returning whether the person survived.
    ///
    /// The person dies if the mortality rate of its infection exceeds a
    /// uniform roll in `[0, 1)`. Survivors become immune. The infection is
    /// cleared in both cases.
    ///
    /// # Panics
    /// Panics if the person is not infected.
    pub fn survive_infection<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let Some(virus) = self.infection.take() else {
            panic!("person {} resolved survival without an infection", self.id);
        };

        let resilience: f64 = rng.random();
        if virus.mortality_rate > resilience {
            self.is_alive = false;
            false
        } else {
            self.is_vaccinated = true;
            true
        }
    }
}

/// Counts describing the population after a run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub n_steps: usize,
    pub n_alive: usize,
    pub n_dead: usize,
    /// Living people that are immune.
    pub n_vaccinated: usize,
    pub n_infected: usize,
    /// Seed cases plus every applied transmission.
    pub total_infected: usize,
}

/// Record of a single run.
///
/// Contains the seed needed to replay the run, the number of infected people
/// at the start of every step and the final summary.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Record {
    pub seed: u64,
    pub infected_series: Vec<usize>,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn infected_person(mortality_rate: f64) -> Person {
        let virus = Rc::new(Virus::new("Ebola", mortality_rate, 0.5));
        Person::new(7, false, Some(virus))
    }

    #[test]
    fn new_person_is_alive() {
        let person = Person::new(3, true, None);
        assert_eq!(person.id(), 3);
        assert!(person.is_alive());
        assert!(person.is_vaccinated());
        assert!(!person.is_infected());
        assert!(!person.is_infectious());
    }

    #[test]
    fn certain_death() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        for _ in 0..100 {
            let mut person = infected_person(1.0);
            assert!(!person.survive_infection(&mut rng));
            assert!(!person.is_alive());
            assert!(!person.is_vaccinated());
            assert!(person.infection().is_none());
        }
    }

    #[test]
    fn certain_survival() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        for _ in 0..100 {
            let mut person = infected_person(0.0);
            assert!(person.survive_infection(&mut rng));
            assert!(person.is_alive());
            assert!(person.is_vaccinated());
            assert!(person.infection().is_none());
        }
    }

    #[test]
    fn survival_rate_tracks_mortality() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let n_trials = 10_000;
        let n_survived = (0..n_trials)
            .filter(|_| infected_person(0.3).survive_infection(&mut rng))
            .count();
        let frac = n_survived as f64 / n_trials as f64;
        assert!((frac - 0.7).abs() < 0.03, "survival fraction {frac}");
    }

    #[test]
    #[should_panic(expected = "without an infection")]
    fn survival_requires_infection() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        Person::new(0, false, None).survive_infection(&mut rng);
    }
}
