use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub virus: VirusConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Virus parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VirusConfig {
    /// Name of the virus.
    pub name: String,
    /// Probability threshold of dying from an infection.
    pub mortality_rate: f64,
    /// Probability of transmission per interaction with a susceptible person.
    pub transmission_prob: f64,
}

/// Population parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of people.
    pub size: usize,
    /// Probability that a healthy person starts vaccinated.
    pub vacc_percentage: f64,
    /// Number of people infected at the outset.
    #[serde(default = "default_initial_infected")]
    pub initial_infected: usize,
}

/// Run parameters.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed of the random number generator (drawn per run if absent).
    pub seed: Option<u64>,
}

fn default_initial_infected() -> usize {
    1
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.virus.name.trim().is_empty() {
            bail!("invalid virus name: name must not be empty");
        }
        check_num(self.virus.mortality_rate, 0.0..=1.0).context("invalid mortality rate")?;
        check_num(self.virus.transmission_prob, 0.0..=1.0)
            .context("invalid transmission probability")?;

        check_num(self.population.size, 1..=10_000_000).context("invalid population size")?;
        check_num(self.population.vacc_percentage, 0.0..=1.0)
            .context("invalid vaccination percentage")?;
        check_num(self.population.initial_infected, 1..=self.population.size)
            .context("invalid initial number of infected")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    // NaN fails every comparison and is rejected here too.
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(
    size: usize,
    vacc_percentage: f64,
    mortality_rate: f64,
    transmission_prob: f64,
    initial_infected: usize,
) -> Config {
    Config {
        virus: VirusConfig {
            name: "Ebola".to_string(),
            mortality_rate,
            transmission_prob,
        },
        population: PopulationConfig {
            size,
            vacc_percentage,
            initial_infected,
        },
        run: RunConfig::default(),
    }
}
