use crate::model::Record;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Observable computed over the records of all runs.
pub trait Obs {
    fn update(&mut self, record: &Record);
    fn report(&self) -> serde_json::Value;
}

/// Accumulates a single count taken from every record.
pub struct Count {
    name: &'static str,
    extract: fn(&Record) -> usize,
    acc: Accumulator,
}

impl Count {
    pub fn new(name: &'static str, extract: fn(&Record) -> usize) -> Self {
        Self {
            name,
            extract,
            acc: Accumulator::new(),
        }
    }
}

impl Obs for Count {
    fn update(&mut self, record: &Record) {
        self.acc.add((self.extract)(record) as f64);
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ self.name: self.acc.report() })
    }
}

/// Mean number of infected people at the start of each step, over runs that
/// reached that step.
pub struct InfectedCurve {
    acc_vec: Vec<Accumulator>,
}

impl InfectedCurve {
    pub fn new() -> Self {
        Self {
            acc_vec: Vec::new(),
        }
    }
}

impl Obs for InfectedCurve {
    fn update(&mut self, record: &Record) {
        let n_steps = record.infected_series.len();
        if self.acc_vec.len() < n_steps {
            self.acc_vec.resize_with(n_steps, Accumulator::new);
        }
        for (acc, &val) in self.acc_vec.iter_mut().zip(&record.infected_series) {
            acc.add(val as f64);
        }
    }

    fn report(&self) -> serde_json::Value {
        let means: Vec<_> = self.acc_vec.iter().map(|acc| acc.report().mean).collect();
        serde_json::json!({ "infected_curve": means })
    }
}

pub struct Analyzer {
    n_runs: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Count::new("n_steps", |r| r.summary.n_steps)),
            Box::new(Count::new("n_alive", |r| r.summary.n_alive)),
            Box::new(Count::new("n_dead", |r| r.summary.n_dead)),
            Box::new(Count::new("n_vaccinated", |r| r.summary.n_vaccinated)),
            Box::new(Count::new("total_infected", |r| r.summary.total_infected)),
            Box::new(Count::new("peak_infected", |r| {
                r.infected_series.iter().copied().max().unwrap_or(0)
            })),
            Box::new(InfectedCurve::new()),
        ];
        Self {
            n_runs: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_record(&mut self, record: &Record) {
        self.n_runs += 1;
        for obs in &mut self.obs_ptr_vec {
            obs.update(record);
        }
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let record: Record = decode::from_read(&mut reader).context("failed to read record")?;
        self.add_record(&record);
        Ok(())
    }

    pub fn results(&self) -> serde_json::Value {
        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::json!({ "n_runs": self.n_runs, "observables": reports })
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.results())
            .context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
