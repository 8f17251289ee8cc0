use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Simulation;
use crate::logger::EventLog;
use crate::model::Record;
use anyhow::{Context, Result, bail};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Manager of a simulation directory.
///
/// The directory holds `config.toml`, one `run-NNNN` directory per run and
/// the analysis results.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = self.cfg.run.seed.unwrap_or_else(rand::random);

        let record = self
            .simulate(seed, self.events_file(run_idx))
            .context("failed to simulate")?;

        let record_file = self.record_file(run_idx);
        save_record(&record, &record_file)
            .with_context(|| format!("failed to save {record_file:?}"))?;
        log::info!("saved {record_file:?}");

        Ok(())
    }

    /// Run a recorded simulation again from its seed and check that it ends
    /// the same way.
    pub fn replay_run(&self, run_idx: usize) -> Result<()> {
        let record_file = self.record_file(run_idx);
        let record = load_record(&record_file)
            .with_context(|| format!("failed to load {record_file:?}"))?;
        log::info!("loaded {record_file:?}");

        let replayed = self
            .simulate(record.seed, self.run_dir(run_idx).join("replay.log"))
            .context("failed to simulate")?;
        if replayed != record {
            bail!("replayed run differs from the recorded run");
        }
        log::info!("replayed run {run_idx} matches its record");

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        if n_runs == 0 {
            bail!("no runs to analyze");
        }

        let mut analyzer = Analyzer::new();
        for run_idx in 0..n_runs {
            analyzer
                .add_file(self.record_file(run_idx))
                .context("failed to add file")?;
        }

        let results_file = self.results_file();
        analyzer
            .save_results(&results_file)
            .context("failed to save results")?;
        log::info!("saved {results_file:?}");

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let results_file = self.results_file();
        if results_file.exists() {
            fs::remove_file(&results_file)
                .with_context(|| format!("failed to remove {results_file:?}"))?;
            log::info!("removed {results_file:?}");
        }

        Ok(())
    }

    fn simulate(&self, seed: u64, events_file: PathBuf) -> Result<Record> {
        let file = File::create(&events_file)
            .with_context(|| format!("failed to create {events_file:?}"))?;
        let event_log = EventLog::new(BufWriter::new(file), &self.cfg);

        let mut sim = Simulation::new(&self.cfg, seed, event_log)
            .context("failed to construct simulation")?;
        log::info!(
            "simulating {} in a population of {} with seed {seed}",
            sim.virus().name,
            sim.population().len()
        );
        sim.run();

        let summary = sim.summary();
        let infected_series = sim
            .into_logger()
            .finish()
            .with_context(|| format!("failed to write {events_file:?}"))?;

        Ok(Record {
            seed,
            infected_series,
            summary,
        })
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn events_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("events.log")
    }

    fn record_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("record.msgpack")
    }

    fn results_file(&self) -> PathBuf {
        self.sim_dir.join("results.json")
    }
}

fn save_record(record: &Record, file: &Path) -> Result<()> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, record).context("failed to serialize record")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_record(file: &Path) -> Result<Record> {
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let record = decode::from_read(&mut reader).context("failed to deserialize record")?;
    Ok(record)
}
