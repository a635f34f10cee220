use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::builder::TypedValueParser;
use clap::Parser;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mida::{
    analysis, build_peptide, AminoAcidTable, BinningCache, ChemicalData, DistributionRequest,
    MidaError,
};

use crate::args::{non_negative_float_f64, ArgLysineVariant, OutputFormat};

#[derive(Debug, Error)]
pub enum MidaCalcError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to write JSON output: {0}")]
    JSONError(
        #[source]
        #[from]
        serde_json::Error,
    ),
    #[error("Failed to read configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to build thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error(transparent)]
    MidaError(#[from] MidaError),
    #[error("No peptide sequences were given")]
    NoSequences,
    #[error("At least one enrichment step is required")]
    NoEnrichmentSteps,
    #[error("{failed} of {total} peptides could not be computed")]
    PeptidesFailed { failed: usize, total: usize },
}

/// The computed distributions for a single peptide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideReport {
    pub sequence: String,
    pub formula: String,
    pub base_mass: f64,
    /// The summed labile hydrogen count before rounding
    pub labile_hydrogens: f64,
    /// The distribution with every atom at natural abundance
    pub natural: Vec<f64>,
    pub p_values: Vec<f64>,
    /// The renormalized distribution at each enrichment parameter
    pub distributions: Vec<Vec<f64>>,
    /// The excess abundance of each isotopomer at each enrichment parameter, if requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub excess: Option<Vec<Vec<f64>>>,
}

/// Compute mass isotopomer distributions of peptides over a sweep of tracer enrichment.
///
/// Each sequence's labile hydrogens are enriched by every value of the enrichment
/// parameter `p` from zero to `--p-max`, and the resulting distributions are renormalized
/// and written as a table or a JSON document.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MidaCalc {
    /// The peptide sequences to compute, in one-letter residue codes
    #[arg()]
    pub sequences: Vec<String>,

    /// The path to write the output file to, or if '-' is passed, write to STDOUT
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `midacalc.toml` in the working directory.
    /// Environment variables prefixed with `MIDACALC_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The highest isotopomer, `M+n`, to compute
    #[arg(short = 'c', long = "mass-cutoff", default_value_t = 4)]
    pub mass_cutoff: usize,

    /// The largest enrichment parameter to sweep to
    #[arg(
        short = 'p',
        long = "p-max",
        default_value_t = 0.05,
        value_parser = non_negative_float_f64
    )]
    pub p_max: f64,

    /// The number of evenly spaced enrichment parameters to compute, including zero
    #[arg(
        short = 'n',
        long = "p-steps",
        default_value_t = 50,
        value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize)
    )]
    pub p_steps: usize,

    /// The modified lysine that the `k` residue code denotes
    #[arg(
        short = 'k',
        long = "lysine-variant",
        value_enum,
        default_value_t = ArgLysineVariant::Ubiquitinated
    )]
    pub lysine_variant: ArgLysineVariant,

    /// The format to write results in
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    /// Also report the excess abundance series relative to the unlabeled distribution
    #[arg(long = "excess")]
    pub excess: bool,
}

impl Default for MidaCalc {
    fn default() -> Self {
        Self {
            sequences: Vec::new(),
            output_file: PathBuf::from("-"),
            log_file: None,
            config_file: None,
            threads: -1,
            mass_cutoff: 4,
            p_max: 0.05,
            p_steps: 50,
            lysine_variant: ArgLysineVariant::default(),
            format: OutputFormat::default(),
            excess: false,
        }
    }
}

/// Extend `row` with empty bins up to `width`
fn pad_row(row: &[f64], width: usize) -> Vec<f64> {
    let mut out = row.to_vec();
    if out.len() < width {
        out.resize(width, 0.0);
    }
    out
}

impl MidaCalc {
    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MidaCalcError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    fn compute_report(
        &self,
        sequence: &str,
        p_values: &[f64],
        table: &AminoAcidTable,
        data: &ChemicalData,
        cache: &BinningCache,
    ) -> Result<PeptideReport, MidaError> {
        let peptide = build_peptide(sequence, table, data, cache)?;

        let mut request = DistributionRequest::new();
        for group in peptide.labile_groups() {
            request = request.with_labile(analysis::convert_enrichment_parameter_to_abundances(
                p_values,
                data.natural_abundances(group.element_id()),
            )?);
        }
        for group in peptide.enrichment_groups() {
            request = request.with_enrichment(
                vec![data.natural_abundances(group.element_id()).to_vec()],
                0.0,
            );
        }

        let dist = peptide.distribution(&request, self.mass_cutoff)?;
        let renormalized = analysis::renormalize(&peptide, &dist);
        let width = self.mass_cutoff + 1;
        let excess = self.excess.then(|| {
            analysis::excess_abundances(&renormalized)
                .iter()
                .map(|row| pad_row(row, width))
                .collect::<Vec<_>>()
        });
        let natural = peptide.natural_distribution(self.mass_cutoff)?;

        let labile_hydrogens = data
            .element_id("H")
            .map(|h| {
                peptide
                    .labile_specs()
                    .iter()
                    .filter(|spec| spec.element_id == h)
                    .map(|spec| spec.n)
                    .sum::<f64>()
            })
            .unwrap_or_default();

        Ok(PeptideReport {
            sequence: sequence.to_string(),
            formula: peptide.formula(),
            base_mass: peptide.base_mass(),
            labile_hydrogens,
            natural: pad_row(natural.row(0), width),
            p_values: p_values.to_vec(),
            distributions: renormalized
                .iter()
                .map(|row| pad_row(row, width))
                .collect(),
            excess,
        })
    }

    /// Compute every sequence's report in input order, logging and counting the sequences
    /// that could not be computed
    fn compute_batch(&self) -> Result<(Vec<PeptideReport>, usize), MidaCalcError> {
        if self.sequences.is_empty() {
            return Err(MidaCalcError::NoSequences);
        }
        if self.p_steps == 0 {
            return Err(MidaCalcError::NoEnrichmentSteps);
        }
        let data = ChemicalData::default();
        let table = AminoAcidTable::default().with_lysine_variant(self.lysine_variant.into());
        let cache = BinningCache::new();
        let p_values = analysis::enrichment_sweep(self.p_max, self.p_steps);

        let started = Instant::now();
        let results: Vec<_> = self.create_threadpool()?.install(|| {
            self.sequences
                .par_iter()
                .map(|seq| self.compute_report(seq, &p_values, &table, &data, &cache))
                .collect()
        });

        let total = results.len();
        let mut reports = Vec::with_capacity(total);
        let mut failed = 0;
        for (seq, result) in self.sequences.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!("Failed to compute {seq}: {e}");
                    failed += 1;
                }
            }
        }
        debug!("{} binning enumerations cached", cache.len());
        info!(
            "Computed {} peptides in {:0.3?}",
            reports.len(),
            Instant::now() - started
        );
        Ok((reports, failed))
    }

    /// Compute every sequence's report, failing if any sequence could not be computed
    pub fn compute(&self) -> Result<Vec<PeptideReport>, MidaCalcError> {
        let (reports, failed) = self.compute_batch()?;
        if failed > 0 {
            return Err(MidaCalcError::PeptidesFailed {
                failed,
                total: self.sequences.len(),
            });
        }
        Ok(reports)
    }

    fn write_tsv<W: Write>(&self, mut writer: W, reports: &[PeptideReport]) -> io::Result<()> {
        let mass_columns = (0..=self.mass_cutoff).map(|i| format!("M{i}")).join("\t");
        writeln!(
            writer,
            "sequence\tformula\tbase_mass\tlabile_hydrogens\tseries\tp\t{mass_columns}"
        )?;
        for report in reports {
            let prefix = format!(
                "{}\t{}\t{:.6}\t{:.2}",
                report.sequence, report.formula, report.base_mass, report.labile_hydrogens
            );
            let fmt_row = |row: &[f64]| row.iter().map(|v| format!("{v:.6}")).join("\t");
            writeln!(writer, "{prefix}\tnatural\t\t{}", fmt_row(report.natural.as_slice()))?;
            for (p, row) in report.p_values.iter().zip(report.distributions.iter()) {
                writeln!(writer, "{prefix}\tlabeled\t{p:.6}\t{}", fmt_row(row.as_slice()))?;
            }
            if let Some(excess) = report.excess.as_ref() {
                for (p, row) in report.p_values.iter().zip(excess.iter()) {
                    writeln!(writer, "{prefix}\texcess\t{p:.6}\t{}", fmt_row(row.as_slice()))?;
                }
            }
        }
        Ok(())
    }

    /// Compute every sequence and write the results to `writer`, returning the number of
    /// peptides written.
    ///
    /// Sequences that fail are skipped and the rest are still written, but the run as a
    /// whole reports [`MidaCalcError::PeptidesFailed`].
    pub fn run_to<W: Write>(&self, mut writer: W) -> Result<usize, MidaCalcError> {
        let (reports, failed) = self.compute_batch()?;
        match self.format {
            OutputFormat::Tsv => self.write_tsv(&mut writer, &reports)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &reports)?;
                writeln!(writer)?;
            }
        }
        writer.flush()?;
        if failed > 0 {
            return Err(MidaCalcError::PeptidesFailed {
                failed,
                total: self.sequences.len(),
            });
        }
        Ok(reports.len())
    }

    pub fn main(&self) -> Result<(), MidaCalcError> {
        info!(
            "midacalc v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Sequences: {}", self.sequences.len());
        info!("Output: {}", self.output_file.display());
        if self.output_file == PathBuf::from("-") {
            let stdout = io::stdout();
            self.run_to(stdout.lock())?;
        } else {
            let handle = io::BufWriter::new(fs::File::create(&self.output_file)?);
            self.run_to(handle)?;
        }
        Ok(())
    }
}
