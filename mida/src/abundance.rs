/*! Isotopomer distributions of homogeneous pools of atoms of a single element */
use std::sync::Arc;

use tracing::trace;

use crate::binning::{BinningCache, Binnings};
use crate::distribution::{broadcast_scenarios, Distribution};
use crate::error::MidaError;

/// The default highest mass bin to compute
pub const DEFAULT_MASS_CUTOFF: usize = 15;

/// `C(n, k)` as a float
pub(crate) fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (1..=k).fold(1.0, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

/// The number of distinguishable atom-to-isotope assignments producing `combo`,
/// `N! / (c0! c1! ... cK-1!)`, built up as a product of binomial coefficients over
/// the running partial sums of `combo`.
pub fn multinomial_coefficient(combo: &[u32]) -> f64 {
    let mut partial = 0u32;
    let mut acc = 1.0;
    for c in combo.iter().copied() {
        partial += c;
        acc *= binomial(partial, c);
    }
    acc
}

/// Check that every scenario's abundance vector covers `num_isotopes` isotopes and
/// holds only probabilities
pub(crate) fn validate_abundances<A: AsRef<[f64]>>(
    abundances: &[A],
    num_isotopes: usize,
) -> Result<(), MidaError> {
    if abundances.is_empty() {
        return Err(MidaError::ShapeMismatch {
            what: "abundance scenarios",
            expected: 1,
            found: 0,
        });
    }
    for scenario in abundances {
        let scenario = scenario.as_ref();
        if scenario.len() != num_isotopes {
            return Err(MidaError::ShapeMismatch {
                what: "isotope abundances",
                expected: num_isotopes,
                found: scenario.len(),
            });
        }
        if let Some(bad) = scenario.iter().find(|a| !(0.0..=1.0).contains(*a)) {
            return Err(MidaError::AbundanceOutOfRange(*bad));
        }
    }
    Ok(())
}

/// A pool of `N` atoms of one element where every atom is independently any of the
/// element's `K` isotopes.
///
/// All isotope-count combinations are enumerated up front along with their mass
/// shifts and multinomial coefficients, so evaluating the pool's distribution under
/// a new set of isotopic abundances is a weighted sum.
#[derive(Debug, Clone)]
pub struct AbundanceGroup {
    element_id: usize,
    num_atoms: u32,
    isotope_mass_indices: Vec<u32>,
    combos: Arc<Binnings>,
    mass_shifts: Vec<usize>,
    coefficients: Vec<f64>,
}

impl PartialEq for AbundanceGroup {
    fn eq(&self, other: &Self) -> bool {
        self.element_id == other.element_id
            && self.num_atoms == other.num_atoms
            && self.isotope_mass_indices == other.isotope_mass_indices
    }
}

impl AbundanceGroup {
    pub fn new(
        element_id: usize,
        num_atoms: u32,
        isotope_mass_indices: &[u32],
        cache: &BinningCache,
    ) -> Self {
        let combos = cache.get(num_atoms, isotope_mass_indices.len());
        let mass_shifts = combos
            .iter()
            .map(|combo| {
                combo
                    .iter()
                    .zip(isotope_mass_indices.iter())
                    .map(|(c, mi)| (c * mi) as usize)
                    .sum()
            })
            .collect();
        let coefficients = combos.iter().map(multinomial_coefficient).collect();
        trace!(
            "Built abundance group for element {element_id} with {num_atoms} atoms and {} combos",
            combos.len()
        );
        Self {
            element_id,
            num_atoms,
            isotope_mass_indices: isotope_mass_indices.to_vec(),
            combos,
            mass_shifts,
            coefficients,
        }
    }

    pub fn element_id(&self) -> usize {
        self.element_id
    }

    pub fn num_atoms(&self) -> u32 {
        self.num_atoms
    }

    pub fn num_isotopes(&self) -> usize {
        self.isotope_mass_indices.len()
    }

    pub fn isotope_mass_indices(&self) -> &[u32] {
        &self.isotope_mass_indices
    }

    pub fn combos(&self) -> &Binnings {
        &self.combos
    }

    /// The nominal mass increment of each combo
    pub fn mass_shifts(&self) -> &[usize] {
        &self.mass_shifts
    }

    /// The multinomial coefficient of each combo
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The largest mass shift any combo can reach
    pub fn max_mass_shift(&self) -> usize {
        self.mass_shifts.iter().copied().max().unwrap_or_default()
    }

    /// Compute the probability of every combo under each abundance scenario.
    ///
    /// `abundances` holds one vector per scenario, each with one entry per isotope.
    /// The result has one row per scenario and one column per combo.
    pub fn combo_abundances<A: AsRef<[f64]>>(
        &self,
        abundances: &[A],
    ) -> Result<Distribution, MidaError> {
        validate_abundances(abundances, self.num_isotopes())?;
        let n_combos = self.combos.len();
        let mut out = Distribution::zeros(abundances.len(), n_combos);
        for (r, scenario) in abundances.iter().enumerate() {
            let scenario = scenario.as_ref();
            let row = out.row_mut(r);
            for (k, (combo, coef)) in self.combos.iter().zip(self.coefficients.iter()).enumerate() {
                row[k] = combo
                    .iter()
                    .zip(scenario)
                    .fold(*coef, |acc, (c, a)| acc * a.powi(*c as i32));
            }
        }
        Ok(out)
    }

    /// Compute the mass isotopomer distribution of this group under each abundance scenario,
    /// holding bins `0..=min(max_mass_shift, mass_cutoff)`.
    ///
    /// Combos whose mass shift exceeds `mass_cutoff` are dropped without renormalizing.
    pub fn distribution<A: AsRef<[f64]>>(
        &self,
        abundances: &[A],
        mass_cutoff: usize,
    ) -> Result<Distribution, MidaError> {
        let combo_abundances = self.combo_abundances(abundances)?;
        let num_bins = self.max_mass_shift().min(mass_cutoff) + 1;
        let mut out = Distribution::zeros(combo_abundances.rows(), num_bins);
        for (r, combo_row) in combo_abundances.iter().enumerate() {
            let row = out.row_mut(r);
            for (p, shift) in combo_row.iter().zip(self.mass_shifts.iter().copied()) {
                if shift < num_bins {
                    row[shift] += p;
                }
            }
        }
        Ok(out)
    }
}

/// The weight given to the enriched scenario when mixing it with the natural one
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnrichmentFraction {
    /// One fraction applied to every scenario
    Uniform(f64),
    /// One fraction per scenario
    PerScenario(Vec<f64>),
}

impl Default for EnrichmentFraction {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

impl From<f64> for EnrichmentFraction {
    fn from(value: f64) -> Self {
        Self::Uniform(value)
    }
}

impl From<Vec<f64>> for EnrichmentFraction {
    fn from(value: Vec<f64>) -> Self {
        Self::PerScenario(value)
    }
}

impl EnrichmentFraction {
    fn validate(&self, scenarios: usize) -> Result<(), MidaError> {
        let values = match self {
            Self::Uniform(f) => std::slice::from_ref(f),
            Self::PerScenario(fs) => {
                if fs.len() != scenarios {
                    return Err(MidaError::ShapeMismatch {
                        what: "enrichment fractions",
                        expected: scenarios,
                        found: fs.len(),
                    });
                }
                fs.as_slice()
            }
        };
        match values.iter().find(|f| !(0.0..=1.0).contains(*f)) {
            Some(bad) => Err(MidaError::FractionOutOfRange(*bad)),
            None => Ok(()),
        }
    }

    #[inline]
    fn get(&self, scenario: usize) -> f64 {
        match self {
            Self::Uniform(f) => *f,
            Self::PerScenario(fs) => fs[scenario],
        }
    }
}

/// An [`AbundanceGroup`] for atoms in an enriched amino acid, where some fraction of the
/// residues carry enriched isotopic abundances and the rest remain natural.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedGroup {
    group: AbundanceGroup,
}

impl From<AbundanceGroup> for EnrichedGroup {
    fn from(group: AbundanceGroup) -> Self {
        Self { group }
    }
}

impl EnrichedGroup {
    pub fn new(
        element_id: usize,
        num_atoms: u32,
        isotope_mass_indices: &[u32],
        cache: &BinningCache,
    ) -> Self {
        AbundanceGroup::new(element_id, num_atoms, isotope_mass_indices, cache).into()
    }

    pub fn group(&self) -> &AbundanceGroup {
        &self.group
    }

    pub fn element_id(&self) -> usize {
        self.group.element_id()
    }

    pub fn num_atoms(&self) -> u32 {
        self.group.num_atoms()
    }

    /// Blend the distributions under `natural` and `enriched` abundances, weighting the
    /// enriched distribution by `fraction` and the natural one by `1 - fraction`.
    pub fn mixture_distribution<A: AsRef<[f64]>, B: AsRef<[f64]>>(
        &self,
        natural: &[A],
        enriched: &[B],
        fraction: &EnrichmentFraction,
        mass_cutoff: usize,
    ) -> Result<Distribution, MidaError> {
        let natural_dist = self.group.distribution(natural, mass_cutoff)?;
        let enriched_dist = self.group.distribution(enriched, mass_cutoff)?;
        let mut rows = natural_dist.broadcast_rows(&enriched_dist)?;
        if let EnrichmentFraction::PerScenario(fs) = fraction {
            rows = broadcast_scenarios(rows, fs.len())?;
        }
        fraction.validate(rows)?;

        let mut out = Distribution::zeros(rows, natural_dist.bins());
        for r in 0..rows {
            let f = fraction.get(r);
            let nat = natural_dist.broadcast_row(r);
            let enr = enriched_dist.broadcast_row(r);
            for (o, (n, e)) in out.row_mut(r).iter_mut().zip(nat.iter().zip(enr)) {
                *o = (1.0 - f) * n + f * e;
            }
        }
        Ok(out)
    }
}
