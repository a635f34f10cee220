/*! Molecular compositions and the models that split them into isotopically independent groups */
use std::fmt::Display;
use std::ops::{Add, AddAssign, Index};

use tracing::debug;

use crate::abundance::{AbundanceGroup, EnrichedGroup, EnrichmentFraction};
use crate::binning::BinningCache;
use crate::distribution::Distribution;
use crate::elements::ChemicalData;
use crate::error::MidaError;

/// The number of atoms of each element in a molecule, indexed by element id
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Composition(Vec<u32>);

impl Composition {
    pub fn new(counts: Vec<u32>) -> Self {
        Self(counts)
    }

    pub fn zeros(num_elements: usize) -> Self {
        Self(vec![0; num_elements])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn get(&self, element_id: usize) -> u32 {
        self.0.get(element_id).copied().unwrap_or_default()
    }

    /// Remove `count` atoms of `element_id`, failing if fewer are present
    pub fn remove(&mut self, element_id: usize, count: u32) -> Result<(), MidaError> {
        let available = self.get(element_id);
        match available.checked_sub(count) {
            Some(rest) => {
                self.0[element_id] = rest;
                Ok(())
            }
            None => Err(MidaError::NegativeAtomCount(
                available as f64 - count as f64,
            )),
        }
    }

    /// Render as `Symbol{count}` for every element in table order, zero counts included
    pub fn formula(&self, data: &ChemicalData) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}{c}", data.symbol(i)))
            .collect()
    }

    /// The monoisotopic mass, counting every atom as its lightest isotope
    pub fn base_mass(&self, data: &ChemicalData) -> f64 {
        self.0
            .iter()
            .zip(data.base_masses())
            .map(|(c, m)| *c as f64 * m)
            .sum()
    }
}

impl From<Vec<u32>> for Composition {
    fn from(value: Vec<u32>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[u32; N]> for Composition {
    fn from(value: [u32; N]) -> Self {
        Self(value.to_vec())
    }
}

impl Index<usize> for Composition {
    type Output = u32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AddAssign<&Composition> for Composition {
    fn add_assign(&mut self, rhs: &Composition) {
        if self.0.len() < rhs.0.len() {
            self.0.resize(rhs.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

impl AddAssign for Composition {
    fn add_assign(&mut self, rhs: Composition) {
        *self += &rhs;
    }
}

impl Add for &Composition {
    type Output = Composition;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Add for Composition {
    type Output = Composition;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}

/// A subset of one element's atoms whose isotopic abundances are set separately from
/// the natural pool. The atom count may be fractional, as with average labile hydrogen
/// counts, and is rounded before use.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupSpec {
    pub element_id: usize,
    pub n: f64,
}

impl GroupSpec {
    pub const fn new(element_id: usize, n: f64) -> Self {
        Self { element_id, n }
    }

    /// The atom count rounded half away from zero
    pub fn rounded_count(&self) -> Result<u32, MidaError> {
        if !self.n.is_finite() || self.n < 0.0 {
            return Err(MidaError::NegativeAtomCount(self.n));
        }
        Ok(self.n.round() as u32)
    }
}

/// The per-group inputs to [`Molecule::distribution`].
///
/// Holds one abundance matrix per labile group and one enriched abundance matrix plus
/// mixing fraction per enrichment group, each in the same order as the molecule's groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionRequest {
    pub labile_abundances: Vec<Vec<Vec<f64>>>,
    pub enrichments: Vec<(Vec<Vec<f64>>, EnrichmentFraction)>,
}

impl DistributionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labile(mut self, abundances: Vec<Vec<f64>>) -> Self {
        self.labile_abundances.push(abundances);
        self
    }

    pub fn with_enrichment(
        mut self,
        abundances: Vec<Vec<f64>>,
        fraction: impl Into<EnrichmentFraction>,
    ) -> Self {
        self.enrichments.push((abundances, fraction.into()));
        self
    }
}

/// A molecule whose atoms are split into natural, labile, and enriched isotopic groups.
///
/// The natural pool of each element is whatever is left of its composition count once
/// every labile and enrichment group has taken its share.
#[derive(Debug, Clone)]
pub struct Molecule<'a> {
    data: &'a ChemicalData,
    composition: Composition,
    natural_composition: Composition,
    sequence: Option<String>,
    labile_specs: Vec<GroupSpec>,
    enrichment_specs: Vec<GroupSpec>,
    natural_groups: Vec<AbundanceGroup>,
    labile_groups: Vec<AbundanceGroup>,
    enrichment_groups: Vec<EnrichedGroup>,
}

impl<'a> Molecule<'a> {
    pub fn new(
        composition: Composition,
        data: &'a ChemicalData,
        labile_specs: Vec<GroupSpec>,
        enrichment_specs: Vec<GroupSpec>,
        cache: &BinningCache,
    ) -> Result<Self, MidaError> {
        if composition.len() != data.num_elements() {
            return Err(MidaError::ShapeMismatch {
                what: "element counts in composition",
                expected: data.num_elements(),
                found: composition.len(),
            });
        }

        let mut removed = vec![0u32; data.num_elements()];
        let mut labile_groups = Vec::with_capacity(labile_specs.len());
        let mut enrichment_groups = Vec::with_capacity(enrichment_specs.len());

        for spec in labile_specs.iter() {
            data.check_element(spec.element_id)?;
            let n = spec.rounded_count()?;
            removed[spec.element_id] += n;
            labile_groups.push(AbundanceGroup::new(
                spec.element_id,
                n,
                data.isotope_mass_indices(spec.element_id),
                cache,
            ));
        }
        for spec in enrichment_specs.iter() {
            data.check_element(spec.element_id)?;
            let n = spec.rounded_count()?;
            removed[spec.element_id] += n;
            enrichment_groups.push(EnrichedGroup::new(
                spec.element_id,
                n,
                data.isotope_mass_indices(spec.element_id),
                cache,
            ));
        }

        let mut natural_counts = Vec::with_capacity(data.num_elements());
        for (element_id, (available, taken)) in composition
            .as_slice()
            .iter()
            .copied()
            .zip(removed)
            .enumerate()
        {
            match available.checked_sub(taken) {
                Some(rest) => natural_counts.push(rest),
                None => {
                    return Err(MidaError::NegativeNaturalPool {
                        symbol: data.symbol(element_id).to_string(),
                        available,
                        removed: taken,
                    })
                }
            }
        }

        let natural_groups = natural_counts
            .iter()
            .enumerate()
            .filter(|(element_id, _)| composition[*element_id] > 0)
            .map(|(element_id, n)| {
                AbundanceGroup::new(element_id, *n, data.isotope_mass_indices(element_id), cache)
            })
            .collect();

        Ok(Self {
            data,
            composition,
            natural_composition: Composition::new(natural_counts),
            sequence: None,
            labile_specs,
            enrichment_specs,
            natural_groups,
            labile_groups,
            enrichment_groups,
        })
    }

    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn chemical_data(&self) -> &'a ChemicalData {
        self.data
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// The atoms left in the natural-abundance pools
    pub fn natural_composition(&self) -> &Composition {
        &self.natural_composition
    }

    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    pub fn labile_specs(&self) -> &[GroupSpec] {
        &self.labile_specs
    }

    pub fn enrichment_specs(&self) -> &[GroupSpec] {
        &self.enrichment_specs
    }

    pub fn natural_groups(&self) -> &[AbundanceGroup] {
        &self.natural_groups
    }

    pub fn labile_groups(&self) -> &[AbundanceGroup] {
        &self.labile_groups
    }

    pub fn enrichment_groups(&self) -> &[EnrichedGroup] {
        &self.enrichment_groups
    }

    pub fn base_mass(&self) -> f64 {
        self.composition.base_mass(self.data)
    }

    pub fn nominal_mass(&self) -> u32 {
        self.base_mass().round() as u32
    }

    pub fn formula(&self) -> String {
        self.composition.formula(self.data)
    }

    fn natural_abundances(&self, element_id: usize) -> [&'a [f64]; 1] {
        [self.data.natural_abundances(element_id)]
    }

    /// Compute the whole-molecule mass isotopomer distribution, keeping bins `0..=mass_cutoff`.
    ///
    /// Group distributions are merged natural first, then labile, then enriched. The running
    /// total is truncated after every merge, so the low bins are exact and nothing past the
    /// cutoff is carried forward.
    pub fn distribution(
        &self,
        request: &DistributionRequest,
        mass_cutoff: usize,
    ) -> Result<Distribution, MidaError> {
        if request.labile_abundances.len() != self.labile_groups.len() {
            return Err(MidaError::ShapeMismatch {
                what: "labile abundance matrices",
                expected: self.labile_groups.len(),
                found: request.labile_abundances.len(),
            });
        }
        if request.enrichments.len() != self.enrichment_groups.len() {
            return Err(MidaError::ShapeMismatch {
                what: "enrichment inputs",
                expected: self.enrichment_groups.len(),
                found: request.enrichments.len(),
            });
        }

        let max_bins = mass_cutoff + 1;
        let mut total = Distribution::delta();

        for group in self.natural_groups.iter() {
            let natural = self.natural_abundances(group.element_id());
            let dist = group.distribution(&natural, mass_cutoff)?;
            total = total.convolve(&dist, max_bins)?;
        }
        for (group, abundances) in self.labile_groups.iter().zip(request.labile_abundances.iter()) {
            let dist = group.distribution(abundances, mass_cutoff)?;
            total = total.convolve(&dist, max_bins)?;
        }
        for (group, (enriched, fraction)) in self
            .enrichment_groups
            .iter()
            .zip(request.enrichments.iter())
        {
            let natural = self.natural_abundances(group.element_id());
            let dist = group.mixture_distribution(&natural, enriched, fraction, mass_cutoff)?;
            total = total.convolve(&dist, max_bins)?;
        }
        debug!(
            "Computed {} distribution with shape {:?}",
            self.sequence().map(str::to_string).unwrap_or_else(|| self.formula()),
            total.shape()
        );
        Ok(total)
    }

    /// Compute the distribution with every labile and enrichment group held at natural abundance
    pub fn natural_distribution(&self, mass_cutoff: usize) -> Result<Distribution, MidaError> {
        let mut request = DistributionRequest::new();
        for group in self.labile_groups.iter() {
            request = request.with_labile(vec![self.data.natural_abundances(group.element_id()).to_vec()]);
        }
        for group in self.enrichment_groups.iter() {
            request = request.with_enrichment(
                vec![self.data.natural_abundances(group.element_id()).to_vec()],
                0.0,
            );
        }
        self.distribution(&request, mass_cutoff)
    }
}

impl Display for Molecule<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sequence() {
            Some(seq) => write!(f, "{seq} ({})", self.formula()),
            None => write!(f, "{}", self.formula()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elements::{CARBON, HYDROGEN, NITROGEN, OXYGEN, SULFUR};

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    #[test]
    fn test_composition_ops() {
        let a = Composition::from([7, 3, 1, 2, 0]);
        let g = Composition::from([5, 2, 1, 2, 0]);
        let mut total = &a + &g;
        assert_eq!(total.as_slice(), &[12, 5, 2, 4, 0]);
        total.remove(HYDROGEN, 2).unwrap();
        total.remove(OXYGEN, 1).unwrap();
        assert_eq!(total[HYDROGEN], 10);
        assert!(total.remove(SULFUR, 1).is_err());

        let data = ChemicalData::default();
        assert_eq!(total.formula(&data), "H10C5N2O3S0");
        assert_is_close!(total.base_mass(&data), 146.069143, 1e-9, "base mass");
    }

    #[test]
    fn test_group_spec_rounding() {
        assert_eq!(GroupSpec::new(HYDROGEN, 6.06).rounded_count().unwrap(), 6);
        assert_eq!(GroupSpec::new(HYDROGEN, 2.5).rounded_count().unwrap(), 3);
        assert_eq!(GroupSpec::new(HYDROGEN, 0.49).rounded_count().unwrap(), 0);
        assert!(GroupSpec::new(HYDROGEN, -1.0).rounded_count().is_err());
    }

    #[test]
    fn test_split() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([10, 5, 2, 3, 0]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 6.06)],
            vec![GroupSpec::new(CARBON, 2.0)],
            &cache,
        )
        .unwrap();
        assert_eq!(mol.natural_composition().as_slice(), &[4, 3, 2, 3, 0]);
        let elements: Vec<usize> = mol.natural_groups().iter().map(|g| g.element_id()).collect();
        assert_eq!(elements, vec![HYDROGEN, CARBON, NITROGEN, OXYGEN]);
        assert_eq!(mol.labile_groups()[0].num_atoms(), 6);
        assert_eq!(mol.enrichment_groups()[0].num_atoms(), 2);

        for element_id in 0..data.num_elements() {
            let labile: u32 = mol
                .labile_groups()
                .iter()
                .filter(|g| g.element_id() == element_id)
                .map(|g| g.num_atoms())
                .sum();
            let enriched: u32 = mol
                .enrichment_groups()
                .iter()
                .filter(|g| g.element_id() == element_id)
                .map(|g| g.num_atoms())
                .sum();
            assert_eq!(
                mol.natural_composition()[element_id] + labile + enriched,
                mol.composition()[element_id]
            );
        }
    }

    #[test]
    fn test_empty_natural_pool_kept() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([3, 0, 0, 0, 0]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 3.0)],
            vec![],
            &cache,
        )
        .unwrap();
        assert_eq!(mol.natural_groups().len(), 1);
        assert_eq!(mol.natural_groups()[0].num_atoms(), 0);
        let dist = mol
            .distribution(
                &DistributionRequest::new().with_labile(vec![vec![0.0, 1.0]]),
                15,
            )
            .unwrap();
        assert_eq!(dist.row(0), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_construction_errors() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let err = Molecule::new(
            Composition::from([2, 0, 0, 0, 0]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 3.0)],
            vec![],
            &cache,
        )
        .unwrap_err();
        assert_eq!(
            err,
            MidaError::NegativeNaturalPool {
                symbol: "H".to_string(),
                available: 2,
                removed: 3
            }
        );

        let err = Molecule::new(Composition::from([1, 1, 1, 1]), &data, vec![], vec![], &cache)
            .unwrap_err();
        assert!(matches!(err, MidaError::ShapeMismatch { expected: 5, found: 4, .. }));

        let err = Molecule::new(
            Composition::from([1, 1, 1, 1, 0]),
            &data,
            vec![GroupSpec::new(7, 1.0)],
            vec![],
            &cache,
        )
        .unwrap_err();
        assert_eq!(err, MidaError::ElementOutOfRange(7));
    }

    #[test]
    fn test_request_shape() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([10, 5, 2, 3, 0]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 6.0)],
            vec![],
            &cache,
        )
        .unwrap();
        let err = mol.distribution(&DistributionRequest::new(), 4).unwrap_err();
        assert!(matches!(err, MidaError::ShapeMismatch { expected: 1, found: 0, .. }));
        let err = mol
            .distribution(
                &DistributionRequest::new()
                    .with_labile(vec![vec![0.5, 0.5]])
                    .with_enrichment(vec![vec![0.5, 0.5]], 0.5),
                4,
            )
            .unwrap_err();
        assert!(matches!(err, MidaError::ShapeMismatch { expected: 0, found: 1, .. }));
    }

    #[test]
    fn test_convolution_of_independent_pools() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let whole = Molecule::new(Composition::from([0, 7, 0, 0, 0]), &data, vec![], vec![], &cache)
            .unwrap()
            .natural_distribution(20)
            .unwrap();
        let split = Molecule::new(
            Composition::from([0, 7, 0, 0, 0]),
            &data,
            vec![GroupSpec::new(CARBON, 3.0)],
            vec![],
            &cache,
        )
        .unwrap()
        .natural_distribution(20)
        .unwrap();
        assert_eq!(whole.shape(), (1, 8));
        assert_eq!(split.shape(), whole.shape());
        for (a, b) in whole.row(0).iter().zip(split.row(0)) {
            assert_is_close!(*a, *b, 1e-14, "bin");
        }
        assert_is_close!(whole.totals()[0], 1.0, 1e-12, "total");
    }

    #[test]
    fn test_cutoff_preserves_low_bins() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([10, 5, 2, 3, 1]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 4.0)],
            vec![],
            &cache,
        )
        .unwrap();
        let wide = mol.natural_distribution(15).unwrap();
        let narrow = mol.natural_distribution(3).unwrap();
        assert_eq!(narrow.bins(), 4);
        for (a, b) in narrow.row(0).iter().zip(wide.row(0)) {
            assert_is_close!(*a, *b, 1e-14, "bin");
        }
    }

    #[test]
    fn test_labile_scenarios() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([10, 5, 2, 3, 0]),
            &data,
            vec![GroupSpec::new(HYDROGEN, 6.0)],
            vec![],
            &cache,
        )
        .unwrap();
        let h = data.natural_abundances(HYDROGEN);
        let scenarios: Vec<Vec<f64>> = [0.0, 0.01, 0.02]
            .iter()
            .map(|p| vec![h[0] - p, h[1] + p])
            .collect();
        let dist = mol
            .distribution(&DistributionRequest::new().with_labile(scenarios), 4)
            .unwrap();
        assert_eq!(dist.shape(), (3, 5));
        assert!(dist.row(1)[0] < dist.row(0)[0]);
        assert!(dist.row(2)[0] < dist.row(1)[0]);
        let natural = mol.natural_distribution(4).unwrap();
        for (a, b) in dist.row(0).iter().zip(natural.row(0)) {
            assert_is_close!(*a, *b, 1e-9, "bin");
        }
    }

    #[test]
    fn test_enrichment_mixture() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(
            Composition::from([0, 2, 0, 0, 0]),
            &data,
            vec![],
            vec![GroupSpec::new(CARBON, 2.0)],
            &cache,
        )
        .unwrap();
        let request = DistributionRequest::new().with_enrichment(vec![vec![0.0, 1.0]], vec![0.0, 1.0]);
        let dist = mol.distribution(&request, 4).unwrap();
        assert_eq!(dist.rows(), 2);
        assert_eq!(dist.row(1), &[0.0, 0.0, 1.0]);
        let c = data.natural_abundances(CARBON);
        assert_is_close!(dist.row(0)[0], c[0] * c[0], 1e-15, "M0");
    }

    #[test]
    fn test_empty_molecule() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = Molecule::new(Composition::zeros(5), &data, vec![], vec![], &cache).unwrap();
        assert_eq!(mol.natural_distribution(4).unwrap(), Distribution::delta());
        assert_eq!(mol.formula(), "H0C0N0O0S0");
        assert_eq!(mol.nominal_mass(), 0);
    }
}
