/*! Post-processing of computed distributions into the quantities used for fitting labeling kinetics */
use crate::distribution::Distribution;
use crate::error::MidaError;
use crate::molecule::Molecule;

/// Molecules at or above this base mass are normalized over `M+0..=M+4` rather than `M+0..=M+3`
pub const HEAVY_MOLECULE_MASS: f64 = 2400.0;

/// The number of leading bins [`renormalize`] sums over for a molecule of `base_mass`
pub fn normalization_bins(base_mass: f64) -> usize {
    if base_mass < HEAVY_MOLECULE_MASS {
        4
    } else {
        5
    }
}

/// Scale each scenario so that its leading isotopomers sum to one.
///
/// Bins beyond the distribution's width are simply absent from the sum.
pub fn renormalize(molecule: &Molecule<'_>, distribution: &Distribution) -> Distribution {
    let n = normalization_bins(molecule.base_mass());
    let mut out = distribution.clone();
    for r in 0..out.rows() {
        let row = out.row_mut(r);
        let total: f64 = row.iter().take(n).sum();
        row.iter_mut().for_each(|v| *v /= total);
    }
    out
}

/// Convert enrichment parameters into isotopic abundance scenarios for a two-isotope element.
///
/// Each `p` moves that much abundance from the light isotope to the heavy one, so row `i`
/// is `[natural[0] - p_i, natural[1] + p_i]`.
pub fn convert_enrichment_parameter_to_abundances(
    p_values: &[f64],
    natural: &[f64],
) -> Result<Vec<Vec<f64>>, MidaError> {
    if natural.len() != 2 {
        return Err(MidaError::IllDefinedEnrichmentParameter(natural.len()));
    }
    p_values
        .iter()
        .map(|p| {
            let row = vec![natural[0] - p, natural[1] + p];
            match row.iter().find(|a| !(0.0..=1.0).contains(*a)) {
                Some(bad) => Err(MidaError::AbundanceOutOfRange(*bad)),
                None => Ok(row),
            }
        })
        .collect()
}

/// `steps` evenly spaced enrichment parameters from zero to `p_max` inclusive
pub fn enrichment_sweep(p_max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = p_max / (steps - 1) as f64;
            let mut values: Vec<f64> = (0..steps).map(|i| i as f64 * step).collect();
            values[steps - 1] = p_max;
            values
        }
    }
}

/// The change in each isotopomer's abundance relative to the first scenario.
///
/// When the first scenario is the unlabeled one, row `i` column `j` is `EM_j(p_i)`.
pub fn excess_abundances(distribution: &Distribution) -> Distribution {
    if distribution.rows() == 0 {
        return distribution.clone();
    }
    let baseline = distribution.row(0).to_vec();
    let mut out = distribution.clone();
    for r in 0..out.rows() {
        for (v, b) in out.row_mut(r).iter_mut().zip(baseline.iter()) {
            *v -= b;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binning::BinningCache;
    use crate::elements::{ChemicalData, CARBON, HYDROGEN, OXYGEN};
    use crate::molecule::{Composition, DistributionRequest};
    use crate::peptide::{build_peptide, AminoAcidTable};

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
    fn test_renormalize_light() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let peptide = build_peptide("AG", &AminoAcidTable::default(), &data, &cache).unwrap();
        let dist = peptide.natural_distribution(4).unwrap();
        let norm = renormalize(&peptide, &dist);
        let head: f64 = norm.row(0)[..4].iter().sum();
        assert_is_close!(head, 1.0, 1e-12, "M0..M3");
        assert!(norm.row(0)[4] > 0.0);
    }

    #[test]
    fn test_renormalize_heavy() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let mol = crate::molecule::Molecule::new(
            Composition::from([0, 200, 0, 0, 0]),
            &data,
            vec![],
            vec![],
            &cache,
        )
        .unwrap();
        assert_eq!(mol.base_mass(), HEAVY_MOLECULE_MASS);
        let dist = mol.natural_distribution(6).unwrap();
        let norm = renormalize(&mol, &dist);
        let head: f64 = norm.row(0)[..5].iter().sum();
        assert_is_close!(head, 1.0, 1e-12, "M0..M4");
    }

    #[test]
    fn test_renormalize_narrow() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let peptide = build_peptide("AG", &AminoAcidTable::default(), &data, &cache).unwrap();
        let dist = peptide.natural_distribution(2).unwrap();
        let norm = renormalize(&peptide, &dist);
        assert_eq!(norm.bins(), 3);
        assert_is_close!(norm.totals()[0], 1.0, 1e-12, "total");
    }

    #[test]
    fn test_convert_enrichment_parameter() {
        let data = ChemicalData::default();
        let rows = convert_enrichment_parameter_to_abundances(
            &[0.0, 0.01],
            data.natural_abundances(HYDROGEN),
        )
        .unwrap();
        assert_eq!(rows[0], data.natural_abundances(HYDROGEN));
        assert_is_close!(rows[1][0], 0.989844, 1e-12, "H1");
        assert_is_close!(rows[1][1], 0.010156, 1e-12, "H2");

        let err = convert_enrichment_parameter_to_abundances(&[0.01], data.natural_abundances(OXYGEN))
            .unwrap_err();
        assert_eq!(err, MidaError::IllDefinedEnrichmentParameter(3));

        let err = convert_enrichment_parameter_to_abundances(&[0.5, 1.0], data.natural_abundances(CARBON))
            .unwrap_err();
        assert!(matches!(err, MidaError::AbundanceOutOfRange(_)));
    }

    #[test]
    fn test_sweep() {
        assert!(enrichment_sweep(0.05, 0).is_empty());
        assert_eq!(enrichment_sweep(0.05, 1), vec![0.0]);
        let ps = enrichment_sweep(0.05, 50);
        assert_eq!(ps.len(), 50);
        assert_eq!(ps[0], 0.0);
        assert_eq!(ps[49], 0.05);
        assert_is_close!(ps[1], 0.05 / 49.0, 1e-15, "step");
    }

    #[test_log::test]
    fn test_excess_series() {
        let data = ChemicalData::default();
        let cache = BinningCache::new();
        let peptide = build_peptide("AGLK", &AminoAcidTable::default(), &data, &cache).unwrap();
        let ps = enrichment_sweep(0.05, 6);
        let labile =
            convert_enrichment_parameter_to_abundances(&ps, data.natural_abundances(HYDROGEN))
                .unwrap();
        let dist = peptide
            .distribution(&DistributionRequest::new().with_labile(labile), 4)
            .unwrap();
        let norm = renormalize(&peptide, &dist);
        let excess = excess_abundances(&norm);
        assert_eq!(excess.shape(), (6, 5));
        assert!(excess.row(0).iter().all(|v| *v == 0.0));
        let last = excess.row(5);
        assert!(last[0] < 0.0);
        assert!(last[1] > 0.0);
        for r in 1..6 {
            assert!(excess.row(r)[0] < excess.row(r - 1)[0]);
        }
    }
}
