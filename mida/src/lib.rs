//! Theoretical mass isotopomer distributions for isotope-labeling experiments.
//!
//! A [`Molecule`] splits its atoms into natural-abundance pools, labile positions, and
//! enriched residue groups. Each group's distribution is computed from its isotope-count
//! combinations and the groups are convolved into a single whole-molecule distribution.
//!
//! ```
//! use mida::{build_peptide, AminoAcidTable, BinningCache, ChemicalData};
//!
//! let data = ChemicalData::default();
//! let cache = BinningCache::new();
//! let peptide = build_peptide("AG", &AminoAcidTable::default(), &data, &cache).unwrap();
//! let dist = peptide.natural_distribution(4).unwrap();
//! assert!(dist.row(0)[0] > 0.9);
//! ```
pub mod abundance;
pub mod analysis;
pub mod binning;
pub mod distribution;
pub mod elements;
pub mod error;
pub mod molecule;
pub mod peptide;

pub use abundance::{AbundanceGroup, EnrichedGroup, EnrichmentFraction, DEFAULT_MASS_CUTOFF};
pub use analysis::{
    convert_enrichment_parameter_to_abundances, enrichment_sweep, excess_abundances, renormalize,
};
pub use binning::{BinningCache, Binnings};
pub use distribution::Distribution;
pub use elements::{ChemicalData, Element, Isotope};
pub use error::{ErrorKind, MidaError};
pub use molecule::{Composition, DistributionRequest, GroupSpec, Molecule};
pub use peptide::{build_peptide, AminoAcid, AminoAcidTable, LysineVariant};
