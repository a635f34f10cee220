/*! Amino acid residue tables and building peptide models from one-letter sequences */
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use tracing::trace;

use crate::binning::BinningCache;
use crate::elements::{ChemicalData, HYDROGEN};
use crate::error::MidaError;
use crate::molecule::{Composition, GroupSpec, Molecule};

/// A residue entry in an [`AminoAcidTable`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AminoAcid {
    pub code: char,
    pub name: String,
    pub composition: Composition,
    pub labile: Vec<GroupSpec>,
    pub enrichment: Vec<GroupSpec>,
}

impl AminoAcid {
    pub fn new(
        code: char,
        name: impl Into<String>,
        composition: Composition,
        labile: Vec<GroupSpec>,
        enrichment: Vec<GroupSpec>,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            composition,
            labile,
            enrichment,
        }
    }
}

/// The modified lysine the `k` residue code stands for
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LysineVariant {
    Processed,
    Guanidinated,
    Carbamylated,
    #[default]
    Ubiquitinated,
}

impl LysineVariant {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Processed => "Processed lysine",
            Self::Guanidinated => "Guanidinated lysine",
            Self::Carbamylated => "Carbamylated lysine",
            Self::Ubiquitinated => "Ubiquitinated lysine",
        }
    }

    /// The residue composition in H, C, N, O, S order
    pub const fn composition(&self) -> [u32; 5] {
        match self {
            Self::Processed => [16, 8, 2, 3, 0],
            Self::Guanidinated => [16, 7, 4, 2, 0],
            Self::Carbamylated => [15, 7, 3, 3, 0],
            Self::Ubiquitinated => [20, 10, 4, 4, 0],
        }
    }
}

impl Display for LysineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LysineVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "guanidinated" => Ok(Self::Guanidinated),
            "carbamylated" => Ok(Self::Carbamylated),
            "ubiquitinated" => Ok(Self::Ubiquitinated),
            _ => Err(format!("Unknown lysine variant {s:?}")),
        }
    }
}

const LYSINE_LABILE_HYDROGENS: f64 = 0.54;

/// Residue code, name, H/C/N/O/S composition, labile hydrogen count
const STANDARD_RESIDUES: [(char, &str, [u32; 5], f64); 26] = [
    ('A', "Alanine", [7, 3, 1, 2, 0], 4.00),
    ('R', "Arginine", [14, 6, 4, 2, 0], 3.43),
    ('N', "Asparagine", [8, 4, 2, 3, 0], 1.89),
    ('D', "Aspartic acid", [7, 4, 1, 4, 0], 1.89),
    ('C', "Carbamidomethyl cysteine", [10, 5, 2, 3, 1], 1.62),
    ('E', "Glutamic acid", [9, 5, 1, 4, 0], 3.95),
    ('Q', "Glutamine", [10, 5, 2, 3, 0], 3.95),
    ('G', "Glycine", [5, 2, 1, 2, 0], 2.06),
    ('H', "Histidine", [9, 6, 3, 2, 0], 2.88),
    ('I', "Isoleucine", [13, 6, 1, 2, 0], 1.00),
    ('L', "Leucine", [13, 6, 1, 2, 0], 0.60),
    ('K', "Lysine", [14, 6, 2, 2, 0], 0.54),
    ('M', "Methionine", [11, 5, 1, 2, 1], 1.12),
    ('F', "Phenylalanine", [11, 9, 1, 2, 0], 0.32),
    ('P', "Proline", [9, 5, 1, 2, 0], 2.59),
    ('S', "Serine", [7, 3, 1, 3, 0], 2.61),
    ('T', "Threonine", [9, 4, 1, 3, 0], 0.20),
    ('W', "Tryptophan", [12, 11, 2, 2, 0], 0.08),
    ('Y', "Tyrosine", [11, 9, 1, 3, 0], 0.42),
    ('V', "Valine", [11, 5, 1, 2, 0], 0.56),
    ('m', "Oxidized methionine", [11, 5, 1, 3, 1], 1.12),
    ('q', "Pyroglutamic acid", [7, 5, 1, 3, 0], 3.95),
    ('p', "Hydroxyproline", [9, 5, 1, 3, 0], 2.59),
    ('n', "Deamidated asparagine", [7, 4, 1, 4, 0], 1.89),
    ('c', "S-nitrosyl cysteine", [6, 3, 2, 3, 1], 1.62),
    ('y', "Photo-decomposed tyrosine", [10, 9, 2, 4, 0], 0.42),
];

fn hydrogen_labile(n: f64) -> Vec<GroupSpec> {
    vec![GroupSpec::new(HYDROGEN, n)]
}

/// A lookup from one-letter residue codes to [`AminoAcid`] entries.
///
/// The default table covers the twenty standard residues with carbamidomethylated
/// cysteine, several processed or modified residues under lowercase codes, and the
/// [`LysineVariant::Ubiquitinated`] lysine under `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct AminoAcidTable {
    residues: HashMap<char, AminoAcid>,
    lysine_variant: LysineVariant,
}

impl Default for AminoAcidTable {
    fn default() -> Self {
        let residues = STANDARD_RESIDUES
            .iter()
            .map(|(code, name, comp, labile)| {
                (
                    *code,
                    AminoAcid::new(
                        *code,
                        *name,
                        Composition::from(*comp),
                        hydrogen_labile(*labile),
                        Vec::new(),
                    ),
                )
            })
            .collect();
        let mut this = Self {
            residues,
            lysine_variant: LysineVariant::default(),
        };
        this.set_lysine_variant(LysineVariant::default());
        this
    }
}

impl AminoAcidTable {
    /// A table holding no residues at all
    pub fn empty() -> Self {
        Self {
            residues: HashMap::new(),
            lysine_variant: LysineVariant::default(),
        }
    }

    pub fn with_lysine_variant(mut self, variant: LysineVariant) -> Self {
        self.set_lysine_variant(variant);
        self
    }

    pub fn set_lysine_variant(&mut self, variant: LysineVariant) {
        self.lysine_variant = variant;
        self.insert(AminoAcid::new(
            'k',
            variant.name(),
            Composition::from(variant.composition()),
            hydrogen_labile(LYSINE_LABILE_HYDROGENS),
            Vec::new(),
        ));
    }

    pub fn lysine_variant(&self) -> LysineVariant {
        self.lysine_variant
    }

    /// Add or replace a residue entry, returning the one it replaced
    pub fn insert(&mut self, residue: AminoAcid) -> Option<AminoAcid> {
        self.residues.insert(residue.code, residue)
    }

    pub fn get(&self, code: char) -> Option<&AminoAcid> {
        self.residues.get(&code)
    }

    pub fn contains(&self, code: char) -> bool {
        self.residues.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AminoAcid> {
        self.residues.values()
    }
}

fn accumulate_groups(acc: &mut Vec<GroupSpec>, specs: &[GroupSpec]) {
    for spec in specs {
        match acc.iter_mut().find(|g| g.element_id == spec.element_id) {
            Some(existing) => existing.n += spec.n,
            None => acc.push(*spec),
        }
    }
}

/// Build a peptide [`Molecule`] from a one-letter `sequence`.
///
/// Residue compositions are summed and one water is removed for each peptide bond.
/// Labile and enrichment counts are summed per element, with groups ordered by the
/// element's first appearance along the sequence.
pub fn build_peptide<'a>(
    sequence: &str,
    table: &AminoAcidTable,
    data: &'a ChemicalData,
    cache: &BinningCache,
) -> Result<Molecule<'a>, MidaError> {
    if sequence.is_empty() {
        return Err(MidaError::EmptySequence);
    }
    let hydrogen = data
        .element_id("H")
        .ok_or_else(|| MidaError::UnknownElement("H".to_string()))?;
    let oxygen = data
        .element_id("O")
        .ok_or_else(|| MidaError::UnknownElement("O".to_string()))?;

    let mut composition = Composition::zeros(data.num_elements());
    let mut labile = Vec::new();
    let mut enrichment = Vec::new();
    let mut n_residues = 0u32;

    for (position, code) in sequence.chars().enumerate() {
        let residue = table.get(code).ok_or(MidaError::UnknownResidue {
            residue: code,
            position: position + 1,
        })?;
        composition += &residue.composition;
        accumulate_groups(&mut labile, &residue.labile);
        accumulate_groups(&mut enrichment, &residue.enrichment);
        n_residues += 1;
    }

    let bonds = n_residues - 1;
    composition.remove(hydrogen, 2 * bonds)?;
    composition.remove(oxygen, bonds)?;
    trace!(
        "Built {sequence} with composition {}",
        composition.formula(data)
    );

    Ok(Molecule::new(composition, data, labile, enrichment, cache)?.with_sequence(sequence))
}
