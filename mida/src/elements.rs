/*! Reference element and isotope data, and the per-element vectors derived from them */
use num_traits::Float;

use crate::error::MidaError;

pub(crate) fn isclose<T: Float>(a: T, b: T, delta: T) -> bool {
    (a - b).abs() < delta
}

/// Element index of hydrogen in the default table
pub const HYDROGEN: usize = 0;
/// Element index of carbon in the default table
pub const CARBON: usize = 1;
/// Element index of nitrogen in the default table
pub const NITROGEN: usize = 2;
/// Element index of oxygen in the default table
pub const OXYGEN: usize = 3;
/// Element index of sulfur in the default table
pub const SULFUR: usize = 4;

/// A chemical element and the number of stable isotopes tracked for it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub symbol: String,
    pub atomic_number: u32,
    pub num_isotopes: usize,
}

impl Element {
    pub fn new(symbol: impl Into<String>, atomic_number: u32, num_isotopes: usize) -> Self {
        Self {
            symbol: symbol.into(),
            atomic_number,
            num_isotopes,
        }
    }
}

/// A single isotope of an [`Element`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Isotope {
    /// The index of the element this isotope belongs to
    pub element_id: usize,
    /// The mass number, `A`
    pub mass_number: u32,
    /// The mass index, `A - A0` where `A0` is the lightest isotope's mass number
    pub mass_index: u32,
    /// The exact mass of the isotope
    pub mass: f64,
    /// The fraction of naturally occurring atoms of the element that are this isotope
    pub natural_abundance: f64,
}

impl Isotope {
    pub const fn new(
        element_id: usize,
        mass_number: u32,
        mass_index: u32,
        mass: f64,
        natural_abundance: f64,
    ) -> Self {
        Self {
            element_id,
            mass_number,
            mass_index,
            mass,
            natural_abundance,
        }
    }
}

const DEFAULT_ELEMENTS: [(&str, u32, usize); 5] =
    [("H", 1, 2), ("C", 6, 2), ("N", 7, 2), ("O", 8, 3), ("S", 16, 4)];

const DEFAULT_ISOTOPES: [Isotope; 13] = [
    Isotope::new(HYDROGEN, 1, 0, 1.007825, 0.999844),
    Isotope::new(HYDROGEN, 2, 1, 2.014101, 0.000156),
    Isotope::new(CARBON, 12, 0, 12.000000, 0.9891),
    Isotope::new(CARBON, 13, 1, 13.003355, 0.0109),
    Isotope::new(NITROGEN, 14, 0, 14.003074, 0.99635),
    Isotope::new(NITROGEN, 15, 1, 15.000108, 0.00365),
    Isotope::new(OXYGEN, 16, 0, 15.994915, 0.99759),
    Isotope::new(OXYGEN, 17, 1, 16.999132, 0.00037),
    Isotope::new(OXYGEN, 18, 2, 17.999161, 0.00204),
    Isotope::new(SULFUR, 32, 0, 31.972071, 0.9493),
    Isotope::new(SULFUR, 33, 1, 32.971459, 0.0076),
    Isotope::new(SULFUR, 34, 2, 33.967867, 0.0429),
    Isotope::new(SULFUR, 36, 4, 35.967081, 0.0002),
];

/// The element and isotope reference tables along with the per-element lookups
/// the distribution engine needs.
///
/// A [`ChemicalData`] is built once and shared read-only by every model built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalData {
    elements: Vec<Element>,
    isotopes: Vec<Isotope>,
    isotope_mass_indices: Vec<Vec<u32>>,
    natural_abundances: Vec<Vec<f64>>,
    base_masses: Vec<f64>,
    base_nominal_masses: Vec<u32>,
}

impl Default for ChemicalData {
    fn default() -> Self {
        let elements = DEFAULT_ELEMENTS
            .iter()
            .map(|(sym, z, n)| Element::new(*sym, *z, *n))
            .collect();
        Self::build(elements, DEFAULT_ISOTOPES.to_vec())
    }
}

impl ChemicalData {
    /// Create a new [`ChemicalData`] from custom tables, checking that every element's
    /// isotopes are internally consistent.
    pub fn new(elements: Vec<Element>, isotopes: Vec<Isotope>) -> Result<Self, MidaError> {
        Self::validate(&elements, &isotopes)?;
        Ok(Self::build(elements, isotopes))
    }

    fn validate(elements: &[Element], isotopes: &[Isotope]) -> Result<(), MidaError> {
        if let Some(iso) = isotopes.iter().find(|iso| iso.element_id >= elements.len()) {
            return Err(MidaError::ElementOutOfRange(iso.element_id));
        }
        for (element_id, element) in elements.iter().enumerate() {
            let members: Vec<&Isotope> = isotopes
                .iter()
                .filter(|iso| iso.element_id == element_id)
                .collect();
            if members.is_empty() {
                return Err(MidaError::InvalidReferenceData(format!(
                    "{} has no isotopes",
                    element.symbol
                )));
            }
            if members.len() != element.num_isotopes {
                return Err(MidaError::InvalidReferenceData(format!(
                    "{} declares {} isotopes but {} were given",
                    element.symbol,
                    element.num_isotopes,
                    members.len()
                )));
            }
            let lightest = members.iter().map(|iso| iso.mass_number).min().unwrap_or(0);
            for iso in members.iter() {
                if !(0.0..=1.0).contains(&iso.natural_abundance) {
                    return Err(MidaError::AbundanceOutOfRange(iso.natural_abundance));
                }
                if iso.mass_number - lightest != iso.mass_index {
                    return Err(MidaError::InvalidReferenceData(format!(
                        "{}{} has mass index {}, expected {}",
                        element.symbol,
                        iso.mass_number,
                        iso.mass_index,
                        iso.mass_number - lightest
                    )));
                }
            }
            let total: f64 = members.iter().map(|iso| iso.natural_abundance).sum();
            if !isclose(total, 1.0, 1e-6) {
                return Err(MidaError::InvalidReferenceData(format!(
                    "natural abundances of {} sum to {total}",
                    element.symbol
                )));
            }
        }
        Ok(())
    }

    fn build(elements: Vec<Element>, isotopes: Vec<Isotope>) -> Self {
        let n = elements.len();
        let mut isotope_mass_indices = vec![Vec::new(); n];
        let mut natural_abundances = vec![Vec::new(); n];
        let mut base_masses = vec![f64::INFINITY; n];
        let mut base_nominal_masses = vec![u32::MAX; n];

        for iso in isotopes.iter() {
            let i = iso.element_id;
            isotope_mass_indices[i].push(iso.mass_index);
            natural_abundances[i].push(iso.natural_abundance);
            base_masses[i] = base_masses[i].min(iso.mass);
            base_nominal_masses[i] = base_nominal_masses[i].min(iso.mass_number);
        }

        Self {
            elements,
            isotopes,
            isotope_mass_indices,
            natural_abundances,
            base_masses,
            base_nominal_masses,
        }
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn isotopes(&self) -> &[Isotope] {
        &self.isotopes
    }

    pub fn element(&self, element_id: usize) -> Option<&Element> {
        self.elements.get(element_id)
    }

    /// Find the index of the element with the given symbol
    pub fn element_id(&self, symbol: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.symbol == symbol)
    }

    pub fn symbol(&self, element_id: usize) -> &str {
        &self.elements[element_id].symbol
    }

    pub fn num_isotopes(&self, element_id: usize) -> usize {
        self.isotope_mass_indices[element_id].len()
    }

    /// The mass indices of each isotope of `element_id`, in table order
    pub fn isotope_mass_indices(&self, element_id: usize) -> &[u32] {
        &self.isotope_mass_indices[element_id]
    }

    /// The natural abundance vector of `element_id`, in table order
    pub fn natural_abundances(&self, element_id: usize) -> &[f64] {
        &self.natural_abundances[element_id]
    }

    /// The exact mass of the lightest isotope of `element_id`
    pub fn base_mass(&self, element_id: usize) -> f64 {
        self.base_masses[element_id]
    }

    pub fn base_masses(&self) -> &[f64] {
        &self.base_masses
    }

    /// The mass number of the lightest isotope of `element_id`
    pub fn base_nominal_mass(&self, element_id: usize) -> u32 {
        self.base_nominal_masses[element_id]
    }

    pub(crate) fn check_element(&self, element_id: usize) -> Result<(), MidaError> {
        if element_id < self.num_elements() {
            Ok(())
        } else {
            Err(MidaError::ElementOutOfRange(element_id))
        }
    }
}
