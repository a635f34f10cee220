use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mida::LysineVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgLysineVariant {
    /// C8H16N2O3
    Processed,
    /// Homoarginine, C7H16N4O2
    Guanidinated,
    /// Homocitrulline, C7H15N3O3
    Carbamylated,
    #[default]
    /// Lysine carrying a diglycine remnant, C10H20N4O4
    Ubiquitinated,
}

impl From<ArgLysineVariant> for LysineVariant {
    fn from(value: ArgLysineVariant) -> Self {
        match value {
            ArgLysineVariant::Processed => LysineVariant::Processed,
            ArgLysineVariant::Guanidinated => LysineVariant::Guanidinated,
            ArgLysineVariant::Carbamylated => LysineVariant::Carbamylated,
            ArgLysineVariant::Ubiquitinated => LysineVariant::Ubiquitinated,
        }
    }
}

impl Display for ArgLysineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    /// Tab-separated rows, one per peptide and series and enrichment step
    Tsv,
    /// A JSON array with one document per peptide
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub(crate) fn non_negative_float_f64(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative_float_f64("0.05"), Ok(0.05));
        assert!(non_negative_float_f64("-1").is_err());
        assert!(non_negative_float_f64("abc").is_err());
    }

    #[test]
    fn test_lysine_conversion() {
        let variant: LysineVariant = ArgLysineVariant::default().into();
        assert_eq!(variant, LysineVariant::default());
        let variant: LysineVariant = ArgLysineVariant::Carbamylated.into();
        assert_eq!(variant, LysineVariant::Carbamylated);
    }
}
