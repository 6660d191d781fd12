use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tier that the estimator measures households against.
pub const FULL_AMI_PERCENT: f64 = 100.0;

const HOUSEHOLD_KEY_PREFIX: &str = "people_";

/// One row of a published AMI table: the percentage tier plus an income ceiling per household size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct AmiTier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ami: Option<f64>,
    #[serde(flatten)]
    pub ceilings: BTreeMap<String, f64>,
}

impl From<Map<String, Value>> for AmiTier {
    fn from(fields: Map<String, Value>) -> Self {
        let mut ami = None;
        let mut ceilings = BTreeMap::new();

        for (key, value) in fields {
            let number = match &value {
                Value::Number(number) => number.as_f64(),
                Value::String(raw) => raw.trim().parse::<f64>().ok(),
                _ => None,
            };
            let Some(number) = number else {
                continue;
            };

            if key == "ami" {
                ami = Some(number);
            } else {
                ceilings.insert(key, number);
            }
        }

        Self { ami, ceilings }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AmiTableError {
    #[error("AMI table has no 100% AMI tier; income thresholds cannot be derived")]
    MissingFullAmiTier,
    #[error("invalid AMI table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid AMI table CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidCsvValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("failed to read AMI table: {0}")]
    Io(#[from] std::io::Error),
}

/// Income ceilings for the 100% AMI tier, keyed by `people_<household size>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmiIncomeTable {
    ceilings: BTreeMap<String, f64>,
}

impl AmiIncomeTable {
    /// Boston-area 100% AMI limits used when no table source is configured.
    pub fn boston_2020() -> Self {
        let ceilings = [79350.0, 90650.0, 102000.0, 113300.0, 122400.0, 131450.0]
            .into_iter()
            .enumerate()
            .map(|(index, ceiling)| (household_key(&(index + 1).to_string()), ceiling))
            .collect();
        Self { ceilings }
    }

    pub fn from_ceilings(ceilings: BTreeMap<String, f64>) -> Self {
        Self { ceilings }
    }

    /// Pick the tier whose `ami` is exactly 100.
    pub fn select(tiers: Vec<AmiTier>) -> Result<Self, AmiTableError> {
        tiers
            .into_iter()
            .find(|tier| tier.ami == Some(FULL_AMI_PERCENT))
            .map(|tier| Self {
                ceilings: tier.ceilings,
            })
            .ok_or(AmiTableError::MissingFullAmiTier)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, AmiTableError> {
        let tiers: Vec<AmiTier> = serde_json::from_slice(bytes)?;
        Self::select(tiers)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, AmiTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, AmiTableError> {
        Self::select(tiers_from_csv(reader)?)
    }

    /// Ceiling for a household size as entered in the form (`"6+"` looks up `"6"`).
    pub fn ceiling_for(&self, household_size: &str) -> Option<f64> {
        let size = household_size.replacen('+', "", 1);
        self.ceilings.get(&household_key(&size)).copied()
    }

    pub fn household_sizes(&self) -> Vec<String> {
        self.ceilings
            .keys()
            .filter_map(|key| key.strip_prefix(HOUSEHOLD_KEY_PREFIX))
            .map(str::to_string)
            .collect()
    }
}

impl Default for AmiIncomeTable {
    fn default() -> Self {
        Self::boston_2020()
    }
}

fn household_key(size: &str) -> String {
    format!("{HOUSEHOLD_KEY_PREFIX}{size}")
}

pub fn tiers_from_csv<R: Read>(reader: R) -> Result<Vec<AmiTier>, AmiTableError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut tiers = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let mut ami = None;
        let mut ceilings = BTreeMap::new();

        for (column, field) in headers.iter().zip(record.iter()) {
            if field.is_empty() {
                continue;
            }
            let value = field
                .replace([',', '$'], "")
                .parse::<f64>()
                .map_err(|_| AmiTableError::InvalidCsvValue {
                    row: index + 1,
                    column: column.to_string(),
                    value: field.to_string(),
                })?;

            if column == "ami" {
                ami = Some(value);
            } else {
                ceilings.insert(column.to_string(), value);
            }
        }

        tiers.push(AmiTier { ami, ceilings });
    }

    Ok(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_the_full_ami_tier() {
        let payload = json!([
            { "ami": 80, "people_1": 63480, "people_4": 90640 },
            { "ami": 100, "people_1": 79350, "people_4": 113300, "label": "100% AMI" },
            { "people_1": 1 }
        ]);
        let table = AmiIncomeTable::from_json_slice(payload.to_string().as_bytes())
            .expect("100% tier present");

        assert_eq!(table.ceiling_for("4"), Some(113300.0));
        assert_eq!(table.ceiling_for("1"), Some(79350.0));
        assert_eq!(table.household_sizes(), vec!["1", "4"]);
    }

    #[test]
    fn missing_full_tier_is_fatal() {
        let payload = json!([{ "ami": 80, "people_1": 63480 }, { "ami": 100.5 }]);
        let err = AmiIncomeTable::from_json_slice(payload.to_string().as_bytes())
            .expect_err("no exact 100 tier");
        assert!(matches!(err, AmiTableError::MissingFullAmiTier));
    }

    #[test]
    fn strips_plus_suffix_from_household_size() {
        let table = AmiIncomeTable::boston_2020();
        assert_eq!(table.ceiling_for("6+"), Some(131450.0));
        assert_eq!(table.ceiling_for("7"), None);
        assert_eq!(table.ceiling_for(""), None);
    }

    #[test]
    fn parses_csv_tables() {
        let csv = "ami,people_1,people_2\n80,\"63,480\",72560\n100,79350,$90650\n";
        let table = AmiIncomeTable::from_csv_reader(csv.as_bytes()).expect("csv parses");
        assert_eq!(table.ceiling_for("2"), Some(90650.0));
    }

    #[test]
    fn reports_bad_csv_cells() {
        let csv = "ami,people_1\n100,lots\n";
        let err = AmiIncomeTable::from_csv_reader(csv.as_bytes()).expect_err("bad cell");
        match err {
            AmiTableError::InvalidCsvValue { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "people_1");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
