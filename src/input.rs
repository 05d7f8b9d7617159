//! Common routines for handling input data.
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod scenario;
use scenario::read_scenarios;
pub mod settlement;
use settlement::read_settlements;
pub mod technology;
use technology::read_technologies;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(!vec.is_empty(), input_err_msg_empty(file_path));

    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

fn input_err_msg_empty(file_path: &Path) -> String {
    format!("CSV file {} cannot be empty", file_path.display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value)
}

/// Check that a field value is a finite number and not negative, naming the field on failure
pub fn check_non_negative(field: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{field} must be a finite number greater than or equal to zero (got {value})"
    );

    Ok(())
}

/// Check that a field value is a finite number greater than zero, naming the field on failure
pub fn check_positive(field: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{field} must be a finite number greater than zero (got {value})"
    );

    Ok(())
}

/// Indicates that the slice is sorted in strictly ascending order (i.e. no duplicates)
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Insert items into an [`IndexMap`] keyed by ID, raising an error on duplicates
pub fn into_id_map<ID, T, I>(iter: I) -> Result<IndexMap<ID, T>>
where
    ID: IDLike,
    T: HasID<ID>,
    I: Iterator<Item = T>,
{
    let mut map = IndexMap::new();
    for item in iter {
        let id = item.get_id().clone();
        ensure!(
            map.insert(id.clone(), item).is_none(),
            "Duplicate ID found: {id}"
        );
    }

    Ok(map)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let settlements = read_settlements(model_dir)?;
    let technologies = read_technologies(model_dir)?;
    let scenarios = read_scenarios(model_dir)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        settlements,
        technologies,
        scenarios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello, 1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data rows
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert_error!(
            read_csv::<Record>(&file_path).map(|_| ()),
            format!("CSV file {} cannot be empty", file_path.display())
        );

        // Missing file
        assert!(read_csv::<Record>(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value = 1").unwrap();
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct Value {
            value: u32,
        }

        assert_eq!(read_toml::<Value>(&file_path).unwrap(), Value { value: 1 });
        assert!(read_toml::<Value>(&dir.path().join("missing.toml")).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: f64,
    }

    #[test]
    fn test_deserialise_proportion() {
        let parse = |s: &str| toml::from_str::<Proportion>(&format!("value = {s}"));
        assert_approx_eq!(f64, parse("0.0").unwrap().value, 0.0);
        assert_approx_eq!(f64, parse("1.0").unwrap().value, 1.0);
        assert!(parse("-0.1").is_err());
        assert!(parse("1.1").is_err());
    }

    #[test]
    fn test_checks() {
        assert!(check_non_negative("population", 0.0).is_ok());
        assert_error!(
            check_non_negative("population", -1.0),
            "population must be a finite number greater than or equal to zero (got -1)"
        );
        assert!(check_non_negative("population", f64::NAN).is_err());
        assert!(check_positive("tech_life", 1.0).is_ok());
        assert!(check_positive("tech_life", 0.0).is_err());
        assert!(check_positive("tech_life", f64::INFINITY).is_err());
    }

    #[test]
    fn test_is_sorted_and_unique() {
        assert!(is_sorted_and_unique::<u32>(&[]));
        assert!(is_sorted_and_unique(&[1, 2]));
        assert!(!is_sorted_and_unique(&[1, 1]));
        assert!(!is_sorted_and_unique(&[2, 1]));
    }
}
