use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::PostOffice;
use super::is_valid_pincode;

#[derive(Debug)]
pub enum PostOfficeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidPincode { line: u64, value: String },
}

impl std::fmt::Display for PostOfficeImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostOfficeImportError::Io(err) => write!(f, "failed to read post office file: {}", err),
            PostOfficeImportError::Csv(err) => write!(f, "invalid post office CSV data: {}", err),
            PostOfficeImportError::InvalidPincode { line, value } => write!(
                f,
                "line {}: pincode '{}' must be exactly 6 digits",
                line, value
            ),
        }
    }
}

impl std::error::Error for PostOfficeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PostOfficeImportError::Io(err) => Some(err),
            PostOfficeImportError::Csv(err) => Some(err),
            PostOfficeImportError::InvalidPincode { .. } => None,
        }
    }
}

impl From<std::io::Error> for PostOfficeImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for PostOfficeImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct PostOfficeRow {
    pincode: String,
    post_office_name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    location: String,
}

/// Reads `pincode,post_office_name,address,location` exports.
pub struct PostOfficeImporter;

impl PostOfficeImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<PostOffice>, PostOfficeImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<PostOffice>, PostOfficeImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut offices = Vec::new();

        for (index, record) in csv_reader.deserialize::<PostOfficeRow>().enumerate() {
            let row = record?;
            if !is_valid_pincode(&row.pincode) {
                return Err(PostOfficeImportError::InvalidPincode {
                    // header occupies line 1
                    line: index as u64 + 2,
                    value: row.pincode,
                });
            }

            offices.push(PostOffice {
                pincode: row.pincode,
                post_office_name: row.post_office_name,
                address: row.address,
                location: row.location,
            });
        }

        Ok(offices)
    }
}
