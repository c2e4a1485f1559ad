//! Reference data behind the wizard's drop-downs and the fee page.

pub mod domain;
mod import;
mod memory;

pub use domain::{Board, Branch, FeeHead, FeeSchedule, Institute, PostOffice, Programme, ProgrammeType};
pub use import::{PostOfficeImportError, PostOfficeImporter};
pub use memory::InMemoryCatalog;

/// Read-only lookups served to applicants.
pub trait Catalog: Send + Sync {
    /// Branches sorted by name.
    fn branches(&self) -> Vec<Branch>;
    fn institute_for_branch(&self, branch_id: u64) -> Option<Institute>;
    /// Active programme types.
    fn programme_types(&self) -> Vec<ProgrammeType>;
    /// Active programmes of a type; unknown types yield an empty list.
    fn programmes(&self, type_code: &str) -> Vec<Programme>;
    fn boards(&self, level: &str) -> Vec<Board>;
    fn post_offices_for(&self, pincode: &str) -> Vec<PostOffice>;
    fn fee_schedule(&self, branch_id: u64, programme_code: &str) -> Option<FeeSchedule>;

    fn post_offices(&self, pincode: &str) -> Result<Vec<PostOffice>, CatalogError> {
        let pincode = pincode.trim();
        if !is_valid_pincode(pincode) {
            return Err(CatalogError::InvalidPincode(pincode.to_string()));
        }
        Ok(self.post_offices_for(pincode))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("The pincode must be exactly 6 digits.")]
    InvalidPincode(String),
}

pub(crate) fn is_valid_pincode(value: &str) -> bool {
    value.len() == 6 && value.chars().all(|c| c.is_ascii_digit())
}
