use serde::{Deserialize, Serialize};

use crate::workflows::money::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institute {
    pub id: u64,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: u64,
    pub name: String,
    pub code: String,
    pub institute_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeType {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing, default = "active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    pub code: String,
    pub name: String,
    pub programme_type: String,
    pub min_duration_years: u8,
    pub max_duration_years: u8,
    #[serde(skip_serializing, default = "active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub level: String,
    #[serde(skip_serializing, default = "active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOffice {
    pub pincode: String,
    pub post_office_name: String,
    pub address: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeHead {
    pub name: String,
    pub amount: Amount,
}

/// Fees payable on admission for one branch and programme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub branch_id: u64,
    pub programme_code: String,
    pub group: String,
    pub heads: Vec<FeeHead>,
}

impl FeeSchedule {
    pub fn total(&self) -> Amount {
        Amount::from_paise(self.heads.iter().map(|head| head.amount.paise()).sum())
    }
}

fn active() -> bool {
    true
}
