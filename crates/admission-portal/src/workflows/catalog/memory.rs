use crate::workflows::money::Amount;

use super::domain::{
    Board, Branch, FeeHead, FeeSchedule, Institute, PostOffice, Programme, ProgrammeType,
};
use super::Catalog;

/// Catalog held in memory, seeded with the college's reference data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    institutes: Vec<Institute>,
    branches: Vec<Branch>,
    programme_types: Vec<ProgrammeType>,
    programmes: Vec<Programme>,
    boards: Vec<Board>,
    post_offices: Vec<PostOffice>,
    fee_schedules: Vec<FeeSchedule>,
}

impl InMemoryCatalog {
    pub fn seeded() -> Self {
        let institutes = vec![Institute {
            id: 1,
            name: "Tech University".to_string(),
            code: "TECHU".to_string(),
        }];

        let branches = vec![Branch {
            id: 1,
            name: "Main Campus".to_string(),
            code: "MC001".to_string(),
            institute_id: 1,
        }];

        let programme_types = [
            ("DIPLOMA", "Diploma", true),
            ("BACHELOR", "Bachelor", true),
            ("CERTIFICATE", "Certificate", false),
        ]
        .into_iter()
        .map(|(code, name, active)| ProgrammeType {
            code: code.to_string(),
            name: name.to_string(),
            active,
        })
        .collect();

        let programmes = [
            ("DIPN", "Diploma in Nursing", "DIPLOMA", 3, 5, true),
            ("GNM", "General Nursing and Midwifery", "DIPLOMA", 3, 4, true),
            ("BSCN", "B.Sc. Nursing", "BACHELOR", 4, 6, true),
            ("PBBSCN", "Post Basic B.Sc. Nursing", "BACHELOR", 2, 4, false),
        ]
        .into_iter()
        .map(|(code, name, kind, min, max, active)| Programme {
            code: code.to_string(),
            name: name.to_string(),
            programme_type: kind.to_string(),
            min_duration_years: min,
            max_duration_years: max,
            active,
        })
        .collect();

        let boards = [
            ("CBSE", "Central Board of Secondary Education", "10", true),
            ("ICSE", "Council for the Indian School Certificate Examinations", "10", true),
            ("CBSE", "Central Board of Secondary Education", "12", true),
            ("ISC", "Council for the Indian School Certificate Examinations", "12", true),
            ("NIOS", "National Institute of Open Schooling", "12", true),
            ("OLD", "Discontinued State Board", "12", false),
        ]
        .into_iter()
        .map(|(code, name, level, active)| Board {
            code: code.to_string(),
            name: name.to_string(),
            level: level.to_string(),
            active,
        })
        .collect();

        let post_offices = [
            ("110001", "New Delhi G.P.O.", "New Delhi"),
            ("110001", "Parliament House", "New Delhi"),
            ("400001", "Mumbai G.P.O.", "Mumbai"),
            ("700001", "Kolkata G.P.O.", "Kolkata"),
            ("600001", "Chennai G.P.O.", "Chennai"),
        ]
        .into_iter()
        .map(|(pincode, name, city)| PostOffice {
            pincode: pincode.to_string(),
            post_office_name: name.to_string(),
            address: city.to_string(),
            location: city.to_string(),
        })
        .collect();

        let heads = [
            ("Tuition Fee", 50_000),
            ("Admission Fee", 1_000),
            ("Library Fee", 500),
            ("Laboratory Fee", 2_000),
            ("Examination Fee", 1_500),
            ("Identity Card", 100),
            ("Sports Fee", 500),
        ]
        .into_iter()
        .map(|(name, rupees)| FeeHead {
            name: name.to_string(),
            amount: Amount::from_rupees(rupees),
        })
        .collect();

        let fee_schedules = vec![FeeSchedule {
            branch_id: 1,
            programme_code: "DIPN".to_string(),
            group: "On Admission".to_string(),
            heads,
        }];

        Self {
            institutes,
            branches,
            programme_types,
            programmes,
            boards,
            post_offices,
            fee_schedules,
        }
    }

    /// Merges imported post offices; an existing pincode and name pair is replaced.
    pub fn with_post_offices(mut self, offices: impl IntoIterator<Item = PostOffice>) -> Self {
        for office in offices {
            self.post_offices.retain(|existing| {
                existing.pincode != office.pincode
                    || existing.post_office_name != office.post_office_name
            });
            self.post_offices.push(office);
        }
        self
    }

    pub fn with_fee_schedule(mut self, schedule: FeeSchedule) -> Self {
        self.fee_schedules.retain(|existing| {
            existing.branch_id != schedule.branch_id
                || existing.programme_code != schedule.programme_code
        });
        self.fee_schedules.push(schedule);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn branches(&self) -> Vec<Branch> {
        let mut branches = self.branches.clone();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    fn institute_for_branch(&self, branch_id: u64) -> Option<Institute> {
        let branch = self.branches.iter().find(|branch| branch.id == branch_id)?;
        self.institutes
            .iter()
            .find(|institute| institute.id == branch.institute_id)
            .cloned()
    }

    fn programme_types(&self) -> Vec<ProgrammeType> {
        let mut types: Vec<_> = self
            .programme_types
            .iter()
            .filter(|kind| kind.active)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    fn programmes(&self, type_code: &str) -> Vec<Programme> {
        let known = self
            .programme_types
            .iter()
            .any(|kind| kind.code == type_code);
        if !known {
            return Vec::new();
        }

        let mut programmes: Vec<_> = self
            .programmes
            .iter()
            .filter(|programme| programme.programme_type == type_code && programme.active)
            .cloned()
            .collect();
        programmes.sort_by(|a, b| a.name.cmp(&b.name));
        programmes
    }

    fn boards(&self, level: &str) -> Vec<Board> {
        self.boards
            .iter()
            .filter(|board| board.level == level && board.active)
            .cloned()
            .collect()
    }

    fn post_offices_for(&self, pincode: &str) -> Vec<PostOffice> {
        self.post_offices
            .iter()
            .filter(|office| office.pincode == pincode)
            .cloned()
            .collect()
    }

    fn fee_schedule(&self, branch_id: u64, programme_code: &str) -> Option<FeeSchedule> {
        self.fee_schedules
            .iter()
            .find(|schedule| {
                schedule.branch_id == branch_id && schedule.programme_code == programme_code
            })
            .cloned()
    }
}
