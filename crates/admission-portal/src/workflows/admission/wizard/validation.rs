use serde::Deserialize;

use crate::workflows::admission::domain::{
    CorrespondenceDetails, PersonalDetails, ProgrammeDetails, QualificationDetails,
    QualificationEntry,
};
use crate::workflows::admission::validation::{
    optional_email, optional_max, required_max, ValidationErrors,
};

pub fn validate_personal(details: &PersonalDetails) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    optional_max(&mut errors, "apar_id", details.apar_id.as_deref(), 50);
    optional_max(&mut errors, "apar_name", details.apar_name.as_deref(), 255);
    optional_max(&mut errors, "apar_gender", details.apar_gender.as_deref(), 50);
    optional_max(&mut errors, "certificate_name", details.certificate_name.as_deref(), 255);
    optional_max(&mut errors, "certificate_gender", details.certificate_gender.as_deref(), 50);

    required_max(&mut errors, "mother_name", &details.mother_name, 255);
    required_max(&mut errors, "guardian_relation", &details.guardian_relation, 100);
    required_max(&mut errors, "guardian_name", &details.guardian_name, 255);
    required_max(&mut errors, "category", &details.category, 100);
    optional_max(
        &mut errors,
        "citizenship_country",
        details.citizenship_country.as_deref(),
        100,
    );
    required_max(&mut errors, "territory_area", &details.territory_area, 100);
    required_max(&mut errors, "minority", &details.minority, 100);
    required_max(&mut errors, "religion", &details.religion, 100);
    required_max(&mut errors, "marital_status", &details.marital_status, 100);
    optional_max(&mut errors, "social_status", details.social_status.as_deref(), 100);

    optional_email(&mut errors, "email", details.email.as_deref());
    optional_email(&mut errors, "alternate_email", details.alternate_email.as_deref());
    optional_max(&mut errors, "mobile", details.mobile.as_deref(), 20);
    optional_max(&mut errors, "alternate_mobile", details.alternate_mobile.as_deref(), 20);

    errors.into_result()
}

pub fn validate_programme(details: &ProgrammeDetails) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    required_max(&mut errors, "programme_type", &details.programme_type, 100);
    required_max(&mut errors, "mode_of_study", &details.mode_of_study, 100);
    required_max(&mut errors, "programme_enrollment", &details.programme_enrollment, 255);
    required_max(&mut errors, "region_code", &details.region_code, 100);
    required_max(&mut errors, "study_center_code", &details.study_center_code, 100);
    required_max(&mut errors, "medium", &details.medium, 100);
    errors.into_result()
}

pub fn validate_correspondence(details: &CorrespondenceDetails) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    required_max(&mut errors, "address_line_1", &details.address_line_1, 255);
    optional_max(&mut errors, "address_line_2", details.address_line_2.as_deref(), 255);
    required_max(&mut errors, "city", &details.city, 100);
    required_max(&mut errors, "pincode", &details.pincode, 10);
    required_max(&mut errors, "post_office", &details.post_office, 100);
    errors.into_result()
}

/// Qualification payload as submitted; numbers may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualificationRequest {
    #[serde(default)]
    pub qualifications: Vec<QualificationInput>,
    #[serde(default)]
    pub nad_username: Option<String>,
    #[serde(default)]
    pub nad_certificate_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualificationInput {
    #[serde(default)]
    pub relevant_qualification: String,
    #[serde(default)]
    pub main_subjects: Option<String>,
    #[serde(default)]
    pub year_of_passing: Option<i32>,
    #[serde(default)]
    pub division: String,
    #[serde(default)]
    pub percent_marks: Option<f32>,
    #[serde(default)]
    pub board_code: String,
    #[serde(default)]
    pub board_roll_number: Option<String>,
}

pub fn validate_qualification(
    request: QualificationRequest,
) -> Result<QualificationDetails, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if request.qualifications.is_empty() {
        errors.add("qualifications", "At least one qualification is required.");
    }

    let mut entries = Vec::with_capacity(request.qualifications.len());
    for (index, input) in request.qualifications.into_iter().enumerate() {
        let field = |name: &str| format!("qualifications.{index}.{name}");

        required_max(
            &mut errors,
            &field("relevant_qualification"),
            &input.relevant_qualification,
            255,
        );
        optional_max(
            &mut errors,
            &field("main_subjects"),
            input.main_subjects.as_deref(),
            500,
        );
        required_max(&mut errors, &field("division"), &input.division, 100);
        required_max(&mut errors, &field("board_code"), &input.board_code, 100);
        optional_max(
            &mut errors,
            &field("board_roll_number"),
            input.board_roll_number.as_deref(),
            255,
        );

        let year = match input.year_of_passing {
            Some(year) if (1900..=2100).contains(&year) => Some(year),
            Some(_) => {
                errors.add(
                    &field("year_of_passing"),
                    "The year of passing must be between 1900 and 2100.",
                );
                None
            }
            None => {
                errors.add(
                    &field("year_of_passing"),
                    "The year of passing field is required.",
                );
                None
            }
        };

        let percent = match input.percent_marks {
            Some(percent) if (0.0..=100.0).contains(&percent) => Some(percent),
            Some(_) => {
                errors.add(
                    &field("percent_marks"),
                    "The percent marks must be between 0 and 100.",
                );
                None
            }
            None => {
                errors.add(
                    &field("percent_marks"),
                    "The percent marks field is required.",
                );
                None
            }
        };

        if let (Some(year_of_passing), Some(percent_marks)) = (year, percent) {
            entries.push(QualificationEntry {
                relevant_qualification: input.relevant_qualification,
                main_subjects: input.main_subjects,
                year_of_passing,
                division: input.division,
                percent_marks,
                board_code: input.board_code,
                board_roll_number: input.board_roll_number,
            });
        }
    }

    optional_max(&mut errors, "nad_username", request.nad_username.as_deref(), 255);
    optional_max(
        &mut errors,
        "nad_certificate_id",
        request.nad_certificate_id.as_deref(),
        255,
    );

    errors.into_result()?;

    Ok(QualificationDetails {
        qualifications: entries,
        nad_username: request.nad_username,
        nad_certificate_id: request.nad_certificate_id,
    })
}
