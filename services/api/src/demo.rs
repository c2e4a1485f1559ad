use crate::infra::{
    InMemoryApplicantRepository, InMemoryRegistrationLedger, OutboxMailer, SimulatedGateway,
};
use admission_portal::config::{BankTransferDetails, PortalConfig};
use admission_portal::error::AppError;
use admission_portal::workflows::admission::payments::{BankTransferRequest, ProofDocument};
use admission_portal::workflows::admission::wizard::{QualificationInput, QualificationRequest};
use admission_portal::workflows::admission::{
    AdmissionPortal, ApplicantId, CorrespondenceDetails, DocumentType, PersonalDetails,
    PortalDependencies, ProgrammeDetails, RegistrationRequest, SystemClock, UploadRequest,
};
use admission_portal::workflows::catalog::{Catalog, InMemoryCatalog, PostOfficeImporter};
use chrono::Utc;
use clap::{Args, ValueEnum};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum DemoPayment {
    /// Pay through the (simulated) Cashfree checkout
    #[default]
    Online,
    /// Record an offline bank transfer and reconcile it as an administrator
    BankTransfer,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// How the applicant settles the admission fee.
    #[arg(long, value_enum, default_value_t = DemoPayment::Online)]
    pub(crate) payment: DemoPayment,
    /// Reject the first submission so the applicant has to correct and resubmit.
    #[arg(long)]
    pub(crate) reject_first: bool,
    /// Optional post office CSV used to validate the correspondence address.
    #[arg(long)]
    pub(crate) post_office_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct PostOfficeArgs {
    /// Post office directory export (pincode, post office name, address, location)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Six digit pincode to look up
    #[arg(long)]
    pub(crate) pincode: String,
}

pub(crate) fn run_post_office_lookup(args: PostOfficeArgs) -> Result<(), AppError> {
    let offices =
        PostOfficeImporter::from_path(&args.csv).map_err(AppError::post_offices(&args.csv))?;
    println!("Imported {} post offices from {}", offices.len(), args.csv.display());

    let catalog = InMemoryCatalog::seeded().with_post_offices(offices);
    match catalog.post_offices(&args.pincode) {
        Ok(matches) if matches.is_empty() => {
            println!("No post office serves pincode {}", args.pincode.trim());
        }
        Ok(matches) => match serde_json::to_string_pretty(&matches) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Post office listing unavailable: {err}"),
        },
        Err(err) => println!("{err}"),
    }
    Ok(())
}

struct Demo {
    portal: AdmissionPortal,
    mailer: OutboxMailer,
    gateway: SimulatedGateway,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut catalog = InMemoryCatalog::seeded();
    if let Some(path) = &args.post_office_csv {
        let offices = PostOfficeImporter::from_path(path).map_err(AppError::post_offices(path))?;
        catalog = catalog.with_post_offices(offices);
    }

    let mailer = OutboxMailer::default();
    let gateway = SimulatedGateway::default();
    let dependencies = PortalDependencies {
        applicants: Arc::new(InMemoryApplicantRepository::default()),
        ledger: Arc::new(InMemoryRegistrationLedger::default()),
        mailer: Arc::new(mailer.clone()),
        clock: Arc::new(SystemClock),
        catalog: Arc::new(catalog),
    };
    let config = PortalConfig {
        admin_token: Some("demo-admin".to_string()),
        ..PortalConfig::default()
    };
    let portal = AdmissionPortal::builder(dependencies, config)
        .gateway(Arc::new(gateway.clone()))
        .bank_transfer(Some(demo_bank_account()))
        .build();

    let demo = Demo {
        portal,
        mailer,
        gateway,
    };

    println!("Nursing college admission demo");
    if let Err(message) = demo.walk_through(&args).await {
        println!("  Demo stopped: {message}");
    }
    demo.print_outbox();
    Ok(())
}

fn failed<E: Display>(stage: &'static str) -> impl FnOnce(E) -> String {
    move |err| format!("{stage} failed ({err})")
}

impl Demo {
    async fn walk_through(&self, args: &DemoArgs) -> Result<(), String> {
        let id = self.sign_up()?;
        self.fill_wizard(id).await?;

        let review = &self.portal.review;
        review.submit(id).map_err(failed("submission"))?;
        println!("  Application submitted for review");

        if args.reject_first {
            let snapshot = review
                .reject(id, "The signature upload is unreadable.")
                .map_err(failed("rejection"))?;
            println!(
                "  Reviewer rejected the application: {}",
                snapshot.rejection_reason.unwrap_or_default()
            );
            self.portal
                .uploads
                .store(id, demo_upload(DocumentType::SIGNATURE))
                .await
                .map_err(failed("signature re-upload"))?;
            review.submit(id).map_err(failed("resubmission"))?;
            println!("  Applicant re-uploaded the signature and resubmitted");
        }

        let snapshot = review.approve(id).map_err(failed("approval"))?;
        println!("  Reviewer approved; status is now {}", snapshot.status.label());

        let fee = self
            .portal
            .payments
            .fee_schedule_for(id)
            .map_err(failed("fee lookup"))?
            .ok_or_else(|| "no fee schedule published for the chosen branch".to_string())?;
        println!("  Fee schedule ({}):", fee.group);
        for head in &fee.heads {
            println!("    - {}: {}", head.name, head.amount);
        }
        println!("  Total payable: {}", fee.total());

        match args.payment {
            DemoPayment::Online => self.pay_online(id, fee.total()).await?,
            DemoPayment::BankTransfer => self.pay_by_transfer(id, fee.total())?,
        }

        let history = self
            .portal
            .payments
            .history(id)
            .map_err(failed("payment history"))?;
        match serde_json::to_string_pretty(&history) {
            Ok(json) => println!("  Final registration:\n{json}"),
            Err(err) => println!("  Final registration unavailable: {err}"),
        }
        Ok(())
    }

    fn sign_up(&self) -> Result<ApplicantId, String> {
        let accounts = &self.portal.accounts;
        let email = "meera.nair@example.com";
        let dispatched = accounts
            .register(RegistrationRequest {
                username: "meera.nair".to_string(),
                email: email.to_string(),
                email_confirmation: email.to_string(),
                password: "s3cret-pass".to_string(),
                password_confirmation: "s3cret-pass".to_string(),
                mobile: "9876543210".to_string(),
                mobile_confirmation: "9876543210".to_string(),
            })
            .map_err(failed("registration"))?;
        println!(
            "  Registered {}; OTP valid until {}",
            dispatched.email, dispatched.otp_expires_at
        );

        let code = self
            .mailer
            .latest_detail(email, "otp")
            .ok_or_else(|| "no OTP mail was sent".to_string())?;
        let grant = accounts
            .verify_otp(email, &code)
            .map_err(failed("OTP verification"))?;
        println!("  Email verified; applicant #{} signed in", grant.applicant.id);
        Ok(grant.applicant.id)
    }

    async fn fill_wizard(&self, id: ApplicantId) -> Result<(), String> {
        let wizard = &self.portal.wizard;
        wizard
            .save_personal(id, demo_personal_details())
            .map_err(failed("personal details"))?;
        wizard
            .save_programme(id, demo_programme())
            .map_err(failed("programme details"))?;
        wizard
            .save_qualification(id, demo_qualification())
            .map_err(failed("qualification details"))?;
        wizard
            .save_correspondence(id, demo_correspondence())
            .map_err(failed("correspondence details"))?;

        for document in [DocumentType::PHOTO, DocumentType::SIGNATURE] {
            self.portal
                .uploads
                .store(id, demo_upload(document))
                .await
                .map_err(failed("upload"))?;
        }

        let progress = wizard.progress(id).map_err(failed("progress"))?;
        println!(
            "  Wizard complete: {}",
            if progress.missing_steps().is_empty() {
                "all steps saved".to_string()
            } else {
                format!("missing {}", progress.missing_steps().join(", "))
            }
        );
        Ok(())
    }

    async fn pay_online(
        &self,
        id: ApplicantId,
        amount: admission_portal::workflows::money::Amount,
    ) -> Result<(), String> {
        let payments = &self.portal.payments;
        let order = payments
            .create_gateway_order(id, amount)
            .await
            .map_err(failed("order creation"))?;
        println!(
            "  Checkout opened: order {} ({} mode)",
            order.order_id, order.mode
        );

        self.gateway.complete_checkout(&order.order_id);
        let outcome = payments
            .verify_gateway_order(id, &order.order_id)
            .await
            .map_err(failed("payment verification"))?;
        println!("  {}", outcome.message);
        Ok(())
    }

    fn pay_by_transfer(
        &self,
        id: ApplicantId,
        amount: admission_portal::workflows::money::Amount,
    ) -> Result<(), String> {
        let payments = &self.portal.payments;
        let transaction_id = "UTR20260001";
        let registration = payments
            .submit_bank_transfer(
                id,
                BankTransferRequest {
                    amount,
                    transaction_id: transaction_id.to_string(),
                    bank_name: "Canara Bank".to_string(),
                    transaction_date: Utc::now().date_naive(),
                    proof_document: ProofDocument {
                        storage_key: "demo/transfer-receipt.pdf".to_string(),
                        original_name: "transfer-receipt.pdf".to_string(),
                        file_size: 120_000,
                    },
                },
            )
            .map_err(failed("bank transfer"))?;
        println!(
            "  Bank transfer {} recorded; payment {:?}",
            registration.transaction_id, registration.payment_status
        );

        let entry = payments
            .reconcile_bank_transfer(transaction_id, true)
            .map_err(failed("reconciliation"))?;
        println!(
            "  Accounts office verified the transfer; ledger status {:?}",
            entry.payment.status
        );
        Ok(())
    }

    fn print_outbox(&self) {
        let notifications = self.mailer.notifications();
        if notifications.is_empty() {
            println!("  Notifications: none sent");
            return;
        }
        println!("  Notifications:");
        for notification in notifications {
            println!(
                "    - {} -> {}",
                notification.template.label(),
                notification.recipient
            );
        }
    }
}

fn demo_bank_account() -> BankTransferDetails {
    BankTransferDetails {
        account_name: "Nursing College Admissions".to_string(),
        account_number: "50100234567890".to_string(),
        ifsc: "CNRB0000456".to_string(),
        bank_name: "Canara Bank".to_string(),
    }
}

fn demo_personal_details() -> PersonalDetails {
    PersonalDetails {
        apar_name: Some("Meera Nair".to_string()),
        mother_name: "Lakshmi Nair".to_string(),
        guardian_relation: "Father".to_string(),
        guardian_name: "Suresh Nair".to_string(),
        category: "General".to_string(),
        citizenship_country: Some("India".to_string()),
        territory_area: "Urban".to_string(),
        minority: "No".to_string(),
        religion: "Hindu".to_string(),
        marital_status: "Single".to_string(),
        ..PersonalDetails::default()
    }
}

fn demo_programme() -> ProgrammeDetails {
    ProgrammeDetails {
        programme_type: "DIPLOMA".to_string(),
        mode_of_study: "Regular".to_string(),
        programme_enrollment: "DIPN".to_string(),
        region_code: "1".to_string(),
        study_center_code: "MC001".to_string(),
        medium: "English".to_string(),
    }
}

fn demo_qualification() -> QualificationRequest {
    QualificationRequest {
        qualifications: vec![QualificationInput {
            relevant_qualification: "Senior Secondary (10+2)".to_string(),
            main_subjects: Some("Physics, Chemistry, Biology".to_string()),
            year_of_passing: Some(2025),
            division: "First".to_string(),
            percent_marks: Some(82.5),
            board_code: "CBSE".to_string(),
            board_roll_number: Some("1203344".to_string()),
        }],
        nad_username: None,
        nad_certificate_id: None,
    }
}

fn demo_correspondence() -> CorrespondenceDetails {
    CorrespondenceDetails {
        address_line_1: "14 Lake View Road".to_string(),
        address_line_2: None,
        city: "Kochi".to_string(),
        pincode: "682001".to_string(),
        post_office: "Ernakulam".to_string(),
    }
}

fn demo_upload(document_type: &str) -> UploadRequest {
    UploadRequest {
        document_type: document_type.to_string(),
        storage_key: format!("demo/{document_type}.jpg"),
        original_name: format!("{document_type}.jpg"),
        mime_type: Some("image/jpeg".to_string()),
        file_size: 150_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_registers_the_applicant_for_both_payment_paths() {
        for payment in [DemoPayment::Online, DemoPayment::BankTransfer] {
            let args = DemoArgs {
                payment,
                reject_first: true,
                post_office_csv: None,
            };
            run_demo(args).await.expect("demo runs");
        }
    }

    #[test]
    fn demo_pages_pass_wizard_validation() {
        use admission_portal::workflows::admission::wizard::validation::{
            validate_correspondence, validate_personal, validate_programme,
        };

        assert!(validate_personal(&demo_personal_details()).is_ok());
        assert!(validate_programme(&demo_programme()).is_ok());
        assert!(validate_correspondence(&demo_correspondence()).is_ok());
    }
}
