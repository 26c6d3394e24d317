use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use fleetdesk::error::AppError;
use fleetdesk::workflows::matching::NewDriverRequest;
use fleetdesk::workflows::verification::{
    CheckKind, CompanyRegistration, DriverRegistration, NewDocument, VerificationConfig,
    VerificationStatus,
};

use crate::infra::Backoffice;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date for document expiry (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) on: Option<NaiveDate>,
    /// Stop after the verification portion of the walk-through.
    #[arg(long)]
    pub(crate) skip_matching: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { on, skip_matching } = args;
    let on = on.unwrap_or_else(|| Local::now().date_naive());

    let backoffice = Backoffice::bootstrap(VerificationConfig::default())?;
    let root = backoffice.seed.bootstrap.admin.id;
    let verification = &backoffice.verification;

    println!("Fleet back office demo");
    println!(
        "- Bootstrap admin {} <{}> ({})",
        backoffice.seed.bootstrap.admin.name,
        backoffice.seed.bootstrap.admin.email,
        backoffice.seed.bootstrap.role_label
    );
    for role in backoffice.access.hierarchy()? {
        let permissions = backoffice.access.permissions_for(role.id)?;
        println!(
            "  - role {} (level {}) holds {} permissions",
            role.name,
            role.level,
            permissions.len()
        );
    }

    println!("\nCompany onboarding");
    let company = verification.register_company(CompanyRegistration {
        name: "Lagos Freightways".to_string(),
        email: "ops@lagosfreightways.test".to_string(),
        phone: Some("+234 1 555 0199".to_string()),
        registration_number: Some("RC-880412".to_string()),
    })?;
    let company = verification
        .set_company_status(company.id, VerificationStatus::Verified, root, None)?
        .into_inner();
    println!(
        "- {} -> {} / {}",
        company.name, company.review.verification_status, company.status
    );

    println!("\nDriver verification");
    let mut drivers = Vec::new();
    for (first_name, last_name) in [("Ada", "Nwosu"), ("Bola", "Adeyemi"), ("Chidi", "Obi")] {
        let driver = verification.register_driver(DriverRegistration {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("{}@drivers.test", first_name.to_lowercase()),
            phone: None,
        })?;
        println!(
            "- Registered {} ({} / {})",
            driver.full_name(),
            driver.review.verification_status,
            driver.status
        );
        drivers.push(driver);
    }

    verification.upload_document(NewDocument {
        driver_id: drivers[0].id,
        document_type: "drivers_licence".to_string(),
        file_name: "ada-licence.pdf".to_string(),
        expiry_date: Some(on - Duration::days(30)),
    })?;

    let check = verification.open_check(drivers[1].id, CheckKind::Nin, None, root)?;
    let check = verification.record_check_failure(check.id, "registry timeout", root)?;
    println!(
        "- {} check for {} failed (retries so far: {})",
        check.kind,
        drivers[1].full_name(),
        check.retry_count
    );
    verification.retry_check(check.id, root)?;
    let check = verification.record_check_success(check.id, root)?.into_inner();
    println!("  Retried and recorded: {}", check.status);

    let approved = [drivers[0].id, drivers[1].id];
    let bulk = verification.bulk_set_driver_status(&approved, VerificationStatus::Verified, root, None)?;
    println!(
        "- Bulk verification: {} drivers affected, {} changed",
        bulk.affected, bulk.changed
    );
    let rejected = verification
        .set_driver_status(
            drivers[2].id,
            VerificationStatus::Rejected,
            root,
            Some("licence photo unreadable".to_string()),
        )?
        .into_inner();
    println!(
        "- {} rejected: {}",
        rejected.full_name(),
        rejected.review.rejection_reason.as_deref().unwrap_or("no reason")
    );

    let expired = verification.expired_documents(on)?;
    println!("- Documents expired as of {on}: {}", expired.len());
    for document in &expired {
        println!(
            "  - {} for driver {} (expired {})",
            document.document_type,
            document.driver_id,
            document
                .expiry_date
                .map(|date| date.to_string())
                .unwrap_or_default()
        );
    }

    if skip_matching {
        return Ok(());
    }

    println!("\nMatching");
    let matching = &backoffice.matching;
    let request = matching.open_request(NewDriverRequest {
        company_id: company.id,
        title: "Apapa port shuttle".to_string(),
        drivers_needed: 2,
    })?;
    let candidates = matching.candidates(request.id)?;
    println!(
        "- Request {} needs {} drivers; {} candidates available",
        request.id,
        request.drivers_needed,
        candidates.len()
    );

    let mut latest = request;
    for driver in &candidates {
        let assignment = matching.match_driver(latest.id, driver.id, root)?;
        println!(
            "  - Matched {} -> {}/{} ({})",
            driver.full_name(),
            assignment.request.matched,
            assignment.request.drivers_needed,
            assignment.request.status
        );
        latest = assignment.request;
    }

    if let Some(first) = candidates.first() {
        let reopened = matching.unmatch_driver(latest.id, first.id, root)?;
        println!(
            "- Unmatched {}: request back to {} with {} open slot(s)",
            first.full_name(),
            reopened.status,
            reopened.remaining()
        );
    }

    Ok(())
}
