use certgov::ledger::LedgerClient;
use certgov::App;

/// List issued certificates; records that could not be read are reported.
pub async fn list<L: LedgerClient>(app: &App<L>) -> Result<(), Box<dyn std::error::Error>> {
    let listing = app.certificates.list_certificates().await?;

    if listing.items.is_empty() && listing.failures.is_empty() {
        println!("No certificates issued.");
    }
    for certificate in &listing.items {
        println!(
            "#{} {} | {} | {} | {}",
            certificate.id, certificate.name, certificate.course, certificate.grade, certificate.date
        );
    }
    for failure in &listing.failures {
        println!("⚠️  could not read certificate {}: {}", failure.item_id, failure.reason);
    }
    Ok(())
}
