use super::parse_address;
use certgov::ledger::LedgerClient;
use certgov::roles::{RoleGrantRequest, RoleKind};
use certgov::App;

/// Grant a timelock role. Only admins get this far; the timelock checks again.
pub async fn grant<L: LedgerClient>(
    app: &App<L>,
    role: &str,
    grantee: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = RoleGrantRequest {
        role: role.parse::<RoleKind>()?,
        grantee: parse_address(grantee)?,
    };

    app.wallet.connect().await?;
    let confirmation = app.roles.grant_role(request).await?;
    println!(
        "✅ {} role granted to {} (tx {})",
        request.role, request.grantee, confirmation.transaction_hash
    );
    Ok(())
}
