use certgov::ledger::LedgerClient;
use certgov::App;

/// Connect and show who the operator is on the ledger.
///
/// Displays:
/// - Connected identity
/// - Whether it administers the timelock (role grants available)
/// - Voting token balance
/// - Contract addresses from the deployment record
pub async fn execute<L: LedgerClient>(app: &App<L>) -> Result<(), Box<dyn std::error::Error>> {
    println!("📊 certgov status");
    println!();

    let identity = app.wallet.connect().await?;
    let (is_admin, balance) = futures::join!(
        app.roles.is_admin(identity.address()),
        app.tokens.balance_of(identity.address())
    );

    println!("  Identity: {}", identity);
    match is_admin {
        Ok(true) => println!("  Timelock admin: yes (grant-role available)"),
        Ok(false) => println!("  Timelock admin: no"),
        Err(e) => println!("  Timelock admin: unknown ({})", e),
    }
    match balance {
        Ok(balance) => println!("  Token balance: {}", balance),
        Err(e) => println!("  Token balance: unknown ({})", e),
    }

    let book = app.address_book();
    println!();
    println!("  Governor: {}", book.governor);
    println!("  Timelock: {}", book.timelock);
    println!("  Token: {}", book.token);
    println!("  Credential: {}", book.credential);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use certgov::ledger::MockLedger;
    use certgov::AppSettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_execute() {
        let ledger = Arc::new(MockLedger::new().with_admin(Address::repeat_byte(0xa1)));
        let app = App::new(ledger.clone(), ledger.address_book(), AppSettings::default());
        assert!(execute(&app).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_without_wallet() {
        let ledger = Arc::new(MockLedger::new());
        let app = App::new(ledger.clone(), ledger.address_book(), AppSettings::default());
        assert!(execute(&app).await.is_err());
    }
}
