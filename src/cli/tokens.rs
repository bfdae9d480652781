use super::parse_address;
use alloy_primitives::U256;
use certgov::ledger::LedgerClient;
use certgov::App;

pub async fn mint<L: LedgerClient>(
    app: &App<L>,
    to: &str,
    amount: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let to = parse_address(to)?;
    let amount = U256::from_str_radix(amount.trim(), 10)
        .map_err(|e| format!("invalid amount {:?}: {}", amount, e))?;

    app.wallet.connect().await?;
    let confirmation = app.tokens.mint(to, amount).await?;
    println!(
        "✅ minted {} to {} (tx {})",
        amount, to, confirmation.transaction_hash
    );
    Ok(())
}

pub async fn delegate<L: LedgerClient>(
    app: &App<L>,
    to: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let delegatee = to.map(parse_address).transpose()?;

    let identity = app.wallet.connect().await?;
    let confirmation = app.tokens.delegate(delegatee).await?;
    println!(
        "✅ voting power of {} delegated to {} (tx {})",
        identity,
        delegatee.unwrap_or_else(|| identity.address()),
        confirmation.transaction_hash
    );
    Ok(())
}
