//! Proposal commands: list, propose, vote, queue, execute.

use super::parse_address;
use alloy_primitives::Address;
use certgov::governance::{
    CommandOutcome, Proposal, ProposalAction, ProposalCommand, ProposalDraft, ProposalId,
    VoteSupport,
};
use certgov::ledger::LedgerClient;
use certgov::listing::Listing;
use certgov::App;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn format_actions(proposal: &Proposal) -> String {
    let actions = proposal.offered_actions();
    if actions.is_empty() {
        return "-".to_string();
    }
    actions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_listing(listing: &Listing<Proposal>) {
    if listing.items.is_empty() && listing.failures.is_empty() {
        println!("No proposals.");
    }
    for proposal in &listing.items {
        println!("{} [{}] {}", proposal.id, proposal.state, proposal.description);
        println!("    actions: {}", format_actions(proposal));
    }
    for failure in &listing.failures {
        println!("⚠️  could not index {}: {}", failure.item_id, failure.reason);
    }
}

fn print_outcome(action: &str, outcome: &CommandOutcome) {
    println!(
        "✅ {} confirmed for proposal {} (tx {}, block {})",
        action,
        outcome.proposal_id,
        outcome.confirmation.transaction_hash,
        outcome.confirmation.block_number
    );
    println!();
    match &outcome.refresh {
        Ok(listing) => print_listing(listing),
        Err(e) => println!("⚠️  refresh failed: {}", e),
    }
    match &outcome.certificates {
        Some(Ok(listing)) => println!("📜 {} certificate(s) issued so far", listing.items.len()),
        Some(Err(e)) => println!("⚠️  certificate refresh failed: {}", e),
        None => {}
    }
}

pub async fn list<L: LedgerClient>(app: &App<L>) -> CliResult {
    let listing = app.proposals.list_proposals().await?;
    print_listing(&listing);
    Ok(())
}

/// Resolve `credential`, `token` or a literal address.
fn resolve_target<L: LedgerClient>(app: &App<L>, target: &str) -> Result<Address, String> {
    match target.trim().to_ascii_lowercase().as_str() {
        "credential" | "cert" => Ok(app.address_book().credential),
        "token" => Ok(app.address_book().token),
        _ => parse_address(target),
    }
}

pub async fn propose<L: LedgerClient>(
    app: &App<L>,
    target: &str,
    function: String,
    args_json: String,
    description: String,
) -> CliResult {
    let draft = ProposalDraft {
        target: resolve_target(app, target)?,
        function,
        args_json,
        description,
    };
    // Reject bad input before prompting for a connection
    app.proposals.encode_draft(&draft)?;

    app.wallet.connect().await?;
    let outcome = app.proposals.dispatch(ProposalCommand::Create(draft)).await?;
    print_outcome("proposal", &outcome);
    Ok(())
}

/// Fetch the proposal and check the displayed state offers `action`.
async fn offered<L: LedgerClient>(
    app: &App<L>,
    id: &str,
    action: ProposalAction,
    force: bool,
) -> Result<Proposal, Box<dyn std::error::Error>> {
    let id: ProposalId = id.parse()?;
    let proposal = app.proposals.proposal(id).await?;
    if !force && !proposal.offered_actions().contains(&action) {
        return Err(format!(
            "proposal {} is {}; offered actions: {} (use --force to submit anyway)",
            proposal.id,
            proposal.state,
            format_actions(&proposal)
        )
        .into());
    }
    Ok(proposal)
}

pub async fn vote<L: LedgerClient>(app: &App<L>, id: &str, support: &str, force: bool) -> CliResult {
    let support: VoteSupport = support.parse()?;
    let action = match support {
        VoteSupport::For => ProposalAction::VoteFor,
        VoteSupport::Against => ProposalAction::VoteAgainst,
    };
    let proposal = offered(app, id, action, force).await?;

    app.wallet.connect().await?;
    let outcome = app
        .proposals
        .dispatch(ProposalCommand::CastVote {
            id: proposal.id,
            support,
        })
        .await?;
    print_outcome(&action.to_string(), &outcome);
    Ok(())
}

pub async fn queue<L: LedgerClient>(app: &App<L>, id: &str, force: bool) -> CliResult {
    let proposal = offered(app, id, ProposalAction::Queue, force).await?;
    app.wallet.connect().await?;
    let outcome = app.proposals.dispatch(ProposalCommand::Queue(proposal)).await?;
    print_outcome("queue", &outcome);
    Ok(())
}

pub async fn execute<L: LedgerClient>(app: &App<L>, id: &str, force: bool) -> CliResult {
    let proposal = offered(app, id, ProposalAction::Execute, force).await?;
    app.wallet.connect().await?;
    let outcome = app.proposals.dispatch(ProposalCommand::Execute(proposal)).await?;
    print_outcome("execute", &outcome);
    Ok(())
}
