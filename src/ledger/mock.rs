//! Mock ledger for testing.
//!
//! `MockLedger` is an in-memory chain that simulates the governor, the
//! timelock's access control, the voting token and the credential registry
//! closely enough to drive every client flow without a node. Reverts carry
//! the same `Error(string)` payloads the real contracts produce.

use super::traits::*;
use crate::abi::{self, ParamType, Token};
use crate::contracts::governor::{self, ProposalCreated};
use crate::contracts::{credential, timelock, token, AddressBook};
use crate::governance::proposal::{
    description_hash, hash_proposal, ProposalCall, ProposalId, ProposalState,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Voting period the mock governor reports in `ProposalCreated`.
const VOTING_PERIOD: u64 = 50;

/// In-memory ledger.
#[derive(Clone)]
pub struct MockLedger {
    chain: Arc<Mutex<MockChain>>,
    book: AddressBook,
}

#[derive(Clone)]
struct MockProposal {
    state: ProposalState,
    voters: HashSet<Address>,
}

#[derive(Clone, Default)]
struct MockChain {
    accounts: Vec<Address>,
    reject_signing: bool,
    offline: bool,
    mine_reverts: bool,
    paused: bool,

    head: u64,
    tx_count: u64,
    logs: Vec<Log>,
    emitted: Vec<(Address, Vec<B256>, Bytes)>,
    receipts: HashMap<B256, Receipt>,
    pending: Vec<(B256, CallRequest)>,

    proposals: HashMap<U256, MockProposal>,
    roles: HashSet<(B256, Address)>,
    balances: HashMap<Address, U256>,
    delegates: HashMap<Address, Address>,
    certificates: BTreeMap<U256, [String; 4]>,
    next_certificate: u64,

    failing_states: HashSet<U256>,
    failing_certificates: HashSet<U256>,

    rpc_calls: usize,
    log_queries: usize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Fresh chain with a deterministic address book and no accounts.
    pub fn new() -> Self {
        let book = AddressBook {
            credential: Address::repeat_byte(0xc1),
            governor: Address::repeat_byte(0xc2),
            token: Address::repeat_byte(0xc3),
            timelock: Address::repeat_byte(0xc4),
        };
        let mut chain = MockChain {
            next_certificate: 1,
            ..MockChain::default()
        };
        // The timelock administers itself
        chain.roles.insert((B256::ZERO, book.timelock));

        Self {
            chain: Arc::new(Mutex::new(chain)),
            book,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockChain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address_book(&self) -> AddressBook {
        self.book
    }

    /// Accounts the signing backend exposes.
    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.lock().accounts = accounts;
        self
    }

    /// Grant the timelock admin role to `admin` and expose it as an account.
    pub fn with_admin(self, admin: Address) -> Self {
        {
            let mut chain = self.lock();
            chain.roles.insert((B256::ZERO, admin));
            if !chain.accounts.contains(&admin) {
                chain.accounts.push(admin);
            }
        }
        self
    }

    /// Make the signing backend decline every prompt.
    pub fn reject_signing(&self, reject: bool) {
        self.lock().reject_signing = reject;
    }

    /// Make every request fail at the transport level.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Include transactions with a failed status instead of applying them.
    pub fn set_mine_reverts(&self, reverts: bool) {
        self.lock().mine_reverts = reverts;
    }

    /// Hold submitted transactions without including them.
    pub fn pause_inclusion(&self) {
        self.lock().paused = true;
    }

    /// Include every held transaction, in submission order.
    pub fn resume_inclusion(&self) {
        let book = self.book;
        let mut chain = self.lock();
        chain.paused = false;
        let pending = std::mem::take(&mut chain.pending);
        for (hash, request) in pending {
            chain.include(&book, hash, &request);
        }
    }

    pub fn pending_sends(&self) -> usize {
        self.lock().pending.len()
    }

    /// Total requests served, of any kind.
    pub fn rpc_calls(&self) -> usize {
        self.lock().rpc_calls
    }

    pub fn log_queries(&self) -> usize {
        self.lock().log_queries
    }

    /// Record a certificate directly, as if the timelock had issued it.
    pub fn issue_certificate(&self, name: &str, course: &str, grade: &str, date: &str) -> U256 {
        let mut chain = self.lock();
        let id = chain.store_certificate(&self.book, [name, course, grade, date].map(String::from));
        let hash = chain.next_hash();
        chain.mine(hash, true);
        id
    }

    /// Create a proposal directly and put it in `state`.
    pub fn seed_proposal(
        &self,
        proposer: Address,
        calls: Vec<ProposalCall>,
        description: &str,
        state: ProposalState,
    ) -> ProposalId {
        let mut chain = self.lock();
        let id = chain.create_proposal(self.book.governor, proposer, calls, description.to_string());
        if let Some(proposal) = chain.proposals.get_mut(&id.0) {
            proposal.state = state;
        }
        let hash = chain.next_hash();
        chain.mine(hash, true);
        id
    }

    /// Append an arbitrary log in a new block.
    pub fn emit_raw_log(&self, address: Address, topics: Vec<B256>, data: Vec<u8>) {
        let mut chain = self.lock();
        chain.emitted.push((address, topics, Bytes::from(data)));
        let hash = chain.next_hash();
        chain.mine(hash, true);
    }

    /// Force a proposal's state, standing in for block progression.
    pub fn set_proposal_state(&self, id: ProposalId, state: ProposalState) {
        if let Some(proposal) = self.lock().proposals.get_mut(&id.0) {
            proposal.state = state;
        }
    }

    pub fn proposal_state(&self, id: ProposalId) -> Option<ProposalState> {
        self.lock().proposals.get(&id.0).map(|p| p.state)
    }

    pub fn fail_state_query(&self, id: ProposalId) {
        self.lock().failing_states.insert(id.0);
    }

    pub fn fail_certificate_query(&self, id: U256) {
        self.lock().failing_certificates.insert(id);
    }

    pub fn has_role(&self, role: B256, account: Address) -> bool {
        self.lock().roles.contains(&(role, account))
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.lock().balances.get(&account).copied().unwrap_or_default()
    }

    pub fn delegate_of(&self, account: Address) -> Option<Address> {
        self.lock().delegates.get(&account).copied()
    }

    pub fn certificate_count(&self) -> usize {
        self.lock().certificates.len()
    }
}

fn revert(reason: &str) -> RpcError {
    RpcError::Rpc {
        code: EXECUTION_REVERTED_CODE,
        message: format!("execution reverted: {}", reason),
        data: Some(Bytes::from(abi::encode_revert_reason(reason))),
    }
}

fn rejected() -> RpcError {
    RpcError::Rpc {
        code: USER_REJECTED_CODE,
        message: "User rejected the request.".to_string(),
        data: None,
    }
}

fn is(selector: &[u8], signature: &str) -> bool {
    selector == abi::selector(signature)
}

fn decode_args(types: &[ParamType], args: &[u8]) -> Result<Vec<Token>, String> {
    abi::decode(types, args).map_err(|e| format!("invalid calldata: {}", e))
}

fn address_array() -> ParamType {
    ParamType::Array(Box::new(ParamType::Address))
}

fn uint_array() -> ParamType {
    ParamType::Array(Box::new(ParamType::Uint(256)))
}

fn bytes_array() -> ParamType {
    ParamType::Array(Box::new(ParamType::Bytes))
}

/// Rebuild proposal calls from the three parallel arrays.
fn calls_from(
    targets: Option<Token>,
    values: Option<Token>,
    calldatas: Option<Token>,
) -> Result<Vec<ProposalCall>, String> {
    let targets = targets.and_then(Token::into_array).unwrap_or_default();
    let values = values.and_then(Token::into_array).unwrap_or_default();
    let calldatas = calldatas.and_then(Token::into_array).unwrap_or_default();

    if targets.len() != values.len() || targets.len() != calldatas.len() {
        return Err("Governor: invalid proposal length".to_string());
    }
    targets
        .into_iter()
        .zip(values)
        .zip(calldatas)
        .map(|((target, value), calldata)| {
            Some(ProposalCall {
                target: target.into_address()?,
                value: value.into_uint()?,
                calldata: Bytes::from(calldata.into_bytes()?),
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| "invalid calldata".to_string())
}

fn missing_role(account: Address, role: B256) -> String {
    format!(
        "AccessControl: account 0x{} is missing role 0x{}",
        hex::encode(account.as_slice()),
        hex::encode(role.as_slice())
    )
}

impl MockChain {
    fn check_online(&mut self) -> RpcResult<()> {
        self.rpc_calls += 1;
        if self.offline {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn next_hash(&mut self) -> B256 {
        self.tx_count += 1;
        keccak256(self.tx_count.to_be_bytes())
    }

    /// Seal a block holding one transaction and whatever it emitted.
    fn mine(&mut self, hash: B256, status: bool) {
        self.head += 1;
        let emitted = std::mem::take(&mut self.emitted);
        let logs: Vec<Log> = if status {
            emitted
                .into_iter()
                .enumerate()
                .map(|(index, (address, topics, data))| Log {
                    address,
                    topics,
                    data,
                    block_number: self.head,
                    log_index: index as u64,
                })
                .collect()
        } else {
            Vec::new()
        };
        self.logs.extend(logs.iter().cloned());
        self.receipts.insert(
            hash,
            Receipt {
                transaction_hash: hash,
                block_number: self.head,
                status,
                logs,
            },
        );
    }

    /// Apply a transaction and mine it; failures are included with status 0.
    fn include(&mut self, book: &AddressBook, hash: B256, request: &CallRequest) {
        let from = request.from.unwrap_or_default();
        if self.mine_reverts {
            self.mine(hash, false);
            return;
        }
        let mut next = self.clone();
        match next.execute(book, from, request.to, &request.data) {
            Ok(_) => {
                *self = next;
                self.mine(hash, true);
            }
            Err(_) => {
                self.emitted.clear();
                self.mine(hash, false);
            }
        }
    }

    fn execute(
        &mut self,
        book: &AddressBook,
        from: Address,
        to: Address,
        data: &[u8],
    ) -> Result<Vec<u8>, String> {
        if data.len() < 4 {
            return Err("function selector was not recognized".to_string());
        }
        let (selector, args) = data.split_at(4);

        if to == book.governor {
            self.governor(book, from, selector, args)
        } else if to == book.timelock {
            self.timelock(from, selector, args)
        } else if to == book.token {
            self.token(from, selector, args)
        } else if to == book.credential {
            self.credential(book, from, selector, args)
        } else {
            // No code at the address
            Ok(Vec::new())
        }
    }

    fn create_proposal(
        &mut self,
        emitter: Address,
        proposer: Address,
        calls: Vec<ProposalCall>,
        description: String,
    ) -> ProposalId {
        let id = hash_proposal(&calls, description_hash(&description));
        self.proposals.insert(
            id.0,
            MockProposal {
                state: ProposalState::Pending,
                voters: HashSet::new(),
            },
        );
        let event = ProposalCreated {
            proposal_id: id,
            proposer,
            calls,
            vote_start: U256::from(self.head + 1),
            vote_end: U256::from(self.head + 1 + VOTING_PERIOD),
            description,
        };
        self.emitted.push((
            emitter,
            vec![governor::proposal_created_topic()],
            Bytes::from(event.encode_data()),
        ));
        id
    }

    fn proposal_state(&self, id: U256) -> Result<ProposalState, String> {
        self.proposals
            .get(&id)
            .map(|p| p.state)
            .ok_or_else(|| "Governor: unknown proposal id".to_string())
    }

    fn governor(
        &mut self,
        book: &AddressBook,
        from: Address,
        selector: &[u8],
        args: &[u8],
    ) -> Result<Vec<u8>, String> {
        if is(selector, governor::STATE) {
            let mut tokens = decode_args(&[ParamType::Uint(256)], args)?.into_iter();
            let id = tokens.next().and_then(Token::into_uint).unwrap_or_default();
            let state = self.proposal_state(id)?;
            return Ok(abi::encode(&[Token::Uint(U256::from(state.ordinal()))]));
        }

        if is(selector, governor::PROPOSE) {
            let types = [address_array(), uint_array(), bytes_array(), ParamType::String];
            let mut tokens = decode_args(&types, args)?.into_iter();
            let calls = calls_from(tokens.next(), tokens.next(), tokens.next())?;
            let description = tokens.next().and_then(Token::into_string).unwrap_or_default();

            if calls.is_empty() {
                return Err("Governor: empty proposal".to_string());
            }
            let id = hash_proposal(&calls, description_hash(&description));
            if self.proposals.contains_key(&id.0) {
                return Err("Governor: proposal already exists".to_string());
            }
            let id = self.create_proposal(book.governor, from, calls, description);
            return Ok(abi::encode(&[Token::Uint(id.0)]));
        }

        if is(selector, governor::CAST_VOTE) {
            let mut tokens = decode_args(&[ParamType::Uint(256), ParamType::Uint(8)], args)?.into_iter();
            let id = tokens.next().and_then(Token::into_uint).unwrap_or_default();
            let support = tokens.next().and_then(Token::into_uint).unwrap_or_default();

            if self.proposal_state(id)? != ProposalState::Active {
                return Err("Governor: vote not currently active".to_string());
            }
            if support > U256::from(1u8) {
                return Err("GovernorVotingSimple: invalid value for enum VoteType".to_string());
            }
            let weight = self.balances.get(&from).copied().unwrap_or_default();
            let proposal = self
                .proposals
                .get_mut(&id)
                .ok_or_else(|| "Governor: unknown proposal id".to_string())?;
            if !proposal.voters.insert(from) {
                return Err("GovernorVotingSimple: vote already cast".to_string());
            }
            return Ok(abi::encode(&[Token::Uint(weight)]));
        }

        let queue = is(selector, governor::QUEUE);
        if queue || is(selector, governor::EXECUTE) {
            let types = [
                address_array(),
                uint_array(),
                bytes_array(),
                ParamType::FixedBytes(32),
            ];
            let mut tokens = decode_args(&types, args)?.into_iter();
            let calls = calls_from(tokens.next(), tokens.next(), tokens.next())?;
            let hash = tokens
                .next()
                .and_then(Token::into_fixed_bytes)
                .map(|bytes| B256::from_slice(&bytes))
                .unwrap_or_default();
            let id = hash_proposal(&calls, hash);

            let state = self.proposal_state(id.0)?;
            let next = if queue {
                if state != ProposalState::Succeeded {
                    return Err("Governor: proposal not successful".to_string());
                }
                ProposalState::Queued
            } else {
                if state != ProposalState::Queued {
                    return Err("Governor: proposal not successful".to_string());
                }
                for call in &calls {
                    self.execute(book, book.timelock, call.target, &call.calldata)
                        .map_err(|reason| format!("TimelockController: underlying transaction reverted: {}", reason))?;
                }
                ProposalState::Executed
            };
            if let Some(proposal) = self.proposals.get_mut(&id.0) {
                proposal.state = next;
            }
            return Ok(abi::encode(&[Token::Uint(id.0)]));
        }

        Err("function selector was not recognized".to_string())
    }

    fn timelock(&mut self, from: Address, selector: &[u8], args: &[u8]) -> Result<Vec<u8>, String> {
        let role_word = |role: B256| -> Result<Vec<u8>, String> {
            Ok(abi::encode(&[Token::FixedBytes(role.to_vec())]))
        };

        if is(selector, timelock::PROPOSER_ROLE) {
            return role_word(keccak256("PROPOSER_ROLE"));
        }
        if is(selector, timelock::EXECUTOR_ROLE) {
            return role_word(keccak256("EXECUTOR_ROLE"));
        }
        if is(selector, timelock::DEFAULT_ADMIN_ROLE) {
            return role_word(B256::ZERO);
        }

        let grant = is(selector, timelock::GRANT_ROLE);
        if grant || is(selector, timelock::HAS_ROLE) {
            let mut tokens =
                decode_args(&[ParamType::FixedBytes(32), ParamType::Address], args)?.into_iter();
            let role = tokens
                .next()
                .and_then(Token::into_fixed_bytes)
                .map(|bytes| B256::from_slice(&bytes))
                .unwrap_or_default();
            let account = tokens.next().and_then(Token::into_address).unwrap_or_default();

            if !grant {
                let held = self.roles.contains(&(role, account));
                return Ok(abi::encode(&[Token::Bool(held)]));
            }
            if !self.roles.contains(&(B256::ZERO, from)) {
                return Err(missing_role(from, B256::ZERO));
            }
            self.roles.insert((role, account));
            return Ok(Vec::new());
        }

        Err("function selector was not recognized".to_string())
    }

    fn token(&mut self, from: Address, selector: &[u8], args: &[u8]) -> Result<Vec<u8>, String> {
        if is(selector, token::BALANCE_OF) {
            let mut tokens = decode_args(&[ParamType::Address], args)?.into_iter();
            let account = tokens.next().and_then(Token::into_address).unwrap_or_default();
            let balance = self.balances.get(&account).copied().unwrap_or_default();
            return Ok(abi::encode(&[Token::Uint(balance)]));
        }
        if is(selector, token::MINT) {
            let mut tokens =
                decode_args(&[ParamType::Address, ParamType::Uint(256)], args)?.into_iter();
            let to = tokens.next().and_then(Token::into_address).unwrap_or_default();
            let amount = tokens.next().and_then(Token::into_uint).unwrap_or_default();
            let balance = self.balances.entry(to).or_default();
            *balance = balance.saturating_add(amount);
            return Ok(Vec::new());
        }
        if is(selector, token::DELEGATE) {
            let mut tokens = decode_args(&[ParamType::Address], args)?.into_iter();
            let delegatee = tokens.next().and_then(Token::into_address).unwrap_or_default();
            self.delegates.insert(from, delegatee);
            return Ok(Vec::new());
        }
        Err("function selector was not recognized".to_string())
    }

    fn store_certificate(&mut self, book: &AddressBook, fields: [String; 4]) -> U256 {
        let id = U256::from(self.next_certificate);
        self.next_certificate += 1;
        self.certificates.insert(id, fields);
        self.emitted.push((
            book.credential,
            vec![
                credential::certificate_issued_topic(),
                B256::from(id.to_be_bytes::<32>()),
            ],
            Bytes::new(),
        ));
        id
    }

    fn credential(
        &mut self,
        book: &AddressBook,
        from: Address,
        selector: &[u8],
        args: &[u8],
    ) -> Result<Vec<u8>, String> {
        if is(selector, credential::ISSUE) {
            if from != book.timelock {
                return Err("Ownable: caller is not the owner".to_string());
            }
            let fields = decode_args(&vec![ParamType::String; 4], args)?
                .into_iter()
                .map(|token| token.into_string().unwrap_or_default())
                .collect::<Vec<_>>();
            let fields: [String; 4] = fields
                .try_into()
                .map_err(|_| "invalid calldata".to_string())?;
            let id = self.store_certificate(book, fields);
            return Ok(abi::encode(&[Token::Uint(id)]));
        }
        if is(selector, credential::CERTIFICATES) {
            let mut tokens = decode_args(&[ParamType::Uint(256)], args)?.into_iter();
            let id = tokens.next().and_then(Token::into_uint).unwrap_or_default();
            let record = self.certificates.get(&id).cloned().unwrap_or_default();
            let tokens: Vec<Token> = record.into_iter().map(Token::String).collect();
            return Ok(abi::encode(&tokens));
        }
        Err("function selector was not recognized".to_string())
    }

    /// Transport failures injected for specific reads.
    fn injected_read_failure(&self, book: &AddressBook, request: &CallRequest) -> Option<RpcError> {
        if request.data.len() < 36 {
            return None;
        }
        let (selector, args) = request.data.split_at(4);
        let id = U256::from_be_slice(&args[..32]);
        let failing = (request.to == book.governor
            && is(selector, governor::STATE)
            && self.failing_states.contains(&id))
            || (request.to == book.credential
                && is(selector, credential::CERTIFICATES)
                && self.failing_certificates.contains(&id));
        failing.then(|| RpcError::Transport("connection reset by peer".to_string()))
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn accounts(&self) -> RpcResult<Vec<Address>> {
        let mut chain = self.lock();
        chain.check_online()?;
        Ok(chain.accounts.clone())
    }

    async fn request_accounts(&self) -> RpcResult<Vec<Address>> {
        let mut chain = self.lock();
        chain.check_online()?;
        if chain.reject_signing {
            return Err(rejected());
        }
        Ok(chain.accounts.clone())
    }

    async fn call(&self, request: &CallRequest) -> RpcResult<Bytes> {
        let mut chain = self.lock();
        chain.check_online()?;
        if let Some(err) = chain.injected_read_failure(&self.book, request) {
            return Err(err);
        }
        let mut scratch = chain.clone();
        scratch
            .execute(
                &self.book,
                request.from.unwrap_or_default(),
                request.to,
                &request.data,
            )
            .map(Bytes::from)
            .map_err(|reason| revert(&reason))
    }

    async fn send_transaction(&self, request: &CallRequest) -> RpcResult<B256> {
        let mut chain = self.lock();
        chain.check_online()?;
        if chain.reject_signing {
            return Err(rejected());
        }
        let from = request.from.ok_or_else(|| RpcError::Rpc {
            code: -32000,
            message: "from address required".to_string(),
            data: None,
        })?;
        if !chain.accounts.contains(&from) {
            return Err(RpcError::Rpc {
                code: -32000,
                message: format!("unknown account {}", from),
                data: None,
            });
        }

        // Gas estimation surfaces reverts before anything is broadcast
        if !chain.mine_reverts {
            let mut scratch = chain.clone();
            scratch
                .execute(&self.book, from, request.to, &request.data)
                .map_err(|reason| revert(&reason))?;
        }

        let hash = chain.next_hash();
        if chain.paused {
            chain.pending.push((hash, request.clone()));
        } else {
            chain.include(&self.book, hash, request);
        }
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &B256) -> RpcResult<Option<Receipt>> {
        let mut chain = self.lock();
        chain.check_online()?;
        Ok(chain.receipts.get(hash).cloned())
    }

    async fn block_number(&self) -> RpcResult<u64> {
        let mut chain = self.lock();
        chain.check_online()?;
        Ok(chain.head)
    }

    async fn get_logs(&self, filter: &LogFilter) -> RpcResult<Vec<Log>> {
        let mut chain = self.lock();
        chain.check_online()?;
        chain.log_queries += 1;
        let to_block = filter.to_block.unwrap_or(u64::MAX);
        Ok(chain
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.topics.first() == Some(&filter.topic0)
                    && log.block_number >= filter.from_block
                    && log.block_number <= to_block
            })
            .cloned()
            .collect())
    }
}
