//! In-memory chain implementing every port.
//!
//! Submitted payloads are decoded and replayed action by action against a
//! copy of the world. The copy is committed only when every action and the
//! flash loan settlement succeed, so a failing unit leaves no trace.

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy_primitives::{keccak256, Address, Bytes, I256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::domain::{DAI, JOIN_ETH, TASK_EXECUTOR, WETH};
use crate::domain::amount::WAD;
use crate::domain::{
    codec, ActionKind, AssetAmount, Literal, PositionId, PositionSnapshot, Ratio, RecipeBuilder,
    RecipeUnit, ReferenceResolver, RoundData, BASE_GAS,
};
use crate::error::{TransportError, TransportErrorKind};
use crate::port::{
    AccountHandle, AccountProvisioning, Balances, ExecutionGateway, FeedRegistry, PositionReader,
    PriceOracle, RawOutcome, Registry, ReserveExchange, SubmitRequest, TreasuryLedger,
};
use crate::service::RECIPE_EXECUTOR_NAME;

const DECIMALS: u8 = 18;

/// State of one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultState {
    pub owner: Address,
    pub collateral_asset: Address,
    pub collateral: U256,
    pub debt: U256,
}

#[derive(Debug, Clone, Default)]
struct World {
    tokens: HashMap<(Address, Address), U256>,
    native: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    vaults: BTreeMap<u64, VaultState>,
    next_vault: u64,
}

impl World {
    fn balance(&self, asset: Address, holder: Address) -> U256 {
        self.tokens.get(&(asset, holder)).copied().unwrap_or_default()
    }

    fn credit(&mut self, asset: Address, holder: Address, amount: U256) {
        let balance = self.tokens.entry((asset, holder)).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), String> {
        let balance = self.tokens.entry((asset, holder)).or_default();
        if *balance < amount {
            return Err(format!("{asset}: transfer amount exceeds balance of {holder}"));
        }
        *balance -= amount;
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), String> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount);
        Ok(())
    }

    fn native(&self, holder: Address) -> U256 {
        self.native.get(&holder).copied().unwrap_or_default()
    }

    fn credit_native(&mut self, holder: Address, amount: U256) {
        let balance = self.native.entry(holder).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<(), String> {
        let balance = self.native.entry(from).or_default();
        if *balance < amount {
            return Err(format!("native transfer exceeds balance of {from}"));
        }
        *balance -= amount;
        self.credit_native(to, amount);
        Ok(())
    }
}

/// Markets, registry and feeds. Not rolled back by replay.
#[derive(Debug, Clone)]
struct Setup {
    debt_asset: Address,
    joins: HashMap<Address, Address>,
    prices: HashMap<Address, U256>,
    min_ratio: Ratio,
    flash_fee_bps: u64,
    gas_overhead: u64,
    registry: HashMap<String, Address>,
    accounts: HashMap<Address, Address>,
    feeds: HashMap<(Address, Address), Address>,
    rounds: HashMap<Address, RoundData>,
    failing_feeds: HashSet<Address>,
    reserve_per_native: U256,
    fail_conversions: bool,
    fail_native_sends: bool,
    fail_next_submit: bool,
    signer: Option<Address>,
    submissions: usize,
}

struct Inner {
    world: World,
    setup: Setup,
}

/// Flash loan taken inside the current replay.
struct Loan {
    token: Address,
    lender: Address,
    owed: U256,
    lender_before: U256,
}

/// In-memory implementation of all chain ports.
pub struct Sandbox {
    inner: Mutex<Inner>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// ETH-A market over DAI at 2000 DAI/ETH, 150% minimum ratio, no flash fee.
    #[must_use]
    pub fn new() -> Self {
        let setup = Setup {
            debt_asset: DAI,
            joins: HashMap::from([(JOIN_ETH, WETH)]),
            prices: HashMap::from([(WETH, U256::from(2_000u64) * WAD)]),
            min_ratio: Ratio::Finite(U256::from(150u64) * WAD),
            flash_fee_bps: 0,
            gas_overhead: 0,
            registry: HashMap::from([(RECIPE_EXECUTOR_NAME.to_string(), TASK_EXECUTOR)]),
            accounts: HashMap::new(),
            feeds: HashMap::new(),
            rounds: HashMap::new(),
            failing_feeds: HashSet::new(),
            reserve_per_native: U256::from(2_000u64) * WAD,
            fail_conversions: false,
            fail_native_sends: false,
            fail_next_submit: false,
            signer: None,
            submissions: 0,
        };
        Self {
            inner: Mutex::new(Inner {
                world: World::default(),
                setup,
            }),
        }
    }

    pub fn fund(&self, asset: Address, holder: Address, amount: U256) {
        self.inner.lock().world.credit(asset, holder, amount);
    }

    pub fn fund_native(&self, holder: Address, amount: U256) {
        self.inner.lock().world.credit_native(holder, amount);
    }

    #[must_use]
    pub fn balance(&self, asset: Address, holder: Address) -> U256 {
        self.inner.lock().world.balance(asset, holder)
    }

    #[must_use]
    pub fn native(&self, holder: Address) -> U256 {
        self.inner.lock().world.native(holder)
    }

    #[must_use]
    pub fn vault(&self, id: PositionId) -> Option<VaultState> {
        self.inner.lock().world.vaults.get(&id.value()).copied()
    }

    /// Units that reached the gateway, including reverted ones.
    #[must_use]
    pub fn submissions(&self) -> usize {
        self.inner.lock().setup.submissions
    }

    /// Wad price of one unit of `collateral` in the debt asset.
    pub fn set_price(&self, collateral: Address, price: U256) {
        self.inner.lock().setup.prices.insert(collateral, price);
    }

    pub fn set_min_ratio(&self, ratio: Ratio) {
        self.inner.lock().setup.min_ratio = ratio;
    }

    pub fn set_flash_fee_bps(&self, bps: u64) {
        self.inner.lock().setup.flash_fee_bps = bps;
    }

    /// Gas consumed on top of the static estimate.
    pub fn set_gas_overhead(&self, gas: u64) {
        self.inner.lock().setup.gas_overhead = gas;
    }

    pub fn register(&self, name: &str, address: Address) {
        self.inner
            .lock()
            .setup
            .registry
            .insert(name.to_string(), address);
    }

    /// Account `approve` calls act for.
    pub fn set_signer(&self, signer: Address) {
        self.inner.lock().setup.signer = Some(signer);
    }

    pub fn fail_next_submit(&self) {
        self.inner.lock().setup.fail_next_submit = true;
    }

    /// Reserve units paid per native unit, wad-scaled.
    pub fn set_reserve_rate(&self, reserve_per_native: U256) {
        self.inner.lock().setup.reserve_per_native = reserve_per_native;
    }

    pub fn fail_conversions(&self, fail: bool) {
        self.inner.lock().setup.fail_conversions = fail;
    }

    /// Make every treasury operation that delivers native currency fail.
    pub fn fail_native_sends(&self, fail: bool) {
        self.inner.lock().setup.fail_native_sends = fail;
    }

    pub fn set_feed(&self, base: Address, quote: Address, feed: Address) {
        self.inner.lock().setup.feeds.insert((base, quote), feed);
    }

    pub fn set_round(&self, feed: Address, answer: i64, updated_at: u64) {
        let answer = I256::try_from(answer).unwrap_or_default();
        self.inner
            .lock()
            .setup
            .rounds
            .insert(feed, RoundData { answer, updated_at });
    }

    pub fn fail_feed(&self, feed: Address) {
        self.inner.lock().setup.failing_feeds.insert(feed);
    }

    fn proxy_for(owner: Address) -> Address {
        Address::from_slice(&keccak256(owner.as_slice())[12..])
    }
}

fn arg_address(args: &[Literal], index: usize) -> Result<Address, String> {
    args.get(index)
        .and_then(Literal::as_address)
        .ok_or_else(|| format!("param {index} is not an address"))
}

fn arg_amount(args: &[Literal], index: usize) -> Result<U256, String> {
    args.get(index)
        .and_then(Literal::as_amount)
        .ok_or_else(|| format!("param {index} is not an amount"))
}

fn vault_id(args: &[Literal]) -> Result<u64, String> {
    u64::try_from(arg_amount(args, 0)?).map_err(|_| "vault id out of range".to_string())
}

/// `U256::MAX` means "everything `holder` has".
fn resolve_max(world: &World, asset: Address, holder: Address, amount: U256) -> U256 {
    if amount == U256::MAX {
        world.balance(asset, holder)
    } else {
        amount
    }
}

fn quote(setup: &Setup, src: Address, dest: Address, amount: U256) -> Result<U256, String> {
    if src == setup.debt_asset {
        if let Some(price) = setup.prices.get(&dest) {
            return Ok(amount.saturating_mul(WAD) / *price);
        }
    }
    if dest == setup.debt_asset {
        if let Some(price) = setup.prices.get(&src) {
            return Ok(amount.saturating_mul(*price) / WAD);
        }
    }
    Err(format!("no market for {src} -> {dest}"))
}

fn owned_vault(world: &World, id: u64, proxy: Address) -> Result<VaultState, String> {
    let vault = world
        .vaults
        .get(&id)
        .copied()
        .ok_or_else(|| format!("vault {id} does not exist"))?;
    if vault.owner != proxy {
        return Err(format!("vault {id} is not owned by the proxy"));
    }
    Ok(vault)
}

fn run_action(
    setup: &Setup,
    world: &mut World,
    kind: ActionKind,
    args: &[Literal],
    proxy: Address,
    loan: &mut Option<Loan>,
) -> Result<U256, String> {
    match kind {
        ActionKind::OpenVault => {
            let join = arg_address(args, 0)?;
            let collateral_asset = *setup
                .joins
                .get(&join)
                .ok_or_else(|| format!("unknown join {join}"))?;
            world.next_vault += 1;
            world.vaults.insert(
                world.next_vault,
                VaultState {
                    owner: proxy,
                    collateral_asset,
                    collateral: U256::ZERO,
                    debt: U256::ZERO,
                },
            );
            Ok(U256::from(world.next_vault))
        }
        ActionKind::Supply => {
            let id = vault_id(args)?;
            let join = arg_address(args, 2)?;
            let from = arg_address(args, 3)?;
            let vault = owned_vault(world, id, proxy)?;
            if setup.joins.get(&join) != Some(&vault.collateral_asset) {
                return Err(format!("join {join} does not match vault {id}"));
            }
            let amount = resolve_max(world, vault.collateral_asset, from, arg_amount(args, 1)?);
            world.debit(vault.collateral_asset, from, amount)?;
            if let Some(vault) = world.vaults.get_mut(&id) {
                vault.collateral = vault.collateral.saturating_add(amount);
            }
            Ok(amount)
        }
        ActionKind::Generate => {
            let id = vault_id(args)?;
            let amount = arg_amount(args, 1)?;
            let to = arg_address(args, 2)?;
            let vault = owned_vault(world, id, proxy)?;
            let price = setup
                .prices
                .get(&vault.collateral_asset)
                .copied()
                .unwrap_or_default();
            let debt = vault.debt.saturating_add(amount);
            let value = vault.collateral.saturating_mul(price) / WAD;
            if Ratio::compute(value, debt) < setup.min_ratio {
                return Err("Vault/not-safe".to_string());
            }
            if let Some(vault) = world.vaults.get_mut(&id) {
                vault.debt = debt;
            }
            world.credit(setup.debt_asset, to, amount);
            Ok(amount)
        }
        ActionKind::FlashLoan => {
            let amount = arg_amount(args, 0)?;
            let token = arg_address(args, 1)?;
            let lender = arg_address(args, 2)?;
            if loan.is_some() {
                return Err("nested flash loan".to_string());
            }
            let fee = amount.saturating_mul(U256::from(setup.flash_fee_bps)) / U256::from(10_000u64);
            let owed = amount.saturating_add(fee);
            *loan = Some(Loan {
                token,
                lender,
                owed,
                lender_before: world.balance(token, lender),
            });
            world.credit(token, proxy, amount);
            Ok(owed)
        }
        ActionKind::Swap => {
            let src = arg_address(args, 0)?;
            let dest = arg_address(args, 1)?;
            let from = arg_address(args, 4)?;
            let to = arg_address(args, 5)?;
            let amount = resolve_max(world, src, from, arg_amount(args, 2)?);
            let bought = quote(setup, src, dest, amount)?;
            world.debit(src, from, amount)?;
            world.credit(dest, to, bought);
            Ok(bought)
        }
        ActionKind::PullToken => {
            let token = arg_address(args, 0)?;
            let from = arg_address(args, 1)?;
            let amount = resolve_max(world, token, from, arg_amount(args, 2)?);
            world.transfer(token, from, proxy, amount)?;
            Ok(amount)
        }
        ActionKind::SendToken => {
            let token = arg_address(args, 0)?;
            let to = arg_address(args, 1)?;
            let amount = resolve_max(world, token, proxy, arg_amount(args, 2)?);
            world.transfer(token, proxy, to, amount)?;
            Ok(amount)
        }
        ActionKind::SumInputs => arg_amount(args, 0)?
            .checked_add(arg_amount(args, 1)?)
            .ok_or_else(|| "sum overflows".to_string()),
    }
}

/// Replay `unit` on `world`. On error returns the reason and the gas burnt.
fn replay(
    setup: &Setup,
    world: &mut World,
    unit: &RecipeUnit,
    proxy: Address,
) -> Result<(), (String, u64)> {
    let resolver = ReferenceResolver::new(unit);
    let mut outputs: Vec<Option<Literal>> = Vec::with_capacity(unit.len());
    let mut loan = None;
    let mut gas = BASE_GAS;

    for (position, action) in unit.actions().iter().enumerate() {
        let burnt = gas + action.kind().gas_estimate() / 2;
        let args = resolver
            .resolve(position, &outputs)
            .map_err(|e| (e.to_string(), burnt))?;
        let output = run_action(setup, world, action.kind(), &args, proxy, &mut loan)
            .map_err(|reason| (reason, burnt))?;
        outputs.push(Some(Literal::Amount(output)));
        gas += action.kind().gas_estimate();
    }

    if let Some(loan) = loan {
        let repaid = world
            .balance(loan.token, loan.lender)
            .saturating_sub(loan.lender_before);
        if repaid < loan.owed {
            return Err(("flash loan not repaid".to_string(), gas));
        }
        world
            .debit(loan.token, loan.lender, loan.owed)
            .map_err(|reason| (reason, gas))?;
    }
    Ok(())
}

fn reverted(reason: impl Into<String>, gas_used: u64) -> RawOutcome {
    RawOutcome {
        succeeded: false,
        gas_used,
        revert_reason: Some(reason.into()),
        emitted_data: Bytes::new(),
        tx_hash: None,
    }
}

#[async_trait]
impl ExecutionGateway for Sandbox {
    async fn submit(&self, request: SubmitRequest) -> Result<RawOutcome, TransportError> {
        let mut inner = self.inner.lock();
        if std::mem::take(&mut inner.setup.fail_next_submit) {
            return Err(TransportError::network("connection reset"));
        }
        inner.setup.submissions += 1;

        let proxy = request.account.proxy;
        if inner.setup.accounts.get(&request.account.owner) != Some(&proxy) {
            return Ok(reverted("DSProxy: not authorized", BASE_GAS));
        }
        if inner.setup.registry.get(RECIPE_EXECUTOR_NAME) != Some(&request.target) {
            return Ok(reverted("target is not the recipe executor", BASE_GAS));
        }
        let unit = match codec::decode(&request.payload, &RecipeBuilder::new(u64::MAX)) {
            Ok(unit) => unit,
            Err(e) => return Ok(reverted(e.to_string(), BASE_GAS)),
        };

        let consumed = unit.gas_estimate().saturating_add(inner.setup.gas_overhead);
        if consumed > request.gas_limit {
            return Ok(RawOutcome {
                succeeded: false,
                gas_used: request.gas_limit,
                revert_reason: None,
                emitted_data: Bytes::new(),
                tx_hash: None,
            });
        }

        let mut world = inner.world.clone();
        match replay(&inner.setup, &mut world, &unit, proxy) {
            Ok(()) => {
                inner.world = world;
                let tx_hash = keccak256(&request.payload);
                Ok(RawOutcome {
                    succeeded: true,
                    gas_used: consumed,
                    revert_reason: None,
                    emitted_data: Bytes::new(),
                    tx_hash: Some(tx_hash),
                })
            }
            Err((reason, burnt)) => Ok(reverted(reason, burnt.min(consumed))),
        }
    }

    fn gateway_name(&self) -> &'static str {
        "sandbox"
    }
}

#[async_trait]
impl Registry for Sandbox {
    async fn resolve_address(&self, name: &str) -> Result<Address, TransportError> {
        self.inner
            .lock()
            .setup
            .registry
            .get(name)
            .copied()
            .ok_or_else(|| TransportError::rpc(format!("{name} is not registered")))
    }
}

#[async_trait]
impl AccountProvisioning for Sandbox {
    async fn get_or_create_execution_account(
        &self,
        owner: Address,
    ) -> Result<AccountHandle, TransportError> {
        let mut inner = self.inner.lock();
        let proxy = *inner
            .setup
            .accounts
            .entry(owner)
            .or_insert_with(|| Self::proxy_for(owner));
        Ok(AccountHandle { owner, proxy })
    }
}

#[async_trait]
impl Balances for Sandbox {
    async fn balance_of(&self, asset: Address, holder: Address) -> Result<U256, TransportError> {
        Ok(self.balance(asset, holder))
    }

    async fn allowance(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TransportError> {
        Ok(self
            .inner
            .lock()
            .world
            .allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn approve(
        &self,
        asset: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        let owner = inner.setup.signer.ok_or_else(|| {
            TransportError::new(TransportErrorKind::Signature, "no signer")
        })?;
        inner
            .world
            .allowances
            .insert((asset, owner, spender), amount);
        Ok(())
    }
}

#[async_trait]
impl PositionReader for Sandbox {
    async fn read_position(&self, id: PositionId) -> Result<PositionSnapshot, TransportError> {
        let inner = self.inner.lock();
        let vault = inner
            .world
            .vaults
            .get(&id.value())
            .ok_or_else(|| TransportError::rpc(format!("{id} does not exist")))?;
        let price = inner
            .setup
            .prices
            .get(&vault.collateral_asset)
            .copied()
            .unwrap_or_default();

        Ok(PositionSnapshot {
            collateral: AssetAmount::new(vault.collateral_asset, vault.collateral, DECIMALS),
            debt: AssetAmount::new(inner.setup.debt_asset, vault.debt, DECIMALS),
            collateral_price: price,
        })
    }

    async fn positions_of(&self, owner: Address) -> Result<Vec<PositionId>, TransportError> {
        Ok(self
            .inner
            .lock()
            .world
            .vaults
            .iter()
            .filter(|(_, vault)| vault.owner == owner)
            .map(|(id, _)| PositionId::new(*id))
            .collect())
    }
}

#[async_trait]
impl TreasuryLedger for Sandbox {
    async fn native_balance(&self, holder: Address) -> Result<U256, TransportError> {
        Ok(self.native(holder))
    }

    async fn token_balance(
        &self,
        asset: Address,
        holder: Address,
    ) -> Result<U256, TransportError> {
        Ok(self.balance(asset, holder))
    }

    async fn refill_from_wrapped(
        &self,
        wrapped: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.setup.fail_native_sends {
            return Err(TransportError::network("native send rejected"));
        }
        inner
            .world
            .debit(wrapped, from, amount)
            .map_err(TransportError::rpc)?;
        inner.world.credit_native(to, amount);
        Ok(())
    }

    async fn transfer_token(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError> {
        self.inner
            .lock()
            .world
            .transfer(asset, from, to, amount)
            .map_err(TransportError::rpc)
    }

    async fn transfer_native(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.setup.fail_native_sends {
            return Err(TransportError::network("native send rejected"));
        }
        inner
            .world
            .transfer_native(from, to, amount)
            .map_err(TransportError::rpc)
    }

    async fn approve_from(
        &self,
        asset: Address,
        holder: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TransportError> {
        self.inner
            .lock()
            .world
            .allowances
            .insert((asset, holder, spender), amount);
        Ok(())
    }
}

#[async_trait]
impl ReserveExchange for Sandbox {
    async fn convert_and_send(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        native_out: U256,
    ) -> Result<U256, TransportError> {
        let mut inner = self.inner.lock();
        if inner.setup.fail_conversions {
            return Err(TransportError::rpc("exchange: insufficient liquidity"));
        }
        if inner.setup.fail_native_sends {
            return Err(TransportError::network("native send rejected"));
        }
        let spent = native_out.saturating_mul(inner.setup.reserve_per_native) / WAD;
        inner
            .world
            .debit(asset, from, spent)
            .map_err(TransportError::rpc)?;
        inner.world.credit_native(to, native_out);
        Ok(spent)
    }
}

#[async_trait]
impl FeedRegistry for Sandbox {
    async fn get_feed(&self, base: Address, quote: Address) -> Result<Address, TransportError> {
        self.inner
            .lock()
            .setup
            .feeds
            .get(&(base, quote))
            .copied()
            .ok_or_else(|| TransportError::rpc("Feed not found"))
    }
}

#[async_trait]
impl PriceOracle for Sandbox {
    async fn latest_round(&self, feed: Address) -> Result<RoundData, TransportError> {
        let inner = self.inner.lock();
        if inner.setup.failing_feeds.contains(&feed) {
            return Err(TransportError::network(format!("{feed} unreachable")));
        }
        inner
            .setup
            .rounds
            .get(&feed)
            .copied()
            .ok_or_else(|| TransportError::rpc(format!("{feed} has no rounds")))
    }
}
