//! Typed action descriptions.
//!
//! An [`ActionSpec`] is one step of a recipe. Its [`ActionKind`] fixes the
//! parameter schema, the output type and the registry id of the on-chain
//! action contract, so a malformed step is caught when the recipe is built.

use std::fmt;

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, U256};

/// Parameter (and output) types understood by the action contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Uint,
    Bytes,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Uint => write!(f, "uint256"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

/// Closed set of supported actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Open an empty vault: `(join, manager) -> vault_id`.
    OpenVault,
    /// Deposit collateral: `(vault_id, amount, join, from, manager) -> amount`.
    Supply,
    /// Draw debt: `(vault_id, amount, to, manager) -> amount`.
    Generate,
    /// Flash-borrow: `(amount, token, lender) -> amount + fee`.
    FlashLoan,
    /// Exchange: `(src, dest, amount, wrapper, from, to) -> bought`.
    Swap,
    /// Pull tokens into the proxy: `(token, from, amount) -> amount`.
    PullToken,
    /// Send tokens out of the proxy: `(token, to, amount) -> amount`.
    SendToken,
    /// Add two amounts: `(a, b) -> a + b`.
    SumInputs,
}

use ParamType::{Address as A, Bytes as B, Uint as U};

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::OpenVault,
        Self::Supply,
        Self::Generate,
        Self::FlashLoan,
        Self::Swap,
        Self::PullToken,
        Self::SendToken,
        Self::SumInputs,
    ];

    /// Name of the action contract in the registry.
    #[must_use]
    pub const fn contract_name(self) -> &'static str {
        match self {
            Self::OpenVault => "McdOpen",
            Self::Supply => "McdSupply",
            Self::Generate => "McdGenerate",
            Self::FlashLoan => "FLDyDx",
            Self::Swap => "DFSSell",
            Self::PullToken => "PullToken",
            Self::SendToken => "SendToken",
            Self::SumInputs => "SumInputs",
        }
    }

    /// Registry id: first four bytes of `keccak256(contract_name)`.
    #[must_use]
    pub fn id(self) -> FixedBytes<4> {
        let hash = keccak256(self.contract_name().as_bytes());
        FixedBytes::from_slice(&hash[..4])
    }

    /// Look a kind up by registry id.
    #[must_use]
    pub fn from_id(id: FixedBytes<4>) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Parameter schema.
    #[must_use]
    pub const fn params(self) -> &'static [ParamType] {
        match self {
            Self::OpenVault => &[A, A],
            Self::Supply => &[U, U, A, A, A],
            Self::Generate => &[U, U, A, A],
            Self::FlashLoan => &[U, A, A],
            Self::Swap => &[A, A, U, A, A, A],
            Self::PullToken | Self::SendToken => &[A, A, U],
            Self::SumInputs => &[U, U],
        }
    }

    /// Type of the value the action returns, if any.
    #[must_use]
    pub const fn output(self) -> Option<ParamType> {
        // All current actions return a uint; kept optional for void actions.
        match self {
            Self::OpenVault
            | Self::Supply
            | Self::Generate
            | Self::FlashLoan
            | Self::Swap
            | Self::PullToken
            | Self::SendToken
            | Self::SumInputs => Some(U),
        }
    }

    /// Static gas estimate for one execution of the action.
    #[must_use]
    pub const fn gas_estimate(self) -> u64 {
        match self {
            Self::OpenVault => 160_000,
            Self::Supply => 130_000,
            Self::Generate => 150_000,
            Self::FlashLoan => 220_000,
            Self::Swap => 200_000,
            Self::PullToken => 60_000,
            Self::SendToken => 55_000,
            Self::SumInputs => 15_000,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Address(Address),
    Amount(U256),
    Bytes(Bytes),
}

impl Literal {
    /// Schema type of this literal.
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Address(_) => ParamType::Address,
            Self::Amount(_) => ParamType::Uint,
            Self::Bytes(_) => ParamType::Bytes,
        }
    }

    /// The amount, if this is a uint literal.
    #[must_use]
    pub const fn as_amount(&self) -> Option<U256> {
        match self {
            Self::Amount(value) => Some(*value),
            _ => None,
        }
    }

    /// The address, if this is an address literal.
    #[must_use]
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Address> for Literal {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<U256> for Literal {
    fn from(value: U256) -> Self {
        Self::Amount(value)
    }
}

impl From<Bytes> for Literal {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

/// A parameter: either a literal or the output of an earlier action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(Literal),
    /// Output of the action at this zero-based position.
    Reference(usize),
}

impl Value {
    /// Address literal.
    #[must_use]
    pub fn address(value: Address) -> Self {
        Self::Literal(Literal::Address(value))
    }

    /// Uint literal.
    #[must_use]
    pub fn amount(value: U256) -> Self {
        Self::Literal(Literal::Amount(value))
    }

    /// Bytes literal.
    #[must_use]
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Literal(Literal::Bytes(value.into()))
    }

    /// Reference to the output of action `index`.
    #[must_use]
    pub const fn reference(index: usize) -> Self {
        Self::Reference(index)
    }
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Self::address(value)
    }
}

impl From<U256> for Value {
    fn from(value: U256) -> Self {
        Self::amount(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::bytes(value)
    }
}

/// Label naming an action's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputSlot(String);

impl OutputSlot {
    /// Create a slot label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Slot label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One step of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    kind: ActionKind,
    params: Vec<Value>,
    output: Option<OutputSlot>,
}

impl ActionSpec {
    /// Create an action without a declared output.
    pub fn new(kind: ActionKind, params: impl IntoIterator<Item = Value>) -> Self {
        Self {
            kind,
            params: params.into_iter().collect(),
            output: None,
        }
    }

    /// Declare the output slot of this action so later actions may reference it.
    #[must_use]
    pub fn with_output(mut self, slot: impl Into<String>) -> Self {
        self.output = Some(OutputSlot::new(slot));
        self
    }

    /// Action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Parameters in call order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Declared output slot.
    #[must_use]
    pub const fn output(&self) -> Option<&OutputSlot> {
        self.output.as_ref()
    }

    /// Indices of the actions this one references.
    pub fn references(&self) -> impl Iterator<Item = usize> + '_ {
        self.params.iter().filter_map(|value| match value {
            Value::Reference(index) => Some(*index),
            Value::Literal(_) => None,
        })
    }

    pub fn open_vault(join: Address, manager: Address) -> Self {
        Self::new(ActionKind::OpenVault, [join.into(), manager.into()])
    }

    pub fn supply(
        vault_id: Value,
        amount: Value,
        join: Address,
        from: Address,
        manager: Address,
    ) -> Self {
        Self::new(
            ActionKind::Supply,
            [vault_id, amount, join.into(), from.into(), manager.into()],
        )
    }

    pub fn generate(vault_id: Value, amount: Value, to: Address, manager: Address) -> Self {
        Self::new(
            ActionKind::Generate,
            [vault_id, amount, to.into(), manager.into()],
        )
    }

    pub fn flash_loan(amount: Value, token: Address, lender: Address) -> Self {
        Self::new(ActionKind::FlashLoan, [amount, token.into(), lender.into()])
    }

    pub fn swap(
        src: Address,
        dest: Address,
        amount: Value,
        wrapper: Address,
        from: Address,
        to: Address,
    ) -> Self {
        Self::new(
            ActionKind::Swap,
            [
                src.into(),
                dest.into(),
                amount,
                wrapper.into(),
                from.into(),
                to.into(),
            ],
        )
    }

    pub fn pull_token(token: Address, from: Address, amount: Value) -> Self {
        Self::new(ActionKind::PullToken, [token.into(), from.into(), amount])
    }

    pub fn send_token(token: Address, to: Address, amount: Value) -> Self {
        Self::new(ActionKind::SendToken, [token.into(), to.into(), amount])
    }

    pub fn sum_inputs(a: Value, b: Value) -> Self {
        Self::new(ActionKind::SumInputs, [a, b])
    }
}
