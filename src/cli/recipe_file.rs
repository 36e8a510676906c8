//! TOML recipe descriptions for the `encode` command.
//!
//! Either a plain action list:
//!
//! ```toml
//! name = "OpenAndSupply"
//!
//! [[actions]]
//! kind = "open_vault"
//! params = ["0x2F0b...", "0x5ef3..."]
//! output = "vault"
//!
//! [[actions]]
//! kind = "supply"
//! params = ["$1", "1000000000000000000", "0x2F0b...", "0xaaaa...", "0x5ef3..."]
//! ```
//!
//! or a `[leverage]` table expanded by the flash-loan orchestrator.
//! `$k` refers to the output of the k-th action, counting from one.

use std::path::Path;
use std::str::FromStr;

use alloy_primitives::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{ActionKind, ActionSpec, BuildError, ParamType, RecipeBuilder, RecipeUnit, Value};
use crate::error::{ConfigError, Result};
use crate::service::{FlashLoanOrchestrator, LeverageConfig, LeveragePlan, UserCollateral};

#[derive(Debug, Deserialize)]
pub struct RecipeFile {
    pub name: String,
    #[serde(default)]
    pub gas_ceiling: Option<u64>,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
    #[serde(default)]
    pub leverage: Option<LeverageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ActionEntry {
    pub kind: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeverageEntry {
    pub proxy: String,
    pub debt_asset: String,
    pub collateral_asset: String,
    pub join: String,
    pub manager: String,
    pub lender: String,
    pub exchange_wrapper: String,
    pub principal: String,
    pub leverage: Decimal,
    #[serde(default)]
    pub user_collateral_from: Option<String>,
    #[serde(default)]
    pub user_collateral_amount: Option<String>,
}

/// Built recipe plus the leverage plan when one was requested.
#[derive(Debug)]
pub struct LoadedRecipe {
    pub unit: RecipeUnit,
    pub plan: Option<LeveragePlan>,
}

impl RecipeFile {
    /// # Errors
    ///
    /// [`ConfigError::ReadFile`] or [`ConfigError::Parse`].
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content).map_err(ConfigError::Parse)?)
    }

    /// Ceiling from the command line, then the file, then `fallback`.
    #[must_use]
    pub fn effective_ceiling(&self, cli: Option<u64>, fallback: u64) -> u64 {
        cli.or(self.gas_ceiling).unwrap_or(fallback)
    }

    /// Validate into a recipe unit.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for unparsable entries, otherwise any
    /// [`BuildError`].
    #[allow(clippy::result_large_err)]
    pub fn build(&self, builder: RecipeBuilder) -> Result<LoadedRecipe> {
        match (&self.leverage, self.actions.is_empty()) {
            (Some(_), false) => Err(invalid(
                "actions",
                "a recipe takes either [[actions]] or [leverage], not both",
            )),
            (Some(leverage), true) => {
                let proxy = parse_address("proxy", &leverage.proxy)?;
                let recipe = FlashLoanOrchestrator::new(builder).build_leveraged(
                    self.name.clone(),
                    &leverage.to_config()?,
                    proxy,
                )?;
                Ok(LoadedRecipe {
                    unit: recipe.unit,
                    plan: Some(recipe.plan),
                })
            }
            (None, _) => {
                let actions = self
                    .actions
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| entry.to_spec(index))
                    .collect::<Result<Vec<_>>>()?;
                Ok(LoadedRecipe {
                    unit: builder.build(self.name.clone(), actions)?,
                    plan: None,
                })
            }
        }
    }
}

impl ActionEntry {
    #[allow(clippy::result_large_err)]
    fn to_spec(&self, index: usize) -> Result<ActionSpec> {
        let kind = parse_kind(&self.kind)?;
        let schema = kind.params();
        if self.params.len() != schema.len() {
            return Err(BuildError::ArityMismatch {
                index,
                kind,
                expected: schema.len(),
                actual: self.params.len(),
            }
            .into());
        }

        let params = self
            .params
            .iter()
            .zip(schema)
            .map(|(raw, param_type)| parse_value(raw, *param_type))
            .collect::<Result<Vec<_>>>()?;

        let spec = ActionSpec::new(kind, params);
        Ok(match &self.output {
            Some(slot) => spec.with_output(slot.clone()),
            None => spec,
        })
    }
}

impl LeverageEntry {
    #[allow(clippy::result_large_err)]
    fn to_config(&self) -> Result<LeverageConfig> {
        let user_collateral = match (&self.user_collateral_from, &self.user_collateral_amount) {
            (Some(from), Some(amount)) => Some(UserCollateral {
                from: parse_address("user_collateral_from", from)?,
                amount: parse_amount("user_collateral_amount", amount)?,
            }),
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "user_collateral",
                    "user_collateral_from and user_collateral_amount go together",
                ))
            }
        };

        Ok(LeverageConfig {
            debt_asset: parse_address("debt_asset", &self.debt_asset)?,
            collateral_asset: parse_address("collateral_asset", &self.collateral_asset)?,
            join: parse_address("join", &self.join)?,
            manager: parse_address("manager", &self.manager)?,
            lender: parse_address("lender", &self.lender)?,
            exchange_wrapper: parse_address("exchange_wrapper", &self.exchange_wrapper)?,
            principal: parse_amount("principal", &self.principal)?,
            leverage: self.leverage,
            user_collateral,
        })
    }
}

#[allow(clippy::result_large_err)]
fn parse_kind(name: &str) -> Result<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .find(|kind| kind.contract_name() == name || snake_name(*kind) == name)
        .ok_or_else(|| invalid("kind", &format!("unknown action '{name}'")))
}

const fn snake_name(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::OpenVault => "open_vault",
        ActionKind::Supply => "supply",
        ActionKind::Generate => "generate",
        ActionKind::FlashLoan => "flash_loan",
        ActionKind::Swap => "swap",
        ActionKind::PullToken => "pull_token",
        ActionKind::SendToken => "send_token",
        ActionKind::SumInputs => "sum_inputs",
    }
}

#[allow(clippy::result_large_err)]
fn parse_value(raw: &str, param_type: ParamType) -> Result<Value> {
    if let Some(position) = raw.strip_prefix('$') {
        return match position.parse::<usize>() {
            Ok(k) if k > 0 => Ok(Value::reference(k - 1)),
            _ => Err(invalid("params", &format!("bad reference '{raw}'"))),
        };
    }
    match param_type {
        ParamType::Address => parse_address("params", raw).map(Value::address),
        ParamType::Uint => parse_amount("params", raw).map(Value::amount),
        ParamType::Bytes => Bytes::from_str(raw)
            .map(Value::bytes)
            .map_err(|e| invalid("params", &format!("'{raw}': {e}"))),
    }
}

#[allow(clippy::result_large_err)]
fn parse_address(field: &'static str, raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| invalid(field, &format!("'{raw}': {e}")))
}

#[allow(clippy::result_large_err)]
fn parse_amount(field: &'static str, raw: &str) -> Result<U256> {
    U256::from_str(raw).map_err(|e| invalid(field, &format!("'{raw}': {e}")))
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const JOIN: &str = "0x2F0b23f53734252Bda2277357e97e1517d6B042A";
    const MANAGER: &str = "0x5ef30b9986345249bc32d8928B7ee64DE9435E39";
    const OWNER: &str = "0x00000000000000000000000000000000000000aa";

    fn open_and_supply() -> String {
        format!(
            r#"
            name = "OpenAndSupply"

            [[actions]]
            kind = "open_vault"
            params = ["{JOIN}", "{MANAGER}"]
            output = "vault"

            [[actions]]
            kind = "McdSupply"
            params = ["$1", "1000000000000000000", "{JOIN}", "{OWNER}", "{MANAGER}"]
            "#
        )
    }

    #[test]
    fn parses_actions_and_one_based_references() {
        let file = RecipeFile::parse(&open_and_supply()).unwrap();
        let loaded = file.build(RecipeBuilder::default()).unwrap();

        assert!(loaded.plan.is_none());
        assert_eq!(loaded.unit.len(), 2);
        assert_eq!(loaded.unit.actions()[1].kind(), ActionKind::Supply);
        assert_eq!(loaded.unit.actions()[1].params()[0], Value::Reference(0));
    }

    #[test]
    fn unknown_kind_is_invalid_value() {
        let file = RecipeFile::parse(
            r#"
            name = "x"
            [[actions]]
            kind = "teleport"
            "#,
        )
        .unwrap();
        assert!(matches!(
            file.build(RecipeBuilder::default()),
            Err(Error::Config(ConfigError::InvalidValue { field: "kind", .. }))
        ));
    }

    #[test]
    fn wrong_param_count_is_arity_mismatch() {
        let file = RecipeFile::parse(&format!(
            r#"
            name = "x"
            [[actions]]
            kind = "open_vault"
            params = ["{JOIN}"]
            "#
        ))
        .unwrap();
        assert!(matches!(
            file.build(RecipeBuilder::default()),
            Err(Error::Build(BuildError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }))
        ));
    }

    #[test]
    fn zero_reference_is_rejected() {
        assert!(parse_value("$0", ParamType::Uint).is_err());
        assert_eq!(
            parse_value("$3", ParamType::Uint).unwrap(),
            Value::Reference(2)
        );
    }

    #[test]
    fn leverage_table_uses_orchestrator() {
        let file = RecipeFile::parse(&format!(
            r#"
            name = "Leveraged"

            [leverage]
            proxy = "{OWNER}"
            debt_asset = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
            collateral_asset = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
            join = "{JOIN}"
            manager = "{MANAGER}"
            lender = "0x00000000000000000000000000000000000000f1"
            exchange_wrapper = "0x00000000000000000000000000000000000000e1"
            principal = "1000000000000000000000"
            leverage = "2"
            "#
        ))
        .unwrap();

        let loaded = file.build(RecipeBuilder::default()).unwrap();
        let plan = loaded.plan.unwrap();
        assert_eq!(loaded.unit.actions()[0].kind(), ActionKind::FlashLoan);
        assert_eq!(plan.flash_amount, U256::from(1_000u64) * U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn ceiling_precedence() {
        let mut file = RecipeFile::parse(&open_and_supply()).unwrap();
        assert_eq!(file.effective_ceiling(None, 7), 7);
        file.gas_ceiling = Some(9);
        assert_eq!(file.effective_ceiling(None, 7), 9);
        assert_eq!(file.effective_ceiling(Some(11), 7), 11);
    }
}
