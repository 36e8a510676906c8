//! `vaultsmith encode`: build a recipe file and print its calldata.

use alloy_primitives::hex;

use crate::cli::output;
use crate::cli::recipe_file::RecipeFile;
use crate::cli::EncodeArgs;
use crate::domain::{codec, RecipeBuilder, DEFAULT_GAS_CEILING};
use crate::error::Result;

pub fn execute(args: &EncodeArgs) -> Result<()> {
    let file = RecipeFile::load(&args.recipe)?;
    let ceiling = file.effective_ceiling(args.gas_ceiling, DEFAULT_GAS_CEILING);
    let loaded = file.build(RecipeBuilder::new(ceiling))?;
    let unit = &loaded.unit;

    output::section(&format!("Recipe: {}", unit.name()));
    for (index, action) in unit.actions().iter().enumerate() {
        let slot = action
            .output()
            .map(|slot| format!(" -> ${} ({slot})", index + 1))
            .unwrap_or_default();
        println!("  {}. {}{slot}", index + 1, action.kind());
    }

    println!();
    output::key_value("Actions", unit.len());
    output::key_value("Gas estimate", unit.gas_estimate());
    output::key_value("Gas ceiling", ceiling);
    if let Some(plan) = loaded.plan {
        output::key_value("Flash amount", plan.flash_amount);
        output::key_value("Exposure", plan.target_exposure);
        output::key_value("Min debt", plan.min_expected_debt);
    }
    output::key_value("Selector", codec::execute_recipe_selector());

    println!();
    println!("{}", hex::encode_prefixed(codec::encode(unit)));
    Ok(())
}
