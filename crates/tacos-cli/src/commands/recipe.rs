use anyhow::{Context, Result};
use std::str::FromStr;
use tacos_core::item::TacoSize;
use tacos_core::recipe_id::{self, Recipe};

/// Accepts `XL` as well as the full `tacos_XL` code.
fn parse_size(input: &str) -> Result<TacoSize> {
    let code = if input.starts_with("tacos_") {
        input.to_string()
    } else {
        format!("tacos_{}", input)
    };
    TacoSize::from_str(&code).with_context(|| format!("Unknown size '{}'", input))
}

pub fn hash(
    size: &str,
    meats: Vec<String>,
    sauces: Vec<String>,
    garnitures: Vec<String>,
) -> Result<()> {
    let size = parse_size(size)?;
    let recipe = Recipe::new(size.code(), meats, sauces, garnitures);

    let hex = recipe_id::hash(&recipe);
    let shareable = recipe_id::to_shareable_form(&hex)?;
    println!("hex:       {}", hex);
    println!("shareable: {}", shareable);
    Ok(())
}

pub fn decode(identity: &str) -> Result<()> {
    let hex = recipe_id::resolve_identity(identity)?;
    println!("{}", hex);
    Ok(())
}
