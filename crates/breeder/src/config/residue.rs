use serde::{Deserialize, Deserializer};
use tritium_core::ResiduePolicy;

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Residue {
    Converted,
    MassConserving,
}

/// Reads a [`ResiduePolicy`] from `"converted"` or `"mass_conserving"`.
pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<ResiduePolicy, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Residue::deserialize(deserializer)? {
        Residue::Converted => ResiduePolicy::Converted,
        Residue::MassConserving => ResiduePolicy::MassConserving,
    })
}
