//! Names for the throwaway resource group and key vault.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rand::Rng;
use rg_azure::types::{AzureError, AzureErrorKind, AzureResult};

pub const GROUP_PREFIX: &str = "azure-sample-group-resources-";
pub const VAULT_PREFIX: &str = "azureSampleVault";
pub const POSTFIX_RANGE: RangeInclusive<u32> = 100..=500;

pub fn group_name(postfix: u32) -> String {
    format!("{GROUP_PREFIX}{postfix}")
}

/// Draw a group name whose postfix is not already used by one of `existing`.
/// Names are compared case-insensitively, as ARM does.
pub fn pick_group_name<'a, R, I>(existing: I, rng: &mut R) -> AzureResult<String>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<String> = existing.into_iter().map(str::to_ascii_lowercase).collect();
    let free: Vec<u32> = POSTFIX_RANGE
        .filter(|p| !taken.contains(&group_name(*p).to_ascii_lowercase()))
        .collect();

    if free.is_empty() {
        return Err(AzureError::new(
            AzureErrorKind::Conflict,
            format!(
                "every {GROUP_PREFIX}{{{}..={}}} name is taken",
                POSTFIX_RANGE.start(),
                POSTFIX_RANGE.end()
            ),
        ));
    }
    Ok(group_name(free[rng.gen_range(0..free.len())]))
}

/// `azureSampleVault-HHMMSS` in UTC. Vault names are global and at most 24
/// characters; this one is 23.
pub fn vault_name(now: DateTime<Utc>) -> String {
    format!("{VAULT_PREFIX}{}", now.format("-%H%M%S"))
}
