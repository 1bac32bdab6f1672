use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orbit_core::{CommandId, ProviderId};

use super::result::{CommandError, CommandResult};

/// Primary command result merged with each provider's own result.
///
/// `provider_errors` and `errors` are derived on every call, so they always
/// reflect the current state of the underlying results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorCommandResult {
    pub command_result: CommandResult,
    #[serde(default)]
    pub provider_command_results: BTreeMap<ProviderId, CommandResult>,
}

impl OrchestratorCommandResult {
    /// Merge a primary result with per-provider results.
    ///
    /// Later entries for the same provider replace earlier ones.
    pub fn aggregate(
        primary: CommandResult,
        provider_results: impl IntoIterator<Item = (ProviderId, CommandResult)>,
    ) -> Self {
        Self {
            command_result: primary,
            provider_command_results: provider_results.into_iter().collect(),
        }
    }

    pub fn command_id(&self) -> CommandId {
        self.command_result.command_id
    }

    pub fn provider_result(&self, provider: &ProviderId) -> Option<&CommandResult> {
        self.provider_command_results.get(provider)
    }

    pub fn provider_result_mut(&mut self, provider: &ProviderId) -> Option<&mut CommandResult> {
        self.provider_command_results.get_mut(provider)
    }

    pub fn insert_provider_result(&mut self, provider: ProviderId, result: CommandResult) {
        self.provider_command_results.insert(provider, result);
    }

    /// Providers whose result carries at least one error, with those errors.
    pub fn provider_errors(&self) -> BTreeMap<&ProviderId, &[CommandError]> {
        self.provider_command_results
            .iter()
            .filter(|(_, r)| r.has_errors())
            .map(|(p, r)| (p, r.errors.as_slice()))
            .collect()
    }

    /// Primary errors first, then each provider's errors in provider order.
    pub fn errors(&self) -> Vec<&CommandError> {
        self.command_result
            .errors
            .iter()
            .chain(
                self.provider_command_results
                    .values()
                    .flat_map(|r| r.errors.iter()),
            )
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.command_result.has_errors()
            || self.provider_command_results.values().any(|r| r.has_errors())
    }
}
