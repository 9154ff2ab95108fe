use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::providers::{PROVIDERS, ProviderConfig, ProviderId};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub provider: &'static ProviderConfig,
    pub model: String,
    pub credential: Option<String>,
}

/// Picks the provider, model and credential for this run.
///
/// An explicitly flagged provider with a credential wins; otherwise the first
/// provider in table order with a credential is used. The local provider needs
/// no credential but is never picked unless flagged. `model_override` swaps the
/// model id without changing routing.
pub fn resolve(
    is_flagged: impl Fn(ProviderId) -> bool,
    model_override: Option<&str>,
    get_var: impl Fn(&str) -> Option<String>,
) -> Result<Resolution, ConfigError> {
    let credential_for = |cfg: &ProviderConfig| -> Option<String> {
        cfg.credential_env_var
            .and_then(&get_var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let flagged = PROVIDERS.iter().filter(|cfg| is_flagged(cfg.id)).find(|cfg| {
        if cfg.is_local() {
            return true;
        }
        let present = credential_for(cfg).is_some();
        if !present {
            warn!(
                provider = cfg.name,
                env_var = cfg.credential_env_var.unwrap_or_default(),
                "provider requested but its credential is not set"
            );
        }
        present
    });

    let chosen = flagged.or_else(|| {
        PROVIDERS
            .iter()
            .filter(|cfg| !cfg.is_local())
            .find(|cfg| credential_for(cfg).is_some())
    });

    let provider = chosen.ok_or(ConfigError::NoCredentialFound)?;
    let model = model_override
        .filter(|model| !model.is_empty())
        .unwrap_or(provider.default_model)
        .to_string();
    debug!(provider = provider.name, model = %model, "resolved provider");

    Ok(Resolution {
        provider,
        credential: credential_for(provider),
        model,
    })
}
