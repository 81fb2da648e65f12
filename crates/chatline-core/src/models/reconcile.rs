use tracing::info;

use super::catalog::{ModelCatalog, ReasoningEffort};
use crate::settings::ChatSettings;

/// What a reconciliation pass changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Previous model id, when it was missing from the catalog
    pub replaced_model: Option<String>,
    /// Previous effort level, when the active model no longer accepts it
    pub replaced_effort: Option<ReasoningEffort>,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        self.replaced_model.is_some() || self.replaced_effort.is_some()
    }
}

/// Bring `settings` back in line with `catalog`.
///
/// Must run after every catalog swap and every model selection. An unknown
/// model falls back to the first catalog entry; an effort level the active
/// model does not list falls back to its declared default, then to its first
/// option. Models without effort options leave the stored level untouched.
pub fn reconcile(settings: &mut ChatSettings, catalog: &ModelCatalog) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    if !catalog.contains(&settings.model) {
        let fallback = catalog.first().id.clone();
        info!(from = %settings.model, to = %fallback, "Selected model not in catalog, falling back");
        outcome.replaced_model = Some(std::mem::replace(&mut settings.model, fallback));
    }

    let model = catalog.resolve(&settings.model);
    if !model.reasoning_effort_options.is_empty()
        && !model
            .reasoning_effort_options
            .contains(&settings.reasoning_effort)
        && let Some(fallback) = model.fallback_reasoning_effort()
    {
        info!(
            model = %model.id,
            from = %settings.reasoning_effort,
            to = %fallback,
            "Reasoning effort not supported by model, resetting"
        );
        outcome.replaced_effort = Some(settings.reasoning_effort);
        settings.reasoning_effort = fallback;
    }

    outcome
}
