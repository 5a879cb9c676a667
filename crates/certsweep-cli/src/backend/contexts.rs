//! Context discovery from the kubeconfig
//!
//! Every kubeconfig context becomes a scan target, in file order. Its
//! namespace comes from the context entry unless overridden. Contexts without
//! a namespace are kept here and filtered out by the pipeline.

use kube::config::Kubeconfig;

use certsweep_core::Context;

use crate::{Error, Result};

/// Which contexts to scan and how.
#[derive(Debug, Clone, Default)]
pub struct ContextSelection {
    /// Only scan these contexts (all when empty)
    pub only: Vec<String>,
    /// Namespace applied to every selected context
    pub namespace: Option<String>,
}

/// Build the scan targets from `kubeconfig`.
///
/// Asking for a context the kubeconfig doesn't define is an error.
pub fn discover_contexts(
    kubeconfig: &Kubeconfig,
    selection: &ContextSelection,
) -> Result<Vec<Context>> {
    if let Some(missing) = selection
        .only
        .iter()
        .find(|name| !kubeconfig.contexts.iter().any(|c| &c.name == *name))
    {
        return Err(Error::ContextNotFound {
            name: missing.clone(),
        });
    }

    let contexts = kubeconfig
        .contexts
        .iter()
        .filter(|named| selection.only.is_empty() || selection.only.contains(&named.name))
        .map(|named| {
            let namespace = selection
                .namespace
                .clone()
                .or_else(|| named.context.as_ref().and_then(|c| c.namespace.clone()))
                .unwrap_or_default();
            Context::new(named.name.clone(), namespace)
        })
        .collect();

    Ok(contexts)
}
