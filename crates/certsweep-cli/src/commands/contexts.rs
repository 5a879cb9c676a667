//! `certsweep contexts` - show which contexts a scan would visit
//!
//! # Usage
//!
//! ```bash
//! certsweep contexts
//! certsweep contexts --context prod --namespace payments
//! ```

use clap::Args;

use crate::backend::contexts::{discover_contexts, ContextSelection};
use crate::commands::format::print_table;
use crate::commands::load_kubeconfig;
use crate::config::load_defaults;
use crate::Result;

/// List the kubeconfig contexts and whether each can be scanned
#[derive(Args, Debug)]
pub struct ContextsArgs {
    /// Path to kubeconfig
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Only show these contexts (repeatable)
    #[arg(long = "context")]
    pub contexts: Vec<String>,

    /// Namespace to use for every context
    #[arg(short, long)]
    pub namespace: Option<String>,
}

/// Run the contexts command
pub async fn run(args: ContextsArgs) -> Result<()> {
    let defaults = load_defaults()?;
    let kubeconfig = load_kubeconfig(args.kubeconfig.as_deref())?;
    let selection = ContextSelection {
        only: args.contexts,
        namespace: args.namespace.or(defaults.namespace),
    };

    let contexts = discover_contexts(&kubeconfig, &selection)?;
    if contexts.is_empty() {
        println!("No contexts found.");
        return Ok(());
    }

    let rows = contexts
        .iter()
        .map(|ctx| {
            vec![
                ctx.name.clone(),
                if ctx.namespace.is_empty() {
                    "-".to_string()
                } else {
                    ctx.namespace.clone()
                },
                if ctx.is_scannable() { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    print_table(&["NAME", "NAMESPACE", "SCANNABLE"], &rows);
    Ok(())
}
