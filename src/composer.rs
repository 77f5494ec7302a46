//! Output composer: merges per-marker outcomes into one synthesized unit

use crate::diagnostic::Diagnostic;
use crate::document::DocumentContext;
use crate::error::SynthError;
use crate::invoker::GenerationOutcome;
use crate::marker::MarkerSite;
use crate::unit::{SynthesizedUnit, UnitDeclaration};
use quote::ToTokens;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// What to do when two markers on the same declaration produce the same name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Fail the whole regeneration
    #[default]
    Error,
    /// Keep the earlier marker's declaration and warn about the later one
    FirstWins,
}

/// Compose outcomes into a unit.
///
/// Order is marker document order, then generator emission order, whatever
/// order the outcomes arrive in. Failed markers become error diagnostics.
/// Name collisions fail the whole composition unless `policy` resolves them.
pub fn compose(
    context: &DocumentContext,
    mut outcomes: Vec<GenerationOutcome>,
    policy: CollisionPolicy,
) -> Result<SynthesizedUnit, SynthError> {
    outcomes.sort_by_key(|outcome| outcome.site.ordinal);

    let mut claimed: HashMap<String, MarkerSite> = HashMap::new();
    let mut declarations = Vec::new();
    let mut diagnostics = Vec::new();
    let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for outcome in outcomes {
        let GenerationOutcome {
            site,
            identity,
            result,
            diagnostics: reported,
            ..
        } = outcome;

        diagnostics.extend(
            reported
                .into_iter()
                .map(|diagnostic| diagnostic.from_marker(site.clone())),
        );

        let synthesized = match result {
            Ok(synthesized) => synthesized,
            Err(err) if err.is_document_fatal() => return Err(err),
            Err(err) => {
                diagnostics.push(Diagnostic::from_error(&err, &site));
                continue;
            }
        };

        'declarations: for declaration in synthesized {
            let keys = declaration.collision_keys();
            let mut own = HashSet::new();
            for key in &keys {
                if !own.insert(key.as_str()) {
                    return Err(collision(key, &site, &site));
                }
                let Some(first) = claimed.get(key) else {
                    continue;
                };
                let same_declaration =
                    first.declaration == site.declaration && first.ordinal != site.ordinal;
                if same_declaration && policy == CollisionPolicy::FirstWins {
                    warn!(name = %key, first = %first, dropped = %site, "Dropping colliding declaration");
                    diagnostics.push(
                        Diagnostic::warning(format!(
                            "dropped `{}` generated by {}: already generated by {}",
                            key, site, first
                        ))
                        .at(site.span)
                        .with_code("name-collision")
                        .from_marker(site.clone()),
                    );
                    continue 'declarations;
                }
                return Err(collision(key, first, &site));
            }

            for key in keys {
                claimed.insert(key, site.clone());
            }

            let namespace = declaration.namespace.join("::");
            let scope = imports.entry(namespace).or_insert_with(|| {
                context
                    .uses_in(&declaration.namespace)
                    .iter()
                    .map(|import| normalize_use(import))
                    .collect()
            });
            scope.extend(declaration.imports.iter().map(|import| normalize_use(import)));

            declarations.push(UnitDeclaration {
                origin: site.clone(),
                identity: identity.clone(),
                declaration,
            });
        }
    }

    debug!(
        document = %context.path().display(),
        declarations = declarations.len(),
        diagnostics = diagnostics.len(),
        "Composed synthesized unit"
    );

    Ok(SynthesizedUnit {
        path: context.path().to_path_buf(),
        fingerprint: context.fingerprint(),
        declarations,
        imports: imports
            .into_iter()
            .map(|(namespace, set)| (namespace, set.into_iter().collect()))
            .collect(),
        diagnostics,
    })
}

fn collision(name: &str, first: &MarkerSite, second: &MarkerSite) -> SynthError {
    SynthError::SynthesizedNameCollision {
        name: name.to_string(),
        first: first.clone(),
        second: second.clone(),
    }
}

/// Canonical token form of a `use` item, so spelling differences de-duplicate
fn normalize_use(import: &str) -> String {
    syn::parse_str::<syn::ItemUse>(import)
        .map(|item| item.to_token_stream().to_string())
        .unwrap_or_else(|_| import.trim().to_string())
}
