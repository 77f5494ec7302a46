//! Generator invoker: runs one generator and normalizes what comes back

use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::document::DocumentContext;
use crate::error::SynthError;
use crate::generator::{GenerationContext, SynthesizedDecl};
use crate::marker::{GeneratorIdentity, MarkedDeclaration, MarkerSite};
use crate::registry::{panic_message, GeneratorInstance};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of one marker's invocation, consumed once by the composer
#[derive(Debug)]
pub struct GenerationOutcome {
    pub site: MarkerSite,
    pub identity: GeneratorIdentity,
    pub result: Result<Vec<SynthesizedDecl>, SynthError>,
    /// Diagnostics the generator reported, in report order
    pub diagnostics: Vec<Diagnostic>,
    /// Served from the incremental cache
    pub cached: bool,
}

impl GenerationOutcome {
    pub fn failed(site: MarkerSite, identity: GeneratorIdentity, error: SynthError) -> Self {
        GenerationOutcome {
            site,
            identity,
            result: Err(error),
            diagnostics: Vec::new(),
            cached: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.result, Err(err) if err.is_cancelled())
    }
}

/// Invoke a generator for one marked declaration.
///
/// Never fails: generator errors, panics and malformed output become a
/// `GeneratorExecution` outcome, and cancellation becomes
/// `RegenerationCancelled` as soon as the token fires.
pub async fn invoke(
    instance: GeneratorInstance,
    marked: MarkedDeclaration,
    document: Arc<DocumentContext>,
    cancel: CancellationToken,
) -> GenerationOutcome {
    let site = marked.site().clone();
    let identity = marked.identity().clone();
    let sink = DiagnosticSink::new();
    let cx = GenerationContext {
        declaration: marked.declaration,
        marker: marked.marker,
        document,
        diagnostics: sink.clone(),
        cancel: cancel.clone(),
    };

    debug!(identity = %identity, site = %site, "Invoking generator");
    let started = Instant::now();
    let run = AssertUnwindSafe(instance.generate(cx)).catch_unwind();

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SynthError::RegenerationCancelled),
        finished = run => match finished {
            Ok(Ok(declarations)) => validate(declarations, &identity, &site),
            // Errors raised while unwinding a cancelled regeneration are cancellation
            Ok(Err(_)) if cancel.is_cancelled() => Err(SynthError::RegenerationCancelled),
            Ok(Err(err)) => Err(SynthError::GeneratorExecution {
                identity: identity.clone(),
                site: site.clone(),
                message: format!("{:#}", err),
            }),
            Err(panic) => Err(SynthError::GeneratorExecution {
                identity: identity.clone(),
                site: site.clone(),
                message: format!("generator panicked: {}", panic_message(&*panic)),
            }),
        },
    };

    match &result {
        Ok(declarations) => debug!(
            identity = %identity,
            site = %site,
            declarations = declarations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generator finished"
        ),
        Err(err) if err.is_cancelled() => {
            debug!(identity = %identity, site = %site, "Generator cancelled")
        }
        Err(err) => warn!(identity = %identity, site = %site, error = %err, "Generator failed"),
    }

    GenerationOutcome {
        site,
        identity,
        result,
        diagnostics: sink.snapshot(),
        cached: false,
    }
}

fn validate(
    declarations: Vec<SynthesizedDecl>,
    identity: &GeneratorIdentity,
    site: &MarkerSite,
) -> Result<Vec<SynthesizedDecl>, SynthError> {
    for declaration in &declarations {
        declaration
            .validate()
            .map_err(|reason| SynthError::GeneratorExecution {
                identity: identity.clone(),
                site: site.clone(),
                message: format!("malformed output: {}", reason),
            })?;
    }
    Ok(declarations)
}
