//! Demo binary for prompt-gateway.
//!
//! Builds a gateway from the default two-tier configuration (or a TOML file
//! passed as the first argument) and runs a handful of demo prompts through
//! the decision pipeline, then executes each decision against an executor.
//!
//! ## Environment Variables
//!
//! - `LOG_FORMAT=json` — structured JSON output (production)
//! - `RUST_LOG=info` — log level filter (default: info)
//! - `OPENAI_API_KEY` — enables real execution; without it the echo
//!   executor simulates output, mirroring a credential-less demo session

use std::path::Path;
use std::sync::Arc;

use prompt_gateway::{
    config, init_tracing, metrics, Credential, EchoExecutor, Gateway, GatewayConfig,
    GatewayRequest, ModelExecutor, OpenAiExecutor, SessionId,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = init_tracing();

    // Initialize Prometheus metrics registry before handling any request.
    metrics::init_metrics()?;

    let config = match std::env::args().nth(1) {
        Some(path) => config::load_from_file(Path::new(&path))?,
        None => GatewayConfig::default(),
    };
    let mode = config.compliance;

    info!("Starting prompt-gateway demo");

    // Fails closed: without a working recognizer there is no gateway.
    let gateway = Gateway::with_defaults(config)?;

    // Request-scoped credential; never stored on the gateway.
    let credential = std::env::var("OPENAI_API_KEY").ok().map(Credential::new);
    let executor: Arc<dyn ModelExecutor> = if credential.is_some() {
        Arc::new(OpenAiExecutor::new())
    } else {
        warn!("OPENAI_API_KEY not set, simulating execution with echo executor");
        Arc::new(EchoExecutor::with_delay(10))
    };

    let demo_prompts = [
        "What is the capital of France?",
        "Call me at 555-0199 about the Project X budget",
        "Email the draft to jane.doe@example.com by Friday",
        "Explain quantum computing in simple terms",
        "Summarize the benefits of async programming in Rust, covering tasks, \
         executors, wakers, pinning, cancellation, structured concurrency, and \
         how backpressure interacts with bounded channels in long-running \
         streaming pipelines under sustained production load",
    ];

    let session = SessionId::new("demo-session");

    for prompt in demo_prompts {
        let mut request = GatewayRequest::new(session.clone(), prompt, "gpt-4o");
        request
            .meta
            .insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339());
        request
            .meta
            .insert("client".to_string(), "demo-client".to_string());
        let record = gateway.handle_request(&request, mode);

        info!(
            request_id = %request.request_id,
            tokens = record.tokens,
            tier = %record.chosen_tier,
            model = %record.chosen_model,
            reason = %record.routing_reason,
            pii_findings = record.pii_finding_count,
            redacted = record.redacted,
            audit_flagged = record.audit_flagged,
            cost_low_usd = record.cost_low_usd,
            cost_high_usd = record.cost_high_usd,
            session_savings_usd = record.session_savings_after_usd,
            "decision emitted"
        );

        // Execution layer: external step after the decision. Failures are
        // reported verbatim, never masked, never retried.
        match executor
            .invoke(&record.chosen_model, &record.forwarded_text, credential.as_ref())
            .await
        {
            Ok(tokens) => info!(
                request_id = %request.request_id,
                response_tokens = tokens.len(),
                "execution complete"
            ),
            Err(e) => error!(
                request_id = %request.request_id,
                error = %e,
                "execution failed"
            ),
        }
    }

    let snapshot = gateway.ledger().snapshot();
    info!(
        requests = snapshot.requests,
        session_savings_usd = snapshot.savings_usd,
        "demo complete"
    );

    Ok(())
}
