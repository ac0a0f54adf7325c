//! Runs one `save` call through the call pipeline and logs what happened.
//!
//! ```text
//! RUST_LOG=debug hook-demo --async-delay-ms 50
//! hook-demo --fail-before
//! hook-demo --stall --deadline-ms 200
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hookline_runtime::{
    build_call_pipeline, Args, Call, HookConfig, HookRegistry, Interceptor, Next, Operation,
    UnhandledPolicy, Value,
};
use parking_lot::Mutex;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hook-demo", about = "Interceptor chain demo")]
struct Cli {
    /// Delay before the asynchronous audit interceptor reports completion.
    #[arg(long, env = "HOOK_DEMO_ASYNC_DELAY_MS", default_value_t = 25)]
    async_delay_ms: u64,

    /// Make the validation interceptor reject the call.
    #[arg(long)]
    fail_before: bool,

    /// Make an interceptor hold on to `next` without calling it.
    #[arg(long)]
    stall: bool,

    /// Per-call deadline; defaults to the configured deadline.
    #[arg(long, env = "HOOK_DEMO_DEADLINE_MS")]
    deadline_ms: Option<u64>,

    /// Return unhandled chain errors instead of passing them to the operation.
    #[arg(long)]
    surface_errors: bool,

    /// Emit JSON log lines.
    #[arg(long, env = "HOOK_DEMO_JSON_LOGS")]
    json_logs: bool,
}

/// In-memory document the `save` operation writes to.
#[derive(Debug, Default)]
struct Document {
    fields: Mutex<BTreeMap<String, Value>>,
}

type Stalled = Arc<Mutex<Vec<Next<Document>>>>;

fn registry(
    cli: &Cli,
    config: HookConfig,
    stalled: &Stalled,
) -> anyhow::Result<HookRegistry<Document>> {
    let hooks = HookRegistry::with_config(config);
    hooks.install(
        "save",
        Operation::new(|doc: &Document, args: Args| {
            if let Some(err) = args.first().and_then(Value::as_error) {
                tracing::warn!(%err, "save received an error instead of a value");
                return Ok(());
            }
            let Some(key) = args.first().and_then(Value::as_str) else {
                anyhow::bail!("save needs a key");
            };
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            doc.fields.lock().insert(key.to_string(), value);
            Ok(())
        })
        .with_arity(2),
    );

    let fail_before = cli.fail_before;
    hooks.add_before(
        "save",
        Interceptor::sync(move |_: &Document, next, args: Args| {
            if fail_before {
                return next.fail(anyhow::anyhow!("validation rejected {args:?}"));
            }
            let key = args.first().and_then(Value::as_str).unwrap_or_default();
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            next.proceed_with(vec![Value::from(key.to_lowercase()), value])
        })
        .expecting(2),
    );

    let delay = Duration::from_millis(cli.async_delay_ms);
    hooks.add_before(
        "save",
        Interceptor::asynchronous(move |_: &Document, next, done, args: Args| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::info!(?args, "audit record written");
                if let Err(err) = done.complete() {
                    tracing::error!(%err, "audit completion failed");
                }
            });
            next.proceed()
        }),
    );

    if cli.stall {
        let stalled = Arc::clone(stalled);
        hooks.add_before(
            "save",
            Interceptor::sync(move |_: &Document, next, _| {
                stalled.lock().push(next);
                Ok(())
            }),
        );
    }

    hooks.add_after(
        "save",
        Interceptor::sync(|doc: &Document, next, _| {
            tracing::info!(fields = doc.fields.lock().len(), "document saved");
            next.proceed()
        }),
    )?;

    Ok(hooks)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = HookConfig {
        unhandled: if cli.surface_errors {
            UnhandledPolicy::Surface
        } else {
            UnhandledPolicy::SelfHeal
        },
        ..HookConfig::default()
    };
    let stalled = Stalled::default();
    let hooks = Arc::new(registry(&cli, config.clone(), &stalled)?);
    let doc = Arc::new(Document::default());

    let mut call = Call::new(Arc::clone(&doc), "save", ["Title", "Hello"]);
    if let Some(ms) = cli.deadline_ms {
        call = call.with_deadline_ms(ms);
    }

    let svc = build_call_pipeline(hooks, &config);
    match svc.oneshot(call).await {
        Ok(args) => {
            tracing::info!(args = %serde_json::to_string(&args)?, "call settled");
        }
        Err(err) => {
            tracing::error!(%err, "call failed");
        }
    }
    tracing::info!(
        document = %serde_json::to_string(&*doc.fields.lock())?,
        stalled = stalled.lock().len(),
        "final state"
    );
    Ok(())
}
