//! # Example: app
//!
//! A service bootstrap the way a host process would wire it.
//!
//! Shows how to:
//! - Register blocking starters (an "http" listener, a "broker" subscriber).
//! - Register closers that release resources in reverse registration order.
//! - Schedule recurring cron jobs through [`Supervisor::add_jobs`].
//! - Expose typed components to the rest of the program.
//! - Attach the built-in [`LogWriter`] and a custom [`Subscribe`]r.
//!
//! ## Flow
//! ```text
//! Supervisor::start()
//!     ├─► http / broker / job-manager starters (concurrent)
//!     ├─► Ctrl-C, or the 5s demo timer cancels the parent token
//!     └─► closers: job-manager ─► publisher ─► pool (Reverse order)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example app --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use appvisor::{
    ClosePolicy, CloserFn, CronTimezone, ComponentError, Event, EventKind, JobFn, JobManager, JobRef, LogWriter,
    ShutdownOrder, StarterFn, StarterRef, Subscribe, Supervisor, SupervisorConfig,
};
use tokio_util::sync::CancellationToken;

/// Stand-in for a database pool handed out to request handlers.
struct Pool {
    dsn: &'static str,
    queries: AtomicU64,
}

/// Counts failures; a real one would export metrics or page someone.
#[derive(Default)]
struct FailureCounter {
    failures: AtomicU64,
}

#[async_trait::async_trait]
impl Subscribe for FailureCounter {
    async fn on_event(&self, ev: &Event) {
        if ev.is_failure() {
            let n = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
            println!("[alerts] failure #{n}: {:?}", ev.kind);
        }
        if ev.kind == EventKind::ShutdownCompleted {
            println!(
                "[alerts] shutdown done, {} failure(s) seen",
                self.failures.load(Ordering::Relaxed)
            );
        }
    }

    fn name(&self) -> &'static str {
        "alerts"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = SupervisorConfig {
        grace: Duration::from_secs(3),
        shutdown_order: ShutdownOrder::Reverse,
        close_policy: ClosePolicy::BestEffort,
        cron_timezone: CronTimezone::Utc,
        ..SupervisorConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> =
        vec![Arc::new(LogWriter::default()), Arc::new(FailureCounter::default())];
    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();

    // Resources first: closers run in reverse, so the pool closes last.
    let pool = Arc::new(Pool {
        dsn: "postgres://localhost/app",
        queries: AtomicU64::new(0),
    });
    sup.provide(Arc::clone(&pool));
    sup.add_closer(CloserFn::arc("pool", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }));
    sup.add_closer(CloserFn::arc("publisher", |ctx: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(100)) => Ok(()),
            _ = ctx.cancelled() => Err(ComponentError::fail("flush interrupted")),
        }
    }));

    let http: StarterRef = StarterFn::arc("http", |ctx: CancellationToken| async move {
        println!("[http] listening on :8080");
        ctx.cancelled().await;
        Ok(())
    });
    let broker: StarterRef = {
        let pool = Arc::clone(&pool);
        StarterFn::arc("broker", move |ctx: CancellationToken| {
            let pool = Arc::clone(&pool);
            async move {
                let mut tick = tokio::time::interval(Duration::from_millis(700));
                loop {
                    tokio::select! {
                        _ = ctx.cancelled() => return Ok(()),
                        _ = tick.tick() => {
                            pool.queries.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
        })
    };
    sup.add_parallel([http, broker]);

    let jobs: Vec<JobRef> = vec![
        JobFn::arc("heartbeat", "*/2 * * * * *", || async {
            println!("[job] heartbeat");
            Ok(())
        }),
        JobFn::arc("report", "0 0 3 * * *", || async { Ok(()) }),
    ];
    sup.add_jobs(jobs)?;

    let jm = sup.component::<JobManager>();
    let db = sup.component::<Pool>();
    println!("[main] {} job(s) registered, db at {}", jm.jobs_count(), db.dsn);

    let parent = CancellationToken::new();
    {
        let parent = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            parent.cancel();
        });
    }

    sup.start(parent).await?;
    println!("[main] broker ran {} queries", pool.queries.load(Ordering::Relaxed));
    Ok(())
}
