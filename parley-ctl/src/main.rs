use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use parley_client::{
    api::{PostId, TraceStep},
    spawn_view, ViewHandle,
};
use parley_mock_server::{MockHandle, MockServer};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Trace to replay, one JSON-encoded step per line
    #[structopt(parse(from_os_str))]
    trace: PathBuf,

    /// Make the server reject every n-th mutation
    #[structopt(long)]
    fail_every: Option<usize>,

    /// How long to wait for live updates to reach the view at the end
    #[structopt(long, default_value = "1000")]
    quiesce_ms: u64,
}

fn read_trace(path: &Path) -> anyhow::Result<Vec<TraceStep>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace file {}", path.display()))?;
    data.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l).with_context(|| format!("parsing trace line {}", i + 1))
        })
        .collect()
}

async fn replay(view: &mut ViewHandle, mock: &MockHandle, step: TraceStep) -> anyhow::Result<()> {
    match step {
        TraceStep::Observe(post) => view.observe(post),
        TraceStep::Select(id) => match view.snapshot().find(id) {
            Some(c) => view.select(c.clone()),
            None => tracing::warn!(?id, "not selecting comment absent from the view"),
        },
        TraceStep::Submit(content) => view.submit(content),
        TraceStep::Delete(id) => view.delete(id),
        TraceStep::Remote(action) => {
            if let Err(err) = mock.lock().await.submit_action(action) {
                tracing::info!(?err, status = %err.status_code(), "remote action rejected");
            }
        }
    }
    view.settled().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let steps = read_trace(&opt.trace)?;
    let server = match opt.fail_every {
        Some(n) => MockServer::with_fail_every(n),
        None => MockServer::new(),
    };
    let mock = MockHandle::new(server);
    let notifier = || tracing::debug!("comment form submitted");
    let (mut view, join) = spawn_view(Arc::new(mock.clone()), Arc::new(mock.clone()), notifier);

    tracing::info!(num_steps = steps.len(), "replaying trace");
    for step in steps {
        replay(&mut view, &mock, step).await?;
    }

    let post: Option<PostId> = view.snapshot().post;
    let server_comments = match post {
        Some(p) => mock.lock().await.test_comments(p),
        None => Vec::new(),
    };
    let snapshot = tokio::time::timeout(
        Duration::from_millis(opt.quiesce_ms),
        view.wait_until(|s| s.comments == server_comments),
    )
    .await;
    let (snapshot, consistent) = match snapshot {
        Ok(s) => (s?, true),
        Err(_) => {
            tracing::warn!("view did not converge to the server state");
            (view.snapshot(), false)
        }
    };

    let last_error = match &snapshot.last_error {
        Some(e) => Some(
            serde_json::from_slice::<serde_json::Value>(&e.contents())
                .context("decoding error body")?,
        ),
        None => None,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "post": snapshot.post,
            "comments": snapshot.comments,
            "consistent": consistent,
            "last_error": last_error,
        }))?
    );

    view.shutdown();
    join.await.context("joining comment view")?;
    Ok(())
}
