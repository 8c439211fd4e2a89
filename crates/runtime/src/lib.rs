
#[allow(unused)]
#[macro_use]
extern crate tracing;

use std::future::Future;
use std::pin::Pin;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

pub mod args;
pub mod log;
pub mod utils;


pub type BoxedTask = Box<dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>>;

/// Wrap a long-running service (web server, watcher...) for [`run`]
pub fn task<Func, Fut>(f: Func) -> BoxedTask
where
    Func: FnOnce(CancellationToken) -> Fut + 'static,
    Fut: Future<Output = ()> + Send + 'static
{
    Box::new(move |c| Box::pin(f(c)))
}

struct RunHandleInner {
    reload_channel: (flume::Sender<()>, flume::Receiver<()>),
    shutdown_channel: (flume::Sender<()>, flume::Receiver<()>),
}

/// Lets the rest of the program ask the run loop to reload config or shut down
#[derive(Clone)]
pub struct RunHandle(std::sync::Arc<RunHandleInner>);
impl RunHandle {
    pub fn new() -> Self {
        RunHandle(std::sync::Arc::new(RunHandleInner {
            reload_channel: flume::unbounded(),
            shutdown_channel: flume::unbounded(),
        }))
    }
    pub fn signal_reload(&self) {
        self.0.reload_channel.0.send(()).ok();
    }
    pub fn signal_shutdown(&self) {
        self.0.shutdown_channel.0.send(()).ok();
    }
}
impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn log_task_exit(result: Option<Result<&'_ str, tokio::task::JoinError>>) {
    match result {
        Some(Ok(ident)) => info!("task {} exited", ident),
        Some(Err(e)) => warn!("task exited with failure: {}", e),
        None => warn!("remaining tasks list is empty?"),
    }
}

enum Action {
    Exit(&'static str),
    Reload(&'static str),
    Continue,
}

/// Run `tasks` until one exits or a shutdown is requested, then cancel the rest and
/// wait for them. SIGHUP (or [`RunHandle::signal_reload`]) calls `reload`.
#[tracing::instrument(skip_all)]
pub async fn run(
    handle: RunHandle,
    tasks: Vec<(&'static str, BoxedTask)>,
    mut reload: impl FnMut(),
) -> Result<(), std::io::Error> {
    let mut join_set = tokio::task::JoinSet::new();
    let mut remaining_tasks = tasks.len();
    let cancel = CancellationToken::new();

    for (ident, task) in tasks {
        let future = task(cancel.child_token());
        let span = tracing::info_span!("task", name=ident).or_current();
        join_set.spawn(async move {
            log::instrument(span, future).await;
            ident
        });
    }

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let reload_rx = &handle.0.reload_channel.1;
    let shutdown_rx = &handle.0.shutdown_channel.1;

    loop {
        let action = tokio::select! {
            _ = sighup.recv()  => Action::Reload("Received SIGHUP"),
            _ = sigint.recv()  => Action::Exit("Received SIGINT"),
            _ = sigterm.recv() => Action::Exit("Received SIGTERM"),

            _ = reload_rx.recv_async() => Action::Reload("Received reload request"),
            _ = shutdown_rx.recv_async() => Action::Exit("Received shutdown request"),

            // join_next is cancel-safe
            result = join_set.join_next(), if remaining_tasks > 0 => {
                log_task_exit(result);
                remaining_tasks -= 1;
                Action::Exit("Task exited")
            },
        };

        match action {
            Action::Continue => (),
            Action::Reload(msg) => {
                info!("{msg}, reloading config");
                reload();
            },
            Action::Exit(msg) => {
                warn!("{msg}, starting shutdown");
                break;
            },
        }
    }

    log::instrument(tracing::info_span!("shut down").or_current(), async {
        info!("Starting to shut down");
        cancel.cancel();

        while remaining_tasks > 0 {
            let action = tokio::select! {
                _ = sigint.recv()  => Action::Exit("Received second SIGINT"),
                _ = sigterm.recv() => Action::Exit("Received second SIGTERM"),

                result = join_set.join_next() => {
                    log_task_exit(result);
                    remaining_tasks -= 1;
                    Action::Continue
                },
            };
            if let Action::Exit(msg) = action {
                warn!("{msg}, exiting immediately");
                break;
            }
        }

        info!("Exiting");
    }).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exits_when_a_task_finishes() {
        let tasks = vec![("quick", task(|_cancel| async {}))];
        run(RunHandle::new(), tasks, || ()).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_cancels_tasks() {
        let (tx, rx) = flume::unbounded();
        let handle = RunHandle::new();
        let tasks = vec![("waits", task(move |cancel: CancellationToken| async move {
            cancel.cancelled().await;
            tx.send("cancelled").ok();
        }))];

        handle.signal_shutdown();
        run(handle, tasks, || ()).await.unwrap();
        assert_eq!(rx.try_recv(), Ok("cancelled"));
    }

    #[tokio::test]
    async fn reload_runs_callback() {
        let handle = RunHandle::new();
        let tasks = vec![("waits", task(|cancel: CancellationToken| async move {
            cancel.cancelled().await;
        }))];

        let mut reloads = 0;
        handle.signal_reload();
        let inner = handle.clone();
        run(handle, tasks, || {
            reloads += 1;
            inner.signal_shutdown();
        }).await.unwrap();
        assert_eq!(reloads, 1);
    }
}
