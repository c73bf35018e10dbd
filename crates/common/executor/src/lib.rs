use std::sync::Weak;

use futures::{future, prelude::*};
use tokio::runtime::{Handle, Runtime};
pub use tokio::task::JoinHandle;

/// Source of a tokio handle to spawn onto.
///
/// Holding a `Weak<Runtime>` lets the executor outlive a runtime that is
/// being torn down: spawns become no-ops instead of panics.
#[derive(Clone)]
pub enum HandleProvider {
    Runtime(Weak<Runtime>),
    Handle(Handle),
}

impl From<Handle> for HandleProvider {
    fn from(handle: Handle) -> Self {
        HandleProvider::Handle(handle)
    }
}

impl From<Weak<Runtime>> for HandleProvider {
    fn from(weak_runtime: Weak<Runtime>) -> Self {
        HandleProvider::Runtime(weak_runtime)
    }
}

impl HandleProvider {
    pub fn handle(&self) -> Option<Handle> {
        match self {
            HandleProvider::Runtime(weak_runtime) => weak_runtime
                .upgrade()
                .map(|runtime| runtime.handle().clone()),
            HandleProvider::Handle(handle) => Some(handle.clone()),
        }
    }
}

/// Fire-and-forget task spawner with a shutdown signal.
///
/// Every spawned future races the exit channel, so dropping a message into
/// the paired sender (or dropping the sender entirely) aborts outstanding
/// work without the tasks having to poll for cancellation themselves.
#[derive(Clone)]
pub struct VigilExecutor {
    handle_provider: HandleProvider,
    exit: async_channel::Receiver<()>,
}

impl VigilExecutor {
    pub fn new<T: Into<HandleProvider>>(handle: T, exit: async_channel::Receiver<()>) -> Self {
        Self {
            handle_provider: handle.into(),
            exit,
        }
    }

    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        if let Some(handle) = self.handle() {
            let exit = self.exit();
            handle.spawn(async move {
                futures::pin_mut!(exit);
                let _ = future::select(Box::pin(task), exit).await;
            });
        }
    }

    /// Like [`Self::spawn`] but returns a handle; the task resolves to `None`
    /// if the exit signal fired first.
    pub fn spawn_handle<R: Send + 'static>(
        &self,
        task: impl Future<Output = R> + Send + 'static,
    ) -> Option<JoinHandle<Option<R>>> {
        let exit = self.exit();
        let handle = self.handle()?;
        Some(handle.spawn(async move {
            futures::pin_mut!(exit);
            match future::select(Box::pin(task), exit).await {
                future::Either::Left((value, _)) => Some(value),
                future::Either::Right(_) => None,
            }
        }))
    }

    pub fn handle(&self) -> Option<Handle> {
        self.handle_provider.handle()
    }

    pub fn exit(&self) -> impl Future<Output = ()> + use<> {
        let exit = self.exit.clone();
        async move {
            let _ = exit.recv().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_runs_task() {
        let (_exit_sender, exit_receiver) = async_channel::bounded(1);
        let executor = VigilExecutor::new(Handle::current(), exit_receiver);

        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = Arc::clone(&counter);
        executor.spawn(async move {
            task_counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exit_aborts_pending_task() {
        let (exit_sender, exit_receiver) = async_channel::bounded(1);
        let executor = VigilExecutor::new(Handle::current(), exit_receiver);

        let handle = executor
            .spawn_handle(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                42
            })
            .expect("runtime handle available");

        exit_sender.send(()).await.expect("exit channel open");
        let result = handle.await.expect("task joins cleanly");
        assert_eq!(result, None);
    }
}
