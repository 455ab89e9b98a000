use std::io;
use tokio::runtime::Runtime;
use tracing::info;

/// Multi-threaded runtime, `threads` workers when set, one per core otherwise.
pub fn build(name: &str, threads: Option<usize>) -> io::Result<Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name(format!("{}-worker", name));
    if let Some(threads) = threads {
        info!("custom runtime threads: {}", threads);
        builder.worker_threads(threads);
    }

    builder.build()
}
