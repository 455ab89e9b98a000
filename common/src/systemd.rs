use sd_notify::NotifyState;
use std::io;
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

/// Tells systemd the service accepts requests. A no-op outside systemd.
pub fn ready() {
    if let Err(e) = sd_notify::notify(false, &[NotifyState::Ready]) {
        error!("notify ready: {}", e);
    }
}

/// Wakes every `shutdown` waiter on the first INT, TERM or QUIT signal and
/// reports the service as stopping.
pub fn run(shutdown: Arc<Notify>) -> io::Result<()> {
    let signals = Signals::new()?;
    tokio::spawn(async move {
        let name = signals.recv().await;
        info!("received {} signal", name);
        if let Err(e) = sd_notify::notify(false, &[NotifyState::Stopping]) {
            error!("notify stopping: {}", e);
        }

        shutdown.notify_waiters();
    });

    Ok(())
}

struct Signals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
}

impl Signals {
    fn new() -> io::Result<Self> {
        Ok(Signals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "interrupt",
            _ = self.terminate.recv() => "terminate",
            _ = self.quit.recv() => "quit",
        }
    }
}
