/// Wait for a shutdown request and report which signal delivered it.
///
/// Both services exit cleanly on SIGTERM/SIGINT so an external supervisor
/// (systemd, a wrapper script) can relaunch them; the node service relies
/// on this for its "restart requested" path.
pub async fn wait_for_stop_signal() -> &'static str {
    imp::wait().await
}

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{signal, SignalKind};

    pub async fn wait() -> &'static str {
        let mut terminate = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut interrupt = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        }
    }
}

#[cfg(not(unix))]
mod imp {
    pub async fn wait() -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "CTRL_C"
    }
}
