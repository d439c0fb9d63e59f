//! Generic cancellable line-server accept loop (§4.I, §5): one task per
//! connection, shutdown cancels the listener and every in-flight handler.

use std::future::Future;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run_server<C, Fut>(
    addr: &str,
    label: &'static str,
    cancel: CancellationToken,
    make_conn_task: C,
) -> anyhow::Result<()>
where
    C: Fn(TcpStream, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr, label, "listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(label, "server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, label, "connection accepted");
                        let conn_cancel = cancel.child_token();
                        let task = make_conn_task.clone();
                        tokio::spawn(async move { task(stream, conn_cancel).await; });
                    }
                    Err(err) => warn!(error = %err, label, "accept failed"),
                }
            }
        }
    }
}
