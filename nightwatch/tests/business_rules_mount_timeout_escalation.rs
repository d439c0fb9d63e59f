//! Business Rule Tests: Mount Write Timeout Escalation
//!
//! Two consecutive command timeouts escalate the connection to `faulted`;
//! a single timeout followed by a success does not (§8 item 9).

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use nightwatch::mount::{ConnectionState, MountConnection, MountEngine};

async fn bind_loopback() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn two_consecutive_timeouts_fault_the_connection() {
    let (listener, port) = bind_loopback().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut byte = [0u8; 1];
        // Never respond to anything; every command times out.
        loop {
            if stream.read(&mut byte).await.unwrap_or(0) == 0 {
                break;
            }
        }
    });

    let engine = MountEngine::new(MountConnection::Tcp {
        host: "127.0.0.1".to_string(),
        port,
    });
    engine.connect().await.expect("connects even though the peer never replies");

    assert!(engine.send_command("GR").await.is_err());
    assert_eq!(engine.state().await, ConnectionState::Open, "one timeout alone does not fault");

    assert!(engine.send_command("GR").await.is_err());
    assert_eq!(engine.state().await, ConnectionState::Faulted, "a second consecutive timeout faults");
}

#[tokio::test]
async fn timeout_followed_by_success_clears_the_counter() {
    let (listener, port) = bind_loopback().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut frame = Vec::new();
        let mut byte = [0u8; 1];
        let mut frame_count = 0;
        loop {
            if stream.read(&mut byte).await.unwrap_or(0) == 0 {
                break;
            }
            frame.push(byte[0]);
            if byte[0] != b'#' {
                continue;
            }
            frame.clear();
            frame_count += 1;
            if frame_count >= 2 {
                // Reply to the second command onward; the first is left hanging.
                let _ = stream.write_all(b"0#").await;
            }
        }
    });

    let engine = MountEngine::new(MountConnection::Tcp {
        host: "127.0.0.1".to_string(),
        port,
    });
    engine.connect().await.unwrap();

    assert!(engine.send_command("GR").await.is_err(), "first command goes unanswered");
    assert!(engine.send_command("MS").await.is_ok(), "second command is answered normally");
    assert_eq!(engine.state().await, ConnectionState::Open, "success after a single timeout clears the fault counter");
}
