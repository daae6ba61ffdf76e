//! Loopback integration test for the tokio transport driver.
#![cfg(feature = "tokio")]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use slirc_client::connection::{driver, ClientConnection, RawLine, RawLineEvent, StatusChange};
use slirc_client::connection::{ConnectionStatus, StatusChangeEvent};
use slirc_client::{Irc, Phase};

#[tokio::test]
async fn driver_feeds_lines_and_status_changes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Fake server: greet, read whatever arrives, then close.
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream
            .write_all(b":srv.test 001 nick :Welcome\r\nPING :tok\r\n")
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"PONG"));
        // Dropping the stream closes the connection.
    });

    let irc = Irc::new();
    let conn = irc
        .load(|irc| ClientConnection::new(irc, &format!("irc://127.0.0.1:{}", addr.port())))
        .unwrap();

    let driver_task = tokio::spawn(driver::run(conn.link()));

    // Collect everything the driver produces until disconnect.
    let mut lines = Vec::new();
    let mut statuses = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);

    let _status = irc.attach::<StatusChangeEvent>(Phase::Handler, |_, _| Ok(()));

    'outer: loop {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for disconnect"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        while let Some(ev) = irc.fetch_event() {
            irc.dispatch(&ev).unwrap();
            if ev.was_a::<RawLineEvent>() {
                let line = ev.get_tag::<RawLine>().unwrap().line;
                if line.starts_with("PING") {
                    conn.send("PONG :tok\r\n");
                }
                lines.push(line);
            }
            if ev.was_a::<StatusChangeEvent>() {
                let change = ev.get_tag::<StatusChange>().unwrap();
                statuses.push(change.new_status);
                if change.new_status == ConnectionStatus::Disconnected {
                    break 'outer;
                }
            }
        }
    }

    assert_eq!(
        lines,
        vec![":srv.test 001 nick :Welcome".to_string(), "PING :tok".to_string()]
    );
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
        ]
    );

    server.await.unwrap();
    driver_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_dial_lands_in_disconnected() {
    // Bind a port and close it again so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let irc = Irc::new();
    let conn = irc
        .load(|irc| ClientConnection::new(irc, &format!("127.0.0.1:{}", addr.port())))
        .unwrap();

    assert!(driver::run(conn.link()).await.is_err());
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);

    // Connecting -> Disconnected surfaced as events.
    let mut changes = Vec::new();
    while let Some(ev) = irc.fetch_event() {
        if ev.is_a::<StatusChangeEvent>() {
            changes.push(ev.get_tag::<StatusChange>().unwrap().new_status);
        }
    }
    assert_eq!(
        changes,
        vec![ConnectionStatus::Connecting, ConnectionStatus::Disconnected]
    );
}
