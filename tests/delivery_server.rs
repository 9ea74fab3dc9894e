//! Delivery server tests over real TCP sockets.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

use vocast::broadcast::{BroadcastQueue, LineUpdate};
use vocast::server::DeliveryServer;

const GREETING: &str = "Hello, client!";

async fn start_server(queue: BroadcastQueue) -> (std::net::SocketAddr, watch::Sender<bool>) {
    let server = DeliveryServer::bind("127.0.0.1:0")
        .await
        .unwrap()
        .with_greeting(GREETING)
        .with_subscriber_wait(Duration::from_millis(50));
    let addr = server.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.serve(queue, shutdown_rx));

    (addr, shutdown_tx)
}

async fn connect(addr: std::net::SocketAddr) -> BufReader<TcpStream> {
    let stream = TcpStream::connect(addr).await.unwrap();
    BufReader::new(stream)
}

async fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for a line")
        .unwrap();
    line.trim_end().to_string()
}

fn update(index: usize, text: &str) -> LineUpdate {
    LineUpdate {
        index,
        text: text.to_string(),
        open: true,
    }
}

#[tokio::test]
async fn subscriber_gets_greeting_then_json_updates() {
    let queue = BroadcastQueue::new(16);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    let mut reader = connect(addr).await;
    assert_eq!(read_line(&mut reader).await, GREETING);

    // The greeting is written after the cursor exists, so this publish is
    // guaranteed to be seen.
    queue.publish(update(0, "first line"));

    let line = read_line(&mut reader).await;
    let decoded: LineUpdate = serde_json::from_str(&line).unwrap();
    assert_eq!(decoded, update(0, "first line"));
}

#[tokio::test]
async fn late_subscriber_only_sees_later_updates() {
    let queue = BroadcastQueue::new(16);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    let mut early = connect(addr).await;
    assert_eq!(read_line(&mut early).await, GREETING);

    queue.publish(update(0, "early only"));
    assert_eq!(
        serde_json::from_str::<LineUpdate>(&read_line(&mut early).await).unwrap(),
        update(0, "early only")
    );

    let mut late = connect(addr).await;
    assert_eq!(read_line(&mut late).await, GREETING);

    queue.publish(update(1, "both"));

    assert_eq!(
        serde_json::from_str::<LineUpdate>(&read_line(&mut early).await).unwrap(),
        update(1, "both")
    );
    assert_eq!(
        serde_json::from_str::<LineUpdate>(&read_line(&mut late).await).unwrap(),
        update(1, "both")
    );
}

#[tokio::test]
async fn dropped_subscriber_does_not_affect_others() {
    let queue = BroadcastQueue::new(16);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    let mut doomed = connect(addr).await;
    assert_eq!(read_line(&mut doomed).await, GREETING);
    let mut survivor = connect(addr).await;
    assert_eq!(read_line(&mut survivor).await, GREETING);

    drop(doomed);

    // Give the server a moment to notice the dead connection.
    queue.publish(update(0, "a"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    queue.publish(update(1, "b"));

    assert_eq!(
        serde_json::from_str::<LineUpdate>(&read_line(&mut survivor).await).unwrap(),
        update(0, "a")
    );
    assert_eq!(
        serde_json::from_str::<LineUpdate>(&read_line(&mut survivor).await).unwrap(),
        update(1, "b")
    );
}

#[tokio::test]
async fn updates_arrive_in_publish_order() {
    let queue = BroadcastQueue::new(64);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    let mut reader = connect(addr).await;
    assert_eq!(read_line(&mut reader).await, GREETING);

    for i in 0..10 {
        queue.publish(update(i, &format!("line {i}")));
    }

    for i in 0..10 {
        let decoded: LineUpdate = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert_eq!(decoded.index, i);
        assert_eq!(decoded.text, format!("line {i}"));
    }
}

#[tokio::test]
async fn abrupt_client_reset_does_not_stop_the_accept_loop() {
    let queue = BroadcastQueue::new(16);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    // Reset a few connections as abruptly as possible (zero linger sends RST
    // on close, which can surface as an accept-time error on the server).
    for _ in 0..3 {
        let stream = TcpStream::connect(addr).await.unwrap();
        stream.set_linger(Some(Duration::ZERO)).unwrap();
        drop(stream);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The server still accepts and serves new subscribers.
    let mut reader = connect(addr).await;
    assert_eq!(read_line(&mut reader).await, GREETING);

    queue.publish(update(0, "still serving"));
    let decoded: LineUpdate = serde_json::from_str(&read_line(&mut reader).await).unwrap();
    assert_eq!(decoded, update(0, "still serving"));
}

#[tokio::test]
async fn idle_hangup_is_noticed_without_a_publish() {
    let queue = BroadcastQueue::new(16);
    let (addr, _shutdown) = start_server(queue.clone()).await;

    let mut reader = connect(addr).await;
    assert_eq!(read_line(&mut reader).await, GREETING);
    assert_eq!(queue.subscriber_count(), 1);

    drop(reader);

    // The subscriber loop's timeout probe reaps the dead connection within a
    // few wait periods even though nothing is ever published.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(queue.subscriber_count(), 0);
}

#[tokio::test]
async fn shutdown_closes_subscriber_streams() {
    let queue = BroadcastQueue::new(16);
    let (addr, shutdown) = start_server(queue.clone()).await;

    let mut reader = connect(addr).await;
    assert_eq!(read_line(&mut reader).await, GREETING);

    shutdown.send(true).unwrap();

    // The subscriber loop notices the flag within one wait period and closes
    // the connection; read_line then yields EOF (empty string).
    let mut line = String::new();
    let n = tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("server did not close the connection")
        .unwrap();
    assert_eq!(n, 0);

    // New connections are no longer accepted once shutdown completes.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        TcpStream::connect(addr).await.is_err(),
        "accept loop should have stopped"
    );
}
