//! Control-plane connection tests over real loopback sockets

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use nextgtp::conn::{Conn, ConnError, DialConfig};
use nextgtp::{GtpMessage, GtpVersion};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn local_server(
    restart_counter: u8,
) -> (
    std::sync::Arc<Conn>,
    tokio::sync::mpsc::Receiver<ConnError>,
) {
    Conn::listen_and_serve(
        GtpVersion::V2,
        "127.0.0.1:0".parse().unwrap(),
        restart_counter,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn dial_succeeds_against_listening_peer() {
    init_logging();
    let (server, _server_errors) = local_server(7).await;

    let (client, _client_errors) = Conn::dial(
        GtpVersion::V2,
        "127.0.0.1:0".parse().unwrap(),
        server.local_addr().unwrap(),
        1,
    )
    .await
    .unwrap();

    assert_eq!(client.restart_counter(), 1);
    client.close();
    server.close();
}

#[tokio::test]
async fn dial_gives_up_against_silent_peer() {
    init_logging();
    // bound but never answering
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let result = Conn::dial_with(
        GtpVersion::V2,
        "127.0.0.1:0".parse().unwrap(),
        silent.local_addr().unwrap(),
        1,
        DialConfig {
            timeout: Duration::from_millis(100),
            max_retries: Some(2),
        },
    )
    .await;

    match result {
        Err(ConnError::HandshakeTimeout { attempts, .. }) => assert_eq!(attempts, 2),
        Err(other) => panic!("expected handshake timeout, got {other:?}"),
        Ok(_) => panic!("dial unexpectedly succeeded against a silent peer"),
    }
}

#[tokio::test]
async fn default_echo_handler_answers_keepalive() {
    init_logging();
    let (server, _errors) = local_server(0x42).await;

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let request = GtpMessage::echo_request(GtpVersion::V2, 9, 0);
    probe
        .send_to(&request.encode(), server.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (n, _) = timeout(Duration::from_secs(2), probe.recv_from(&mut buf))
        .await
        .expect("no echo response")
        .unwrap();

    match GtpMessage::decode(&buf[..n]).unwrap() {
        GtpMessage::V2(nextgtp::v2::Gtp2Message::EchoResponse(m)) => {
            // response carries the server's restart counter
            assert_eq!(m.recovery.unwrap().as_recovery().unwrap(), 0x42);
            assert_eq!(m.header.sequence_number, 9);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
    server.close();
}

#[tokio::test]
async fn add_handler_overrides_default_echo_responder() {
    init_logging();
    let (server, _errors) = local_server(1).await;

    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::channel::<u8>(4);
    server.add_handler(1, move |_ep, _from, msg| {
        let seen_tx = seen_tx.clone();
        async move {
            seen_tx.send(msg.message_type()).await.ok();
            Ok(())
        }
    });

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let request = GtpMessage::echo_request(GtpVersion::V2, 1, 0);
    probe
        .send_to(&request.encode(), server.local_addr().unwrap())
        .await
        .unwrap();

    // the custom handler ran...
    let msg_type = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("custom handler not invoked")
        .unwrap();
    assert_eq!(msg_type, 1);

    // ...and the built-in responder did not: no reply on the wire
    let mut buf = [0u8; 64];
    assert!(timeout(Duration::from_millis(300), probe.recv_from(&mut buf))
        .await
        .is_err());
    server.close();
}

#[tokio::test]
async fn missing_handler_is_reported_not_fatal() {
    init_logging();
    let (server, mut errors) = local_server(1).await;

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let csr = nextgtp::v2::message::CreateSessionRequest::new(0, 1);
    let msg = GtpMessage::V2(nextgtp::v2::Gtp2Message::CreateSessionRequest(csr));
    probe
        .send_to(&msg.encode(), server.local_addr().unwrap())
        .await
        .unwrap();

    let err = timeout(Duration::from_secs(2), errors.recv())
        .await
        .expect("no error reported")
        .unwrap();
    match err {
        ConnError::NoHandlerFound { msg_type, .. } => assert_eq!(msg_type, 32),
        other => panic!("unexpected error: {other:?}"),
    }

    // the connection still serves after the unhandled message
    let request = GtpMessage::echo_request(GtpVersion::V2, 2, 0);
    probe
        .send_to(&request.encode(), server.local_addr().unwrap())
        .await
        .unwrap();
    let mut buf = [0u8; 64];
    timeout(Duration::from_secs(2), probe.recv_from(&mut buf))
        .await
        .expect("receive loop died after unhandled message")
        .unwrap();
    server.close();
}

#[tokio::test]
async fn version_not_supported_surfaces_on_error_channel() {
    init_logging();
    let (server, mut errors) = local_server(1).await;

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let vns = GtpMessage::version_not_supported(GtpVersion::V2, 3);
    probe
        .send_to(&vns.encode(), server.local_addr().unwrap())
        .await
        .unwrap();

    let err = timeout(Duration::from_secs(2), errors.recv())
        .await
        .expect("no error reported")
        .unwrap();
    assert!(matches!(err, ConnError::VersionNotSupportedByPeer(_)));
    server.close();
}

#[tokio::test]
async fn unknown_version_gets_version_not_supported_reply() {
    init_logging();
    let (server, mut errors) = local_server(1).await;

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // version bits = 7
    probe
        .send_to(&[0xE0, 0x01, 0x00, 0x00], server.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let (n, _) = timeout(Duration::from_secs(2), probe.recv_from(&mut buf))
        .await
        .expect("no reply to unsupported version")
        .unwrap();
    let reply = GtpMessage::decode(&buf[..n]).unwrap();
    assert_eq!(reply.message_type(), 3);

    let err = timeout(Duration::from_secs(2), errors.recv())
        .await
        .expect("no error reported")
        .unwrap();
    assert!(matches!(
        err,
        ConnError::Codec(nextgtp::GtpError::InvalidVersion(7))
    ));
    server.close();
}
