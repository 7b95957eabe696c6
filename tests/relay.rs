//! User-plane relay and kernel-offload tests over real loopback sockets

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use nextgtp::conn::{ConnError, KernelTunnel, Role, UPlaneConn};
use nextgtp::v1::Gtp1Message;
use nextgtp::{GtpMessage, GtpVersion};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn bind_uplane() -> (
    Arc<UPlaneConn>,
    tokio::sync::mpsc::Receiver<ConnError>,
) {
    UPlaneConn::bind("127.0.0.1:0".parse().unwrap(), 1)
        .await
        .unwrap()
}

#[tokio::test]
async fn relay_rewrites_teid_and_forwards() {
    init_logging();
    let (ingress, _ingress_errors) = bind_uplane().await;
    let (egress, _egress_errors) = bind_uplane().await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    ingress
        .relay_to(
            &egress,
            0x11111111,
            0x22222222,
            receiver.local_addr().unwrap(),
        )
        .unwrap();

    let payload = Bytes::from_static(b"\x45\x00\x00\x54user packet bytes");
    let gpdu = Gtp1Message::g_pdu(0x11111111, payload);
    let wire = gpdu.encode();
    sender
        .send_to(&wire, ingress.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (n, from) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .expect("relayed datagram never arrived")
        .unwrap();

    // forwarded out the egress connection's socket
    assert_eq!(from, egress.local_addr().unwrap());

    // byte-for-byte identical except the rewritten TEID
    let mut expected = wire.to_vec();
    expected[4..8].copy_from_slice(&0x22222222u32.to_be_bytes());
    assert_eq!(&buf[..n], &expected[..]);

    ingress.close();
    egress.close();
}

#[tokio::test]
async fn unknown_teid_is_dropped_without_error() {
    init_logging();
    let (ingress, mut ingress_errors) = bind_uplane().await;
    let (egress, _egress_errors) = bind_uplane().await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    ingress
        .relay_to(
            &egress,
            0x11111111,
            0x22222222,
            receiver.local_addr().unwrap(),
        )
        .unwrap();

    // TEID with no association
    let gpdu = Gtp1Message::g_pdu(0x33333333, Bytes::from_static(b"orphan"));
    sender
        .send_to(&gpdu.encode(), ingress.local_addr().unwrap())
        .await
        .unwrap();

    // nothing forwarded
    let mut buf = [0u8; 64];
    assert!(
        timeout(Duration::from_millis(300), receiver.recv_from(&mut buf))
            .await
            .is_err()
    );
    // and nothing on the error channel: the drop is by design
    assert!(ingress_errors.try_recv().is_err());

    ingress.close();
    egress.close();
}

#[tokio::test]
async fn removed_relay_stops_forwarding() {
    init_logging();
    let (ingress, _errors) = bind_uplane().await;
    let (egress, _egress_errors) = bind_uplane().await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    ingress
        .relay_to(&egress, 0x10, 0x20, receiver.local_addr().unwrap())
        .unwrap();
    assert!(ingress.remove_relay(0x10));
    assert!(!ingress.remove_relay(0x10));

    let gpdu = Gtp1Message::g_pdu(0x10, Bytes::from_static(b"late"));
    sender
        .send_to(&gpdu.encode(), ingress.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    assert!(
        timeout(Duration::from_millis(300), receiver.recv_from(&mut buf))
            .await
            .is_err()
    );
    ingress.close();
    egress.close();
}

#[tokio::test]
async fn echo_still_handled_while_relaying() {
    init_logging();
    let (ingress, _errors) = bind_uplane().await;
    let (egress, _egress_errors) = bind_uplane().await;
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    ingress
        .relay_to(&egress, 0x1, 0x2, receiver.local_addr().unwrap())
        .unwrap();

    // keepalives bypass the relay fast path and hit the registry
    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let request = GtpMessage::echo_request(GtpVersion::V1, 5, 0);
    probe
        .send_to(&request.encode(), ingress.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let (n, _) = timeout(Duration::from_secs(2), probe.recv_from(&mut buf))
        .await
        .expect("no echo response while relaying")
        .unwrap();
    let reply = GtpMessage::decode(&buf[..n]).unwrap();
    assert_eq!(reply.version(), GtpVersion::V1);
    assert_eq!(reply.message_type(), 2);

    ingress.close();
    egress.close();
}

// ----------------------------------------------------------------------
// Kernel offload
// ----------------------------------------------------------------------

#[derive(Default)]
struct FakeKernelDevice {
    calls: Mutex<Vec<String>>,
    fail_enable: bool,
}

impl KernelTunnel for FakeKernelDevice {
    fn name(&self) -> &str {
        "gtp-test0"
    }

    fn enable(&self, role: Role) -> io::Result<()> {
        if self.fail_enable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "no cap"));
        }
        self.calls.lock().unwrap().push(format!("enable {role:?}"));
        Ok(())
    }

    fn add_tunnel(&self, peer: IpAddr, ms: IpAddr, otei: u32, itei: u32) -> io::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add {peer} {ms} {otei:#x} {itei:#x}"));
        Ok(())
    }

    fn add_tunnel_override(&self, peer: IpAddr, ms: IpAddr, otei: u32, itei: u32) -> io::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("override {peer} {ms} {otei:#x} {itei:#x}"));
        Ok(())
    }

    fn del_tunnel_by_itei(&self, itei: u32) -> io::Result<()> {
        self.calls.lock().unwrap().push(format!("del itei {itei:#x}"));
        Ok(())
    }

    fn del_tunnel_by_ms_address(&self, ms: IpAddr) -> io::Result<()> {
        self.calls.lock().unwrap().push(format!("del ms {ms}"));
        Ok(())
    }
}

#[tokio::test]
async fn kernel_and_userland_modes_are_mutually_exclusive() {
    init_logging();
    let (conn, _errors) = bind_uplane().await;
    let (other, _other_errors) = bind_uplane().await;
    let peer_addr = "127.0.0.1:2152".parse().unwrap();

    // tunnel CRUD requires kernel mode
    let ms: IpAddr = "10.45.0.2".parse().unwrap();
    let peer: IpAddr = "127.0.0.2".parse().unwrap();
    assert!(matches!(
        conn.add_tunnel(peer, ms, 1, 2),
        Err(ConnError::KernelNotEnabled)
    ));

    conn.enable_kernel_gtp(Box::new(FakeKernelDevice::default()), Role::Sgsn)
        .unwrap();
    assert!(conn.kernel_gtp_enabled());

    // userland relay is refused while the kernel owns the data path
    assert!(matches!(
        conn.relay_to(&other, 0x1, 0x2, peer_addr),
        Err(ConnError::KernelActive)
    ));

    conn.add_tunnel(peer, ms, 0x100, 0x200).unwrap();
    conn.add_tunnel_override(peer, ms, 0x100, 0x201).unwrap();
    conn.del_tunnel_by_itei(0x201).unwrap();
    conn.del_tunnel_by_ms_address(ms).unwrap();

    // switching back clears kernel mode and relay works again
    conn.disable_kernel_gtp();
    assert!(!conn.kernel_gtp_enabled());
    conn.relay_to(&other, 0x1, 0x2, peer_addr).unwrap();

    conn.close();
    other.close();
}

#[tokio::test]
async fn failed_enable_keeps_userland_mode() {
    init_logging();
    let (conn, _errors) = bind_uplane().await;
    let device = FakeKernelDevice {
        fail_enable: true,
        ..Default::default()
    };

    match conn.enable_kernel_gtp(Box::new(device), Role::Ggsn) {
        Err(ConnError::Kernel { device, op, .. }) => {
            assert_eq!(device, "gtp-test0");
            assert_eq!(op, "enable");
        }
        other => panic!("expected kernel error, got {other:?}"),
    }
    assert!(!conn.kernel_gtp_enabled());
    conn.close();
}
