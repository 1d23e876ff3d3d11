//! Thin binary: parses CLI flags, opens a dual-stack UDP socket, and drives
//! [`worms_server::GameController`] from a simple poll loop. The socket and
//! timer plumbing here are the external collaborators the core logic doesn't
//! depend on; everything interesting happens inside the library crate.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use log::{error, warn};
use socket2::{Domain, Socket, Type};

use worms_protocol::codec::{read_u32, read_u64, read_u8};
use worms_server::cli::ServerArgs;
use worms_server::GameController;

const MIN_DATAGRAM_LEN: usize = 13;
const MAX_DATAGRAM_LEN: usize = 33;
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn wall_clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn bind_dual_stack(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, None)?;
    socket.set_only_v6(false)?;
    socket.set_nonblocking(false)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    let addr: SocketAddr = format!("[::]:{port}").parse().expect("literal address is well-formed");
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

struct HeartbeatDatagram {
    session_id: u64,
    turn_direction: u8,
    next_expected_event_no: u32,
    player_name: String,
}

fn parse_heartbeat(buf: &[u8]) -> Option<HeartbeatDatagram> {
    if !(MIN_DATAGRAM_LEN..=MAX_DATAGRAM_LEN).contains(&buf.len()) {
        return None;
    }
    let session_id = read_u64(buf, 0).ok()?;
    let turn_direction = read_u8(buf, 8).ok()?;
    let next_expected_event_no = read_u32(buf, 9).ok()?;
    let name_bytes = &buf[13..];
    if !name_bytes.iter().all(|&b| (33..=126).contains(&b)) {
        return None;
    }
    let player_name = String::from_utf8(name_bytes.to_vec()).ok()?;
    Some(HeartbeatDatagram {
        session_id,
        turn_direction,
        next_expected_event_no,
        player_name,
    })
}

fn main() {
    env_logger::init();
    let args = ServerArgs::parse();
    if let Err(err) = args.validate() {
        eprintln!("worms-server: {err}");
        std::process::exit(1);
    }

    let seed = args.seed.unwrap_or_else(wall_clock_seed);
    let socket = match bind_dual_stack(args.port) {
        Ok(socket) => socket,
        Err(err) => {
            eprintln!("worms-server: failed to bind port {}: {err}", args.port);
            std::process::exit(1);
        }
    };

    let mut controller = GameController::new(seed, args.turning_speed, args.width, args.height);
    let tick_interval = Duration::from_nanos(1_000_000_000 / args.rounds_per_sec as u64);
    let mut next_tick = Instant::now() + tick_interval;
    let mut recv_buf = [0u8; MAX_DATAGRAM_LEN];

    loop {
        match socket.recv_from(&mut recv_buf) {
            Ok((len, src)) => {
                if let Some(datagram) = parse_heartbeat(&recv_buf[..len]) {
                    let src_socket = match src {
                        SocketAddr::V4(_) | SocketAddr::V6(_) => src,
                    };
                    let started = controller.on_client_datagram(
                        src_socket,
                        datagram.session_id,
                        datagram.player_name,
                        datagram.turn_direction,
                        datagram.next_expected_event_no as usize,
                        Instant::now(),
                        |bytes| {
                            if let Err(err) = socket.send_to(bytes, src) {
                                warn!("short send to {src}: {err}");
                            }
                        },
                    );
                    if started {
                        next_tick = Instant::now() + tick_interval;
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock || err.kind() == std::io::ErrorKind::TimedOut => {}
            Err(err) => {
                error!("fatal socket error: {err}");
                std::process::exit(1);
            }
        }

        let now = Instant::now();
        while now >= next_tick {
            let recipients: Vec<SocketAddr> = controller.registry.iter().map(|(_, c)| c.addr).collect();
            controller.on_tick(now, |bytes| {
                for addr in &recipients {
                    if let Err(err) = socket.send_to(bytes, addr) {
                        warn!("short send to {addr}: {err}");
                    }
                }
            });
            next_tick += tick_interval;
        }
    }
}
