//! Thin binary: opens a UDP socket to the game server and a TCP stream to
//! the GUI bridge, and drives [`worms_client::ClientSessionState`] from a
//! simple poll loop. As in the server binary, the socket/timer plumbing here
//! is the external collaborator; the protocol logic lives in the library.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use log::error;

use worms_client::cli::ClientArgs;
use worms_client::ClientSessionState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(worms_protocol::CLIENT_HEARTBEAT_MILLIS);
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const MAX_SERVER_DATAGRAM: usize = 548;

fn session_id_from_wall_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() {
    env_logger::init();
    let args = ClientArgs::parse();

    let server_addr = match (args.game_server.as_str(), args.server_port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                eprintln!("worms-client: could not resolve {}", args.game_server);
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("worms-client: failed to resolve {}: {err}", args.game_server);
            std::process::exit(1);
        }
    };

    let socket = match UdpSocket::bind("[::]:0").or_else(|_| UdpSocket::bind("0.0.0.0:0")) {
        Ok(socket) => socket,
        Err(err) => {
            eprintln!("worms-client: failed to open a UDP socket: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = socket.connect(server_addr) {
        eprintln!("worms-client: failed to connect to {server_addr}: {err}");
        std::process::exit(1);
    }
    socket
        .set_read_timeout(Some(POLL_INTERVAL))
        .expect("a nonzero timeout is always valid");

    let gui_addr = format!("{}:{}", args.gui_server, args.gui_port);
    let tcp_stream = match TcpStream::connect(&gui_addr) {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("worms-client: failed to connect to GUI at {gui_addr}: {err}");
            std::process::exit(1);
        }
    };
    tcp_stream.set_nodelay(true).expect("TCP_NODELAY is always settable on a connected stream");
    tcp_stream
        .set_read_timeout(Some(POLL_INTERVAL))
        .expect("a nonzero timeout is always valid");
    let mut gui_writer = tcp_stream.try_clone().expect("stream is duplicable");
    let mut gui_reader = BufReader::new(tcp_stream);

    let mut session = ClientSessionState::new(args.player_name, session_id_from_wall_clock());
    let mut next_heartbeat = Instant::now();
    let mut recv_buf = [0u8; MAX_SERVER_DATAGRAM];
    let mut gui_line = String::new();

    loop {
        if Instant::now() >= next_heartbeat {
            let datagram = session.heartbeat_datagram();
            if let Err(err) = socket.send(&datagram) {
                log::warn!("short send to server: {err}");
            }
            next_heartbeat = Instant::now() + HEARTBEAT_INTERVAL;
        }

        match socket.recv(&mut recv_buf) {
            Ok(len) => match session.process_datagram(&recv_buf[..len]) {
                Ok(lines) => {
                    for line in lines {
                        if let Err(err) = writeln!(gui_writer, "{line}") {
                            error!("GUI connection write failed: {err}");
                            std::process::exit(1);
                        }
                    }
                }
                Err(violation) => {
                    error!("fatal protocol violation: {violation}");
                    std::process::exit(1);
                }
            },
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock || err.kind() == std::io::ErrorKind::TimedOut => {}
            Err(err) => {
                error!("fatal socket error: {err}");
                std::process::exit(1);
            }
        }

        gui_line.clear();
        match gui_reader.read_line(&mut gui_line) {
            Ok(0) => {
                error!("GUI disconnected");
                std::process::exit(1);
            }
            Ok(_) => session.handle_gui_line(gui_line.trim_end_matches('\n')),
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock || err.kind() == std::io::ErrorKind::TimedOut => {}
            Err(err) => {
                error!("fatal GUI connection error: {err}");
                std::process::exit(1);
            }
        }
    }
}
