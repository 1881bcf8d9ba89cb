/*!
 * Session Tests
 * Framing, concurrency, and connection lifetime
 */

use super::harness::{RawConnection, TestServer};
use pretty_assertions::assert_eq;
use remote_memory::protocol::read_frame_blocking;
use remote_memory::server::{Server, ServerConfig, ServerError};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_fragmented_request_is_reassembled() {
    let server = TestServer::start(256);
    let mut conn = server.raw();

    let request = b"CREATE 8 int";
    let mut frame = (request.len() as u32).to_be_bytes().to_vec();
    frame.extend_from_slice(request);
    for byte in &frame {
        conn.stream.write_all(std::slice::from_ref(byte)).unwrap();
        conn.stream.flush().unwrap();
        std::thread::sleep(Duration::from_millis(1));
    }

    let reply = read_frame_blocking(&mut conn.stream, 1024).unwrap().unwrap();
    assert_eq!(reply, b"+0".to_vec());
}

#[test]
fn test_pipelined_requests_answered_in_order() {
    let server = TestServer::start(256);
    let mut conn = server.raw();

    let mut batch = Vec::new();
    for request in ["CREATE 8 int", "SET 0 5", "GET 0"] {
        batch.extend_from_slice(&(request.len() as u32).to_be_bytes());
        batch.extend_from_slice(request.as_bytes());
    }
    conn.stream.write_all(&batch).unwrap();

    let replies: Vec<Vec<u8>> = (0..3)
        .map(|_| read_frame_blocking(&mut conn.stream, 1024).unwrap().unwrap())
        .collect();
    assert_eq!(replies[0], b"+0".to_vec());
    assert_eq!(replies[1], b"+OK".to_vec());
    assert_eq!(&replies[2][..2], b"+5");
}

#[test]
fn test_oversized_frame_closes_session() {
    let mut config = ServerConfig::ephemeral(64);
    config.max_frame_len = 128;
    let server = TestServer::start_with(config);
    let mut conn = server.raw();

    conn.stream.write_all(&10_000u32.to_be_bytes()).unwrap();
    assert!(matches!(read_frame_blocking(&mut conn.stream, 1024), Ok(None) | Err(_)));

    // Other sessions are unaffected
    assert_eq!(server.raw().create(8, "int"), 0);
}

#[test]
fn test_idle_session_is_closed() {
    let mut config = ServerConfig::ephemeral(64);
    config.idle_timeout = Duration::from_millis(100);
    let server = TestServer::start_with(config);
    let mut conn = server.raw();

    std::thread::sleep(Duration::from_millis(400));
    assert!(matches!(read_frame_blocking(&mut conn.stream, 1024), Ok(None) | Err(_)));
}

#[test]
fn test_sessions_share_one_table() {
    let server = TestServer::start(1024);
    let mut first = server.raw();
    let mut second = server.raw();

    let id = first.create(8, "int");
    assert_eq!(second.send_text(&format!("SET {id} 99")), "OK");
    assert_eq!(&first.send_text(&format!("GET {id}"))[..2], "99");
}

#[test]
fn test_concurrent_ref_updates_are_not_lost() {
    let server = TestServer::start(1024);
    let id = server.raw().create(8, "int");

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let addr = server.addr;
            std::thread::spawn(move || {
                let mut conn = RawConnection::connect(addr);
                for _ in 0..100 {
                    assert_eq!(conn.send_text(&format!("INC_REF {id}")), "OK");
                    if i % 2 == 1 {
                        assert_eq!(conn.send_text(&format!("DEC_REF {id}")), "OK");
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // 1 initial + 3 incrementing workers * 100
    assert_eq!(server.ref_count(id), Some(301));
}

#[test]
fn test_connection_limit_queues_extra_clients() {
    let mut config = ServerConfig::ephemeral(256);
    config.max_connections = 1;
    let server = TestServer::start_with(config);

    let mut first = server.raw();
    assert_eq!(first.create(8, "int"), 0);

    let addr = server.addr;
    let waiting = std::thread::spawn(move || RawConnection::connect(addr).create(8, "int"));

    std::thread::sleep(Duration::from_millis(100));
    assert!(!waiting.is_finished());

    drop(first);
    assert_eq!(waiting.join().unwrap(), 1);
}

#[tokio::test]
async fn test_server_sweeps_through_its_gc_task() {
    let mut config = ServerConfig::ephemeral(256);
    config.gc_interval = Duration::from_secs(3600);
    let server = Server::bind(config).await.unwrap();
    assert_eq!(server.config().arena_size, 256);
    assert_eq!(server.gc().interval(), Duration::from_secs(3600));

    let id = server.memory().allocate(16, "int").unwrap();
    server.memory().dec_ref(id).unwrap();
    let stats = server.gc().sweep_now().await.expect("gc running");
    assert_eq!(stats.reclaimed_blocks, 1);
    assert!(server.memory().block(id).map_or(true, |b| b.free));

    server.run_until(async {}).await.unwrap();
}

#[tokio::test]
async fn test_unallocatable_arena_is_a_bind_error() {
    let mut config = ServerConfig::ephemeral(1 << 62);
    config.max_frame_len = usize::MAX;

    let result = Server::bind(config).await;
    assert!(matches!(result, Err(ServerError::Arena(_))));
}
