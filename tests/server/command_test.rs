/*!
 * Command Tests
 * Each verb end to end over a real socket
 */

use super::harness::TestServer;
use pretty_assertions::assert_eq;

#[test]
fn test_create_set_get() {
    let server = TestServer::start(1024);
    let mut conn = server.raw();

    let id = conn.create(8, "int");
    assert_eq!(id, 0);
    assert_eq!(conn.send_text(&format!("SET {id} 42")), "OK");

    let value = conn.send_text(&format!("GET {id}"));
    assert_eq!(value.len(), 8);
    assert_eq!(&value[..2], "42");
}

#[test]
fn test_set_value_keeps_spaces() {
    let server = TestServer::start(1024);
    let mut conn = server.raw();

    let id = conn.create(16, "string");
    assert_eq!(conn.send_text(&format!("SET {id} hello  world")), "OK");
    assert_eq!(&conn.send_text(&format!("GET {id}"))[..12], "hello  world");
}

#[test]
fn test_value_that_looks_like_an_error_is_still_a_value() {
    let server = TestServer::start(1024);
    let mut conn = server.raw();

    let id = conn.create(24, "string");
    conn.send_text(&format!("SET {id} ERROR: Invalid ID"));

    let response = conn.send(format!("GET {id}").as_bytes());
    assert!(response.is_success());
}

#[test]
fn test_error_replies() {
    let server = TestServer::start(64);
    let mut conn = server.raw();
    let id = conn.create(4, "int");

    assert_eq!(conn.send_text("CREATE 1000 int"), "ERROR: No memory available");
    assert_eq!(conn.send_text("CREATE 0 int"), "ERROR: No memory available");
    assert_eq!(conn.send_text(&format!("SET {id} 12345")), "ERROR: Invalid ID or size");
    assert_eq!(conn.send_text("SET 99 1"), "ERROR: Invalid ID or size");
    assert_eq!(conn.send_text("GET 99"), "ERROR: Invalid ID");
    assert_eq!(conn.send_text("INC_REF 99"), "ERROR: Invalid ID");
    assert_eq!(conn.send_text("DEC_REF 99"), "ERROR: Invalid ID");
    assert_eq!(conn.send_text("GET abc"), "ERROR: Malformed command");
    assert_eq!(conn.send_text("CREATE 4"), "ERROR: Malformed command");

    // The session survives every error
    assert_eq!(conn.send_text(&format!("SET {id} 7")), "OK");
}

#[test]
fn test_unknown_command_leaves_table_unchanged() {
    let server = TestServer::start(256);
    let mut conn = server.raw();
    conn.create(32, "int");
    let before = server.memory.blocks();

    for request in ["FREE 0", "get 0", "", "CREATEX 4 int", "\u{1F600}"] {
        assert_eq!(conn.send_text(request), "ERROR: Unknown command", "{request:?}");
    }
    assert_eq!(server.memory.blocks(), before);
}

#[test]
fn test_ref_counting_and_reclaim() {
    let server = TestServer::start(256);
    let mut conn = server.raw();
    let id = conn.create(16, "int");

    assert_eq!(conn.send_text(&format!("INC_REF {id}")), "OK");
    assert_eq!(server.ref_count(id), Some(2));
    assert_eq!(conn.send_text(&format!("DEC_REF {id}")), "OK");
    assert_eq!(conn.send_text(&format!("DEC_REF {id}")), "OK");
    assert_eq!(server.ref_count(id), Some(0));

    // Below zero is refused, not wrapped
    assert_eq!(conn.send_text(&format!("DEC_REF {id}")), "ERROR: Invalid ID");

    server.sweep();
    assert_eq!(conn.send_text(&format!("GET {id}")), "ERROR: Invalid ID");
    assert_eq!(server.memory.blocks().len(), 1);
}

#[test]
fn test_snapshots_written_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = remote_memory::server::ServerConfig::ephemeral(128);
    config.snapshot_dir = Some(dir.path().to_path_buf());

    let server = TestServer::start_with(config);
    let mut conn = server.raw();
    conn.create(16, "int");
    conn.send_text("GET 0");
    drop(conn);
    drop(server);

    let listings: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert!(listings
        .iter()
        .any(|text| text.contains("Type: int, RefCount: 1, Free: No")));
}
