use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use twin_ftp::client::TransferOutcome;
use twin_ftp::config::{ClientConfig, ServerConfig};
use twin_ftp::protocol::{StatusLine, receive_line, send_line};
use twin_ftp::{FtpClient, Server};

const TIMEOUT: Duration = Duration::from_secs(5);

// Starts a server on an ephemeral port serving a fresh temp directory
async fn start_server() -> (SocketAddr, TempDir) {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        control_port: 0,
        upload_dir: upload_dir.path().to_string_lossy().into_owned(),
        max_clients: 4,
        connect_timeout_secs: 5,
    };

    let server = Server::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    (addr, upload_dir)
}

async fn connect_client(addr: SocketAddr, local_dir: &Path) -> FtpClient {
    let config = ClientConfig {
        local_dir: local_dir.to_path_buf(),
        accept_timeout: TIMEOUT,
    };
    FtpClient::connect(addr, config).await.unwrap()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[tokio::test]
async fn test_get_missing_file_reports_not_found() {
    let (addr, _upload_dir) = start_server().await;
    let local = tempfile::tempdir().unwrap();
    let mut client = connect_client(addr, local.path()).await;

    let reply = client.get("missing.txt").await.unwrap();

    assert_eq!(reply.statuses, vec![StatusLine::not_found()]);
    assert_eq!(reply.outcome, TransferOutcome::None);
    assert!(!local.path().join("missing.txt").exists());
}

#[tokio::test]
async fn test_get_missing_file_never_dials_data_port() {
    let (addr, _upload_dir) = start_server().await;
    let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = data_listener.local_addr().unwrap().port();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    send_line(&mut write_half, "GET missing.txt").await.unwrap();
    send_line(&mut write_half, &format!("Data-Port: {}", port))
        .await
        .unwrap();
    send_line(&mut write_half, "").await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "FAILURE 404 File Not Found");

    let dialed = tokio::time::timeout(Duration::from_millis(200), data_listener.accept()).await;
    assert!(dialed.is_err());
}

#[tokio::test]
async fn test_put_stores_exact_bytes() {
    let (addr, upload_dir) = start_server().await;
    let local = tempfile::tempdir().unwrap();
    let data = payload(10_000);
    std::fs::write(local.path().join("x.bin"), &data).unwrap();

    let mut client = connect_client(addr, local.path()).await;
    let reply = client.put("x.bin").await.unwrap();

    assert_eq!(
        reply.statuses,
        vec![StatusLine::ok(), StatusLine::upload_complete()]
    );
    assert_eq!(reply.outcome, TransferOutcome::Uploaded { bytes: 10_000 });
    assert_eq!(std::fs::read(upload_dir.path().join("x.bin")).unwrap(), data);
}

#[tokio::test]
async fn test_put_then_get_round_trip() {
    let (addr, _upload_dir) = start_server().await;
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let data = payload(4096 * 3 + 17);
    std::fs::write(source.path().join("round.bin"), &data).unwrap();

    let mut uploader = connect_client(addr, source.path()).await;
    assert!(uploader.put("round.bin").await.unwrap().is_success());

    let mut downloader = connect_client(addr, target.path()).await;
    let reply = downloader.get("round.bin").await.unwrap();

    assert_eq!(reply.statuses, vec![StatusLine::ok()]);
    match reply.outcome {
        TransferOutcome::Downloaded { path, bytes } => {
            assert_eq!(bytes, data.len() as u64);
            assert_eq!(std::fs::read(path).unwrap(), data);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_ls_lists_regular_files() {
    let (addr, upload_dir) = start_server().await;
    std::fs::write(upload_dir.path().join("x.txt"), b"x").unwrap();
    std::fs::write(upload_dir.path().join("y.txt"), b"y").unwrap();
    std::fs::create_dir(upload_dir.path().join("subdir")).unwrap();

    let local = tempfile::tempdir().unwrap();
    let mut client = connect_client(addr, local.path()).await;
    let reply = client.list().await.unwrap();

    assert_eq!(reply.statuses, vec![StatusLine::ok()]);
    let TransferOutcome::Listing(entries) = reply.outcome else {
        panic!("expected a listing");
    };
    let names: HashSet<String> = entries.into_iter().collect();
    let expected: HashSet<String> = ["x.txt", "y.txt"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_ls_of_empty_directory() {
    let (addr, _upload_dir) = start_server().await;
    let local = tempfile::tempdir().unwrap();
    let mut client = connect_client(addr, local.path()).await;

    let reply = client.list().await.unwrap();

    assert_eq!(reply.statuses, vec![StatusLine::ok()]);
    assert_eq!(reply.outcome, TransferOutcome::Listing(Vec::new()));
}

#[tokio::test]
async fn test_quit_says_goodbye_and_closes() {
    let (addr, _upload_dir) = start_server().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    send_line(&mut write_half, "QUIT").await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "SUCCESS 200 Goodbye");
    assert_eq!(receive_line(&mut reader).await.unwrap(), None);
}

#[tokio::test]
async fn test_client_quit_closes_session() {
    let (addr, _upload_dir) = start_server().await;
    let local = tempfile::tempdir().unwrap();
    let mut client = connect_client(addr, local.path()).await;

    let reply = client.execute("quit").await.unwrap();

    assert_eq!(reply.statuses, vec![StatusLine::goodbye()]);
    assert_eq!(reply.outcome, TransferOutcome::Closed);
    assert!(client.is_closed());
    assert!(client.list().await.is_err());
}

#[tokio::test]
async fn test_unknown_commands_keep_session_alive() {
    let (addr, _upload_dir) = start_server().await;
    let local = tempfile::tempdir().unwrap();
    let mut client = connect_client(addr, local.path()).await;

    for _ in 0..3 {
        let reply = client.execute("FOO").await.unwrap();
        assert_eq!(reply.statuses, vec![StatusLine::bad_request("Invalid Command")]);
    }

    let reply = client.execute("GET").await.unwrap();
    assert_eq!(
        reply.statuses,
        vec![StatusLine::bad_request("Invalid GET command format")]
    );

    let reply = client.list().await.unwrap();
    assert!(reply.is_success());
}

#[tokio::test]
async fn test_put_with_zero_content_length_is_rejected() {
    let (addr, upload_dir) = start_server().await;
    let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = data_listener.local_addr().unwrap().port();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    send_line(&mut write_half, "PUT zero.bin").await.unwrap();
    send_line(&mut write_half, &format!("Data-Port: {}", port))
        .await
        .unwrap();
    send_line(&mut write_half, "").await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "SUCCESS 200 OK");

    let (mut data, _) = tokio::time::timeout(TIMEOUT, data_listener.accept())
        .await
        .unwrap()
        .unwrap();
    data.write_all(b"Content-Length: 0\n\n").await.unwrap();
    data.shutdown().await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "FAILURE 400 Invalid file size");
    assert!(!upload_dir.path().join("zero.bin").exists());
}

#[tokio::test]
async fn test_sessions_run_concurrently() {
    let (addr, upload_dir) = start_server().await;
    std::fs::write(upload_dir.path().join("shared.bin"), payload(50_000)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        handles.push(tokio::spawn(async move {
            let local = tempfile::tempdir().unwrap();
            let mut client = connect_client(addr, local.path()).await;
            let reply = client.get("shared.bin").await.unwrap();
            client.quit().await.unwrap();
            reply.outcome
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            TransferOutcome::Downloaded { bytes, .. } => assert_eq!(bytes, 50_000),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_unreachable_data_port_reports_connection_failure() {
    let (addr, upload_dir) = start_server().await;
    std::fs::write(upload_dir.path().join("present.txt"), b"data").unwrap();

    let closed_port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    for command in ["GET present.txt", "PUT other.txt", "LS"] {
        send_line(&mut write_half, command).await.unwrap();
        send_line(&mut write_half, &format!("Data-Port: {}", closed_port))
            .await
            .unwrap();
        send_line(&mut write_half, "").await.unwrap();

        let status = receive_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(status, "SUCCESS 200 OK", "{command}");
        let status = receive_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(status, "FAILURE 500 Data Connection Failed", "{command}");
    }

    send_line(&mut write_half, "QUIT").await.unwrap();
    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "SUCCESS 200 Goodbye");
}

#[tokio::test]
async fn test_short_upload_reports_transfer_failure() {
    let (addr, upload_dir) = start_server().await;
    let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = data_listener.local_addr().unwrap().port();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    send_line(&mut write_half, "PUT partial.bin").await.unwrap();
    send_line(&mut write_half, &format!("Data-Port: {}", port))
        .await
        .unwrap();
    send_line(&mut write_half, "").await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "SUCCESS 200 OK");

    let (mut data, _) = tokio::time::timeout(TIMEOUT, data_listener.accept())
        .await
        .unwrap()
        .unwrap();
    data.write_all(b"Content-Length: 100\n\n").await.unwrap();
    data.write_all(&[b'z'; 40]).await.unwrap();
    data.shutdown().await.unwrap();

    let status = receive_line(&mut reader).await.unwrap().unwrap();
    assert_eq!(status, "FAILURE 500 Transfer Failed");

    let stored = std::fs::read(upload_dir.path().join("partial.bin")).unwrap();
    assert_eq!(stored, vec![b'z'; 40]);
}
