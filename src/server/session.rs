//! Control-channel session loop.
//!
//! Reads command lines one at a time and hands each to the dispatcher. The
//! next line is not read until the previous command's exchange, data channel
//! included, has finished.

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;

use crate::error::{FtpError, ProtocolError};
use crate::middleware::logging::{log_command, log_disconnect, log_status};
use crate::protocol::{
    CommandStatus, Dispatcher, SessionState, StatusLine, parse_command, receive_line, send_line,
};
use crate::server::state::Session;

/// Drives one accepted control connection to completion.
pub async fn handle_session(stream: TcpStream, peer_addr: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut session = Session::new(peer_addr);

    if let Err(e) = run_session(&mut session, &dispatcher, &mut reader, &mut write_half).await {
        error!("Session with {} ended with error: {}", peer_addr, e);
    }

    log_disconnect(peer_addr, session.commands_handled());
}

/// Runs the command loop until `QUIT`, peer EOF, or a control-channel fault.
pub async fn run_session<R, W>(
    session: &mut Session,
    dispatcher: &Dispatcher,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), FtpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        session.transition(SessionState::AwaitCommand);

        let line = match receive_line(reader).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Connection closed by client {}", session.peer_addr());
                session.transition(SessionState::Closed);
                return Ok(());
            }
            Err(e @ (ProtocolError::LineTooLong(_) | ProtocolError::InvalidUtf8)) => {
                warn!("Malformed command line from {}: {}", session.peer_addr(), e);
                let status = StatusLine::bad_request("Malformed command line");
                send_line(writer, &status.to_string()).await?;
                log_status(session.peer_addr(), &status);
                continue;
            }
            Err(e) => {
                session.transition(SessionState::Closed);
                return Err(e.into());
            }
        };

        let command = parse_command(&line);
        log_command(session.peer_addr(), &command);

        match dispatcher
            .handle_command(session, &command, reader, writer)
            .await
        {
            Ok(CommandStatus::CloseConnection) => {
                session.record_command();
                session.transition(SessionState::Closed);
                return Ok(());
            }
            Ok(_) => session.record_command(),
            Err(e) => {
                session.transition(SessionState::Closed);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::framing::MAX_LINE_LENGTH;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, duplex};

    fn dispatcher(dir: &std::path::Path) -> Dispatcher {
        Dispatcher::new(dir, Duration::from_secs(1))
    }

    async fn read_status<R: AsyncBufRead + Unpin>(reader: &mut R) -> StatusLine {
        let line = receive_line(reader).await.unwrap().unwrap();
        StatusLine::parse(&line).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_verbs_are_rejected_without_ending_session() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path());

        let (client, server) = duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_read);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_reader = BufReader::new(client_read);

        let mut session = Session::new("127.0.0.1:40000".parse().unwrap());
        let server_task = tokio::spawn(async move {
            let result =
                run_session(&mut session, &dispatcher, &mut server_reader, &mut server_write).await;
            (result, session)
        });

        for _ in 0..5 {
            send_line(&mut client_write, "FOO").await.unwrap();
            let status = read_status(&mut client_reader).await;
            assert_eq!(status.to_string(), "FAILURE 400 Invalid Command");
        }

        client_write.shutdown().await.unwrap();

        let (result, session) = server_task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(session.commands_handled(), 5);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_malformed_payload_verb_consumes_its_header_block() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path());

        let (client, server) = duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_read);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_reader = BufReader::new(client_read);

        let mut session = Session::new("127.0.0.1:40001".parse().unwrap());
        let server_task = tokio::spawn(async move {
            run_session(&mut session, &dispatcher, &mut server_reader, &mut server_write).await
        });

        client_write.write_all(b"GET\nData-Port: 1\n\n").await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Invalid GET command format");

        client_write.write_all(b"LS\n\n").await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Missing Data-Port");

        send_line(&mut client_write, "QUIT").await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "SUCCESS 200 Goodbye");
        assert_eq!(receive_line(&mut client_reader).await.unwrap(), None);

        assert!(server_task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_get_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path());

        let (client, server) = duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_read);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_reader = BufReader::new(client_read);

        let mut session = Session::new("127.0.0.1:40002".parse().unwrap());
        let server_task = tokio::spawn(async move {
            run_session(&mut session, &dispatcher, &mut server_reader, &mut server_write).await
        });

        client_write
            .write_all(b"GET missing.txt\nData-Port: 40003\n\n")
            .await
            .unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 404 File Not Found");

        client_write.shutdown().await.unwrap();
        assert!(server_task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_overlong_line_gets_one_reply() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path());

        let (client, server) = duplex(MAX_LINE_LENGTH * 4);
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_read);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_reader = BufReader::new(client_read);

        let mut session = Session::new("127.0.0.1:40004".parse().unwrap());
        let server_task = tokio::spawn(async move {
            let result =
                run_session(&mut session, &dispatcher, &mut server_reader, &mut server_write).await;
            (result, session)
        });

        let mut line = vec![b'x'; MAX_LINE_LENGTH];
        line.extend_from_slice(b"QUIT\n");
        client_write.write_all(&line).await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Malformed command line");

        send_line(&mut client_write, "FOO").await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Invalid Command");

        client_write.shutdown().await.unwrap();

        let (result, session) = server_task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(session.commands_handled(), 1);
        assert_eq!(receive_line(&mut client_reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overlong_header_line_keeps_stream_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path());

        let (client, server) = duplex(MAX_LINE_LENGTH * 4);
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_read);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut client_reader = BufReader::new(client_read);

        let mut session = Session::new("127.0.0.1:40005".parse().unwrap());
        let server_task = tokio::spawn(async move {
            run_session(&mut session, &dispatcher, &mut server_reader, &mut server_write).await
        });

        let mut request = b"LS\nX-Pad: ".to_vec();
        request.extend(std::iter::repeat_n(b'y', MAX_LINE_LENGTH));
        request.extend_from_slice(b"QUIT\nData-Port: 1\n\n");
        client_write.write_all(&request).await.unwrap();

        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Malformed header block");

        send_line(&mut client_write, "FOO").await.unwrap();
        let status = read_status(&mut client_reader).await;
        assert_eq!(status.to_string(), "FAILURE 400 Invalid Command");

        client_write.shutdown().await.unwrap();
        assert!(server_task.await.unwrap().is_ok());
    }
}
