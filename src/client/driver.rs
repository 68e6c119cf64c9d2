//! Module `driver`
//!
//! The client side of the protocol. For every payload command the driver
//! binds an ephemeral data listener first, advertises it in `Data-Port`, and
//! accepts the server's connection once the command has been accepted.

use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::config::ClientConfig;
use crate::error::{FtpError, ProtocolError, TransferError};
use crate::protocol::headers::DATA_PORT;
use crate::protocol::{
    Command, HeaderBlock, SessionState, StatusLine, parse_command, receive_line, send_headers,
    send_line,
};
use crate::client::results::{Reply, TransferOutcome};
use crate::transfer::{DataChannel, DataListener};

/// How the wait for a data connection ended.
enum DataWait {
    Connected(DataChannel),
    /// The server sent a status line instead of connecting.
    Refused(StatusLine),
}

/// A control-channel session with a server.
pub struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local_ip: IpAddr,
    server_addr: SocketAddr,
    config: ClientConfig,
    state: SessionState,
}

impl FtpClient {
    /// Opens the control connection.
    pub async fn connect<A: ToSocketAddrs>(addr: A, config: ClientConfig) -> Result<Self, FtpError> {
        let stream = TcpStream::connect(addr).await?;
        let server_addr = stream.peer_addr()?;
        let local_ip = stream.local_addr()?.ip();
        info!("Connected to {}", server_addr);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            local_ip,
            server_addr,
            config,
            state: SessionState::AwaitCommand,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Parses an operator line and runs it.
    ///
    /// Lines that don't parse are still sent, so the operator sees the
    /// server's own rejection.
    pub async fn execute(&mut self, line: &str) -> Result<Reply, FtpError> {
        match parse_command(line) {
            Command::Get(name) => self.get(&name).await,
            Command::Put(name) => self.put(&name).await,
            Command::Ls => self.list().await,
            Command::Quit => self.quit().await,
            command @ (Command::Malformed { .. } | Command::Unknown(_)) => {
                self.send_raw(line.trim(), command.carries_headers()).await
            }
        }
    }

    /// Downloads `name` into the local directory.
    pub async fn get(&mut self, name: &str) -> Result<Reply, FtpError> {
        self.begin()?;
        let listener = DataListener::bind(self.local_ip).await?;

        let accepted = self
            .send_payload_command(&Command::Get(name.to_string()), &listener)
            .await?;
        if !accepted.is_success() {
            self.finish();
            return Ok(Reply::status(accepted));
        }

        let mut channel = match self.await_data_channel(listener).await? {
            DataWait::Connected(channel) => channel,
            DataWait::Refused(status) => {
                self.finish();
                return Ok(Reply::new(vec![accepted, status], TransferOutcome::None));
            }
        };

        self.transition(SessionState::Transfer);
        let result = self.download_into(&mut channel, name).await;
        channel.close().await;
        self.finish();

        let (path, bytes) = result?;
        info!("File {} downloaded successfully ({} bytes)", name, bytes);
        Ok(Reply::new(
            vec![accepted],
            TransferOutcome::Downloaded { path, bytes },
        ))
    }

    /// Uploads the local file `name`; the server stores it under the same name.
    pub async fn put(&mut self, name: &str) -> Result<Reply, FtpError> {
        self.begin()?;

        let local_path = self.config.local_dir.join(name);
        let mut file = match File::open(&local_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.finish();
                return Err(FtpError::InvalidInput(format!(
                    "File {} not found",
                    local_path.display()
                )));
            }
            Err(e) => {
                self.finish();
                return Err(e.into());
            }
        };
        let size = file.metadata().await?.len();
        if size == 0 {
            self.finish();
            return Err(FtpError::InvalidInput(format!(
                "File {} is empty",
                local_path.display()
            )));
        }

        let listener = DataListener::bind(self.local_ip).await?;
        let accepted = self
            .send_payload_command(&Command::Put(name.to_string()), &listener)
            .await?;
        if !accepted.is_success() {
            self.finish();
            return Ok(Reply::status(accepted));
        }

        let mut channel = match self.await_data_channel(listener).await? {
            DataWait::Connected(channel) => channel,
            DataWait::Refused(status) => {
                self.finish();
                return Ok(Reply::new(vec![accepted, status], TransferOutcome::None));
            }
        };

        self.transition(SessionState::Transfer);
        let sent = channel.send_payload(&mut file, size).await;
        channel.close().await;

        let bytes = match sent {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Upload of {} interrupted: {}", name, e);
                0
            }
        };

        // The server always closes a PUT with a second status line.
        let stored = self.read_status().await?;
        self.finish();
        Ok(Reply::new(
            vec![accepted, stored],
            TransferOutcome::Uploaded { bytes },
        ))
    }

    /// Fetches the server's file listing.
    pub async fn list(&mut self) -> Result<Reply, FtpError> {
        self.begin()?;
        let listener = DataListener::bind(self.local_ip).await?;

        let accepted = self.send_payload_command(&Command::Ls, &listener).await?;
        if !accepted.is_success() {
            self.finish();
            return Ok(Reply::status(accepted));
        }

        let mut channel = match self.await_data_channel(listener).await? {
            DataWait::Connected(channel) => channel,
            DataWait::Refused(status) => {
                self.finish();
                return Ok(Reply::new(vec![accepted, status], TransferOutcome::None));
            }
        };

        self.transition(SessionState::Transfer);
        let result = receive_listing(&mut channel).await;
        channel.close().await;
        self.finish();

        Ok(Reply::new(vec![accepted], TransferOutcome::Listing(result?)))
    }

    /// Ends the session.
    pub async fn quit(&mut self) -> Result<Reply, FtpError> {
        self.begin()?;
        send_line(&mut self.writer, &Command::Quit.to_string()).await?;
        let status = self.read_status().await?;

        match receive_line(&mut self.reader).await {
            Ok(None) => debug!("Server closed the control channel"),
            Ok(Some(extra)) => warn!("Unexpected data after goodbye: {:?}", extra),
            Err(e) => debug!("Control channel error after goodbye: {}", e),
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!("Control channel shutdown: {}", e);
        }

        self.state = SessionState::Closed;
        info!("Session with {} closed", self.server_addr);
        Ok(Reply::new(vec![status], TransferOutcome::Closed))
    }

    /// Sends a line the driver can't interpret and returns the server's verdict.
    async fn send_raw(&mut self, line: &str, carries_headers: bool) -> Result<Reply, FtpError> {
        self.begin()?;
        send_line(&mut self.writer, line).await?;
        if carries_headers {
            send_headers(&mut self.writer, &HeaderBlock::new()).await?;
        }
        let status = self.read_status().await?;
        self.finish();
        Ok(Reply::status(status))
    }

    async fn send_payload_command(
        &mut self,
        command: &Command,
        listener: &DataListener,
    ) -> Result<StatusLine, FtpError> {
        let headers = HeaderBlock::new().with(DATA_PORT, listener.port());
        send_line(&mut self.writer, &command.to_string()).await?;
        send_headers(&mut self.writer, &headers).await?;
        debug!("Sent {} with data port {}", command, listener.port());

        self.transition(SessionState::ReportStatus);
        self.read_status().await
    }

    /// Waits for the server to dial in, or for a status line telling us it
    /// won't. The accept is bounded by the configured timeout.
    async fn await_data_channel(&mut self, listener: DataListener) -> Result<DataWait, FtpError> {
        self.transition(SessionState::NegotiateDataChannel);

        let timeout = self.config.accept_timeout;
        let reader = &mut self.reader;

        tokio::select! {
            accepted = listener.accept(timeout) => {
                return Ok(DataWait::Connected(accepted?));
            }
            filled = reader.fill_buf() => {
                if filled?.is_empty() {
                    self.state = SessionState::Closed;
                    return Err(ProtocolError::UnexpectedEof("data channel negotiation").into());
                }
            }
        }

        let status = self.read_status().await?;
        warn!("Server refused the data channel: {}", status);
        Ok(DataWait::Refused(status))
    }

    async fn download_into(
        &self,
        channel: &mut DataChannel,
        name: &str,
    ) -> Result<(std::path::PathBuf, u64), FtpError> {
        let length = channel.receive_length().await?;
        if length == 0 {
            return Err(TransferError::InvalidLength.into());
        }

        let path = self.config.local_dir.join(name);
        let mut file = File::create(&path).await?;
        let bytes = channel.receive_body(&mut file, length).await.map_err(|e| {
            warn!("Download of {} incomplete; {} may be corrupt", name, path.display());
            e
        })?;
        Ok((path, bytes))
    }

    async fn read_status(&mut self) -> Result<StatusLine, FtpError> {
        match receive_line(&mut self.reader).await? {
            Some(line) => Ok(StatusLine::parse(&line)?),
            None => {
                self.state = SessionState::Closed;
                Err(ProtocolError::UnexpectedEof("status line").into())
            }
        }
    }

    fn begin(&mut self) -> Result<(), FtpError> {
        if self.is_closed() {
            return Err(FtpError::InvalidInput("session is closed".into()));
        }
        self.transition(SessionState::Validate);
        Ok(())
    }

    fn finish(&mut self) {
        self.transition(SessionState::AwaitCommand);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.is_closed() {
            return;
        }
        if self.state != next {
            debug!("Client: {} -> {}", self.state, next);
        }
        self.state = next;
    }
}

/// Reads a listing; an announced length of `0` is an empty listing.
async fn receive_listing(channel: &mut DataChannel) -> Result<Vec<String>, FtpError> {
    let length = channel.receive_length().await?;
    if length == 0 {
        return Ok(Vec::new());
    }

    let mut buf = Vec::new();
    channel.receive_body(&mut buf, length).await?;
    Ok(String::from_utf8_lossy(&buf)
        .split('\n')
        .map(str::to_string)
        .collect())
}
