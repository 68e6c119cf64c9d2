//! Command handlers module.
//!
//! The `Dispatcher` runs one command through its exchange on the server:
//! read its header block, validate it, dial the client's data channel when the
//! verb carries a payload, run the transfer, and report status lines on the
//! control channel.

use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::config::ServerConfig;
use crate::error::handlers::{error_to_status, handle_error};
use crate::error::{FtpError, ProtocolError, TransferError};
use crate::middleware::logging::log_status;
use crate::protocol::commands::{Command, CommandStatus};
use crate::protocol::framing::send_line;
use crate::protocol::headers::{HeaderBlock, receive_headers};
use crate::protocol::responses::StatusLine;
use crate::protocol::state::SessionState;
use crate::server::Session;
use crate::storage::{create_upload_file, list_files, open_for_download};
use crate::transfer::DataChannel;

/// Server-side command dispatcher.
///
/// Holds only immutable settings, so one instance can be shared by every
/// session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    upload_dir: PathBuf,
    connect_timeout: Duration,
}

impl Dispatcher {
    pub fn new(upload_dir: impl Into<PathBuf>, connect_timeout: Duration) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.upload_dir_path(), config.connect_timeout())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Handles one parsed command.
    ///
    /// Per-command failures are reported as status lines and returned as
    /// `Ok(CommandStatus::Failure(code))`. `Err` means the control channel
    /// itself is unusable and the session must end.
    pub async fn handle_command<R, W>(
        &self,
        session: &mut Session,
        command: &Command,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<CommandStatus, FtpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        session.transition(SessionState::Validate);

        let headers = if command.carries_headers() {
            match receive_headers(reader).await {
                Ok(headers) => headers,
                Err(e @ (ProtocolError::LineTooLong(_) | ProtocolError::InvalidUtf8)) => {
                    warn!("Malformed header block from {}: {}", session.peer_addr(), e);
                    return self
                        .report(session, writer, StatusLine::bad_request("Malformed header block"))
                        .await;
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            HeaderBlock::new()
        };

        match command {
            Command::Get(name) => self.handle_cmd_get(session, name, &headers, writer).await,
            Command::Put(name) => self.handle_cmd_put(session, name, &headers, writer).await,
            Command::Ls => self.handle_cmd_ls(session, &headers, writer).await,
            Command::Quit => self.handle_cmd_quit(session, writer).await,
            Command::Malformed { reason, .. } => {
                self.report(session, writer, StatusLine::bad_request(reason.as_str()))
                    .await
            }
            Command::Unknown(_) => {
                self.report(session, writer, StatusLine::bad_request("Invalid Command"))
                    .await
            }
        }
    }

    /// GET: checks the file, accepts, then streams it over the data channel.
    async fn handle_cmd_get<W>(
        &self,
        session: &mut Session,
        name: &str,
        headers: &HeaderBlock,
        writer: &mut W,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        let port = headers.data_port();
        if port == 0 {
            return self
                .report(session, writer, StatusLine::bad_request("Missing Data-Port"))
                .await;
        }

        let (mut file, retrieved) = match open_for_download(&self.upload_dir, name).await {
            Ok(opened) => opened,
            Err(e) => return self.report_error(session, writer, e.into()).await,
        };

        self.send_status(session, writer, &StatusLine::ok()).await?;

        let mut channel = match self.open_data_channel(session, port).await {
            Ok(channel) => channel,
            Err(e) => return self.report_error(session, writer, e).await,
        };

        session.transition(SessionState::Transfer);
        let result = channel.send_payload(&mut file, retrieved.size).await;
        channel.close().await;

        match result {
            Ok(sent) => {
                info!(
                    "File {} sent to {} ({} bytes)",
                    retrieved.file_path.display(),
                    session.peer_addr(),
                    sent
                );
                Ok(CommandStatus::Success)
            }
            Err(e) => {
                // The client observes the short stream on its data channel.
                error!("GET {} to {} aborted: {}", name, session.peer_addr(), e);
                Ok(CommandStatus::Failure(error_to_status(&FtpError::from(e)).code()))
            }
        }
    }

    /// PUT: accepts, receives the payload into the upload directory, then
    /// acknowledges the stored file with a second status.
    async fn handle_cmd_put<W>(
        &self,
        session: &mut Session,
        name: &str,
        headers: &HeaderBlock,
        writer: &mut W,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        let port = headers.data_port();
        if port == 0 {
            return self
                .report(session, writer, StatusLine::bad_request("Missing Data-Port"))
                .await;
        }

        self.send_status(session, writer, &StatusLine::ok()).await?;

        let mut channel = match self.open_data_channel(session, port).await {
            Ok(channel) => channel,
            Err(e) => return self.report_error(session, writer, e).await,
        };

        session.transition(SessionState::Transfer);
        let result = self.receive_upload(&mut channel, name).await;
        channel.close().await;

        match result {
            Ok(received) => {
                info!(
                    "File {} uploaded by {} ({} bytes)",
                    name,
                    session.peer_addr(),
                    received
                );
                self.report(session, writer, StatusLine::upload_complete())
                    .await
            }
            Err(e) => self.report_error(session, writer, e).await,
        }
    }

    async fn receive_upload(&self, channel: &mut DataChannel, name: &str) -> Result<u64, FtpError> {
        let length = channel.receive_length().await?;
        if length == 0 {
            warn!("Upload of {} declared no Content-Length", name);
            return Err(TransferError::InvalidLength.into());
        }

        info!("Receiving file {} of size {} bytes", name, length);

        let (mut file, path) = create_upload_file(&self.upload_dir, name).await?;
        let received = channel.receive_body(&mut file, length).await.map_err(|e| {
            warn!("Leaving partial upload at {}", path.display());
            e
        })?;
        file.sync_all().await?;
        Ok(received)
    }

    /// LS: builds the listing, accepts, then sends it like file content.
    async fn handle_cmd_ls<W>(
        &self,
        session: &mut Session,
        headers: &HeaderBlock,
        writer: &mut W,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        let port = headers.data_port();
        if port == 0 {
            return self
                .report(session, writer, StatusLine::bad_request("Missing Data-Port"))
                .await;
        }

        let listing = match list_files(&self.upload_dir).await {
            Ok(listing) => listing,
            Err(e) => return self.report_error(session, writer, e.into()).await,
        };
        let bytes = listing.to_bytes();

        self.send_status(session, writer, &StatusLine::ok()).await?;

        let mut channel = match self.open_data_channel(session, port).await {
            Ok(channel) => channel,
            Err(e) => return self.report_error(session, writer, e).await,
        };

        session.transition(SessionState::Transfer);
        let result = if bytes.is_empty() {
            channel.send_empty().await
        } else {
            channel
                .send_payload(&mut bytes.as_slice(), bytes.len() as u64)
                .await
        };
        channel.close().await;

        match result {
            Ok(_) => {
                info!(
                    "Sent listing of {} entries to {}",
                    listing.entries.len(),
                    session.peer_addr()
                );
                Ok(CommandStatus::Success)
            }
            Err(e) => {
                error!("LS to {} aborted: {}", session.peer_addr(), e);
                Ok(CommandStatus::Failure(error_to_status(&FtpError::from(e)).code()))
            }
        }
    }

    /// QUIT: says goodbye and half-closes the write side.
    async fn handle_cmd_quit<W>(
        &self,
        session: &mut Session,
        writer: &mut W,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        self.send_status(session, writer, &StatusLine::goodbye()).await?;
        writer.shutdown().await?;
        info!("Client {} requested to quit", session.peer_addr());
        Ok(CommandStatus::CloseConnection)
    }

    async fn open_data_channel(
        &self,
        session: &mut Session,
        port: u16,
    ) -> Result<DataChannel, FtpError> {
        session.transition(SessionState::NegotiateDataChannel);
        DataChannel::connect(session.peer_ip(), port, self.connect_timeout)
            .await
            .map_err(FtpError::from)
    }

    async fn send_status<W>(
        &self,
        session: &mut Session,
        writer: &mut W,
        status: &StatusLine,
    ) -> Result<(), FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        session.transition(SessionState::ReportStatus);
        send_line(writer, &status.to_string()).await?;
        log_status(session.peer_addr(), status);
        Ok(())
    }

    /// Sends `status` as the final word on the current command.
    async fn report<W>(
        &self,
        session: &mut Session,
        writer: &mut W,
        status: StatusLine,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        self.send_status(session, writer, &status).await?;
        if status.is_success() {
            Ok(CommandStatus::Success)
        } else {
            Ok(CommandStatus::Failure(status.code()))
        }
    }

    async fn report_error<W>(
        &self,
        session: &mut Session,
        writer: &mut W,
        err: FtpError,
    ) -> Result<CommandStatus, FtpError>
    where
        W: AsyncWrite + Unpin,
    {
        handle_error(&err);
        self.report(session, writer, error_to_status(&err)).await
    }
}
