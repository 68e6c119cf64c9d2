//! Module `data_channel`
//!
//! Negotiates the short-lived data connection used by a single transfer.
//!
//! The client listens: it binds an ephemeral port, advertises it in the
//! `Data-Port` header of its command, and accepts exactly one connection. The
//! server dials `(control peer IP, Data-Port)`. Once connected both ends hold
//! a [`DataChannel`] and neither needs to know who dialed.

use log::{debug, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{ChannelError, TransferError};
use crate::protocol::headers::{CONTENT_LENGTH, HeaderBlock, receive_headers, send_headers};
use crate::transfer::engine::{receive_stream, send_stream};

/// Listening side of a pending data channel.
#[derive(Debug)]
pub struct DataListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl DataListener {
    /// Binds `(ip, 0)` and records the port assigned by the OS.
    pub async fn bind(ip: IpAddr) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(SocketAddr::new(ip, 0))
            .await
            .map_err(ChannelError::BindFailed)?;
        let local_addr = listener.local_addr().map_err(ChannelError::BindFailed)?;

        debug!("Data listener bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts exactly one connection, giving up after `timeout`.
    ///
    /// Consumes the listener so the port is released once a peer connects or
    /// the wait fails.
    pub async fn accept(self, timeout: Duration) -> Result<DataChannel, ChannelError> {
        match tokio::time::timeout(timeout, self.listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!(
                    "Data connection accepted from {} on {}",
                    peer_addr, self.local_addr
                );
                Ok(DataChannel::new(stream, peer_addr))
            }
            Ok(Err(e)) => Err(ChannelError::AcceptFailed(e)),
            Err(_) => {
                warn!(
                    "No data connection on {} after {:?}",
                    self.local_addr, timeout
                );
                Err(ChannelError::AcceptTimeout(timeout))
            }
        }
    }
}

/// Connected data channel, used for exactly one transfer.
#[derive(Debug)]
pub struct DataChannel<S = TcpStream> {
    stream: BufReader<S>,
    peer_addr: SocketAddr,
}

impl DataChannel<TcpStream> {
    /// Dials the listening peer at `(peer_ip, port)`.
    pub async fn connect(
        peer_ip: IpAddr,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        if port == 0 {
            return Err(ChannelError::InvalidPort);
        }

        let addr = SocketAddr::new(peer_ip, port);
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                info!("Data connection established to {}", addr);
                Ok(Self::new(stream, addr))
            }
            Ok(Err(e)) => Err(ChannelError::ConnectFailed(addr, e)),
            Err(_) => Err(ChannelError::ConnectTimeout(addr)),
        }
    }
}

impl<S> DataChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer_addr: SocketAddr) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer_addr,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Sends the `Content-Length` header block followed by the payload.
    pub async fn send_payload<R>(
        &mut self,
        source: &mut R,
        length: u64,
    ) -> Result<u64, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        if length == 0 {
            return Err(TransferError::InvalidLength);
        }

        let headers = HeaderBlock::new().with(CONTENT_LENGTH, length);
        send_headers(&mut self.stream, &headers).await?;
        send_stream(&mut self.stream, source, length).await
    }

    /// Announces an empty payload with `Content-Length: 0`. Only listings
    /// may be empty; file transfers always go through `send_payload`.
    pub async fn send_empty(&mut self) -> Result<u64, TransferError> {
        let headers = HeaderBlock::new().with(CONTENT_LENGTH, 0);
        send_headers(&mut self.stream, &headers).await?;
        Ok(0)
    }

    /// Reads the header block and returns the declared `Content-Length`.
    ///
    /// `0` means the header was absent or invalid.
    pub async fn receive_length(&mut self) -> Result<u64, TransferError> {
        let headers = receive_headers(&mut self.stream).await?;
        Ok(headers.content_length())
    }

    /// Reads exactly `length` payload bytes into `sink`.
    pub async fn receive_body<W>(&mut self, sink: &mut W, length: u64) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        receive_stream(&mut self.stream, sink, length).await
    }

    /// Reads the header block and the payload it announces.
    pub async fn receive_payload<W>(&mut self, sink: &mut W) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let length = self.receive_length().await?;
        self.receive_body(sink, length).await
    }

    /// Shuts the channel down. Errors are logged only; the channel is
    /// finished either way.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!("Data channel to {} shutdown: {}", self.peer_addr, e);
        }
    }
}
