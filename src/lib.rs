//! twin-ftp
//!
//! A small two-channel file transfer protocol: commands and status lines
//! travel over a long-lived control connection, while each transfer gets its
//! own data connection dialed by the server to a port the client advertises.

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod utils;

pub use client::FtpClient;
pub use server::Server;
