//! Accept sources for the dispatcher
//!
//! The dispatcher only needs "give me the next connected byte stream".
//! TCP listeners and in-process channels both provide that.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Source of new session streams.
///
/// `accept` must be cancel-safe: the dispatcher drops a pending accept
/// when shutdown or a worker completion wins the race.
pub trait AcceptSource: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Next stream and a peer label; `None` once the source is exhausted
    fn accept(&mut self) -> impl Future<Output = io::Result<Option<(Self::Stream, String)>>> + Send;
}

impl AcceptSource for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<Option<(TcpStream, String)>>> + Send {
        async move {
            let (stream, addr) = TcpListener::accept(self).await?;
            Ok(Some((stream, addr.to_string())))
        }
    }
}

/// In-process accept source fed through a channel
pub struct ChannelAcceptor<S> {
    rx: mpsc::Receiver<(S, String)>,
}

impl<S> ChannelAcceptor<S> {
    /// Create an acceptor and the sender used to hand it streams
    pub fn channel(buffer: usize) -> (mpsc::Sender<(S, String)>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

impl<S> AcceptSource for ChannelAcceptor<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = S;

    fn accept(&mut self) -> impl Future<Output = io::Result<Option<(S, String)>>> + Send {
        async move { Ok(self.rx.recv().await) }
    }
}
