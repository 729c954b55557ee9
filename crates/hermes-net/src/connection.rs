//! Socket tasks: one reader and one writer per session.

use hermes_core::{Error, SessionId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 4096;

/// What socket tasks report back to the engine.
#[derive(Debug)]
pub(crate) enum Completion {
    Accepted {
        generation: u64,
        stream: TcpStream,
        allowed: bool,
    },
    ListenFailed {
        generation: u64,
        error: Error,
    },
    Connected {
        session_id: SessionId,
        stream: TcpStream,
    },
    ConnectFailed {
        session_id: SessionId,
        error: Error,
    },
    Received {
        session_id: SessionId,
        bytes: Vec<u8>,
    },
    Closed {
        session_id: SessionId,
        error: Error,
    },
}

enum Outgoing {
    Bytes(String),
    Close,
}

/// The engine's handle on one open socket.
pub(crate) struct Connection {
    writer: mpsc::UnboundedSender<Outgoing>,
    reader: JoinHandle<()>,
}

impl Connection {
    pub(crate) fn open(
        session_id: SessionId,
        stream: TcpStream,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        let _ = stream.set_nodelay(true);
        let (read, write) = stream.into_split();
        let (writer, outgoing) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(session_id, write, outgoing, completions.clone()));
        let reader = tokio::spawn(read_loop(session_id, read, completions));
        Self { writer, reader }
    }

    pub(crate) fn send(&self, bytes: String) {
        let _ = self.writer.send(Outgoing::Bytes(bytes));
    }

    /// Stops reading now; the socket shuts down after queued writes.
    pub(crate) fn close(self) {
        self.reader.abort();
        let _ = self.writer.send(Outgoing::Close);
    }
}

async fn read_loop(
    session_id: SessionId,
    mut read: OwnedReadHalf,
    completions: mpsc::UnboundedSender<Completion>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    let error = loop {
        match read.read(&mut buf).await {
            Ok(0) => break Error::network("connection closed by peer"),
            Ok(n) => {
                let bytes = buf[..n].to_vec();
                if completions
                    .send(Completion::Received { session_id, bytes })
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => break Error::from(e),
        }
    };
    let _ = completions.send(Completion::Closed { session_id, error });
}

async fn write_loop(
    session_id: SessionId,
    mut write: OwnedWriteHalf,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    completions: mpsc::UnboundedSender<Completion>,
) {
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Bytes(bytes) => {
                if let Err(e) = write.write_all(bytes.as_bytes()).await {
                    tracing::debug!(session = %session_id, error = %e, "write failed");
                    let _ = completions.send(Completion::Closed {
                        session_id,
                        error: e.into(),
                    });
                    return;
                }
            }
            Outgoing::Close => break,
        }
    }
    let _ = write.shutdown().await;
}
