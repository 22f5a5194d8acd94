use std::{future::Future, io, net::SocketAddr, time::Duration};

use anyhow::Result;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    dispatcher::Dispatcher,
    error::StoreError,
    protocol::{Request, Response, read_message, write_message},
};

/// Most bytes read and discarded after rejecting an oversized request.
const MAX_DRAIN_BYTES: u64 = 4 * 1024 * 1024;

/// Default deadline for a client to deliver its request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage-tier endpoint: one request and one response per connection.
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    read_timeout: Duration,
}

impl Server {
    pub fn new(listener: TcpListener, dispatcher: Dispatcher) -> Self {
        Self {
            listener,
            dispatcher,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            dispatcher,
            read_timeout,
        } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("backend shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &dispatcher, read_timeout);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    dispatcher: &Dispatcher,
    read_timeout: Duration,
) {
    match result {
        Ok((stream, peer)) => spawn_connection_handler(stream, peer, dispatcher, read_timeout),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_connection_handler(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
    read_timeout: Duration,
) {
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, &dispatcher, read_timeout).await {
            warn!(peer = %peer, error = ?err, "connection closed with error");
        }
    });
}

async fn handle_connection(
    stream: TcpStream,
    dispatcher: &Dispatcher,
    read_timeout: Duration,
) -> Result<()> {
    let peer = stream.peer_addr().ok();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let request = match timeout(read_timeout, read_message::<_, Request>(&mut reader)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(?peer, ?read_timeout, "client did not send a request in time");
            return Ok(());
        }
    };

    let (response, unread_input) = match request {
        Ok(Some(request)) => (dispatcher.dispatch(&request), false),
        Ok(None) => {
            debug!(?peer, "connection closed before a request arrived");
            return Ok(());
        }
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            debug!(?peer, error = %err, "undecodable request");
            let response = Response::failure(&StoreError::UnknownOperation(String::new()));
            (response, true)
        }
        Err(err) => return Err(err.into()),
    };

    write_message(&mut writer, &response).await?;
    writer.shutdown().await?;

    // Closing with unread bytes buffered resets the connection, which can
    // discard the reply before the client reads it.
    if unread_input {
        drain_request(&mut reader, read_timeout).await;
    }
    Ok(())
}

async fn drain_request<R>(reader: &mut R, read_timeout: Duration)
where
    R: AsyncRead + Unpin,
{
    let mut rest = reader.take(MAX_DRAIN_BYTES);
    match timeout(read_timeout, tokio::io::copy(&mut rest, &mut tokio::io::sink())).await {
        Ok(Ok(bytes)) => debug!(bytes, "drained rejected request"),
        Ok(Err(err)) => debug!(error = %err, "failed to drain rejected request"),
        Err(_) => debug!("client kept sending after its request was rejected"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{protocol::Operation, store::HomeworkStore};

    async fn serve_one(dispatcher: Dispatcher) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            handle_connection(stream, &dispatcher, Duration::from_millis(200))
                .await
                .expect("handle connection");
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn garbage_request_gets_unknown_operation() {
        let dispatcher = Dispatcher::new(Arc::new(HomeworkStore::new()));
        let (addr, handle) = serve_one(dispatcher).await;

        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"{not json\n").await.expect("write");

        let mut reader = BufReader::new(reader);
        let response = read_message::<_, Response>(&mut reader)
            .await
            .expect("read response")
            .expect("response present");
        assert!(!response.success);
        assert_eq!(response.err_message.as_deref(), Some("Unknown operation"));

        handle.await.expect("server task");
    }

    #[tokio::test]
    async fn silent_client_times_out_without_error() {
        let dispatcher = Dispatcher::new(Arc::new(HomeworkStore::new()));
        let (addr, handle) = serve_one(dispatcher).await;

        let _stream = TcpStream::connect(addr).await.expect("connect");
        handle.await.expect("server task should finish after read timeout");
    }

    #[tokio::test]
    async fn request_without_trailing_newline_is_accepted() {
        let dispatcher = Dispatcher::new(Arc::new(HomeworkStore::seeded()));
        let (addr, handle) = serve_one(dispatcher).await;

        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, mut writer) = stream.into_split();
        let body = serde_json::to_vec(&Request::new(Operation::ListAll)).expect("encode");
        writer.write_all(&body).await.expect("write");
        writer.shutdown().await.expect("half close");

        let mut reader = BufReader::new(reader);
        let response = read_message::<_, Response>(&mut reader)
            .await
            .expect("read response")
            .expect("response present");
        assert_eq!(response.homeworks.map(|list| list.len()), Some(4));

        handle.await.expect("server task");
    }

    #[tokio::test]
    async fn oversized_request_still_gets_its_reply() {
        let dispatcher = Dispatcher::new(Arc::new(HomeworkStore::new()));
        let (addr, handle) = serve_one(dispatcher).await;

        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, mut writer) = stream.into_split();
        let mut body = vec![b'x'; 4 * crate::protocol::MAX_MESSAGE_BYTES as usize];
        body.push(b'\n');
        writer.write_all(&body).await.expect("write oversized request");
        writer.shutdown().await.expect("half close");

        let mut reader = BufReader::new(reader);
        let response = read_message::<_, Response>(&mut reader)
            .await
            .expect("reply arrives intact")
            .expect("response present");
        assert!(!response.success);
        assert_eq!(response.err_message.as_deref(), Some("Unknown operation"));

        handle.await.expect("server task");
    }
}
