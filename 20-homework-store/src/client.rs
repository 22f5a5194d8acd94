//! Caller side of the backend protocol, as used by the front-facing tier.
//!
//! Every call opens a fresh connection, sends one request, reads one response
//! and closes. Connection failures, undecodable replies and `success: false`
//! replies come back as distinct [`ClientError`] variants.

use std::{io, net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::{
    error::ClientError,
    protocol::{Operation, Request, Response, read_message, write_message},
    record::{Homework, SlotView},
};

pub type Result<T> = std::result::Result<T, ClientError>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct BackendClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends a raw request and returns whatever envelope came back.
    ///
    /// A `success: false` envelope is still `Ok` here; the typed helpers below
    /// turn it into [`ClientError::Rejected`].
    pub async fn send(&self, request: &Request) -> Result<Response> {
        match timeout(self.timeout, self.round_trip(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.timeout)),
        }
    }

    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr,
                source,
            })?;
        let (reader, mut writer) = stream.into_split();

        write_message(&mut writer, request).await?;
        writer.shutdown().await?;

        let mut reader = BufReader::new(reader);
        let response = match read_message::<_, Response>(&mut reader).await {
            Ok(Some(response)) => response,
            Ok(None) => return Err(ClientError::NoResponse),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                return Err(ClientError::Decode(err));
            }
            Err(err) => return Err(err.into()),
        };
        debug!(operation = %request.operation, success = response.success, "backend replied");
        Ok(response)
    }

    async fn call(&self, request: Request) -> Result<Response> {
        let response = self.send(&request).await?;
        if response.success {
            Ok(response)
        } else {
            Err(ClientError::Rejected {
                message: response.err_message.unwrap_or_default(),
            })
        }
    }

    pub async fn list_all(&self) -> Result<Vec<SlotView>> {
        let response = self.call(Request::new(Operation::ListAll)).await?;
        Ok(response.homeworks.unwrap_or_default())
    }

    pub async fn get_one(&self, id: i64) -> Result<Homework> {
        let response = self.call(Request::new(Operation::ReadOne).with_id(id)).await?;
        Ok(response.homework.unwrap_or_default())
    }

    pub async fn create(&self, homework: Homework) -> Result<()> {
        self.call(Request::new(Operation::Create).with_homework(homework))
            .await
            .map(drop)
    }

    pub async fn edit(&self, id: i64, homework: Homework) -> Result<()> {
        self.call(
            Request::new(Operation::Edit)
                .with_id(id)
                .with_homework(homework),
        )
        .await
        .map(drop)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.call(Request::new(Operation::Delete).with_id(id))
            .await
            .map(drop)
    }

    pub async fn ping(&self) -> Result<()> {
        self.call(Request::new(Operation::HealthCheck))
            .await
            .map(drop)
    }
}
