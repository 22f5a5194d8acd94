use std::{io, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::StoreError,
    record::{Homework, SlotView},
};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Upper bound on a single framed message.
pub const MAX_MESSAGE_BYTES: u64 = 64 * 1024;

/// A request sent by the front-facing tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub operation: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_homework: Option<Homework>,
}

impl Request {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation: operation.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_homework(mut self, homework: Homework) -> Self {
        self.new_homework = Some(homework);
        self
    }
}

/// The single response envelope returned for every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homeworks: Option<Vec<SlotView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework: Option<Homework>,
}

impl Response {
    pub fn ack() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn listing(homeworks: Vec<SlotView>) -> Self {
        Self {
            success: true,
            homeworks: Some(homeworks),
            ..Self::default()
        }
    }

    pub fn single(homework: Homework) -> Self {
        Self {
            success: true,
            homework: Some(homework),
            ..Self::default()
        }
    }

    pub fn failure(error: &StoreError) -> Self {
        Self {
            success: false,
            err_message: Some(error.wire_message().to_string()),
            ..Self::default()
        }
    }
}

/// Operations understood by the backend, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListAll,
    ReadOne,
    Edit,
    Create,
    Delete,
    HealthCheck,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListAll => "home",
            Operation::ReadOne => "getOne",
            Operation::Edit => "edit",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::HealthCheck => "ping",
        }
    }
}

impl FromStr for Operation {
    type Err = StoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "home" => Ok(Operation::ListAll),
            "getOne" => Ok(Operation::ReadOne),
            "edit" => Ok(Operation::Edit),
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "ping" => Ok(Operation::HealthCheck),
            other => Err(StoreError::UnknownOperation(other.to_string())),
        }
    }
}

/// Reads one newline-delimited JSON message.
///
/// Returns `Ok(None)` on a clean EOF. Oversized or malformed input surfaces as
/// an `InvalidData` error.
pub async fn read_message<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut limited = reader.take(MAX_MESSAGE_BYTES + 1);
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = limited.read_line(&mut line).await?;
        if bytes == 0 {
            if limited.limit() == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "message exceeds size limit",
                ));
            }
            return Ok(None);
        }
        if line.len() as u64 > MAX_MESSAGE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "message exceeds size limit",
            ));
        }

        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(trimmed).map_err(to_io_error)?;
        return Ok(Some(parsed));
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = serde_json::to_vec(message).map_err(to_io_error)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
