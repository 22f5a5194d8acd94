//! Maps decoded requests onto store operations.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::StoreError,
    protocol::{Operation, Request, Response},
    record::Homework,
    store::HomeworkStore,
};

/// Stateless front door to a shared [`HomeworkStore`].
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<HomeworkStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<HomeworkStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<HomeworkStore> {
        &self.store
    }

    /// Runs one request to completion and packages the outcome.
    pub fn dispatch(&self, request: &Request) -> Response {
        match self.handle(request) {
            Ok(response) => {
                debug!(operation = %request.operation, id = request.id, "request handled");
                response
            }
            Err(error) => {
                debug!(operation = %request.operation, id = request.id, %error, "request failed");
                Response::failure(&error)
            }
        }
    }

    fn handle(&self, request: &Request) -> Result<Response, StoreError> {
        match request.operation.parse::<Operation>()? {
            Operation::ListAll => Ok(Response::listing(self.store.read_all())),
            Operation::ReadOne => {
                let index = self.index(request.id)?;
                Ok(Response::single(self.store.read_one(index)?))
            }
            Operation::Edit => {
                let index = self.index(request.id)?;
                let Homework { name, desc, .. } = payload(request);
                self.store.edit(index, name, desc)?;
                Ok(Response::ack())
            }
            Operation::Create => {
                let index = self.store.append(payload(request));
                debug!(index, "created homework");
                Ok(Response::ack())
            }
            Operation::Delete => {
                self.store.delete(self.index(request.id)?)?;
                Ok(Response::ack())
            }
            Operation::HealthCheck => Ok(Response::ack()),
        }
    }

    fn index(&self, id: i64) -> Result<usize, StoreError> {
        usize::try_from(id).map_err(|_| StoreError::OutOfRange {
            index: id,
            len: self.store.len(),
        })
    }
}

// A request without `newHomework` edits or creates an empty record.
fn payload(request: &Request) -> Homework {
    request.new_homework.clone().unwrap_or_default()
}
