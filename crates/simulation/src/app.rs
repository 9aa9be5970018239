//! Sample replicated application.

use pbft_consensus::Application;
use pbft_types::{OpRequest, OpResponse, ReadAck, WriteAck};

/// Append-only integer log with indexed reads.
///
/// Purely deterministic, so every replica produces a byte-identical reply
/// for the same request — which is what lets the client cross-check the
/// responses it collects from the cluster.
#[derive(Debug, Default)]
pub struct AppendLog {
    data: Vec<i64>,
}

impl AppendLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Application for AppendLog {
    fn accept(&mut self, request: &OpRequest) -> OpResponse {
        match request {
            OpRequest::Write(w) => {
                self.data.push(w.value);
                OpResponse::WriteAck(WriteAck {
                    success: true,
                    index: (self.data.len() - 1) as u64,
                })
            }
            OpRequest::Read(r) => {
                let value = self.data.get(r.index as usize).copied();
                OpResponse::ReadAck(ReadAck {
                    success: value.is_some(),
                    value: value.unwrap_or(0),
                })
            }
        }
    }
}
