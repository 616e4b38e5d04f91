use bytes::Bytes;

use crate::error::ClientError;
use crate::protocol::command::Command;

/// Per-connection MULTI/EXEC buffer. Just a batching construct: queued
/// commands run back-to-back on EXEC with no isolation from other
/// connections.
#[derive(Default)]
pub struct TxnState {
    active: bool,
    queue: Vec<(Command, Vec<Bytes>)>,
}

impl TxnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self) -> Result<(), ClientError> {
        if self.active {
            return Err(ClientError::NestedMulti);
        }
        self.active = true;
        self.queue.clear();
        Ok(())
    }

    pub fn push(&mut self, command: Command, params: Vec<Bytes>) {
        self.queue.push((command, params));
    }

    /// EXEC: hands the queue to the caller and leaves transaction mode.
    pub fn take(&mut self) -> Result<Vec<(Command, Vec<Bytes>)>, ClientError> {
        if !self.active {
            return Err(ClientError::ExecWithoutMulti);
        }
        self.active = false;
        Ok(std::mem::take(&mut self.queue))
    }

    pub fn discard(&mut self) -> Result<(), ClientError> {
        if !self.active {
            return Err(ClientError::DiscardWithoutMulti);
        }
        self.active = false;
        self.queue.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_outside_multi_is_an_error() {
        let mut txn = TxnState::new();
        assert_eq!(txn.take(), Err(ClientError::ExecWithoutMulti));
        assert_eq!(txn.discard(), Err(ClientError::DiscardWithoutMulti));
    }

    #[test]
    fn queue_runs_in_order_and_clears() {
        let mut txn = TxnState::new();
        txn.begin().unwrap();
        txn.push(Command::SET, vec![]);
        txn.push(Command::RPUSH, vec![]);
        let queued = txn.take().unwrap();
        assert_eq!(
            queued.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            vec![Command::SET, Command::RPUSH]
        );
        assert!(!txn.is_active());
        assert_eq!(txn.take(), Err(ClientError::ExecWithoutMulti));
    }

    #[test]
    fn nested_multi_is_an_error() {
        let mut txn = TxnState::new();
        txn.begin().unwrap();
        assert_eq!(txn.begin(), Err(ClientError::NestedMulti));
        // still in the original transaction
        assert!(txn.is_active());
    }

    #[test]
    fn discard_drops_the_queue() {
        let mut txn = TxnState::new();
        txn.begin().unwrap();
        txn.push(Command::SET, vec![]);
        txn.discard().unwrap();
        txn.begin().unwrap();
        assert!(txn.take().unwrap().is_empty());
    }
}
