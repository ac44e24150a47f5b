//! Serialization of characteristic reads.
//!
//! Most platform GATT stacks drop or reject a read issued while another is outstanding. The queue keeps the
//! in-flight read at its head and only issues the next one once the previous completion has been delivered.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::{CharacteristicId, Error, Result};

/// Pending reads, head first. The head, if any, is the read currently outstanding on the transport.
#[derive(Debug, Default)]
pub struct ReadQueue {
    pending: VecDeque<CharacteristicId>,
}

/// Outcome of [`ReadQueue::on_read_completed`]
#[derive(Debug, Default)]
pub struct ReadAdvance {
    /// The read that just completed
    pub completed: Option<CharacteristicId>,
    /// The read now outstanding
    pub issued: Option<CharacteristicId>,
    /// Queued reads the transport refused while advancing; they are dropped
    pub rejected: Vec<(CharacteristicId, Error)>,
}

impl ReadQueue {
    /// An empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a read of `id`.
    ///
    /// If nothing is outstanding the read is issued right away through `issue`; if the transport refuses it the
    /// queue is left untouched and the error returned. Otherwise the read waits behind the outstanding ones.
    pub fn enqueue<F>(&mut self, id: CharacteristicId, issue: F) -> Result<()>
    where
        F: FnOnce(CharacteristicId) -> Result<()>,
    {
        if self.pending.is_empty() {
            issue(id)?;
            debug!("read of {} issued", id);
        } else {
            debug!("read of {} queued behind {} pending", id, self.pending.len());
        }
        self.pending.push_back(id);
        Ok(())
    }

    /// Retires the outstanding read and issues the next one, if any.
    ///
    /// Entries the transport refuses are dropped and reported so that one bad request cannot stall the queue.
    pub fn on_read_completed<F>(&mut self, mut issue: F) -> ReadAdvance
    where
        F: FnMut(CharacteristicId) -> Result<()>,
    {
        let mut advance = ReadAdvance {
            completed: self.pending.pop_front(),
            ..Default::default()
        };

        while let Some(&next) = self.pending.front() {
            match issue(next) {
                Ok(()) => {
                    debug!("read of {} issued", next);
                    advance.issued = Some(next);
                    break;
                }
                Err(err) => {
                    warn!("transport refused queued read of {}: {}", next, err);
                    let _ = self.pending.pop_front();
                    advance.rejected.push((next, err));
                }
            }
        }

        advance
    }

    /// Drops every pending read
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!("discarding {} pending reads", self.pending.len());
        }
        self.pending.clear();
    }

    /// The read currently outstanding on the transport
    pub fn in_flight(&self) -> Option<CharacteristicId> {
        self.pending.front().copied()
    }

    /// Number of reads outstanding or waiting
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` if no read is outstanding
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending reads, head first
    pub fn iter(&self) -> impl Iterator<Item = &CharacteristicId> + '_ {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::btuuid::bluetooth_uuid_from_u16;
    use crate::error::ErrorKind;

    fn id(n: u16) -> CharacteristicId {
        CharacteristicId::new(bluetooth_uuid_from_u16(n))
    }

    #[test]
    fn issues_in_fifo_order() {
        let issued = RefCell::new(Vec::new());
        let issue = |id: CharacteristicId| -> Result<()> {
            issued.borrow_mut().push(id);
            Ok(())
        };

        let mut queue = ReadQueue::new();
        for n in 1..=3 {
            queue.enqueue(id(n), issue).unwrap();
        }
        assert_eq!(*issued.borrow(), vec![id(1)]);
        assert_eq!(queue.in_flight(), Some(id(1)));

        let advance = queue.on_read_completed(issue);
        assert_eq!(advance.completed, Some(id(1)));
        assert_eq!(advance.issued, Some(id(2)));

        let _ = queue.on_read_completed(issue);
        let advance = queue.on_read_completed(issue);
        assert_eq!(advance.completed, Some(id(3)));
        assert_eq!(advance.issued, None);
        assert!(queue.is_empty());
        assert_eq!(*issued.borrow(), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn refused_first_read_leaves_queue_empty() {
        let mut queue = ReadQueue::new();
        let res = queue.enqueue(id(1), |_| Err(ErrorKind::Busy.into()));
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Busy);
        assert!(queue.is_empty());
    }

    #[test]
    fn refused_entries_are_skipped() {
        let mut queue = ReadQueue::new();
        for n in 1..=3 {
            queue.enqueue(id(n), |_| Ok(())).unwrap();
        }

        let advance = queue.on_read_completed(|x| {
            if x == id(2) {
                Err(ErrorKind::NotConnected.into())
            } else {
                Ok(())
            }
        });
        assert_eq!(advance.issued, Some(id(3)));
        assert_eq!(advance.rejected.len(), 1);
        assert_eq!(advance.rejected[0].0, id(2));
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![id(3)]);
    }

    #[test]
    fn completion_on_empty_queue_is_harmless() {
        let mut queue = ReadQueue::new();
        let advance = queue.on_read_completed(|_| Ok(()));
        assert_eq!(advance.completed, None);
        assert_eq!(advance.issued, None);
    }

    #[test]
    fn reset_discards_everything() {
        let mut queue = ReadQueue::new();
        queue.enqueue(id(1), |_| Ok(())).unwrap();
        queue.enqueue(id(2), |_| Ok(())).unwrap();
        queue.reset();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.in_flight(), None);
    }
}
