// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Fan-out of events to channel subscribers.

use std::sync::mpsc::{channel, Receiver, Sender};

/// A list of subscriber channels. Subscribers whose receiver has been
/// dropped are forgotten on the next send.
#[derive(Debug)]
pub struct Broadcast<T> {
    senders: Vec<Sender<T>>,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<T> {
        let (sender, receiver) = channel();
        self.senders.push(sender);
        receiver
    }

    pub fn send(&mut self, event: T) {
        self.senders.retain(|s| s.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives() {
        let mut b = Broadcast::new();
        let r1 = b.subscribe();
        let r2 = b.subscribe();
        b.send(7);
        assert_eq!(r1.try_recv(), Ok(7));
        assert_eq!(r2.try_recv(), Ok(7));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut b = Broadcast::new();
        let keep = b.subscribe();
        drop(b.subscribe());
        b.send("x");
        assert_eq!(b.subscriber_count(), 1);
        assert_eq!(keep.try_recv(), Ok("x"));
    }
}
