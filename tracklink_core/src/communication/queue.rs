//! Channel-backed source and sink
//!
//! [`QueueEventSource`] stands in for tracker middleware that pushes events
//! from its own callbacks: the producer side is a plain
//! [`crossbeam::channel::Sender`], and the polling driver drains the queue.
//! [`ChannelSink`] forwards outgoing events the same way.

use super::event::MessageEvent;
use super::traits::{EventSink, EventSource};
use crate::error::{TrackError, TrackResult};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

/// Event source fed through a channel
pub struct QueueEventSource {
    rx: Receiver<MessageEvent>,
    started: bool,
}

impl QueueEventSource {
    /// Create an unbounded queue, returning the producer handle and the source
    pub fn unbounded() -> (Sender<MessageEvent>, Self) {
        let (tx, rx) = channel::unbounded();
        (tx, Self::from_receiver(rx))
    }

    pub fn from_receiver(rx: Receiver<MessageEvent>) -> Self {
        Self { rx, started: false }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl EventSource for QueueEventSource {
    fn start(&mut self) -> TrackResult<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> TrackResult<()> {
        self.started = false;
        Ok(())
    }

    fn poll(&mut self) -> TrackResult<Option<MessageEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(TrackError::device("event queue producer disconnected"))
            }
        }
    }
}

/// Sink that forwards `(sink_name, event)` pairs into a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<(String, MessageEvent)>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, Receiver<(String, MessageEvent)>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&mut self, sink_name: &str, event: &MessageEvent) -> TrackResult<()> {
        self.tx
            .send((sink_name.to_string(), event.clone()))
            .map_err(|_| TrackError::device(format!("sink '{}' receiver dropped", sink_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let (tx, mut source) = QueueEventSource::unbounded();
        tx.send(MessageEvent::new("a")).unwrap();
        tx.send(MessageEvent::new("b")).unwrap();

        assert_eq!(source.poll().unwrap().unwrap().name(), "a");
        assert_eq!(source.poll().unwrap().unwrap().name(), "b");
        assert!(source.poll().unwrap().is_none());

        drop(tx);
        assert!(matches!(source.poll(), Err(TrackError::DeviceComm(_))));
    }
}
