//! Correlation of CV read/write requests with their asynchronous replies.
//!
//! A CV command has no request id on the wire; the only key available is
//! the CV number carried in the eventual result. Each armed request is an
//! entry in a map from CV number to a one-shot completion handle. One
//! dispatcher task watches the event bus and is the single point that
//! resolves entries: a matching CV result resolves exactly that entry,
//! while a NACK rejects *every* armed request, because the protocol gives
//! no way to tie a NACK to a specific CV. That coarse correlation is a
//! protocol limitation, not a design preference. A transport failure also
//! rejects every armed request, since no reply can arrive once the
//! receive loop has stopped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::core::{CvResult, Error, Result};
use crate::network::EventBus;
use crate::protocol::{ErrorCode, Event};

type PendingMap = Arc<Mutex<HashMap<u16, oneshot::Sender<Result<CvResult>>>>>;

/// Tracks in-flight CV requests and resolves them from bus events
pub struct CvCorrelator {
    pending: PendingMap,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl CvCorrelator {
    /// Creates a correlator and starts its dispatcher task on the bus
    pub fn new(bus: &EventBus) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = tokio::spawn(dispatch(bus.subscribe(), Arc::clone(&pending)));
        CvCorrelator {
            pending,
            dispatcher,
        }
    }

    /// Arms a request for `cv` before the command is sent.
    ///
    /// Arming a CV that already has an in-flight request replaces the old
    /// entry; the superseded request is rejected immediately.
    pub fn arm(&self, cv: u16) -> PendingCv {
        let (tx, rx) = oneshot::channel();
        let replaced = self.lock_pending().insert(cv, tx);
        if let Some(old) = replaced {
            debug!(cv, "superseding in-flight CV request");
            let _ = old.send(Err(Error::protocol(format!(
                "CV {} request superseded by a newer one",
                cv
            ))));
        }
        PendingCv {
            cv,
            rx,
            pending: Arc::clone(&self.pending),
        }
    }

    /// Drops the entry for `cv` without resolving it. Used when the send
    /// itself fails and no reply can ever arrive.
    pub fn disarm(&self, cv: u16) {
        self.lock_pending().remove(&cv);
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<u16, oneshot::Sender<Result<CvResult>>>> {
        self.pending.lock().expect("pending CV map lock poisoned")
    }
}

impl Drop for CvCorrelator {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Single dispatch point: resolves pending entries from bus events
async fn dispatch(mut events: broadcast::Receiver<Event>, pending: PendingMap) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            // Skipping lagged events is acceptable here: a lost CV result
            // surfaces as a timeout on the armed request
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            Event::CvResult(result) => {
                let entry = pending
                    .lock()
                    .expect("pending CV map lock poisoned")
                    .remove(&result.cv);
                if let Some(tx) = entry {
                    trace!(cv = result.cv, "CV request resolved");
                    let _ = tx.send(Ok(result));
                }
            }
            Event::Error(err)
                if matches!(err.code, ErrorCode::Nack | ErrorCode::NackShortCircuit) =>
            {
                // No request id on the wire: a NACK rejects every armed request
                let drained: Vec<_> = pending
                    .lock()
                    .expect("pending CV map lock poisoned")
                    .drain()
                    .collect();
                for (cv, tx) in drained {
                    debug!(cv, code = ?err.code, "CV request rejected by NACK");
                    let _ = tx.send(Err(Error::Nack {
                        short_circuit: err.code == ErrorCode::NackShortCircuit,
                    }));
                }
            }
            Event::Error(err) if err.code == ErrorCode::Transport => {
                // The receive loop is gone, so no reply can ever arrive;
                // reject everything instead of letting the timeouts run
                let drained: Vec<_> = pending
                    .lock()
                    .expect("pending CV map lock poisoned")
                    .drain()
                    .collect();
                for (cv, tx) in drained {
                    debug!(cv, "CV request rejected by transport failure");
                    let _ = tx.send(Err(Error::protocol(err.message.clone())));
                }
            }
            _ => {}
        }
    }
}

/// Handle to one armed CV request
pub struct PendingCv {
    cv: u16,
    rx: oneshot::Receiver<Result<CvResult>>,
    pending: PendingMap,
}

impl PendingCv {
    /// Waits for the reply, the NACK or the deadline, whichever comes
    /// first. All outcomes are terminal; the map entry is gone afterwards.
    pub async fn wait(self, deadline: Duration) -> Result<CvResult> {
        match timeout(deadline, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                self.pending
                    .lock()
                    .expect("pending CV map lock poisoned")
                    .remove(&self.cv);
                Err(Error::Timeout(deadline))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventError;
    use tokio::time::{sleep, Duration};

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_matching_result_resolves() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(17);
        bus.publish(Event::CvResult(CvResult { cv: 17, value: 0xC0 }));

        let result = pending.wait(WAIT).await.unwrap();
        assert_eq!(result, CvResult { cv: 17, value: 0xC0 });
    }

    #[tokio::test]
    async fn test_non_matching_result_keeps_waiting() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(17);
        bus.publish(Event::CvResult(CvResult { cv: 18, value: 0x01 }));
        bus.publish(Event::CvResult(CvResult { cv: 17, value: 0x02 }));

        let result = pending.wait(WAIT).await.unwrap();
        assert_eq!(result.value, 0x02);
    }

    #[tokio::test]
    async fn test_nack_rejects_all_armed_requests() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let first = correlator.arm(1);
        let second = correlator.arm(2);
        bus.publish(Event::Error(EventError {
            code: ErrorCode::Nack,
            message: "CV Read/Write NACK".to_string(),
        }));

        assert!(matches!(
            first.wait(WAIT).await,
            Err(Error::Nack {
                short_circuit: false
            })
        ));
        assert!(matches!(
            second.wait(WAIT).await,
            Err(Error::Nack {
                short_circuit: false
            })
        ));
    }

    #[tokio::test]
    async fn test_nack_sc_carries_short_circuit() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(5);
        bus.publish(Event::Error(EventError {
            code: ErrorCode::NackShortCircuit,
            message: "CV Read/Write NACK due to short-circuit".to_string(),
        }));

        assert!(matches!(
            pending.wait(WAIT).await,
            Err(Error::Nack {
                short_circuit: true
            })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_rejects_armed_requests() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(17);
        bus.publish(Event::Error(EventError {
            code: ErrorCode::Transport,
            message: "UDP receive failed: network is down".to_string(),
        }));

        assert!(matches!(pending.wait(WAIT).await, Err(Error::Protocol(_))));
        assert!(correlator.lock_pending().is_empty());
    }

    #[tokio::test]
    async fn test_timeout() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(17);
        let result = pending.wait(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        // The entry is gone; a late reply finds nothing to resolve
        assert!(correlator.lock_pending().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_reply_after_resolution_is_ignored() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let pending = correlator.arm(17);
        bus.publish(Event::CvResult(CvResult { cv: 17, value: 0x01 }));
        let result = pending.wait(WAIT).await.unwrap();
        assert_eq!(result.value, 0x01);

        // Duplicate reply: no armed entry left, nothing observable happens
        bus.publish(Event::CvResult(CvResult { cv: 17, value: 0x02 }));
        sleep(Duration::from_millis(20)).await;
        assert!(correlator.lock_pending().is_empty());
    }

    #[tokio::test]
    async fn test_disarm_on_send_failure() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let _pending = correlator.arm(17);
        correlator.disarm(17);
        assert!(correlator.lock_pending().is_empty());
    }

    #[tokio::test]
    async fn test_independent_concurrent_requests() {
        let bus = EventBus::new();
        let correlator = CvCorrelator::new(&bus);

        let first = correlator.arm(1);
        let second = correlator.arm(2);

        bus.publish(Event::CvResult(CvResult { cv: 2, value: 0x20 }));
        bus.publish(Event::CvResult(CvResult { cv: 1, value: 0x10 }));

        assert_eq!(first.wait(WAIT).await.unwrap().value, 0x10);
        assert_eq!(second.wait(WAIT).await.unwrap().value, 0x20);
    }
}
