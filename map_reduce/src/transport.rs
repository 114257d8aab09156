use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::MapReduceError;

/// What a worker sends back to the collector when it finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Report {
    Map {
        mapper: usize,
        read: usize,
        skipped: usize,
        /// Mapped records in their text wire format.
        records: Vec<String>,
    },
    Reduce {
        partition: usize,
        failed: usize,
        /// `(group index, output line)` pairs.
        lines: Vec<(usize, String)>,
    },
}

/// A report tagged with the run it belongs to. A worker that outlived a
/// timed-out run can still deliver into the next one, so the collector
/// drops envelopes from other runs.
#[derive(Serialize, Deserialize)]
struct Envelope<R> {
    run: u64,
    report: R,
}

/// Where a worker sends its report, and for which run.
#[derive(Clone)]
pub(crate) struct ReturnPath<'a> {
    pub(crate) context: zmq::Context,
    pub(crate) addr: &'a str,
    /// zmq socket timeout; -1 blocks.
    pub(crate) timeout_ms: i32,
    pub(crate) run: u64,
}

impl ReturnPath<'_> {
    /// Connects a REQ socket to the collector, sends one report and waits
    /// for the empty acknowledgement.
    pub(crate) fn send(&self, report: &Report) -> Result<(), MapReduceError> {
        let requester = self.context.socket(zmq::REQ)?;
        requester.set_linger(0)?;
        requester.set_sndtimeo(self.timeout_ms)?;
        requester.set_rcvtimeo(self.timeout_ms)?;
        requester.connect(self.addr)?;

        let envelope = Envelope {
            run: self.run,
            report,
        };
        let payload = serde_json::to_vec(&envelope).map_err(MapReduceError::Codec)?;
        requester.send(payload, 0)?;
        requester.recv_bytes(0)?;
        Ok(())
    }
}

/// The REP end every worker reports to. Each report is acknowledged before
/// it is decoded, so the socket is always ready for the next one.
pub(crate) struct Collector {
    responder: zmq::Socket,
    addr: String,
}

impl Collector {
    pub(crate) fn bind(
        context: &zmq::Context,
        addr: &str,
        timeout_ms: i32,
    ) -> Result<Self, MapReduceError> {
        let responder = context.socket(zmq::REP)?;
        responder.set_linger(0)?;
        responder.set_rcvtimeo(timeout_ms)?;
        responder.set_sndtimeo(timeout_ms)?;
        responder.bind(addr)?;
        Ok(Collector {
            responder,
            addr: addr.to_string(),
        })
    }

    /// Blocks until `expected` reports of `run` arrived, acknowledging each
    /// one. The timeout applies to the wait for each report, so it also
    /// bounds how long a single worker may compute.
    pub(crate) fn gather(
        &self,
        run: u64,
        stage: &'static str,
        expected: usize,
    ) -> Result<Vec<Report>, MapReduceError> {
        let mut msg = zmq::Message::new();
        let mut reports = Vec::with_capacity(expected);
        debug!(run, stage, expected, "waiting for workers to return");
        while reports.len() < expected {
            match self.responder.recv(&mut msg, 0) {
                Ok(()) => {}
                Err(zmq::Error::EAGAIN) => {
                    return Err(MapReduceError::Timeout {
                        stage,
                        received: reports.len(),
                        expected,
                    })
                }
                Err(err) => return Err(err.into()),
            }
            self.responder.send("", 0)?;
            let envelope: Envelope<Report> =
                serde_json::from_slice(&msg).map_err(MapReduceError::Codec)?;
            if envelope.run != run {
                warn!(run, stale = envelope.run, stage, "dropping report from an earlier run");
                continue;
            }
            reports.push(envelope.report);
        }
        debug!(run, stage, "all workers returned");
        Ok(reports)
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        let _ = self.responder.unbind(&self.addr);
    }
}
