//! The driver loop (spec §4.7): adapts wall-clock time to simulated ticks
//! via an accumulator, and realizes the "worker isolate" of §5 as a real
//! OS thread talking over `std::sync::mpsc` channels.
//!
//! Direct command replies and the driver's autonomous `StateUpdate` ticks
//! (published whenever the kernel is `Running`, independent of any single
//! request) share one response channel. Each request is tagged with a
//! correlation id so [`DriverHandle::recv_matching`] can pick its reply
//! out from among any autonomous ticks interleaved on the same channel,
//! and the channel itself is bounded to one slot so an idle caller can't
//! let unconsumed ticks pile up without bound: a tick that finds the slot
//! already occupied is simply dropped, since only the latest snapshot
//! ever matters (spec §9 "snapshots, not diffs").

use crate::kernel::{Kernel, KernelConfig};
use crate::message::{dispatch, KernelRequest, KernelResponse, Snapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const MAX_STEPS_PER_FRAME: u32 = 100;
const FRAME_PERIOD: Duration = Duration::from_millis(16);

pub fn clamp_ms_per_tick(ms: u32) -> u32 {
    ms.clamp(1, 1_000)
}

type Tagged<T> = (Option<u64>, T);

/// Handle to the worker-isolate thread: a request channel in, a response
/// channel out. Dropping this stops the driver (the thread exits once the
/// sender is dropped and the channel empties).
pub struct DriverHandle {
    requests: Sender<Tagged<KernelRequest>>,
    responses: Receiver<Tagged<KernelResponse>>,
    next_id: AtomicU64,
    join: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// Spawns the kernel + driver loop on its own thread (spec §5 "worker
    /// isolate... realized as a dedicated OS thread").
    pub fn spawn(config: KernelConfig, ms_per_tick: u32) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::sync_channel(1);
        let join = std::thread::Builder::new()
            .name("circsim-driver".into())
            .spawn(move || run_driver_loop(config, ms_per_tick, request_rx, response_tx))
            .expect("failed to spawn driver thread");
        Self {
            requests: request_tx,
            responses: response_rx,
            next_id: AtomicU64::new(0),
            join: Some(join),
        }
    }

    /// Sends `request` and returns the correlation id its reply will carry.
    /// Pair with [`recv_matching`](Self::recv_matching) to get that exact
    /// reply back regardless of any autonomous ticks interleaved with it.
    pub fn send(&self, request: KernelRequest) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // The driver thread only stops by dropping its receiver, which
        // only happens after `join`; a send error here means the thread
        // already panicked, which is a programmer error, not a kernel one.
        let _ = self.requests.send((Some(id), request));
        id
    }

    /// Blocks for the very next message on the channel, reply or
    /// autonomous tick alike. Only meaningful before any request has been
    /// sent (e.g. the driver's unsolicited startup `ready`).
    pub fn recv(&self) -> Option<KernelResponse> {
        self.responses.recv().ok().map(|(_, response)| response)
    }

    /// Blocks until the reply tagged `id` arrives, discarding any
    /// untagged autonomous `StateUpdate` ticks received in between.
    pub fn recv_matching(&self, id: u64) -> Option<KernelResponse> {
        loop {
            match self.responses.recv() {
                Ok((Some(rid), response)) if rid == id => return Some(response),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// The accumulator-paced loop body (spec §4.7). Runs until the request
/// channel disconnects (the [`DriverHandle`] was dropped).
fn run_driver_loop(
    config: KernelConfig,
    initial_ms_per_tick: u32,
    requests: Receiver<Tagged<KernelRequest>>,
    responses: SyncSender<Tagged<KernelResponse>>,
) {
    let mut kernel = Kernel::new(config);
    let mut ms_per_tick = clamp_ms_per_tick(initial_ms_per_tick);
    let mut accumulator = Duration::ZERO;
    let mut last_time = Instant::now();

    let _ = responses.send((None, KernelResponse::Ready));

    loop {
        match requests.recv_timeout(FRAME_PERIOD) {
            Ok((id, request)) => {
                if let KernelRequest::SetSpeed { ms_per_tick: new_rate } = &request {
                    ms_per_tick = clamp_ms_per_tick(*new_rate);
                    log::trace!("driver: msPerTick set to {ms_per_tick}");
                }
                let response = dispatch(&mut kernel, request);
                // A direct reply always gets through: block until the
                // caller's `recv_matching` has drained whatever (if
                // anything) was occupying the slot.
                if responses.send((id, response)).is_err() {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        if kernel.state() == crate::kernel::KernelState::Running {
            let now = Instant::now();
            accumulator += now.duration_since(last_time);
            last_time = now;

            let tick = Duration::from_millis(ms_per_tick as u64);
            let mut steps = (accumulator.as_nanos() / tick.as_nanos().max(1)) as u32;
            if steps > MAX_STEPS_PER_FRAME {
                log::trace!("driver: clamping {steps} steps to {MAX_STEPS_PER_FRAME}, dropping accumulator");
                steps = MAX_STEPS_PER_FRAME;
                accumulator = Duration::ZERO;
            } else {
                accumulator -= tick * steps;
            }

            if steps > 0 {
                kernel.step(steps);
                let snapshot = Snapshot::capture(&kernel);
                match responses.try_send((None, KernelResponse::StateUpdate(snapshot))) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {} // stale tick, drop it
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        } else {
            last_time = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_enforces_1_to_1000() {
        assert_eq!(clamp_ms_per_tick(0), 1);
        assert_eq!(clamp_ms_per_tick(5_000), 1_000);
        assert_eq!(clamp_ms_per_tick(16), 16);
    }

    #[test]
    fn spawned_driver_acks_ready_then_applies_requests() {
        let handle = DriverHandle::spawn(KernelConfig::default(), 16);
        assert!(matches!(handle.recv(), Some(KernelResponse::Ready)));

        let id = handle.send(KernelRequest::Init {
            gates: vec![],
            wires: vec![],
        });
        assert!(matches!(handle.recv_matching(id), Some(KernelResponse::Ready)));

        let id = handle.send(KernelRequest::GetState);
        match handle.recv_matching(id) {
            Some(KernelResponse::StateUpdate(snapshot)) => assert_eq!(snapshot.time, 0),
            other => panic!("expected stateUpdate, got {other:?}"),
        }
    }

    /// A reply always finds its matching caller even with an autonomous
    /// tick interleaved ahead of it on the channel.
    #[test]
    fn recv_matching_skips_interleaved_ticks() {
        let handle = DriverHandle::spawn(KernelConfig::default(), 1);
        assert!(matches!(handle.recv(), Some(KernelResponse::Ready)));

        let id = handle.send(KernelRequest::Init {
            gates: vec![],
            wires: vec![],
        });
        assert!(matches!(handle.recv_matching(id), Some(KernelResponse::Ready)));

        let id = handle.send(KernelRequest::Run);
        assert!(matches!(handle.recv_matching(id), Some(KernelResponse::Ready)));

        std::thread::sleep(Duration::from_millis(50)); // let ticks accumulate

        let id = handle.send(KernelRequest::Pause);
        assert!(matches!(handle.recv_matching(id), Some(KernelResponse::Ready)));
    }
}
