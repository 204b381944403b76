// SPDX-License-Identifier: AGPL-3.0-only

//! Outstanding work and the materialization barrier

use std::any::Any;
use std::sync::mpsc;
use std::thread;

use crate::device::{Device, DeviceBuffer, Resident};
use crate::error::{Result, RuntimeError};

/// Values whose computation may still be in flight
///
/// `block_until_ready` is the synchronization barrier: it returns only once
/// every output exists.
pub trait Materialize {
    /// Fully computed value
    type Output;

    /// Block the caller until all outputs are computed.
    ///
    /// # Errors
    ///
    /// Returns error if any part of the computation failed.
    fn block_until_ready(self) -> Result<Self::Output>;
}

type LaneResult<O> = (usize, thread::Result<O>);

/// Outputs of a dispatched batched call, one per lane
pub struct Pending<O> {
    rx: mpsc::Receiver<LaneResult<O>>,
    lanes: usize,
    device: Device,
}

impl<O> Pending<O> {
    pub(crate) fn new(rx: mpsc::Receiver<LaneResult<O>>, lanes: usize, device: Device) -> Self {
        Self { rx, lanes, device }
    }

    /// Number of lanes the call was dispatched with
    pub const fn lanes(&self) -> usize {
        self.lanes
    }
}

impl<O: DeviceBuffer> Materialize for Pending<O> {
    type Output = Resident<Vec<O>>;

    fn block_until_ready(self) -> Result<Resident<Vec<O>>> {
        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(self.lanes).collect();
        for _ in 0..self.lanes {
            let (lane, outcome) = self.rx.recv().map_err(|_| {
                let missing = slots.iter().position(Option::is_none).unwrap_or(0);
                RuntimeError::lane_failed(missing, "lane dropped without reporting")
            })?;
            match outcome {
                Ok(out) => slots[lane] = Some(out),
                Err(payload) => return Err(RuntimeError::lane_failed(lane, panic_message(&*payload))),
            }
        }
        let outputs = slots
            .into_iter()
            .enumerate()
            .map(|(lane, slot)| slot.ok_or_else(|| RuntimeError::lane_failed(lane, "no output")))
            .collect::<Result<Vec<O>>>()?;
        Ok(self.device.adopt(outputs))
    }
}

/// Already-computed value; the barrier is a no-op
#[derive(Debug)]
pub struct Ready<T>(pub T);

impl<T> Materialize for Ready<T> {
    type Output = T;

    fn block_until_ready(self) -> Result<T> {
        Ok(self.0)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
