// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame buffer lifecycle orchestration.
//!
//! [`CameraBuf`] ties the slot pools together: per-slot timing metadata,
//! the optional raw sensor buffer pool, the output buffers owned by the
//! publishing service, and the free-slot queue that hands slots from the
//! capture producer to the consumer. The producer side of the hand-off
//! goes through a [`FrameProducer`] handle, which shares the slot arrays
//! and the queue's sending end.

use crate::{
    exposure::{self, Rect},
    metadata::FrameMetadata,
    publish::{FrameExtra, FrameSink, OutputFrame, OutputSpec, StreamId},
    queue::SlotQueue,
    rawbuf::{ComputeContext, RawBuffer},
    sensor::SensorInfo,
};
use std::{
    error::Error,
    sync::{Arc, Mutex},
};
use tracing::{debug, error};

/// What the capture pipeline emits for this stream.
///
/// Downstream logic branches on this: only `Raw` pipelines carry a raw
/// buffer pool, and the distinction is fixed at init.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutput {
    /// ISP-processed output only; no raw pool is allocated.
    Processed,
    /// Unprocessed sensor data alongside the processed output.
    Raw,
}

struct RawPool {
    ctx: Arc<dyn ComputeContext>,
    bufs: Arc<Vec<RawBuffer>>,
}

/// Buffer lifecycle orchestrator for one camera stream.
pub struct CameraBuf<S: FrameSink> {
    sink: S,
    stream: StreamId,
    slot_count: usize,
    metadata: Arc<[Mutex<FrameMetadata>]>,
    raw: Option<RawPool>,
    queue: SlotQueue,
    cur_slot: usize,
    cur_frame: FrameMetadata,
}

impl<S: FrameSink> CameraBuf<S> {
    /// Set up the slot pools for one stream.
    ///
    /// Allocates `slot_count` metadata records (all starting unwritten),
    /// allocates and accelerator-maps the raw pool when `output` is
    /// [`PipelineOutput::Raw`], computes the output geometry from the
    /// sensor descriptor, and asks the publishing service to create its
    /// buffer pool.
    ///
    /// # Errors
    ///
    /// Any allocation, mapping, or pool-creation failure propagates and
    /// the caller must abort pipeline startup; there is no partial state
    /// to retry.
    pub fn new(
        accel: Arc<dyn ComputeContext>,
        sensor: &SensorInfo,
        mut sink: S,
        output: PipelineOutput,
        slot_count: usize,
        stream: StreamId,
    ) -> Result<Self, Box<dyn Error>> {
        let metadata: Arc<[Mutex<FrameMetadata>]> = (0..slot_count)
            .map(|_| Mutex::new(FrameMetadata::default()))
            .collect();

        let raw = match output {
            PipelineOutput::Processed => None,
            PipelineOutput::Raw => {
                let size = sensor.raw_frame_size();
                let mut bufs = Vec::with_capacity(slot_count);
                for _ in 0..slot_count {
                    let buf = RawBuffer::allocate(size)?;
                    accel.map(&buf)?;
                    bufs.push(buf);
                }
                debug!("allocated {slot_count} raw buffers of {size} bytes");
                Some(RawPool {
                    ctx: accel,
                    bufs: Arc::new(bufs),
                })
            }
        };

        let spec = OutputSpec {
            width: sensor.out_width(),
            height: sensor.out_height(),
            size: sensor.out_buffer_size(),
            stride: sensor.out_stride,
            uv_offset: sensor.uv_offset,
        };
        sink.create_buffers(stream, slot_count, &spec)?;
        debug!(
            "created {slot_count} output buffers with size {}x{}",
            spec.stride, spec.height
        );

        Ok(Self {
            sink,
            stream,
            slot_count,
            metadata,
            raw,
            queue: SlotQueue::new(slot_count),
            cur_slot: 0,
            cur_frame: FrameMetadata::default(),
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Producer-side handle sharing this orchestrator's slot arrays and
    /// the free-slot queue. Cloneable; hand it to the capture thread.
    pub fn producer(&self) -> FrameProducer {
        FrameProducer {
            metadata: self.metadata.clone(),
            raw: self.raw.as_ref().map(|p| p.bufs.clone()),
            queue: self.queue.clone(),
        }
    }

    /// Acquire the next completed frame and publish it.
    ///
    /// Pops one slot from the free-slot queue without waiting; `false`
    /// means no frame is ready this cycle and the caller should retry on
    /// the next one. A popped slot whose metadata was never written is
    /// an anomaly: it is logged and dropped for this cycle without being
    /// requeued (slot reuse stays with the producer).
    ///
    /// On success the slot's metadata snapshot (with the ISP latency
    /// filled in) becomes the current frame, and the slot's output buffer
    /// is stamped and handed to the publishing service. Publication here
    /// is the only point where a frame becomes visible downstream.
    pub fn acquire(&mut self) -> bool {
        let Some(slot) = self.queue.try_pop() else {
            return false;
        };

        let meta = *self.metadata[slot].lock().unwrap();
        if meta.frame_id == -1 {
            error!("popped slot {slot} with no frame data");
            return false;
        }

        self.cur_slot = slot;
        self.cur_frame = meta;
        self.cur_frame.processing_time = meta.isp_latency();

        let extra = FrameExtra {
            frame_id: meta.frame_id,
            timestamp_sof: meta.timestamp_sof,
            timestamp_eof: meta.timestamp_eof,
        };
        let Some(buf) = self.sink.buffer(self.stream, slot) else {
            error!("no output buffer for slot {slot}");
            return false;
        };
        buf.set_frame_id(meta.frame_id);
        if let Err(e) = self.sink.send(self.stream, slot, &extra) {
            error!("failed to publish frame {}: {e}", meta.frame_id);
            return false;
        }

        true
    }

    /// Return `slot` to circulation on the free-slot queue.
    ///
    /// No validation happens here; the capture producer owns the slot
    /// cycle and calls this exactly once per slot it has finished.
    pub fn queue(&self, slot: usize) {
        self.queue.push(slot);
    }

    /// Metadata snapshot of the most recently acquired frame.
    pub fn cur_frame(&self) -> &FrameMetadata {
        &self.cur_frame
    }

    pub fn cur_slot(&self) -> usize {
        self.cur_slot
    }

    /// Raw buffer of the most recently acquired frame, if this pipeline
    /// emits raw sensor data.
    pub fn cur_raw(&self) -> Option<&RawBuffer> {
        self.raw.as_ref().map(|p| &p.bufs[self.cur_slot])
    }

    /// Owned copy of the current raw frame, for serialization or logging.
    pub fn raw_frame_image(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        match self.cur_raw() {
            Some(buf) => buf.snapshot(),
            None => Err("pipeline has no raw buffer pool".into()),
        }
    }

    /// Meter exposure over `region` of the current frame's luminance
    /// plane. Call after a successful [`acquire`](Self::acquire) and
    /// before the producer reuses the slot.
    pub fn cur_exposure(&mut self, region: &Rect, x_step: usize, y_step: usize) -> Option<f32> {
        let buf = self.sink.buffer(self.stream, self.cur_slot)?;
        Some(exposure::exposure_value(
            buf.luma(),
            buf.stride(),
            region,
            x_step,
            y_step,
        ))
    }

    /// The publishing service, for callers that need its own surface.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: FrameSink> Drop for CameraBuf<S> {
    fn drop(&mut self) {
        if let Some(pool) = &self.raw {
            for buf in pool.bufs.iter() {
                pool.ctx.unmap(buf);
            }
        }
    }
}

/// Capture-producer handle for one [`CameraBuf`].
///
/// The producer writes a slot's metadata (and raw buffer contents, when
/// present) strictly before queueing the slot; the queue push is what
/// publishes those writes to the consumer.
#[derive(Clone)]
pub struct FrameProducer {
    metadata: Arc<[Mutex<FrameMetadata>]>,
    raw: Option<Arc<Vec<RawBuffer>>>,
    queue: SlotQueue,
}

impl FrameProducer {
    /// Number of slots in the pools this handle serves.
    pub fn slot_count(&self) -> usize {
        self.metadata.len()
    }

    /// Record the metadata for a freshly captured frame in `slot`.
    ///
    /// Must happen before [`queue`](Self::queue) for the same slot, and
    /// `meta.frame_id` must not be -1 once the slot is queued.
    pub fn stage(&self, slot: usize, meta: FrameMetadata) {
        *self.metadata[slot].lock().unwrap() = meta;
    }

    /// Raw buffer for `slot`, if the pipeline carries a raw pool.
    pub fn raw_buffer(&self, slot: usize) -> Option<&RawBuffer> {
        self.raw.as_deref().and_then(|bufs| bufs.get(slot))
    }

    /// Push `slot` onto the free-slot queue, making the frame available
    /// to [`CameraBuf::acquire`].
    pub fn queue(&self, slot: usize) {
        self.queue.push(slot);
    }
}
