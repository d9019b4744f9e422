// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-frame timing metadata, one record per buffer slot.

/// Timing and identity metadata for one captured frame.
///
/// The capture producer overwrites the slot's record in place on every
/// cycle before it queues the slot index. A `frame_id` of -1 marks a slot
/// the producer has never written; acquisition rejects such slots.
///
/// All timestamps are monotonic nanoseconds. `processing_time` is the ISP
/// latency in seconds from end-of-exposure (`timestamp_eof`) to
/// end-of-ISP-processing, computed on acquisition rather than by the
/// producer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameMetadata {
    /// Monotonic frame counter from the sensor driver, -1 when unset.
    pub frame_id: i64,
    /// Start of frame readout.
    pub timestamp_sof: u64,
    /// End of exposure.
    pub timestamp_eof: u64,
    /// End of ISP processing for this frame.
    pub timestamp_end_of_isp: u64,
    /// ISP latency in seconds, filled in by `CameraBuf::acquire`.
    pub processing_time: f64,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            frame_id: -1,
            timestamp_sof: 0,
            timestamp_eof: 0,
            timestamp_end_of_isp: 0,
            processing_time: 0.0,
        }
    }
}

impl FrameMetadata {
    /// ISP latency in seconds for this frame's timestamps.
    ///
    /// Saturates to zero if the clock pair is reversed.
    pub fn isp_latency(&self) -> f64 {
        self.timestamp_end_of_isp.saturating_sub(self.timestamp_eof) as f64 * 1e-9
    }
}
