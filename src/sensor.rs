// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Sensor geometry descriptor and buffer sizing arithmetic.
//!
//! The capture pipeline sizes every pool from the sensor descriptor: the
//! raw pool from the full readout geometry (including the extra rows some
//! sensors append after the active area) and the output pool from the
//! usable image geometry after HDR de-interleaving.

/// Widths at or below this use the larger per-row encoder multiplier.
const ENCODER_WIDTH_THRESHOLD: u32 = 1344;

/// Encoder rows-per-buffer for narrow (<= threshold) outputs.
const ENCODER_ROWS_NARROW: u32 = 2900;

/// Encoder rows-per-buffer for wide outputs.
const ENCODER_ROWS_WIDE: u32 = 2346;

/// Read-only description of a camera sensor's readout geometry.
///
/// All fields come from the sensor/ISP driver at probe time and never
/// change for the lifetime of a pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SensorInfo {
    /// Active frame width in pixels.
    pub frame_width: u32,
    /// Active frame height in rows.
    pub frame_height: u32,
    /// Extra readout rows appended after the active area (embedded data,
    /// optical black). Counted in the raw buffer, never in the output.
    pub extra_height: u32,
    /// Raw readout stride in bytes per row.
    pub frame_stride: u32,
    /// Row offset where the second interleaved HDR exposure begins, or 0
    /// for sensors that emit a single exposure per frame.
    pub hdr_offset: u32,
    /// Output (NV12) stride in bytes per row, dictated by the ISP.
    pub out_stride: u32,
    /// Byte offset of the chroma plane within an output buffer.
    pub uv_offset: u32,
}

impl SensorInfo {
    /// Usable output image width.
    pub fn out_width(&self) -> u32 {
        self.frame_width
    }

    /// Usable output image height.
    ///
    /// Sensors with `hdr_offset > 0` interleave two exposures in one
    /// readout, so only half the rows past the offset belong to each
    /// image.
    pub fn out_height(&self) -> u32 {
        if self.hdr_offset > 0 {
            (self.frame_height - self.hdr_offset) / 2
        } else {
            self.frame_height
        }
    }

    /// Size in bytes of one raw sensor frame.
    pub fn raw_frame_size(&self) -> usize {
        ((self.frame_height + self.extra_height) * self.frame_stride) as usize
    }

    /// Size in bytes of one output buffer.
    ///
    /// The downstream encoder hardware dictates the buffer size it wants
    /// after setup, as a per-row multiplier on the output stride. This is
    /// not the pixel count and must not be computed as width x height.
    pub fn out_buffer_size(&self) -> usize {
        let rows = if self.out_width() <= ENCODER_WIDTH_THRESHOLD {
            ENCODER_ROWS_NARROW
        } else {
            ENCODER_ROWS_WIDE
        };
        (rows * self.out_stride) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor() -> SensorInfo {
        SensorInfo {
            frame_width: 1928,
            frame_height: 1208,
            extra_height: 16,
            frame_stride: 2416,
            hdr_offset: 0,
            out_stride: 1952,
            uv_offset: 1952 * 1208,
        }
    }

    #[test]
    fn out_height_without_hdr() {
        let s = sensor();
        assert_eq!(s.out_height(), 1208);
        assert_eq!(s.out_width(), 1928);
    }

    #[test]
    fn out_height_with_hdr_interleave() {
        let s = SensorInfo {
            hdr_offset: 8,
            ..sensor()
        };
        assert_eq!(s.out_height(), (1208 - 8) / 2);

        // odd remainder truncates
        let s = SensorInfo {
            frame_height: 1209,
            hdr_offset: 8,
            ..sensor()
        };
        assert_eq!(s.out_height(), 600);
    }

    #[test]
    fn raw_frame_size_includes_extra_rows() {
        let s = sensor();
        assert_eq!(s.raw_frame_size(), (1208 + 16) * 2416);
    }

    #[test]
    fn out_buffer_size_tracks_encoder_threshold() {
        let narrow = SensorInfo {
            frame_width: 1280,
            out_stride: 1280,
            ..sensor()
        };
        assert_eq!(narrow.out_buffer_size(), 2900 * 1280);

        let at_threshold = SensorInfo {
            frame_width: 1344,
            out_stride: 1344,
            ..sensor()
        };
        assert_eq!(at_threshold.out_buffer_size(), 2900 * 1344);

        let wide = SensorInfo {
            frame_width: 1928,
            out_stride: 1952,
            ..sensor()
        };
        assert_eq!(wide.out_buffer_size(), 2346 * 1952);
    }
}
