// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Auto-exposure metering over a frame's luminance plane.

/// Rectangular metering region within the luminance plane.
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: i32,
    /// Y coordinate of top-left corner
    pub y: i32,
    /// Width of the rectangle in pixels
    pub width: i32,
    /// Height of the rectangle in pixels
    pub height: i32,
}

/// Median-based exposure statistic over `region` of a luminance plane.
///
/// Builds a 256-bin histogram of the samples inside `region`, visiting
/// every `x_step` column and `y_step` row, then scans the bins from
/// brightest to darkest until the running count reaches half the sample
/// total. The crossing bin divided by 256 is the result, in `[0, 1)`.
///
/// The median resists the outlier-pixel skew a mean would pick up from
/// specular highlights or dead pixels; ties resolve toward the brighter
/// bin because the scan descends from 255.
///
/// `stride` is the luminance plane's row stride in bytes. Both steps must
/// be at least 1. Pure function, safe from any thread while the plane is
/// stable.
pub fn exposure_value(luma: &[u8], stride: usize, region: &Rect, x_step: usize, y_step: usize) -> f32 {
    debug_assert!(x_step >= 1 && y_step >= 1);

    let mut bins = [0u32; 256];
    let mut total: u32 = 0;

    let mut y = region.y;
    while y < region.y + region.height {
        let mut x = region.x;
        while x < region.x + region.width {
            let lum = luma[y as usize * stride + x as usize];
            bins[lum as usize] += 1;
            total += 1;
            x += x_step as i32;
        }
        y += y_step as i32;
    }

    let mut cur: u32 = 0;
    let mut med: i32 = 255;
    while med >= 0 {
        cur += bins[med as usize];
        if cur >= total / 2 {
            break;
        }
        med -= 1;
    }

    med as f32 / 256.0
}
