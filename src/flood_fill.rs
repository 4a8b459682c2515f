//! Breadth-first region fill over straight-alpha RGBA pixel buffers.

use crate::color::{Rgba, colors_match};
use image::RgbaImage;
use std::collections::VecDeque;

/// Width × height RGBA buffer, one byte per channel, straight alpha.
pub type PixelBuffer = RgbaImage;

/// Fills the 4-connected region around `start` whose pixels match `target`
/// within `tolerance`, returning a repainted copy of `buffer`.
///
/// Returns `None` when `start` lies outside the buffer or the pixel there no
/// longer matches `target` (the caller read a stale target color).
pub fn flood_fill(
    buffer: &PixelBuffer,
    start: (u32, u32),
    target: Rgba,
    fill: Rgba,
    tolerance: u8,
) -> Option<PixelBuffer> {
    let mut filled = buffer.clone();
    flood_fill_in_place(&mut filled, start, target, fill, tolerance)?;
    Some(filled)
}

/// In-place variant of [`flood_fill`]. Returns the number of repainted pixels,
/// or `None` if nothing was done.
pub fn flood_fill_in_place(
    buffer: &mut PixelBuffer,
    start: (u32, u32),
    target: Rgba,
    fill: Rgba,
    tolerance: u8,
) -> Option<usize> {
    let (width, height) = buffer.dimensions();
    let (start_x, start_y) = start;
    if start_x >= width || start_y >= height {
        return None;
    }
    if !colors_match(Rgba::from(*buffer.get_pixel(start_x, start_y)), target, tolerance) {
        return None;
    }

    let fill_pixel = image::Rgba::from(fill);
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    let mut visited = vec![false; width as usize * height as usize];
    let mut queue = VecDeque::new();

    visited[index(start_x, start_y)] = true;
    buffer.put_pixel(start_x, start_y, fill_pixel);
    queue.push_back((start_x, start_y));
    let mut painted = 1;

    while let Some((x, y)) = queue.pop_front() {
        let neighbors = [
            (x.checked_add(1), Some(y)),
            (x.checked_sub(1), Some(y)),
            (Some(x), y.checked_add(1)),
            (Some(x), y.checked_sub(1)),
        ];

        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            if nx >= width || ny >= height || visited[index(nx, ny)] {
                continue;
            }
            // Unvisited pixels have not been written yet, so this is the original color.
            if colors_match(Rgba::from(*buffer.get_pixel(nx, ny)), target, tolerance) {
                visited[index(nx, ny)] = true;
                buffer.put_pixel(nx, ny, fill_pixel);
                queue.push_back((nx, ny));
                painted += 1;
            }
        }
    }

    log::debug!("flood fill from {start_x},{start_y} painted {painted} pixels");
    Some(painted)
}

/// Reads the pixel at `(x, y)`, if it lies inside the buffer.
pub fn sample(buffer: &PixelBuffer, x: u32, y: u32) -> Option<Rgba> {
    (x < buffer.width() && y < buffer.height()).then(|| Rgba::from(*buffer.get_pixel(x, y)))
}
