//! Headless compositor for layers and strokes.
//!
//! A layer composites as its raster snapshot followed by its strokes in
//! stored order, each stroke with its own compositing mode; only then is the
//! layer's opacity applied, once, when it is drawn onto the flattened output.
//! Live display, thumbnails, flood-fill sources and exported images all go
//! through the same code so they stay visually identical.

use crate::document::{CanvasSize, LayerList};
use crate::flood_fill::PixelBuffer;
use crate::layer::{Layer, LayerId};
use crate::raster::RasterError;
use crate::stroke::{CompositeMode, LineCap, LineJoin, Stroke, StrokeShape};
use egui::Pos2;
use image::RgbaImage;
use thiserror::Error;
use tiny_skia::{
    BlendMode, ColorU8, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} surface")]
    InvalidSurface { width: u32, height: u32 },

    #[error("failed to encode rendered image: {0}")]
    Raster(#[from] RasterError),
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    size: CanvasSize,
}

impl Renderer {
    pub fn new(size: CanvasSize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Raster plus strokes of one layer at full document resolution, opacity not applied.
    pub fn composite_layer(&self, layer: &Layer) -> Result<Pixmap, RenderError> {
        self.composite_layer_with_preview(layer, None)
    }

    /// Like [`Renderer::composite_layer`], with an uncommitted stroke painted on top.
    pub fn composite_layer_with_preview(
        &self,
        layer: &Layer,
        preview: Option<&Stroke>,
    ) -> Result<Pixmap, RenderError> {
        let mut pixmap = new_pixmap(self.size.width, self.size.height)?;
        draw_raster(&mut pixmap, layer, self.size.width, self.size.height)?;
        for stroke in layer.strokes.iter().chain(preview) {
            paint_stroke(&mut pixmap, stroke, Transform::identity(), 1.0, 0.0);
        }
        Ok(pixmap)
    }

    /// Straight-alpha copy of [`Renderer::composite_layer`], the flood fill source.
    pub fn composite_layer_buffer(&self, layer: &Layer) -> Result<PixelBuffer, RenderError> {
        pixmap_to_buffer(&self.composite_layer(layer)?)
    }

    /// Flattens the visible layers bottom to top into one straight-alpha image.
    pub fn flatten(&self, layers: &[std::sync::Arc<Layer>]) -> Result<PixelBuffer, RenderError> {
        self.render_layers(layers, None)
    }

    /// Flattens with an in-progress stroke shown on its target layer.
    pub fn render_layers(
        &self,
        layers: &[std::sync::Arc<Layer>],
        preview: Option<(LayerId, &Stroke)>,
    ) -> Result<PixelBuffer, RenderError> {
        let mut target = new_pixmap(self.size.width, self.size.height)?;

        for layer in layers.iter().filter(|layer| layer.is_visible) {
            let layer_preview = preview
                .filter(|(id, _)| *id == layer.id)
                .map(|(_, stroke)| stroke);
            let content = self.composite_layer_with_preview(layer, layer_preview)?;
            let paint = PixmapPaint {
                opacity: layer.opacity.clamp(0.0, 1.0),
                blend_mode: BlendMode::SourceOver,
                quality: FilterQuality::Nearest,
            };
            target.draw_pixmap(0, 0, content.as_ref(), &paint, Transform::identity(), None);
        }

        pixmap_to_buffer(&target)
    }

    /// PNG bytes of the flattened visible layers.
    pub fn flatten_png(&self, layers: &LayerList) -> Result<Vec<u8>, RenderError> {
        let flat = self.flatten(layers)?;
        let snapshot = crate::raster::RasterSnapshot::encode(&flat)?;
        Ok(snapshot.png_bytes().to_vec())
    }

    /// Layer preview on a white background. The raster is stretched to the
    /// thumbnail; strokes are scaled uniformly and centred.
    pub fn thumbnail(&self, layer: &Layer, width: u32, height: u32) -> Result<PixelBuffer, RenderError> {
        let mut content = new_pixmap(width, height)?;
        draw_raster(&mut content, layer, width, height)?;

        let scale_x = width as f32 / self.size.width as f32;
        let scale_y = height as f32 / self.size.height as f32;
        let scale = scale_x.min(scale_y);
        let offset_x = (width as f32 - self.size.width as f32 * scale) / 2.0;
        let offset_y = (height as f32 - self.size.height as f32 * scale) / 2.0;
        let transform = Transform::from_row(scale, 0.0, 0.0, scale, offset_x, offset_y);

        for stroke in &layer.strokes {
            paint_stroke(&mut content, stroke, transform, scale, 0.5);
        }

        let mut thumb = new_pixmap(width, height)?;
        thumb.fill(tiny_skia::Color::WHITE);
        thumb.draw_pixmap(
            0,
            0,
            content.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        pixmap_to_buffer(&thumb)
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width, height).ok_or(RenderError::InvalidSurface { width, height })
}

/// Converts premultiplied surface pixels to a straight-alpha buffer.
pub fn pixmap_to_buffer(pixmap: &Pixmap) -> Result<PixelBuffer, RenderError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, data).ok_or(RenderError::InvalidSurface { width, height })
}

/// Converts a straight-alpha buffer to a premultiplied surface.
pub fn buffer_to_pixmap(buffer: &PixelBuffer) -> Result<Pixmap, RenderError> {
    let mut pixmap = new_pixmap(buffer.width(), buffer.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(buffer.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Draws the layer's raster stretched to `width`×`height`. An undecodable
/// raster is logged and treated as blank.
fn draw_raster(pixmap: &mut Pixmap, layer: &Layer, width: u32, height: u32) -> Result<(), RenderError> {
    let Some(raster) = &layer.raster else {
        return Ok(());
    };
    let decoded = match raster.decode() {
        Ok(decoded) => decoded,
        Err(err) => {
            log::warn!("Treating raster of {} as blank: {err}", layer.id);
            return Ok(());
        }
    };

    let source = buffer_to_pixmap(&decoded)?;
    let (transform, quality) = if decoded.dimensions() == (width, height) {
        (Transform::identity(), FilterQuality::Nearest)
    } else {
        (
            Transform::from_scale(
                width as f32 / decoded.width() as f32,
                height as f32 / decoded.height() as f32,
            ),
            FilterQuality::Bilinear,
        )
    };
    let paint = PixmapPaint {
        quality,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    Ok(())
}

/// Paints one stroke. `scale` is the transform's uniform scale; on-screen
/// line width never drops below `min_width`.
fn paint_stroke(pixmap: &mut Pixmap, stroke: &Stroke, transform: Transform, scale: f32, min_width: f32) {
    let mut paint = Paint::default();
    paint.set_color(stroke.color.into());
    paint.anti_alias = true;
    paint.blend_mode = match stroke.composite {
        CompositeMode::SourceOver => BlendMode::SourceOver,
        CompositeMode::DestinationOut => BlendMode::DestinationOut,
    };

    match &stroke.shape {
        StrokeShape::Polyline {
            points,
            tension,
            line_cap,
            line_join,
        } => {
            let width = (stroke.width * scale).max(min_width) / scale.max(f32::EPSILON);
            let Some(first) = points.first() else {
                return;
            };

            if points.iter().all(|p| p == first) {
                // A click without movement: a round dot.
                if let Some(dot) = PathBuilder::from_circle(first.x, first.y, width / 2.0) {
                    pixmap.fill_path(&dot, &paint, tiny_skia::FillRule::Winding, transform, None);
                }
                return;
            }

            let Some(path) = polyline_path(points, *tension) else {
                return;
            };
            let outline = tiny_skia::Stroke {
                width,
                line_cap: match line_cap {
                    LineCap::Butt => tiny_skia::LineCap::Butt,
                    LineCap::Round => tiny_skia::LineCap::Round,
                    LineCap::Square => tiny_skia::LineCap::Square,
                },
                line_join: match line_join {
                    LineJoin::Miter => tiny_skia::LineJoin::Miter,
                    LineJoin::Round => tiny_skia::LineJoin::Round,
                    LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
                },
                ..tiny_skia::Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &outline, transform, None);
        }
        StrokeShape::PixelCells { cells } => {
            // Crisp cell edges.
            paint.anti_alias = false;
            for cell in cells {
                if let Some(rect) = Rect::from_xywh(cell.x, cell.y, cell.width, cell.height) {
                    pixmap.fill_rect(rect, &paint, transform, None);
                }
            }
        }
    }
}

/// Builds a path through `points`, smoothed as a cardinal spline when
/// `tension > 0` and there are more than two points.
fn polyline_path(points: &[Pos2], tension: f32) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    let first = points.first()?;
    builder.move_to(first.x, first.y);

    if tension <= 0.0 || points.len() <= 2 {
        for p in &points[1..] {
            builder.line_to(p.x, p.y);
        }
        return builder.finish();
    }

    // (incoming, outgoing) control points for every interior point.
    let controls: Vec<(Pos2, Pos2)> = points
        .windows(3)
        .map(|w| control_points(w[0], w[1], w[2], tension))
        .collect();
    let last = points.len() - 1;

    builder.quad_to(controls[0].0.x, controls[0].0.y, points[1].x, points[1].y);
    for i in 1..last - 1 {
        let (_, out) = controls[i - 1];
        let (incoming, _) = controls[i];
        let end = points[i + 1];
        builder.cubic_to(out.x, out.y, incoming.x, incoming.y, end.x, end.y);
    }
    let (_, out) = controls[controls.len() - 1];
    builder.quad_to(out.x, out.y, points[last].x, points[last].y);

    builder.finish()
}

fn control_points(p0: Pos2, p1: Pos2, p2: Pos2, tension: f32) -> (Pos2, Pos2) {
    let d01 = p0.distance(p1);
    let d12 = p1.distance(p2);
    let total = d01 + d12;
    if total <= f32::EPSILON {
        return (p1, p1);
    }
    let fa = tension * d01 / total;
    let fb = tension * d12 / total;
    let span = p2 - p0;
    (p1 - span * fa, p1 + span * fb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::flood_fill::sample;
    use crate::raster::RasterSnapshot;
    use crate::stroke::{StrokeBuilder, StrokeTool};
    use egui::pos2;
    use std::sync::Arc;

    fn line(tool: StrokeTool, color: Rgba, width: f32, points: &[Pos2]) -> Stroke {
        let mut builder = StrokeBuilder::polyline(tool, color, width, points[0]);
        for p in &points[1..] {
            builder.add_point(*p);
        }
        builder.finish()
    }

    #[test]
    fn test_zero_size_surface_is_an_error() {
        assert!(matches!(
            new_pixmap(0, 10),
            Err(RenderError::InvalidSurface { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_eraser_punches_through_pen_and_raster() {
        let renderer = Renderer::new(CanvasSize::new(40, 40));
        let mut layer = Layer::new("a").with_raster(Some(RasterSnapshot::solid(40, 40, Rgba::WHITE).unwrap()));
        layer.add_stroke(line(StrokeTool::Pen, Rgba::BLACK, 6.0, &[pos2(0.0, 20.0), pos2(40.0, 20.0)]));
        layer.add_stroke(line(StrokeTool::Eraser, Rgba::WHITE, 6.0, &[pos2(20.0, 0.0), pos2(20.0, 40.0)]));

        let buffer = renderer.composite_layer_buffer(&layer).unwrap();
        assert_eq!(sample(&buffer, 5, 20), Some(Rgba::BLACK));
        assert_eq!(sample(&buffer, 20, 20).map(|c| c.a), Some(0));
        assert_eq!(sample(&buffer, 20, 5).map(|c| c.a), Some(0));
        assert_eq!(sample(&buffer, 5, 5), Some(Rgba::WHITE));
    }

    #[test]
    fn test_undecodable_raster_is_blank() {
        let renderer = Renderer::new(CanvasSize::new(8, 8));
        let layer = Layer::new("broken").with_raster(Some(RasterSnapshot::from_png_bytes(vec![0u8; 4])));
        let buffer = renderer.composite_layer_buffer(&layer).unwrap();
        assert!(buffer.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_smaller_raster_is_stretched_to_canvas() {
        let renderer = Renderer::new(CanvasSize::new(10, 10));
        let layer = Layer::new("a").with_raster(Some(RasterSnapshot::solid(2, 2, Rgba::BLACK).unwrap()));
        let buffer = renderer.composite_layer_buffer(&layer).unwrap();
        assert_eq!(sample(&buffer, 5, 5), Some(Rgba::BLACK));
        assert_eq!(sample(&buffer, 9, 9).map(|c| c.a), Some(255));
    }

    #[test]
    fn test_pixel_cells_are_crisp() {
        let renderer = Renderer::new(CanvasSize::new(20, 20));
        let grid = crate::stroke::PixelGrid::new(20, 2);
        let stroke = StrokeBuilder::pixel_cells(StrokeTool::Pen, Rgba::BLACK, grid, pos2(1.0, 1.0)).finish();
        let mut layer = Layer::new("pixels");
        layer.add_stroke(stroke);

        let buffer = renderer.composite_layer_buffer(&layer).unwrap();
        assert_eq!(sample(&buffer, 0, 0), Some(Rgba::BLACK));
        assert_eq!(sample(&buffer, 9, 9), Some(Rgba::BLACK));
        assert_eq!(sample(&buffer, 10, 10).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_click_without_movement_leaves_a_dot() {
        let renderer = Renderer::new(CanvasSize::new(20, 20));
        let mut layer = Layer::new("a");
        layer.add_stroke(StrokeBuilder::polyline(StrokeTool::Pen, Rgba::BLACK, 6.0, pos2(10.0, 10.0)).finish());
        let buffer = renderer.composite_layer_buffer(&layer).unwrap();
        assert_eq!(sample(&buffer, 10, 10).map(|c| c.a), Some(255));
        assert_eq!(sample(&buffer, 0, 0).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_hidden_layers_are_skipped_when_flattening() {
        let renderer = Renderer::new(CanvasSize::new(4, 4));
        let mut hidden = Layer::new("hidden").with_raster(Some(RasterSnapshot::solid(4, 4, Rgba::BLACK).unwrap()));
        hidden.is_visible = false;
        let flat = renderer.flatten(&[Arc::new(hidden)]).unwrap();
        assert!(flat.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_thumbnail_has_white_background() {
        let renderer = Renderer::new(CanvasSize::new(100, 50));
        let thumb = renderer.thumbnail(&Layer::new("empty"), 20, 20).unwrap();
        assert_eq!(thumb.dimensions(), (20, 20));
        assert!(thumb.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_smoothed_path_passes_through_points() {
        let points = [pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(20.0, 0.0), pos2(30.0, 0.0)];
        let path = polyline_path(&points, 0.5).unwrap();
        let bounds = path.bounds();
        assert_eq!(bounds.left(), 0.0);
        assert_eq!(bounds.right(), 30.0);
        assert_eq!(bounds.height(), 0.0);
    }
}
