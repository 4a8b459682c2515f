use crate::color::Rgba;
use egui::Pos2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Default smoothing applied to free-hand lines.
pub const DEFAULT_TENSION: f32 = 0.1;

/// The tool that produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    Pen,
    Eraser,
}

impl StrokeTool {
    pub fn composite_mode(self) -> CompositeMode {
        match self {
            StrokeTool::Pen => CompositeMode::SourceOver,
            StrokeTool::Eraser => CompositeMode::DestinationOut,
        }
    }
}

/// How a stroke combines with the pixels already on its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeMode {
    /// Paints over existing content.
    SourceOver,
    /// Removes alpha where the stroke covers, whatever its color.
    DestinationOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

/// One grid-aligned filled cell of a pixel-art stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCell {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Geometry of a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrokeShape {
    /// Free-hand smoothed line.
    Polyline {
        points: Vec<Pos2>,
        tension: f32,
        line_cap: LineCap,
        line_join: LineJoin,
    },
    /// Axis-aligned cells, deduplicated by grid position.
    PixelCells { cells: Vec<PixelCell> },
}

/// One committed pen or eraser gesture. Never mutated once committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: Uuid,
    pub tool: StrokeTool,
    pub color: Rgba,
    pub width: f32,
    pub composite: CompositeMode,
    #[serde(flatten)]
    pub shape: StrokeShape,
}

impl Stroke {
    pub fn points(&self) -> &[Pos2] {
        match &self.shape {
            StrokeShape::Polyline { points, .. } => points,
            StrokeShape::PixelCells { .. } => &[],
        }
    }

    pub fn cells(&self) -> &[PixelCell] {
        match &self.shape {
            StrokeShape::PixelCells { cells } => cells,
            StrokeShape::Polyline { .. } => &[],
        }
    }

    pub fn is_eraser(&self) -> bool {
        self.composite == CompositeMode::DestinationOut
    }
}

/// Square grid used to snap pixel-art strokes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    /// Cells per side.
    pub cells: u32,
    /// Side length of one cell in document pixels.
    pub cell_size: f32,
}

impl PixelGrid {
    pub fn new(canvas_width: u32, cells: u32) -> Self {
        let cells = cells.max(1);
        Self {
            cells,
            cell_size: canvas_width as f32 / cells as f32,
        }
    }

    /// Grid coordinate under `pos`, or `None` outside the grid.
    pub fn cell_at(&self, pos: Pos2) -> Option<(u32, u32)> {
        let column = (pos.x / self.cell_size).floor();
        let row = (pos.y / self.cell_size).floor();
        let limit = self.cells as f32;
        if column < 0.0 || row < 0.0 || column >= limit || row >= limit {
            return None;
        }
        Some((column as u32, row as u32))
    }

    pub fn cell_rect(&self, (column, row): (u32, u32)) -> PixelCell {
        PixelCell {
            x: column as f32 * self.cell_size,
            y: row as f32 * self.cell_size,
            width: self.cell_size,
            height: self.cell_size,
        }
    }
}

enum Accumulator {
    Points(Vec<Pos2>),
    Cells {
        grid: PixelGrid,
        seen: HashSet<(u32, u32)>,
        cells: Vec<PixelCell>,
    },
}

/// In-progress stroke owned by the interaction machine.
///
/// Render-only until [`StrokeBuilder::finish`] turns it into a committed [`Stroke`].
pub struct StrokeBuilder {
    id: Uuid,
    tool: StrokeTool,
    color: Rgba,
    width: f32,
    accumulator: Accumulator,
}

impl StrokeBuilder {
    /// Starts a free-hand line seeded with a degenerate segment at `start`,
    /// so a click without movement still leaves a dot.
    pub fn polyline(tool: StrokeTool, color: Rgba, width: f32, start: Pos2) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool,
            color,
            width,
            accumulator: Accumulator::Points(vec![start, start]),
        }
    }

    /// Starts a pixel-art stroke, seeding the cell under `start`.
    pub fn pixel_cells(tool: StrokeTool, color: Rgba, grid: PixelGrid, start: Pos2) -> Self {
        let mut builder = Self {
            id: Uuid::new_v4(),
            tool,
            color,
            width: grid.cell_size,
            accumulator: Accumulator::Cells {
                grid,
                seen: HashSet::new(),
                cells: Vec::new(),
            },
        };
        builder.add_point(start);
        builder
    }

    /// Records one pointer sample.
    pub fn add_point(&mut self, pos: Pos2) {
        match &mut self.accumulator {
            Accumulator::Points(points) => points.push(pos),
            Accumulator::Cells { grid, seen, cells } => {
                if let Some(cell) = grid.cell_at(pos) {
                    if seen.insert(cell) {
                        cells.push(grid.cell_rect(cell));
                    }
                }
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tool(&self) -> StrokeTool {
        self.tool
    }

    pub fn points(&self) -> &[Pos2] {
        match &self.accumulator {
            Accumulator::Points(points) => points,
            Accumulator::Cells { .. } => &[],
        }
    }

    pub fn cells(&self) -> &[PixelCell] {
        match &self.accumulator {
            Accumulator::Cells { cells, .. } => cells,
            Accumulator::Points(_) => &[],
        }
    }

    /// True when there is nothing to commit (a pixel stroke that never hit the grid).
    pub fn is_empty(&self) -> bool {
        match &self.accumulator {
            Accumulator::Points(points) => points.is_empty(),
            Accumulator::Cells { cells, .. } => cells.is_empty(),
        }
    }

    /// Snapshot of the current state for live preview rendering.
    pub fn preview(&self) -> Stroke {
        let shape = match &self.accumulator {
            Accumulator::Points(points) => StrokeShape::Polyline {
                points: points.clone(),
                tension: DEFAULT_TENSION,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
            },
            Accumulator::Cells { cells, .. } => StrokeShape::PixelCells {
                cells: cells.clone(),
            },
        };
        Stroke {
            id: self.id,
            tool: self.tool,
            color: self.color,
            width: self.width,
            composite: self.tool.composite_mode(),
            shape,
        }
    }

    pub fn finish(self) -> Stroke {
        let shape = match self.accumulator {
            Accumulator::Points(points) => StrokeShape::Polyline {
                points,
                tension: DEFAULT_TENSION,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
            },
            Accumulator::Cells { cells, .. } => StrokeShape::PixelCells { cells },
        };
        Stroke {
            id: self.id,
            tool: self.tool,
            color: self.color,
            width: self.width,
            composite: self.tool.composite_mode(),
            shape,
        }
    }
}

impl std::fmt::Debug for StrokeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeBuilder")
            .field("id", &self.id)
            .field("tool", &self.tool)
            .field("points", &self.points().len())
            .field("cells", &self.cells().len())
            .finish()
    }
}
