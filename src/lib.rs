#![warn(clippy::all, rust_2018_idioms)]

pub mod color;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod event;
pub mod flood_fill;
pub mod history;
pub mod id_generator;
pub mod input;
pub mod interaction;
pub mod layer;
pub mod persistence;
pub mod raster;
pub mod renderer;
pub mod stroke;

pub use color::{Rgba, colors_match};
pub use config::EditorConfig;
pub use document::{CanvasSize, CanvasType, Document, DrawingMetadata, LayerList};
pub use editor::{Editor, HistoryMode};
pub use event::{EditorEvent, EventBus, EventHandler, Notice};
pub use flood_fill::{PixelBuffer, flood_fill};
pub use history::{History, MAX_HISTORY_LENGTH};
pub use input::PointerEvent;
pub use interaction::{CanvasInteraction, FillJob, FillOutcome, PointerSource, Tool, ToolSettings};
pub use layer::{Layer, LayerId};
pub use persistence::{DrawingData, DrawingStore, FileStore, MemoryStore, PersistenceError};
pub use raster::RasterSnapshot;
pub use renderer::{RenderError, Renderer};
pub use stroke::{Stroke, StrokeBuilder, StrokeTool};
