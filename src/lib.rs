#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, DiceOptions, DominoOptions, load_config};
pub use error::{ErrorKind, PlotError, PlotWarning};
pub use ir::{ColorMap, Table, Value};
pub use layout::{
    DiceLayout, DominoLayout, PlotLayout, PlotRequest, compute_dice_layout, compute_domino_layout,
    compute_layout,
};
pub use render::{Backend, Figure, OutputFormat, Renderer, renderer_for};
