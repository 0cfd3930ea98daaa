use crate::config::{DiceOptions, DominoOptions, load_config, load_options};
use crate::layout::{PlotRequest, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::parser::load_table;
use crate::render::{Backend, OutputFormat, default_backend, renderer_for};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "diceplot", version, about = "Dice and domino plots for categorical data")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Category x category grid with up to six colored pips per cell
    Dice(PlotArgs),
    /// Feature x cell type grid with two contrast marks per cell
    Domino(PlotArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlotArgs {
    /// Observation table (.csv, .tsv or .json records)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Config JSON file (theme, layout constants, render defaults)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Plot options JSON file (field names, color maps, ...)
    #[arg(short = 'p', long = "options")]
    pub options: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "outputDir")]
    pub output_dir: Option<PathBuf>,

    /// Base file name for saved outputs
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Output formats
    #[arg(short = 'f', long = "formats", value_enum, value_delimiter = ',')]
    pub formats: Vec<OutputFormat>,

    /// Rendering backend (svg/static/matplotlib, html/interactive/plotly)
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    #[arg(long = "switch-axis")]
    pub switch_axis: bool,

    #[arg(long = "title")]
    pub title: Option<String>,

    /// Write the computed layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Print the figure to stdout instead of saving (unless formats are given)
    #[arg(long = "show")]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run_with(args)?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_with(args: Args) -> Result<Vec<PathBuf>> {
    let (plot, request) = match args.command {
        Command::Dice(plot) => {
            let mut options: DiceOptions = load_options(plot.options.as_deref())?;
            options.switch_axis |= plot.switch_axis;
            if plot.title.is_some() {
                options.title = plot.title.clone();
            }
            (plot, PlotRequest::Dice(options))
        }
        Command::Domino(plot) => {
            let mut options: DominoOptions = load_options(plot.options.as_deref())?;
            options.switch_axis |= plot.switch_axis;
            if plot.title.is_some() {
                options.title = plot.title.clone();
            }
            (plot, PlotRequest::Domino(options))
        }
    };

    let config = load_config(plot.config.as_deref())?;
    let backend = match plot.backend.as_deref() {
        Some(name) => Backend::from_name(name)?,
        None => config.render.backend.unwrap_or_else(default_backend),
    };

    let table = load_table(&plot.input)?;
    let layout = compute_layout(&table, &request, &config)?;
    if let Some(path) = plot.dump_layout.as_deref() {
        write_layout_dump(path, &layout)?;
    }

    let renderer = renderer_for(backend);
    let figure = renderer.render(&layout, &config.theme);
    if plot.show {
        renderer.show(&figure)?;
        if plot.formats.is_empty() {
            return Ok(Vec::new());
        }
    }

    let formats = if plot.formats.is_empty() {
        config.render.formats.clone()
    } else {
        plot.formats.clone()
    };
    let dir = plot
        .output_dir
        .clone()
        .unwrap_or_else(|| config.render.output_dir.clone());
    let base_name = plot
        .name
        .clone()
        .unwrap_or_else(|| config.render.base_name.clone());
    let written = renderer.save(&figure, &dir, &base_name, &formats)?;
    for path in &written {
        tracing::info!(path = %path.display(), backend = %backend, "saved plot");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommand_flags() {
        let args = Args::try_parse_from([
            "diceplot",
            "domino",
            "-i",
            "de.csv",
            "-f",
            "svg,html",
            "-b",
            "plotly",
            "--switch-axis",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        let Command::Domino(plot) = args.command else {
            panic!("expected domino subcommand");
        };
        assert_eq!(plot.formats, vec![OutputFormat::Svg, OutputFormat::Html]);
        assert_eq!(plot.backend.as_deref(), Some("plotly"));
        assert!(plot.switch_axis);
    }

    #[test]
    fn rejects_pdf_format() {
        assert!(Args::try_parse_from(["diceplot", "dice", "-i", "x.csv", "-f", "pdf"]).is_err());
    }

    #[test]
    fn dice_command_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("obs.csv");
        std::fs::write(
            &input,
            "CellType,Pathway,Var\nNeuron,Apoptosis,Amyloid\nAstro,Apoptosis,NFT\nNeuron,Metabolism,NFT\n",
        )
        .unwrap();
        let options = dir.path().join("options.json");
        std::fs::write(
            &options,
            r##"{"cat_a": "CellType", "cat_b": "Pathway", "cat_c": "Var",
                "cat_c_colors": {"Amyloid": "#d5cccd", "NFT": "#cb9992"}}"##,
        )
        .unwrap();
        let out = dir.path().join("out");
        let dump = dir.path().join("layout.json");
        let args = Args::try_parse_from([
            "diceplot",
            "dice",
            "-i",
            input.to_str().unwrap(),
            "-p",
            options.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-n",
            "cells",
            "-f",
            "svg,html",
            "--dump-layout",
            dump.to_str().unwrap(),
        ])
        .unwrap();
        let written = run_with(args).unwrap();
        assert_eq!(written, vec![out.join("cells.svg"), out.join("cells.html")]);
        assert!(dump.exists());
        let svg = std::fs::read_to_string(out.join("cells.svg")).unwrap();
        assert!(svg.contains("Metabolism"));
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let args =
            Args::try_parse_from(["diceplot", "dice", "-i", "missing.csv", "-b", "gnuplot"]).unwrap();
        let err = run_with(args).unwrap_err();
        assert!(err.to_string().contains("gnuplot"));
    }
}
