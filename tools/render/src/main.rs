//! Risk map renderer: colours `risk.json` into an RGBA PNG.
//! Undetermined cells are transparent.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inundation_core::export::risk_rgba;
use inundation_core::RiskGrid;

#[derive(Parser, Debug)]
#[command(name = "render", about = "Render a risk grid to PNG")]
struct Args {
    /// risk.json written by `inundation`.
    #[arg(short, long, default_value = "out/risk.json")]
    input: PathBuf,

    /// PNG path.
    #[arg(short, long, default_value = "out/risk.png")]
    output: PathBuf,
}

fn render(grid: &RiskGrid) -> image::RgbaImage {
    let mut img = image::RgbaImage::new(grid.width as u32, grid.height as u32);
    for r in 0..grid.height {
        for c in 0..grid.width {
            img.put_pixel(c as u32, r as u32, image::Rgba(risk_rgba(grid.get(r, c))));
        }
    }
    img
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Reading {}…", args.input.display());
    let text = fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let grid: RiskGrid = serde_json::from_str(&text).with_context(|| format!("parsing {}", args.input.display()))?;

    let img = render(&grid);
    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    img.save(&args.output).with_context(|| format!("saving {}", args.output.display()))?;
    println!("Wrote {} ({}×{})", args.output.display(), grid.width, grid.height);
    Ok(())
}
