//! Blockfall: a falling-block puzzle game in the terminal.

mod app;
mod engine;
mod grid;
mod input;
mod piece;
mod session;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use engine::Engine;
use session::Session;

/// Options derived from CLI that the app loop consumes.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub no_menu: bool,
    pub no_animation: bool,
    pub mute: bool,
    pub frame_rate: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("warning: could not load theme, using defaults: {e}");
            let mut t = theme::Theme::default();
            t.apply_palette(args.palette);
            t
        }
    };
    let engine = match args.seed {
        Some(seed) => Engine::with_seed(seed),
        None => Engine::new(),
    };
    let config = GameConfig {
        no_menu: args.no_menu,
        no_animation: args.no_animation,
        mute: args.mute,
        frame_rate: args.frame_rate,
    };
    let mut app = App::new(config, theme, Session::new(engine));
    app.run()?;
    Ok(())
}

/// Falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Falling-block puzzle in the terminal. Fill rows edge to edge to clear them.",
    long_about = "Blockfall is a classic falling-block puzzle on a 10x20 field.\n\n\
        Steer the falling piece; when it cannot fall further it locks in place. Full rows \
        are cleared for 40/100/300/1200 points (1-4 rows) times level+1. Every 10 lines \
        raises the level and speeds up gravity.\n\n\
        CONTROLS:\n  Left/Right or h/l  Move    Up or k    Rotate   Down or j  Soft drop\n  \
        Enter              Start / pause / resume / restart\n  P  Pause    Q / Esc  Quit"
)]
pub struct Args {
    /// Seed for the piece generator (reproducible piece sequence).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip the start screen and begin playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Path to theme file (btop-style theme[key]="value").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the glow over cleared rows.
    #[arg(long)]
    pub no_animation: bool,

    /// Do not ring the terminal bell on line clears and game over.
    #[arg(long)]
    pub mute: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
