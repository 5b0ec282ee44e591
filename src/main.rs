//! grainfall: place blocks on a coarse grid, watch them crumble into sand, clear any colour
//! that reaches from wall to wall.

mod app;
mod input;
mod records;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use grainfall::grid::DEFAULT_RATIO;
use grainfall::level::parse_date;
use grainfall::{BoardConfig, Tier};

/// Options derived from CLI that affect how a session is built and driven.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    pub tier: Tier,
    /// Daily challenge date; today (local) when not given.
    pub date: Option<NaiveDate>,
    pub board: BoardConfig,
    pub high_color: bool,
    pub tick_rate: f64,
    pub steps_per_tick: u32,
    pub animation: bool,
}

impl GameConfig {
    fn from_args(args: &Args) -> Result<Self> {
        let date = args
            .date
            .as_deref()
            .map(|s| {
                parse_date(s).with_context(|| format!("invalid --date {s:?}, expected YYYY-MM-DD"))
            })
            .transpose()?;
        Ok(Self {
            mode: args.mode,
            tier: args.difficulty.into(),
            date,
            board: BoardConfig {
                logical_width: usize::from(args.width.max(4)),
                logical_height: usize::from(args.height.max(4)),
                ratio: DEFAULT_RATIO,
            },
            high_color: args.high_color,
            tick_rate: args.tick_rate.clamp(1.0, 240.0),
            steps_per_tick: args.steps_per_tick.max(1),
            animation: !args.no_animation,
        })
    }

    /// Date used for the daily challenge.
    pub fn challenge_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig::from_args(&args)?;
    let mut app = App::new(config, theme, args.no_menu)?;
    app.run()?;
    Ok(())
}

/// Falling-sand block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "grainfall",
    version,
    about = "Falling-sand block puzzle in the terminal. Placed blocks crumble into sand; any colour touching both walls is cleared.",
    long_about = "grainfall is a terminal puzzle game in the spirit of Sandtrix.\n\n\
        Pick one of three preview pieces and drop it anywhere it fits. Every block \
        crumbles into sand that slides down and sideways. A single colour that connects \
        the left wall to the right wall disappears; whatever falls afterwards may chain.\n\n\
        The daily mode gives everyone the same layout and piece sequence for a date: clear \
        every pre-placed grain within the step budget.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor    x / i   Rotate CW    z / u   Rotate CCW\n  1 2 3          Pick slot      Tab     Next slot\n  Enter / Space  Place          P       Pause        Q / Esc Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Game mode: endless (play until nothing fits) or daily (seeded layout and pieces).
    #[arg(short, long, default_value = "endless")]
    pub mode: GameMode,

    /// Daily difficulty: easy (2 colours), normal (3) or hard (4).
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Daily challenge date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Board width in logical cells (endless mode; daily boards use the challenge's size).
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub width: u16,

    /// Board height in logical cells.
    #[arg(long, default_value = "18", value_name = "ROWS")]
    pub height: u16,

    /// Disable the elimination flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Sand simulation ticks per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Physics steps per tick (higher = sand falls faster).
    #[arg(long, default_value = "2", value_name = "N")]
    pub steps_per_tick: u32,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// High color mode: use 6 colors (red, blue, yellow, green, magenta, cyan) instead of 4 (red, blue, yellow, green). Endless mode only.
    #[arg(long)]
    pub high_color: bool,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GameMode {
    #[default]
    Endless,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    #[value(alias = "medium")]
    Normal,
    Hard,
}

impl From<Difficulty> for Tier {
    fn from(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => Self::Easy,
            Difficulty::Normal => Self::Normal,
            Difficulty::Hard => Self::Hard,
        }
    }
}

impl From<Tier> for Difficulty {
    fn from(t: Tier) -> Self {
        match t {
            Tier::Easy => Self::Easy,
            Tier::Normal => Self::Normal,
            Tier::Hard => Self::Hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from([
            "grainfall",
            "--mode",
            "daily",
            "-d",
            "hard",
            "--date",
            "2025-01-04",
            "--no-animation",
        ]);
        let config = GameConfig::from_args(&args).unwrap();
        assert_eq!(config.mode, GameMode::Daily);
        assert_eq!(config.tier, Tier::Hard);
        assert_eq!(config.challenge_date(), NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        assert!(!config.animation);
        assert_eq!(config.board, BoardConfig::default());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let args = Args::parse_from(["grainfall", "--date", "04/01/2025"]);
        assert!(GameConfig::from_args(&args).is_err());
    }

    #[test]
    fn test_medium_alias() {
        let args = Args::parse_from(["grainfall", "-d", "medium"]);
        assert_eq!(args.difficulty, Difficulty::Normal);
    }
}
