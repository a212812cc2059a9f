//! ASCII map renderer for terminal review.
//!
//! One character per tile. Terrain uses the glyphs of
//! [`TerrainKind::glyph`]; civilization `n` draws its cities as the `n`th
//! upper-case letter and its units as the lower-case one.

use std::fmt::Write as _;

use civ_core::calendar::format_year;
use civ_core::civilization::CivId;
use civ_core::context::SimulationContext;
use civ_core::game::Game;
use civ_core::grid::Coord;
use civ_core::map::TerrainKind;

/// ASCII rendering options.
#[derive(Debug, Clone, Default)]
pub struct AsciiConfig {
    /// Draw only what this civilization has seen.
    pub viewer: Option<CivId>,
    /// Show the per-civilization legend.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl AsciiConfig {
    /// Legend on, no color, no fog.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            viewer: None,
            show_legend: true,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const BLUE: &str = "\x1b[34m";

    pub const CIVS: [&str; 6] = [
        "\x1b[31m", // red
        "\x1b[33m", // yellow
        "\x1b[32m", // green
        "\x1b[35m", // magenta
        "\x1b[36m", // cyan
        "\x1b[37m", // white
    ];
}

fn civ_color(civ: CivId) -> &'static str {
    colors::CIVS[usize::from(civ.0) % colors::CIVS.len()]
}

/// Symbol for a civilization's cities (`true`) or units.
#[must_use]
pub fn civ_char(civ: CivId, city: bool) -> char {
    let letter = char::from(b'a' + civ.0 % 26);
    if city {
        letter.to_ascii_uppercase()
    } else {
        letter
    }
}

/// What occupies a tile, from the viewer's point of view.
fn tile_char(ctx: &SimulationContext, config: &AsciiConfig, c: Coord) -> (char, &'static str) {
    let explored = config.viewer.map_or(true, |v| ctx.is_explored(v, c));
    if !explored {
        return (' ', "");
    }
    let visible = config.viewer.map_or(true, |v| ctx.is_visible(v, c));

    if let Some(city) = ctx.world.city_on(c) {
        if visible || config.viewer == Some(city.owner) {
            return (civ_char(city.owner, true), civ_color(city.owner));
        }
    }
    if visible {
        if let Some(unit) = ctx.world.units_at(c).first() {
            return (civ_char(unit.owner, false), civ_color(unit.owner));
        }
    }

    let terrain = ctx.map.terrain(c).unwrap_or(TerrainKind::Ocean);
    let color = if terrain.is_water() {
        colors::BLUE
    } else if visible {
        ""
    } else {
        colors::DIM
    };
    (terrain.glyph(), color)
}

/// Render the map of `ctx`.
#[must_use]
pub fn render_context(ctx: &SimulationContext, config: &AsciiConfig) -> String {
    let mut output = String::new();
    let width = ctx.map.width() as usize;

    let _ = writeln!(
        output,
        "{}Round {} | {} | {} to move{}",
        if config.use_color { colors::BOLD } else { "" },
        ctx.turn.round,
        format_year(ctx.turn.year),
        ctx.civ(ctx.turn.active_civ).map_or("nobody", |c| c.name.as_str()),
        if config.use_color { colors::RESET } else { "" },
    );

    let _ = writeln!(output, "+{}+", "-".repeat(width));
    for row in 0..ctx.map.height() as i32 {
        output.push('|');
        for col in 0..width as i32 {
            let (ch, color) = tile_char(ctx, config, Coord::new(col, row));
            if config.use_color && !color.is_empty() {
                output.push_str(color);
                output.push(ch);
                output.push_str(colors::RESET);
            } else {
                output.push(ch);
            }
        }
        output.push_str("|\n");
    }
    let _ = writeln!(output, "+{}+", "-".repeat(width));

    if config.show_legend {
        for civ in &ctx.civs {
            let (color, reset) = if config.use_color {
                (civ_color(civ.id), colors::RESET)
            } else {
                ("", "")
            };
            let _ = writeln!(
                output,
                "{color}{}/{}{reset} {}: {} cities, {} units, {} gold, {} techs{}",
                civ_char(civ.id, true),
                civ_char(civ.id, false),
                civ.name,
                ctx.world.cities_of(civ.id).len(),
                ctx.world.units_of(civ.id).len(),
                civ.resources.gold,
                civ.technologies.len(),
                if civ.is_alive { "" } else { " (eliminated)" },
            );
        }
    }

    output
}

/// Render the map of a running game.
#[must_use]
pub fn render_ascii(game: &Game, config: &AsciiConfig) -> String {
    render_context(game.context(), config)
}
