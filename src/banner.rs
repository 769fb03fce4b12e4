use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const NAME: &str = " AC-INFINITY-CARD ";

/// Startup banner, in the colors of the card header.
pub fn print() -> std::io::Result<()> {
    let mut out = StandardStream::stderr(ColorChoice::Auto);

    out.set_color(
        ColorSpec::new()
            .set_fg(Some(Color::White))
            .set_bg(Some(Color::Black))
            .set_bold(true),
    )?;
    write!(out, "{NAME}")?;

    out.set_color(
        ColorSpec::new()
            .set_fg(Some(Color::White))
            .set_bg(Some(Color::Green))
            .set_bold(true),
    )?;
    write!(out, " Version {} ", env!("CARGO_PKG_VERSION"))?;

    out.reset()?;
    writeln!(out)?;
    out.flush()
}
