//! Plain-text PPM (P3) image output.

use crate::{FrameBuffer, RenderResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Maximum channel value written in the header.
const MAX_VALUE: u8 = 255;

/// Write `image` as a P3 PPM, top row first, one pixel per line.
pub fn write_ppm<W: Write>(image: &FrameBuffer, out: &mut W) -> RenderResult<()> {
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", image.width(), image.height())?;
    writeln!(out, "{MAX_VALUE}")?;

    for pixel in image.pixels() {
        writeln!(out, "{} {} {}", pixel.r, pixel.g, pixel.b)?;
    }
    Ok(())
}

/// Write `image` to a file at `path`, replacing any existing file.
pub fn save_ppm(image: &FrameBuffer, path: impl AsRef<Path>) -> RenderResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_ppm(image, &mut writer)?;
    writer.flush()?;

    log::info!("Wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}
