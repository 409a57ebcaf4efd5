//! Where gif frames come from: network fetch and bitstream decoding.

use crate::error::{CatResult, Error};
use imgref::ImgVec;
use rgb::RGBA8;
use std::io::Read;

/// Input accepted by [`Gif::new`](crate::Gif::new).
///
/// Either a URI to fetch and decode in the background, or frames the caller
/// has already decoded itself.
pub enum Source {
    Uri(String),
    Frames(Vec<ImgVec<RGBA8>>),
}

pub(crate) struct DecodedGif {
    pub frames: Vec<ImgVec<RGBA8>>,
    pub delays_ms: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

/// Download the raw bytes. Non-2xx statuses come back as `Error::Fetch`.
pub(crate) fn fetch(uri: &str) -> CatResult<Vec<u8>> {
    let response = ureq::get(uri).call()?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Decode a whole gif into full-screen RGBA frames plus per-frame delays.
///
/// Frames in the file may be partial updates; `gif_dispose::Screen` handles
/// compositing and disposal, and each pushed frame is a snapshot of the
/// composited screen.
pub(crate) fn decode(bytes: &[u8]) -> CatResult<DecodedGif> {
    let mut gif_opts = gif::DecodeOptions::new();
    // Important:
    gif_opts.set_color_output(gif::ColorOutput::Indexed);

    let mut decoder = gif_opts.read_info(bytes)?;
    let width = u32::from(decoder.width());
    let height = u32::from(decoder.height());
    let mut screen = gif_dispose::Screen::new_decoder(&decoder);

    let mut frames = Vec::new();
    let mut delays_ms = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        screen.blit_frame(frame)?;
        // gif stores delays in centiseconds
        delays_ms.push(u32::from(frame.delay) * 10);
        frames.push(screen.pixels.clone());
    }
    if frames.is_empty() {
        return Err(Error::NoFrames);
    }

    log::info!("decoded gif: {}x{}, {} frames", width, height, frames.len());
    Ok(DecodedGif { frames, delays_ms, width, height })
}
