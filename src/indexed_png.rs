//! Indexed PNG read/write (spec §4.A, §4.F/H), adapted from the teacher's
//! `indexed_png.rs`: the teacher remapped every PNG's *local* palette onto
//! one fixed 64-color global palette via a per-image [`PixelMapper`]. Every
//! PNG this pipeline touches (frame layers on the way in, chunk images and
//! rendered layers on the way out) embeds the *same* global palette
//! already, so no per-image remapping table is needed — we decode raw
//! indices directly and validate the embedded palette bytes match instead.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use png::{BitDepth, ColorType, Info};

use crate::error::{Result, SpriteError};
use crate::tile::IndexedImage;

/// A decoded indexed PNG: its pixel indices plus the raw `PLTE` bytes, so
/// callers can check every input shares one palette (spec §4.A `validate`).
pub struct DecodedPng {
    pub image: IndexedImage,
    pub palette_rgb: Vec<[u8; 3]>,
}

pub fn read_indexed_png(path: impl AsRef<Path>) -> Result<DecodedPng> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SpriteError::Io { path: path.to_path_buf(), message: e })?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder.read_info().map_err(|_| SpriteError::WrongPixelFormat { path: path.to_path_buf() })?;

    let info = reader.info();
    if info.color_type != ColorType::Indexed {
        return Err(SpriteError::WrongPixelFormat { path: path.to_path_buf() });
    }
    let raw_palette = info.palette.as_ref().ok_or(SpriteError::WrongPixelFormat { path: path.to_path_buf() })?;
    if raw_palette.len() % 3 != 0 || raw_palette.len() / 3 > 256 {
        return Err(SpriteError::WrongPixelFormat { path: path.to_path_buf() });
    }
    let palette_rgb: Vec<[u8; 3]> = raw_palette.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    let width = info.width;
    let height = info.height;
    let bit_depth = info.bit_depth;

    let mut buf = vec![0u8; reader.output_buffer_size().unwrap_or(0)];
    let out_info = reader.next_frame(&mut buf).map_err(|_| SpriteError::WrongPixelFormat { path: path.to_path_buf() })?;
    buf.truncate(out_info.buffer_size());

    let indices = expand_bit_depth(&buf, bit_depth, width, height);

    Ok(DecodedPng { image: IndexedImage { width, height, indices }, palette_rgb })
}

fn expand_bit_depth(buf: &[u8], bit_depth: BitDepth, width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    match bit_depth {
        BitDepth::Eight => buf[..pixel_count].to_vec(),
        BitDepth::Four => expand_packed(buf, pixel_count, 2, 0b1111),
        BitDepth::Two => expand_packed(buf, pixel_count, 4, 0b11),
        BitDepth::One => expand_packed(buf, pixel_count, 8, 0b1),
        BitDepth::Sixteen => unreachable!("indexed PNGs are never 16-bit"),
    }
}

fn expand_packed(buf: &[u8], pixel_count: usize, per_byte: usize, mask: u8) -> Vec<u8> {
    let bits = 8 / per_byte;
    let mut out = Vec::with_capacity(pixel_count);
    'outer: for &byte in buf {
        for i in 0..per_byte {
            let shift = 8 - bits * (i + 1);
            out.push((byte >> shift) & mask);
            if out.len() == pixel_count {
                break 'outer;
            }
        }
    }
    out
}

/// Writes `indices` as an indexed PNG, embedding `palette_rgb` verbatim
/// (spec §4.A: "the serializer never reorders colors") with index 0 of
/// every 16-entry group marked transparent via `tRNS`.
pub fn write_indexed_png(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    indices: &[u8],
    palette_rgb: &[[u8; 3]],
) -> Result<()> {
    let path = path.as_ref();
    let mut info = Info::with_size(width, height);
    info.bit_depth = BitDepth::Eight;
    info.color_type = ColorType::Indexed;

    let mut flat = Vec::with_capacity(palette_rgb.len() * 3);
    for c in palette_rgb {
        flat.extend_from_slice(c);
    }
    info.palette = Some(Cow::Owned(flat));

    let trns: Vec<u8> = (0..palette_rgb.len())
        .map(|i| if i % crate::palette::GROUP_SIZE == 0 { 0 } else { 255 })
        .collect();
    info.trns = Some(Cow::Owned(trns));

    let writer = BufWriter::new(File::create(path).map_err(|e| SpriteError::Io { path: path.to_path_buf(), message: e })?);
    let encoder = png::Encoder::with_info(writer, info).map_err(|_| SpriteError::WrongPixelFormat { path: path.to_path_buf() })?;
    let mut writer = encoder.write_header().map_err(|_| SpriteError::WrongPixelFormat { path: path.to_path_buf() })?;
    writer
        .write_image_data(indices)
        .map_err(|e| SpriteError::Io { path: path.to_path_buf(), message: std::io::Error::other(e) })
}
