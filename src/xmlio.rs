//! `frames.xml` / `animations.xml` codec (spec §4.F, §6).
//!
//! XML is written with `quick_xml::Writer` and parsed back with its
//! event-based `Reader`, the same streaming-reader idiom the pack uses for
//! XML elsewhere (see `wms_client.rs`'s `GetCapabilities` parser).

use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::chunk::{AnimFrame, Animation, Cel, Frame};
use crate::error::{Result, SpriteError};

pub fn write_frames_xml(path: impl AsRef<Path>, frames: &[Frame]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_elem(&mut writer, "AnimData", |w| {
        write_elem(w, "Frames", |w| {
            for frame in frames {
                write_elem(w, "Frame", |w| {
                    for cel in &frame.cels {
                        let mut start = BytesStart::new("Cel");
                        start.push_attribute(("img", cel.chunk_id.to_string().as_str()));
                        start.push_attribute(("x", cel.x.to_string().as_str()));
                        start.push_attribute(("y", cel.y.to_string().as_str()));
                        start.push_attribute(("pal", cel.palette_group.to_string().as_str()));
                        w.write_event(Event::Empty(start))?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    })
    .map_err(|e| xml_io_error(path, e))?;

    std::fs::write(path, writer.into_inner().into_inner()).map_err(|e| SpriteError::Io {
        path: path.to_path_buf(),
        message: e,
    })
}

pub fn write_animations_xml(path: impl AsRef<Path>, animations: &[Animation]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_elem(&mut writer, "AnimData", |w| {
        write_elem(w, "Anims", |w| {
            for anim in animations {
                write_elem(w, "Anim", |w| {
                    for f in &anim.frames {
                        let mut start = BytesStart::new("Frame");
                        start.push_attribute(("id", f.frame_id.to_string().as_str()));
                        start.push_attribute(("duration", f.duration_ticks.to_string().as_str()));
                        w.write_event(Event::Empty(start))?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    })
    .map_err(|e| xml_io_error(path, e))?;

    std::fs::write(path, writer.into_inner().into_inner()).map_err(|e| SpriteError::Io {
        path: path.to_path_buf(),
        message: e,
    })
}

fn write_elem<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    body: impl FnOnce(&mut Writer<W>) -> quick_xml::Result<()>,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    body(writer)?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn xml_io_error(path: &Path, e: quick_xml::Error) -> SpriteError {
    SpriteError::Io { path: path.to_path_buf(), message: std::io::Error::other(e) }
}

fn read_attr(tag: &BytesStart, key: &str, path: &Path, pos: usize) -> Result<String> {
    for attr in tag.attributes().flatten() {
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(attr.unescape_value().map_err(|e| xml_parse_error(path, pos, e))?.into_owned());
        }
    }
    Err(SpriteError::XmlParseError {
        path: path.to_path_buf(),
        line: 0,
        column: pos,
        message: format!("missing attribute `{key}` on <{}>", String::from_utf8_lossy(tag.name().as_ref())),
    })
}

fn parse_attr<T: std::str::FromStr>(tag: &BytesStart, key: &str, path: &Path, pos: usize) -> Result<T> {
    let raw = read_attr(tag, key, path, pos)?;
    raw.parse().map_err(|_| SpriteError::XmlParseError {
        path: path.to_path_buf(),
        line: 0,
        column: pos,
        message: format!("attribute `{key}` = {raw:?} is not a valid number"),
    })
}

fn xml_parse_error(path: &Path, pos: usize, e: quick_xml::Error) -> SpriteError {
    SpriteError::XmlParseError { path: path.to_path_buf(), line: 0, column: pos, message: e.to_string() }
}

pub fn read_frames_xml(path: impl AsRef<Path>) -> Result<Vec<Frame>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SpriteError::Io {
        path: path.to_path_buf(),
        message: e,
    })?;
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut frames = Vec::new();
    let mut current: Option<Frame> = None;
    let mut buf = Vec::new();
    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf).map_err(|e| xml_parse_error(path, pos, e))? {
            Event::Start(e) if e.name().as_ref() == b"Frame" => current = Some(Frame::default()),
            Event::End(e) if e.name().as_ref() == b"Frame" => {
                frames.push(current.take().unwrap_or_default());
            }
            Event::Empty(e) if e.name().as_ref() == b"Cel" => {
                let cel = Cel {
                    chunk_id: parse_attr(&e, "img", path, pos)?,
                    x: parse_attr(&e, "x", path, pos)?,
                    y: parse_attr(&e, "y", path, pos)?,
                    palette_group: parse_attr(&e, "pal", path, pos)?,
                    layer: 0,
                    z: 0,
                };
                if let Some(frame) = current.as_mut() {
                    cel.clone_into_frame(frame);
                } else {
                    return Err(SpriteError::XmlParseError {
                        path: path.to_path_buf(),
                        line: 0,
                        column: pos,
                        message: "<Cel> outside of <Frame>".to_string(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(frames)
}

impl Cel {
    fn clone_into_frame(self, frame: &mut Frame) {
        let z = frame.cels.iter().filter(|c| c.layer == self.layer).count() as u32;
        let mut cel = self;
        cel.z = z;
        frame.cels.push(cel);
    }
}

pub fn read_animations_xml(path: impl AsRef<Path>) -> Result<Vec<Animation>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SpriteError::Io {
        path: path.to_path_buf(),
        message: e,
    })?;
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut anims = Vec::new();
    let mut current: Option<Animation> = None;
    let mut buf = Vec::new();
    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf).map_err(|e| xml_parse_error(path, pos, e))? {
            Event::Start(e) if e.name().as_ref() == b"Anim" => current = Some(Animation::default()),
            Event::End(e) if e.name().as_ref() == b"Anim" => {
                anims.push(current.take().unwrap_or_default());
            }
            Event::Empty(e) if e.name().as_ref() == b"Frame" => {
                let entry = AnimFrame {
                    frame_id: parse_attr(&e, "id", path, pos)?,
                    duration_ticks: parse_attr(&e, "duration", path, pos)?,
                };
                match current.as_mut() {
                    Some(anim) => anim.frames.push(entry),
                    None => {
                        return Err(SpriteError::XmlParseError {
                            path: path.to_path_buf(),
                            line: 0,
                            column: pos,
                            message: "<Frame> outside of <Anim>".to_string(),
                        })
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if anims.len() > crate::config::MAX_ANIMATIONS {
        return Err(SpriteError::TooManyAnimations { count: anims.len() });
    }
    Ok(anims)
}
