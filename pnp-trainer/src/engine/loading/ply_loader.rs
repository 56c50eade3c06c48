use std::io::{self, BufRead};

use bevy::prelude::*;
use ply_rs::parser::Parser;
use ply_rs::ply::{
    DefaultElement, ElementDef, Encoding, Header, Property, PropertyAccess, PropertyType, ScalarType,
};

use super::error::{ColourWarning, LoadError};

const COLOUR_CHANNELS: [&str; 3] = ["red", "green", "blue"];

/// One PLY vertex as read from the payload. Unknown properties are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PlyVertex {
    pub position: [Option<f32>; 3],
    pub rgba: [Option<u8>; 4],
}

impl PlyVertex {
    pub fn point(&self) -> Option<Vec3> {
        match self.position {
            [Some(x), Some(y), Some(z)] => Some(Vec3::new(x, y, z)),
            _ => None,
        }
    }

    /// Normalised colour, or `None` when a requested channel is absent.
    pub fn colour(&self, layout: ColourLayout) -> Option<[f32; 4]> {
        let channel = |v: Option<u8>| v.map(|c| c as f32 / 255.0);
        match layout {
            ColourLayout::None => None,
            ColourLayout::Rgb => Some([
                channel(self.rgba[0])?,
                channel(self.rgba[1])?,
                channel(self.rgba[2])?,
                1.0,
            ]),
            ColourLayout::Rgba => Some([
                channel(self.rgba[0])?,
                channel(self.rgba[1])?,
                channel(self.rgba[2])?,
                channel(self.rgba[3])?,
            ]),
        }
    }
}

fn scalar_as_f32(property: Property) -> Option<f32> {
    match property {
        Property::Float(v) => Some(v),
        Property::Double(v) => Some(v as f32),
        Property::Char(v) => Some(v as f32),
        Property::UChar(v) => Some(v as f32),
        Property::Short(v) => Some(v as f32),
        Property::UShort(v) => Some(v as f32),
        Property::Int(v) => Some(v as f32),
        Property::UInt(v) => Some(v as f32),
        _ => None,
    }
}

impl PropertyAccess for PlyVertex {
    fn new() -> Self {
        Self::default()
    }

    fn set_property(&mut self, key: String, property: Property) {
        match key.as_str() {
            "x" => self.position[0] = scalar_as_f32(property),
            "y" => self.position[1] = scalar_as_f32(property),
            "z" => self.position[2] = scalar_as_f32(property),
            "red" | "green" | "blue" | "alpha" => {
                let slot = match key.as_str() {
                    "red" => 0,
                    "green" => 1,
                    "blue" => 2,
                    _ => 3,
                };
                if let Property::UChar(v) = property {
                    self.rgba[slot] = Some(v);
                }
            }
            _ => {}
        }
    }
}

/// Which colour channels the vertex element carries in a readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColourLayout {
    None,
    Rgb,
    Rgba,
}

fn is_uchar(def: &ElementDef, name: &str) -> Option<bool> {
    def.properties
        .get(name)
        .map(|p| matches!(p.data_type, PropertyType::Scalar(ScalarType::UChar)))
}

/// Inspect the vertex header and decide how colours will be read.
/// Anything short of readable red, green and blue degrades to uncoloured.
pub(crate) fn colour_layout(def: &ElementDef) -> (ColourLayout, Option<ColourWarning>) {
    let present: Vec<String> = COLOUR_CHANNELS
        .iter()
        .filter(|c| def.properties.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if present.is_empty() {
        return (ColourLayout::None, None);
    }
    if present.len() < COLOUR_CHANNELS.len() {
        return (ColourLayout::None, Some(ColourWarning::Incomplete { present }));
    }
    for channel in COLOUR_CHANNELS {
        if is_uchar(def, channel) == Some(false) {
            return (
                ColourLayout::None,
                Some(ColourWarning::Unreadable {
                    property: channel.to_string(),
                }),
            );
        }
    }
    match is_uchar(def, "alpha") {
        Some(true) => (ColourLayout::Rgba, None),
        Some(false) => (
            ColourLayout::Rgb,
            Some(ColourWarning::Unreadable {
                property: "alpha".to_string(),
            }),
        ),
        None => (ColourLayout::Rgb, None),
    }
}

/// Header of a PLY stream positioned at the start of its payload. Vertices
/// are decoded one record at a time by [`PlyVertexReader::for_each_vertex`].
pub(crate) struct PlyVertexReader<'r, R> {
    reader: &'r mut R,
    parser: Parser<PlyVertex>,
    header: Header,
    pub count: usize,
    pub layout: ColourLayout,
    pub warning: Option<ColourWarning>,
}

impl<'r, R: BufRead> PlyVertexReader<'r, R> {
    /// Read and check the header (ASCII or binary).
    pub fn new(reader: &'r mut R) -> Result<Self, LoadError> {
        let parser = Parser::<PlyVertex>::new();
        let header = parser
            .read_header(reader)
            .map_err(|e| LoadError::Parse(format!("invalid PLY header: {e}")))?;

        let Some(vertex_def) = header.elements.get("vertex") else {
            return Err(LoadError::Parse("PLY file has no vertex element".to_string()));
        };
        for axis in ["x", "y", "z"] {
            if !vertex_def.properties.contains_key(axis) {
                return Err(LoadError::Parse(format!(
                    "vertex element lacks property '{axis}'"
                )));
            }
        }
        let (layout, warning) = colour_layout(vertex_def);
        let count = vertex_def.count;

        Ok(Self {
            reader,
            parser,
            header,
            count,
            layout,
            warning,
        })
    }

    /// Decode every vertex in file order and hand it to `visit` before the
    /// next record is read. Elements stored ahead of the vertices are read
    /// and discarded record by record. The first error from `visit` stops
    /// the read.
    pub fn for_each_vertex<F>(self, mut visit: F) -> Result<(), LoadError>
    where
        F: FnMut(usize, PlyVertex) -> Result<(), LoadError>,
    {
        let Self {
            reader,
            parser,
            header,
            ..
        } = self;
        let skip_parser = Parser::<DefaultElement>::new();
        let mut line = String::new();

        for (name, element) in &header.elements {
            if name == "vertex" {
                for i in 0..element.count {
                    let vertex = read_record(&parser, reader, element, &header.encoding, &mut line)
                        .map_err(|e| LoadError::Parse(format!("invalid vertex {i}: {e}")))?;
                    visit(i, vertex)?;
                }
                return Ok(());
            }
            for _ in 0..element.count {
                read_record(&skip_parser, reader, element, &header.encoding, &mut line)
                    .map_err(|e| LoadError::Parse(format!("invalid '{name}' data: {e}")))?;
            }
        }
        Err(LoadError::Parse("PLY file has no vertex element".to_string()))
    }
}

/// Decode a single record of `element`. ASCII records are one line each.
fn read_record<E, R>(
    parser: &Parser<E>,
    reader: &mut R,
    element: &ElementDef,
    encoding: &Encoding,
    line: &mut String,
) -> io::Result<E>
where
    E: PropertyAccess,
    R: BufRead,
{
    match encoding {
        Encoding::Ascii => {
            line.clear();
            if reader.read_line(line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "payload ended before the declared element count",
                ));
            }
            parser.read_ascii_element(line.trim(), element)
        }
        Encoding::BinaryBigEndian => parser.read_big_endian_element(reader, element),
        Encoding::BinaryLittleEndian => parser.read_little_endian_element(reader, element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ascii_ply(properties: &str, rows: &[&str]) -> Vec<u8> {
        let mut text = format!(
            "ply\nformat ascii 1.0\nelement vertex {}\n{}end_header\n",
            rows.len(),
            properties
        );
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text.into_bytes()
    }

    const XYZ: &str = "property float x\nproperty float y\nproperty float z\n";

    fn collect(bytes: Vec<u8>) -> (ColourLayout, Option<ColourWarning>, Vec<PlyVertex>) {
        let mut cursor = Cursor::new(bytes);
        let reader = PlyVertexReader::new(&mut cursor).expect("header");
        let (layout, warning) = (reader.layout, reader.warning.clone());
        let mut vertices = Vec::new();
        reader
            .for_each_vertex(|_, v| {
                vertices.push(v);
                Ok(())
            })
            .expect("payload");
        (layout, warning, vertices)
    }

    #[test]
    fn reads_rgb_vertices() {
        let bytes = ascii_ply(
            "property float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\n",
            &["1 2 3 255 0 51"],
        );
        let (layout, warning, vertices) = collect(bytes);
        assert_eq!(layout, ColourLayout::Rgb);
        assert!(warning.is_none());
        assert_eq!(vertices[0].point(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(vertices[0].colour(layout), Some([1.0, 0.0, 0.2, 1.0]));
    }

    #[test]
    fn vertices_are_visited_before_later_records_are_read() {
        // The third record is not a number; stopping at the second vertex
        // means it is never decoded.
        let bytes = ascii_ply(XYZ, &["0 0 0", "1 1 1", "not a vertex"]);
        let mut cursor = Cursor::new(bytes);
        let reader = PlyVertexReader::new(&mut cursor).expect("header");
        assert_eq!(reader.count, 3);

        let mut seen = Vec::new();
        let result = reader.for_each_vertex(|i, v| {
            seen.push((i, v.point()));
            if i == 1 {
                return Err(LoadError::Parse("stop".to_string()));
            }
            Ok(())
        });

        assert!(matches!(result, Err(LoadError::Parse(msg)) if msg == "stop"));
        assert_eq!(
            seen,
            vec![(0, Some(Vec3::ZERO)), (1, Some(Vec3::ONE))]
        );
    }

    #[test]
    fn reads_binary_little_endian_after_leading_element() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement camera 1\nproperty uchar id\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n".to_vec();
        bytes.push(7);
        for v in [1.0f32, 2.0, 3.0, -4.0, 5.5, 6.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let (layout, _, vertices) = collect(bytes);
        assert_eq!(layout, ColourLayout::None);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].point(), Some(Vec3::new(-4.0, 5.5, 6.0)));
    }

    #[test]
    fn truncated_payload_is_a_parse_error() {
        let text = format!("ply\nformat ascii 1.0\nelement vertex 2\n{XYZ}end_header\n0 0 0\n");
        let mut cursor = Cursor::new(text.into_bytes());
        let reader = PlyVertexReader::new(&mut cursor).expect("header");
        assert!(matches!(
            reader.for_each_vertex(|_, _| Ok(())),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn float_colour_channels_degrade_to_uncoloured() {
        let bytes = ascii_ply(
            "property float x\nproperty float y\nproperty float z\nproperty float red\nproperty float green\nproperty float blue\n",
            &["0 0 0 0.5 0.5 0.5"],
        );
        let (layout, warning, _) = collect(bytes);
        assert_eq!(layout, ColourLayout::None);
        assert!(matches!(warning, Some(ColourWarning::Unreadable { .. })));
    }

    #[test]
    fn missing_axis_is_a_parse_error() {
        let bytes = ascii_ply("property float x\nproperty float y\n", &["0 0"]);
        assert!(matches!(
            PlyVertexReader::new(&mut Cursor::new(bytes)),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn incomplete_colour_is_reported() {
        let bytes = ascii_ply(
            "property float x\nproperty float y\nproperty float z\nproperty uchar red\n",
            &["0 0 0 9"],
        );
        let (layout, warning, _) = collect(bytes);
        assert_eq!(layout, ColourLayout::None);
        assert_eq!(
            warning,
            Some(ColourWarning::Incomplete {
                present: vec!["red".to_string()]
            })
        );
    }
}
