//! Brush reference records
//!
//! A reference persists which brush a tool uses plus the transform applied on
//! top of it:
//!
//! ```xml
//! <Brush type="auto_brush" name="circle" spacing="0.1" angle="0" scale="1"
//!        softness="1" randomness="0" density="1">
//!   <MaskGenerator type="circle" diameter="20" ratio="1" hfade="0.5" vfade="0.5"/>
//! </Brush>
//! ```
//!
//! File-backed kinds store only `filename`; the registry resolves it.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::brush::{Brush, BrushKind, ProceduralBrush, TextBrush};
use crate::core::BrushError;
use crate::generator::MaskGeneratorKind;

const BRUSH_TAG: &str = "Brush";
const GENERATOR_TAG: &str = "MaskGenerator";

/// Shape and texture of a procedural brush
#[derive(Debug, Clone, PartialEq)]
pub struct ProceduralSettings {
    pub generator: MaskGeneratorKind,
    pub softness: f64,
    pub randomness: f64,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSettings {
    pub text: String,
    pub font_path: Option<String>,
    pub font_size: f32,
}

/// Persisted pointer to a brush and its tool transform
#[derive(Debug, Clone, PartialEq)]
pub struct BrushReference {
    pub kind: BrushKind,
    pub name: String,
    pub filename: Option<String>,
    pub spacing: f64,
    pub angle: f64,
    pub scale: f64,
    pub procedural: Option<ProceduralSettings>,
    pub text: Option<TextSettings>,
}

impl BrushReference {
    /// Reference to a file-backed brush with no extra transform
    pub fn for_file(kind: BrushKind, filename: impl Into<String>, spacing: f64) -> Self {
        let filename = filename.into();
        Self {
            kind,
            name: filename.clone(),
            filename: Some(filename),
            spacing,
            angle: 0.0,
            scale: 1.0,
            procedural: None,
            text: None,
        }
    }

    /// Capture a live brush, including its transform
    pub fn from_brush(brush: &Brush) -> Self {
        let base = brush.base();
        let procedural = match brush {
            Brush::Procedural(b) => Some(ProceduralSettings {
                generator: b.generator().clone(),
                softness: b.softness(),
                randomness: b.randomness(),
                density: b.density(),
            }),
            _ => None,
        };
        let text = match brush {
            Brush::Text(b) => Some(TextSettings {
                text: b.text().to_string(),
                font_path: b.font_path().map(str::to_string),
                font_size: b.font_size(),
            }),
            _ => None,
        };

        Self {
            kind: brush.kind(),
            name: base.name().to_string(),
            filename: base.filename().map(str::to_string),
            spacing: base.spacing(),
            angle: base.angle(),
            scale: base.scale(),
            procedural,
            text,
        }
    }

    /// Rebuild a brush that needs no registry lookup (procedural and text)
    pub fn build_standalone(&self) -> Result<Option<Brush>, BrushError> {
        let mut brush: Brush = match (self.kind, &self.procedural, &self.text) {
            (BrushKind::Procedural, Some(settings), _) => {
                let mut brush = ProceduralBrush::new(settings.generator.clone())?;
                brush.set_softness(settings.softness);
                brush.set_randomness(settings.randomness);
                brush.set_density(settings.density);
                brush.into()
            }
            (BrushKind::Procedural, None, _) => {
                return Err(BrushError::Xml(
                    "Procedural brush reference has no MaskGenerator".to_string(),
                ))
            }
            (BrushKind::Text, _, Some(settings)) => {
                let Some(font_path) = settings.font_path.as_deref() else {
                    return Err(BrushError::Xml(
                        "Text brush reference has no font".to_string(),
                    ));
                };
                let font_data = std::fs::read(font_path)?;
                TextBrush::new(&settings.text, font_data, settings.font_size)?
                    .with_font_path(font_path)
                    .into()
            }
            (BrushKind::Text, _, None) => {
                return Err(BrushError::Xml(
                    "Text brush reference has no text".to_string(),
                ))
            }
            _ => return Ok(None),
        };
        self.apply_transform(&mut brush);
        Ok(Some(brush))
    }

    /// Re-apply the persisted spacing, angle and scale
    pub fn apply_transform(&self, brush: &mut Brush) {
        let base = brush.base_mut();
        base.set_spacing(self.spacing);
        base.set_angle(self.angle);
        base.set_scale(self.scale);
    }

    pub fn to_xml(&self) -> Result<String, BrushError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut elem = BytesStart::new(BRUSH_TAG);
        elem.push_attribute(("type", self.kind.as_str()));
        elem.push_attribute(("name", self.name.as_str()));
        if let Some(filename) = &self.filename {
            elem.push_attribute(("filename", filename.as_str()));
        }
        elem.push_attribute(("spacing", self.spacing.to_string().as_str()));
        elem.push_attribute(("angle", self.angle.to_string().as_str()));
        elem.push_attribute(("scale", self.scale.to_string().as_str()));
        if let Some(text) = &self.text {
            elem.push_attribute(("text", text.text.as_str()));
            elem.push_attribute(("fontSize", text.font_size.to_string().as_str()));
            if let Some(font) = &text.font_path {
                elem.push_attribute(("font", font.as_str()));
            }
        }

        match &self.procedural {
            Some(settings) => {
                elem.push_attribute(("softness", settings.softness.to_string().as_str()));
                elem.push_attribute(("randomness", settings.randomness.to_string().as_str()));
                elem.push_attribute(("density", settings.density.to_string().as_str()));
                writer.write_event(Event::Start(elem))?;

                let (diameter, ratio, h_fade, v_fade) = settings.generator.params();
                let mut gen = BytesStart::new(GENERATOR_TAG);
                gen.push_attribute(("type", settings.generator.id()));
                gen.push_attribute(("diameter", diameter.to_string().as_str()));
                gen.push_attribute(("ratio", ratio.to_string().as_str()));
                gen.push_attribute(("hfade", h_fade.to_string().as_str()));
                gen.push_attribute(("vfade", v_fade.to_string().as_str()));
                writer.write_event(Event::Empty(gen))?;

                writer.write_event(Event::End(BytesEnd::new(BRUSH_TAG)))?;
            }
            None => writer.write_event(Event::Empty(elem))?,
        }

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| BrushError::Xml(e.to_string()))
    }

    pub fn from_xml(xml: &str) -> Result<Self, BrushError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut reference: Option<BrushReference> = None;
        let mut generator_attrs: Option<Vec<(String, String)>> = None;
        let mut brush_attrs: Vec<(String, String)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let attrs = collect_attributes(e)?;
                    match e.name().as_ref() {
                        b"Brush" if reference.is_none() => {
                            reference = Some(Self::from_attributes(&attrs)?);
                            brush_attrs = attrs;
                        }
                        b"MaskGenerator" => generator_attrs = Some(attrs),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(BrushError::Xml(format!("XML parse error: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        let mut reference =
            reference.ok_or_else(|| BrushError::Xml("No Brush element".to_string()))?;

        if let Some(attrs) = generator_attrs {
            let id = attr(&attrs, "type").unwrap_or("circle");
            let diameter = attr_f64(&attrs, "diameter", 0.0);
            let ratio = attr_f64(&attrs, "ratio", 1.0);
            let h_fade = attr_f64(&attrs, "hfade", 0.0);
            let v_fade = attr_f64(&attrs, "vfade", 0.0);
            let generator = MaskGeneratorKind::from_id(id, diameter, ratio, h_fade, v_fade)
                .ok_or_else(|| BrushError::Xml(format!("Unknown mask generator '{}'", id)))?;
            reference.procedural = Some(ProceduralSettings {
                generator,
                softness: attr_f64(&brush_attrs, "softness", 1.0),
                randomness: attr_f64(&brush_attrs, "randomness", 0.0),
                density: attr_f64(&brush_attrs, "density", 1.0),
            });
        }

        Ok(reference)
    }

    fn from_attributes(attrs: &[(String, String)]) -> Result<Self, BrushError> {
        let kind_id = attr(attrs, "type").unwrap_or_default();
        let kind = BrushKind::parse(kind_id)
            .ok_or_else(|| BrushError::Xml(format!("Unknown brush type '{}'", kind_id)))?;
        let filename = attr(attrs, "filename").map(str::to_string);
        let name = attr(attrs, "name")
            .map(str::to_string)
            .or_else(|| filename.clone())
            .unwrap_or_default();

        let text = attr(attrs, "text").map(|text| TextSettings {
            text: text.to_string(),
            font_path: attr(attrs, "font").map(str::to_string),
            font_size: attr(attrs, "fontSize")
                .and_then(|v| v.parse().ok())
                .unwrap_or(32.0),
        });

        Ok(Self {
            kind,
            name,
            filename,
            spacing: attr_f64(attrs, "spacing", crate::brush::DEFAULT_SPACING),
            angle: attr_f64(attrs, "angle", 0.0),
            scale: attr_f64(attrs, "scale", 1.0),
            procedural: None,
            text,
        })
    }
}

fn collect_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, BrushError> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn attr_f64(attrs: &[(String, String)], key: &str, default: f64) -> f64 {
    attr(attrs, key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}
