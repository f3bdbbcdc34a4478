//! Brush registry
//!
//! Owns the loaded brushes and hands them out as `Arc<Brush>`. The registry is
//! an ordinary value: callers construct it and pass it to whoever needs it.

mod xml;

pub use xml::{BrushReference, ProceduralSettings, TextSettings};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::brush::Brush;
use crate::core::{BrushError, EngineConfig};
use crate::format::{BrushFileType, GbrParser, GihParser, SvgParser};

const RESOURCE_DIR_NAME: &str = "brush-dab";

/// Default on-disk location for brush files
pub fn default_resource_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RESOURCE_DIR_NAME)
        .join("brushes")
}

#[derive(Debug, Default)]
struct RegistryIndex {
    brushes: HashMap<String, Arc<Brush>>,
    /// content hash -> key of the brush loaded from those bytes
    hashes: HashMap<String, String>,
}

#[derive(Debug)]
pub struct BrushRegistry {
    config: EngineConfig,
    resource_dir: PathBuf,
    index: RwLock<RegistryIndex>,
}

impl BrushRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_resource_dir(config, default_resource_dir())
    }

    pub fn with_resource_dir(config: EngineConfig, resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            resource_dir: resource_dir.into(),
            index: RwLock::new(RegistryIndex::default()),
        }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Register a brush under its name, replacing any previous entry
    pub fn insert(&self, brush: Brush) -> Arc<Brush> {
        let key = brush.name().to_string();
        let brush = Arc::new(brush);
        self.index.write().brushes.insert(key, Arc::clone(&brush));
        brush
    }

    pub fn get(&self, key: &str) -> Option<Arc<Brush>> {
        self.index.read().brushes.get(key).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.read().brushes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.index.read().brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().brushes.is_empty()
    }

    /// Decode brush bytes, dispatching on the extension of `filename`.
    ///
    /// Bytes identical to an already loaded file return that brush.
    pub fn load_bytes(&self, filename: &str, data: &[u8]) -> Result<Arc<Brush>, BrushError> {
        let content_hash = hex::encode(Sha256::digest(data));

        {
            let index = self.index.read();
            if let Some(existing) = index
                .hashes
                .get(&content_hash)
                .and_then(|key| index.brushes.get(key))
            {
                debug!(
                    "[BrushRegistry] '{}' duplicates '{}', reusing it",
                    filename,
                    existing.name()
                );
                return Ok(Arc::clone(existing));
            }
        }

        let file_type = BrushFileType::from_path(Path::new(filename))
            .ok_or_else(|| BrushError::UnknownBrush(filename.to_string()))?;
        let maximum_scale = self.config.maximum_scale;
        let mut brush: Brush = match file_type {
            BrushFileType::Gbr => GbrParser::parse(data)?
                .with_maximum_scale(maximum_scale)
                .into(),
            BrushFileType::Gih => GihParser::parse(data)?
                .with_maximum_scale(maximum_scale)
                .into(),
            BrushFileType::Svg => {
                let stem = Path::new(filename)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(filename);
                SvgParser::parse(stem, data)?
                    .with_maximum_scale(maximum_scale)
                    .into()
            }
        };
        brush.base_mut().set_filename(filename);

        info!(
            "[BrushRegistry] Loaded '{}' from {} ({}x{})",
            brush.name(),
            filename,
            brush.width(),
            brush.height()
        );

        let brush = Arc::new(brush);
        let mut index = self.index.write();
        index
            .brushes
            .insert(filename.to_string(), Arc::clone(&brush));
        index.hashes.insert(content_hash, filename.to_string());
        Ok(brush)
    }

    /// Load a brush file; relative paths are resolved against the resource directory
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<Brush>, BrushError> {
        let path = path.as_ref();
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resource_dir.join(path)
        };
        let key = path.to_string_lossy().to_string();
        if let Some(brush) = self.get(&key) {
            return Ok(brush);
        }
        let data = std::fs::read(&full_path)?;
        self.load_bytes(&key, &data)
    }

    /// The shared brush a filename refers to, loading it on first use
    pub fn resolve(&self, filename: &str) -> Result<Arc<Brush>, BrushError> {
        match self.get(filename) {
            Some(brush) => Ok(brush),
            None => self.load_file(filename),
        }
    }

    /// Build the brush a reference describes, with its transform applied.
    ///
    /// The registry copy stays untouched; the result is a private instance.
    pub fn instantiate(&self, reference: &BrushReference) -> Result<Arc<Brush>, BrushError> {
        if let Some(brush) = reference.build_standalone()? {
            return Ok(Arc::new(brush));
        }

        let key = reference
            .filename
            .as_deref()
            .unwrap_or(reference.name.as_str());
        if key.is_empty() {
            return Err(BrushError::UnknownBrush(format!(
                "{} reference without a filename",
                reference.kind.as_str()
            )));
        }

        let mut brush = self.resolve(key)?;
        if brush.kind() != reference.kind {
            return Err(BrushError::UnknownBrush(format!(
                "'{}' is a {}, reference expects {}",
                key,
                brush.kind().as_str(),
                reference.kind.as_str()
            )));
        }
        reference.apply_transform(Arc::make_mut(&mut brush));
        Ok(brush)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::{BrushKind, RasterBrush};
    use crate::format::GbrWriter;
    use crate::mask::PixelMask;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "brush-dab-registry-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn gbr_bytes(name: &str, size: usize) -> Vec<u8> {
        let brush = RasterBrush::from_mask(name, PixelMask::filled(size, size, 200), 0.2).unwrap();
        GbrWriter::to_bytes(&brush).unwrap()
    }

    #[test]
    fn loads_by_extension_and_deduplicates() {
        let registry = BrushRegistry::with_resource_dir(EngineConfig::default(), temp_dir("dedup"));
        let data = gbr_bytes("dot", 4);

        let first = registry.load_bytes("dot.gbr", &data).unwrap();
        assert_eq!(first.kind(), BrushKind::Raster);
        assert_eq!(first.base().filename(), Some("dot.gbr"));

        let second = registry.load_bytes("copy.gbr", &data).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        assert!(matches!(
            registry.load_bytes("dot.png", &data),
            Err(BrushError::UnknownBrush(_))
        ));
    }

    #[test]
    fn svg_files_load_as_colour_brushes() {
        let registry = BrushRegistry::with_resource_dir(EngineConfig::default(), temp_dir("svg"));
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="6"><rect width="10" height="6" fill="blue"/></svg>"#;

        let brush = registry.load_bytes("shapes/bar.svg", svg).unwrap();
        assert_eq!(brush.kind(), BrushKind::Raster);
        assert_eq!(brush.name(), "bar");
        assert_eq!((brush.width(), brush.height()), (10, 6));
        assert!(brush.has_color());
        assert!(registry.get("shapes/bar.svg").is_some());

        assert!(matches!(
            registry.load_bytes("broken.svg", b"<svg"),
            Err(BrushError::Format(_))
        ));
    }

    #[test]
    fn load_file_resolves_relative_to_resource_dir() {
        let dir = temp_dir("files");
        std::fs::write(dir.join("big.gbr"), gbr_bytes("big", 9)).unwrap();
        let registry = BrushRegistry::with_resource_dir(EngineConfig::default(), &dir);

        let brush = registry.resolve("big.gbr").unwrap();
        assert_eq!(brush.width(), 9);
        assert_eq!(registry.names(), vec!["big.gbr".to_string()]);
        assert!(registry.resolve("missing.gbr").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn instantiate_applies_transform_without_touching_shared_copy() {
        let registry = BrushRegistry::with_resource_dir(EngineConfig::default(), temp_dir("inst"));
        let shared = registry.load_bytes("dot.gbr", &gbr_bytes("dot", 6)).unwrap();

        let mut reference = BrushReference::for_file(BrushKind::Raster, "dot.gbr", 0.7);
        reference.angle = 0.5;
        let xml = reference.to_xml().unwrap();
        let brush = registry
            .instantiate(&BrushReference::from_xml(&xml).unwrap())
            .unwrap();

        assert!((brush.spacing() - 0.7).abs() < 1e-12);
        assert!((brush.base().angle() - 0.5).abs() < 1e-12);
        assert!((shared.spacing() - 0.2).abs() < 1e-12);
        assert!(!Arc::ptr_eq(&brush, &shared));

        let wrong_kind = BrushReference::for_file(BrushKind::Pipe, "dot.gbr", 0.7);
        assert!(registry.instantiate(&wrong_kind).is_err());
    }

    #[test]
    fn inserted_brushes_are_shared_across_threads() {
        let registry = Arc::new(BrushRegistry::with_resource_dir(
            EngineConfig::default(),
            temp_dir("threads"),
        ));
        let brush = RasterBrush::from_mask("square", PixelMask::filled(3, 3, 255), 0.25).unwrap();
        registry.insert(brush.into());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get("square").map(|b| b.width()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(3));
        }
    }
}
