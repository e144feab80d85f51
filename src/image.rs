//! # Image Resolver Module
//!
//! Turns a wallpaper identifier into a display-ready image handle. The asset
//! partition is tried first, then `<storage_dir>/<identifier>` on the
//! filesystem.
//!
//! Images from the partition borrow its memory; images from the filesystem own
//! a heap buffer that is freed when the last handle is dropped.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::assets::{AssetRef, AssetStore};

/// Extension of pre-packed, display-native images
pub const PACKED_EXTENSION: &str = ".cbin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Pre-packed display-native image, used as-is
    Packed,
    /// Encoded image bytes (PNG, JPEG, ...) decoded by the display toolkit
    Raw,
}

impl ImageKind {
    fn from_name(name: &str) -> Self {
        match name.rfind('.') {
            Some(dot) if &name[dot..] == PACKED_EXTENSION => ImageKind::Packed,
            _ => ImageKind::Raw,
        }
    }
}

/// Backing memory of an image
#[derive(Debug, Clone)]
pub enum ImageBytes {
    /// Slice of the asset partition
    Borrowed(AssetRef),
    /// Buffer read from the filesystem
    Owned(Vec<u8>),
}

#[derive(Debug)]
pub struct WallpaperImage {
    pub name: String,
    pub kind: ImageKind,
    pub bytes: ImageBytes,
}

impl WallpaperImage {
    pub fn data(&self) -> &[u8] {
        match &self.bytes {
            ImageBytes::Borrowed(asset) => asset.bytes(),
            ImageBytes::Owned(buf) => buf,
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.bytes, ImageBytes::Borrowed(_))
    }
}

/// Shared handle to a loaded image
pub type WallpaperHandle = Arc<WallpaperImage>;

pub struct ImageResolver {
    assets: Arc<dyn AssetStore>,
    storage_dir: PathBuf,
}

impl ImageResolver {
    pub fn new(assets: Arc<dyn AssetStore>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets,
            storage_dir: storage_dir.into(),
        }
    }

    /// Loads `name` from the asset partition or the filesystem.
    ///
    /// Returns `None` when neither source has it. Filesystem lookups only accept
    /// plain relative identifiers; absolute paths and `..` are refused.
    pub fn load(&self, name: &str) -> Option<WallpaperHandle> {
        if self.assets.partition_valid() && self.assets.checksum_valid() {
            if let Some(asset) = self.assets.get(name) {
                let kind = ImageKind::from_name(name);
                log::info!("Load {name} from assets as {kind:?} ({} bytes)", asset.len());
                return Some(Arc::new(WallpaperImage {
                    name: name.to_string(),
                    kind,
                    bytes: ImageBytes::Borrowed(asset),
                }));
            }
        }

        if !is_plain_relative(name) {
            log::warn!("Rejecting wallpaper outside storage: {name}");
            return None;
        }

        let path = self.storage_dir.join(name);
        match std::fs::read(&path) {
            Ok(buf) => {
                log::info!("Load {} from storage ({} bytes)", path.display(), buf.len());
                Some(Arc::new(WallpaperImage {
                    name: name.to_string(),
                    kind: ImageKind::from_name(name),
                    bytes: ImageBytes::Owned(buf),
                }))
            }
            Err(e) => {
                log::warn!("Image not found: {name} (assets or storage: {e})");
                None
            }
        }
    }
}

/// True when `name` stays inside the directory it is joined onto
fn is_plain_relative(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::AssetPartition;

    /// A scratch directory under the system temp dir, removed on drop
    pub(crate) struct TempDir(pub PathBuf);

    impl TempDir {
        pub fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "ambient-clock-{tag}-{}-{:?}",
                std::process::id(),
                std::thread::current().id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    pub(crate) fn partition(assets: &[(&str, &[u8])]) -> Arc<dyn AssetStore> {
        Arc::new(AssetPartition::from_bytes(AssetPartition::pack(assets).unwrap()))
    }

    #[test]
    fn test_kind_from_suffix() {
        assert_eq!(ImageKind::from_name("sky.cbin"), ImageKind::Packed);
        assert_eq!(ImageKind::from_name("sky.png"), ImageKind::Raw);
        assert_eq!(ImageKind::from_name("sky"), ImageKind::Raw);
        assert_eq!(ImageKind::from_name("sky.cbin.png"), ImageKind::Raw);
    }

    #[test]
    fn test_asset_store_wins_and_borrows() {
        let dir = TempDir::new("resolver-assets");
        std::fs::write(dir.0.join("sky.cbin"), b"from disk").unwrap();

        let resolver = ImageResolver::new(partition(&[("sky.cbin", &b"from assets"[..])]), &dir.0);
        let img = resolver.load("sky.cbin").unwrap();

        assert!(img.is_borrowed());
        assert_eq!(img.kind, ImageKind::Packed);
        assert_eq!(img.data(), b"from assets");
    }

    #[test]
    fn test_filesystem_fallback_owns_bytes() {
        let dir = TempDir::new("resolver-fs");
        std::fs::write(dir.0.join("beach.jpg"), b"jpeg bytes").unwrap();

        let resolver = ImageResolver::new(partition(&[("sky.cbin", &b"x"[..])]), &dir.0);
        let img = resolver.load("beach.jpg").unwrap();

        assert!(!img.is_borrowed());
        assert_eq!(img.kind, ImageKind::Raw);
        assert_eq!(img.data(), b"jpeg bytes");
    }

    #[test]
    fn test_invalid_checksum_skips_assets() {
        let dir = TempDir::new("resolver-checksum");
        let mut bundle = AssetPartition::pack(&[("sky.cbin", b"abc")]).unwrap();
        let last = bundle.len() - 1;
        bundle[last] ^= 0x01;
        let resolver = ImageResolver::new(Arc::new(AssetPartition::from_bytes(bundle)), &dir.0);

        assert!(resolver.load("sky.cbin").is_none());
    }

    #[test]
    fn test_identifiers_cannot_leave_storage() {
        let outside = TempDir::new("resolver-outside");
        let secret = outside.0.join("secret.png");
        std::fs::write(&secret, b"outside bytes").unwrap();

        let dir = TempDir::new("resolver-jail");
        std::fs::create_dir_all(dir.0.join("night")).unwrap();
        std::fs::write(dir.0.join("night/moon.png"), b"moon").unwrap();
        let resolver = ImageResolver::new(Arc::new(AssetPartition::empty()), &dir.0);

        let absolute = secret.to_string_lossy().to_string();
        assert!(resolver.load(&absolute).is_none());

        let outside_name = outside.0.file_name().unwrap().to_string_lossy().to_string();
        assert!(resolver.load(&format!("../{outside_name}/secret.png")).is_none());
        assert!(resolver.load("night/../../etc/passwd").is_none());
        assert!(resolver.load("").is_none());

        // Plain subdirectories stay allowed
        assert_eq!(resolver.load("night/moon.png").unwrap().data(), b"moon");
    }

    #[test]
    fn test_missing_everywhere() {
        let dir = TempDir::new("resolver-missing");
        let resolver = ImageResolver::new(Arc::new(AssetPartition::empty()), &dir.0);
        assert!(resolver.load("nope.png").is_none());
    }
}
