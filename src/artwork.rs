use eframe::egui::ColorImage;
use sha2::{Digest, Sha256};
use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    fmt, fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use crate::{bridge::PlayerBridge, model::TrackIdentity};

const ARTWORK_EXTENSION: &str = "art";

/// Entries kept on disk before the oldest are pruned.
pub const DEFAULT_LIBRARY_LIMIT: usize = 500;

#[derive(Clone, Default)]
pub enum Artwork {
    #[default]
    Placeholder,
    Image { hash: u64, image: Arc<ColorImage> },
}

impl Artwork {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Artwork::Placeholder)
    }
}

impl fmt::Debug for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artwork::Placeholder => f.write_str("Placeholder"),
            Artwork::Image { hash, image } => f
                .debug_struct("Image")
                .field("hash", hash)
                .field("size", &image.size)
                .finish(),
        }
    }
}

/// Where the current artwork came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtworkSource {
    Library,
    Bridge,
    Placeholder,
}

pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

pub fn decode_artwork(bytes: &[u8]) -> std::result::Result<ColorImage, String> {
    let image =
        image::load_from_memory(bytes).map_err(|e| format!("Failed to decode artwork: {e}"))?;
    let image = image.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = image.into_raw();
    Ok(ColorImage::from_rgba_unmultiplied(size, &pixels))
}

fn artwork_from_bytes(bytes: &[u8]) -> Option<Artwork> {
    match decode_artwork(bytes) {
        Ok(image) => Some(Artwork::Image {
            hash: hash_bytes(bytes),
            image: Arc::new(image),
        }),
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

/// Artwork stored on disk, keyed by track identity. Holds at most `limit`
/// files; the least recently written go first.
pub struct ArtworkLibrary {
    dir: Option<PathBuf>,
    entries: HashMap<String, PathBuf>,
    limit: usize,
}

impl ArtworkLibrary {
    pub fn open(dir: Option<PathBuf>) -> Self {
        Self::open_with_limit(dir, DEFAULT_LIBRARY_LIMIT)
    }

    /// Indexes `dir`. A directory that cannot be read is logged and the
    /// library starts out empty.
    pub fn open_with_limit(dir: Option<PathBuf>, limit: usize) -> Self {
        let entries = match dir.as_deref() {
            Some(dir) => match scan(dir) {
                Ok(entries) => {
                    log::debug!("{} artwork entries in {}", entries.len(), dir.display());
                    entries
                }
                Err(err) => {
                    log::warn!("Artwork library {} unavailable: {err}", dir.display());
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        let mut library = Self {
            dir,
            entries,
            limit: limit.max(1),
        };
        library.prune();
        library
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, identity: &TrackIdentity) -> Option<Vec<u8>> {
        let path = self.entries.get(&library_key(identity))?;
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("Failed to read artwork {}: {err}", path.display());
                None
            }
        }
    }

    pub fn store(&mut self, identity: &TrackIdentity, bytes: &[u8]) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        let key = library_key(identity);
        let path = dir.join(format!("{key}.{ARTWORK_EXTENSION}"));
        let result = fs::create_dir_all(dir).and_then(|()| fs::write(&path, bytes));
        match result {
            Ok(()) => {
                self.entries.insert(key, path);
                self.prune();
            }
            Err(err) => log::warn!("Failed to store artwork in {}: {err}", dir.display()),
        }
    }

    fn prune(&mut self) {
        let excess = self.entries.len().saturating_sub(self.limit);
        if excess == 0 {
            return;
        }
        let mut by_age: Vec<(SystemTime, String)> = self
            .entries
            .iter()
            .map(|(key, path)| {
                let modified = fs::metadata(path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, key.clone())
            })
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(excess) {
            if let Some(path) = self.entries.remove(&key) {
                if let Err(err) = fs::remove_file(&path) {
                    log::warn!("Failed to prune artwork {}: {err}", path.display());
                }
            }
        }
        log::debug!("Pruned {excess} artwork entries");
    }
}

fn scan(dir: &Path) -> std::io::Result<HashMap<String, PathBuf>> {
    let mut entries = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_artwork = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTWORK_EXTENSION));
        if !is_artwork {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            entries.insert(stem.to_string(), path.clone());
        }
    }
    Ok(entries)
}

/// File stem for a track. Stable across builds and runs, unlike the std
/// hasher.
fn library_key(identity: &TrackIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.name.as_bytes());
    hasher.update([0]);
    hasher.update(identity.album.as_bytes());
    hasher.update([0]);
    hasher.update(identity.track_number.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// Library first, then the bridge (caching what it returns), then the
/// placeholder.
pub fn resolve_artwork<B: PlayerBridge + ?Sized>(
    library: &mut ArtworkLibrary,
    identity: &TrackIdentity,
    bridge: &B,
) -> (Artwork, ArtworkSource) {
    if let Some(artwork) = library
        .lookup(identity)
        .and_then(|bytes| artwork_from_bytes(&bytes))
    {
        return (artwork, ArtworkSource::Library);
    }

    match bridge.artwork_data() {
        Ok(Some(bytes)) => {
            if let Some(artwork) = artwork_from_bytes(&bytes) {
                library.store(identity, &bytes);
                return (artwork, ArtworkSource::Bridge);
            }
        }
        Ok(None) => log::debug!("No artwork for {:?}", identity.name),
        Err(err) => log::warn!("Artwork request failed: {err}"),
    }

    (Artwork::Placeholder, ArtworkSource::Placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MockBridge;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 2, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn identity(name: &str) -> TrackIdentity {
        TrackIdentity {
            name: name.to_string(),
            album: "Album".to_string(),
            track_number: 1,
        }
    }

    #[test]
    fn decode_artwork_fails_on_garbage_input() {
        assert!(decode_artwork(&[0u8, 1u8, 2u8, 3u8]).is_err());
    }

    #[test]
    fn bridge_artwork_is_cached_in_the_library() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = ArtworkLibrary::open(Some(dir.path().to_path_buf()));
        let mut bridge = MockBridge::default();
        bridge.artwork = Some(png_bytes([255, 0, 0, 255]));

        let (artwork, source) = resolve_artwork(&mut library, &identity("a"), &bridge);
        assert_eq!(source, ArtworkSource::Bridge);
        assert!(!artwork.is_placeholder());

        bridge.artwork = None;
        let (_, source) = resolve_artwork(&mut library, &identity("a"), &bridge);
        assert_eq!(source, ArtworkSource::Library);

        let reopened = ArtworkLibrary::open(Some(dir.path().to_path_buf()));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn library_keys_are_stable_across_runs() {
        let hello = TrackIdentity {
            name: "Hello".to_string(),
            album: "Album".to_string(),
            track_number: 3,
        };
        assert_eq!(library_key(&hello), "69cdd7daa427e12344c680803497fdd0");
        assert_ne!(library_key(&hello), library_key(&identity("Hello")));
    }

    #[test]
    fn library_drops_the_oldest_entries_beyond_its_limit() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["old", "middle", "new"].into_iter().enumerate() {
            let path = dir
                .path()
                .join(format!("{}.{ARTWORK_EXTENSION}", library_key(&identity(name))));
            fs::write(&path, png_bytes([0, 0, 0, 255])).unwrap();
            let file = fs::File::options().write(true).open(&path).unwrap();
            let age = std::time::Duration::from_secs(1_000 + i as u64);
            file.set_modified(SystemTime::UNIX_EPOCH + age).unwrap();
        }

        let mut library = ArtworkLibrary::open_with_limit(Some(dir.path().to_path_buf()), 2);
        assert_eq!(library.len(), 2);
        assert!(library.lookup(&identity("old")).is_none());
        assert!(library.lookup(&identity("new")).is_some());

        library.store(&identity("newest"), &png_bytes([1, 1, 1, 255]));
        assert_eq!(library.len(), 2);
        assert!(library.lookup(&identity("middle")).is_none());
        assert!(library.lookup(&identity("newest")).is_some());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn unreadable_library_falls_back_to_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        fs::write(&not_a_dir, b"x").unwrap();
        let mut library = ArtworkLibrary::open(Some(not_a_dir));
        assert!(library.is_empty());

        let mut bridge = MockBridge::default();
        bridge.artwork = Some(png_bytes([0, 0, 255, 255]));
        let (_, source) = resolve_artwork(&mut library, &identity("b"), &bridge);
        assert_eq!(source, ArtworkSource::Bridge);
    }

    #[test]
    fn missing_or_broken_artwork_yields_placeholder() {
        let mut library = ArtworkLibrary::open(None);
        let mut bridge = MockBridge::default();
        let (artwork, source) = resolve_artwork(&mut library, &identity("c"), &bridge);
        assert!(artwork.is_placeholder());
        assert_eq!(source, ArtworkSource::Placeholder);

        bridge.artwork = Some(vec![1, 2, 3]);
        let (_, source) = resolve_artwork(&mut library, &identity("c"), &bridge);
        assert_eq!(source, ArtworkSource::Placeholder);
    }
}
