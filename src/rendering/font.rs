//! Font resolution and process-wide caching

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::Font;

use crate::error::{Error, Result};

static FONT_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Font<'static>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Well-known font locations probed when no explicit path is configured.
/// CJK-capable faces first; the campaign text is mostly Traditional Chinese.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSerifCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Helvetica.ttc",
];

/// Load and cache the font at `path`.
pub fn load_font_cached(path: &Path) -> Result<Arc<Font<'static>>> {
    if let Some(f) = FONT_CACHE.lock().get(path) {
        return Ok(Arc::clone(f));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| Error::FontError(format!("failed to read font {}: {}", path.display(), e)))?;
    let font = Font::try_from_vec(bytes)
        .ok_or_else(|| Error::FontError(format!("failed to parse font {}", path.display())))?;

    let font = Arc::new(font);
    FONT_CACHE
        .lock()
        .insert(path.to_path_buf(), Arc::clone(&font));
    Ok(font)
}

/// Resolve the drawing font: explicit setting, then the `POSTERFORGE_FONT`
/// environment override, then well-known system locations.
pub fn resolve_font(explicit: Option<&Path>) -> Result<Arc<Font<'static>>> {
    if let Some(path) = explicit {
        return load_font_cached(path);
    }

    if let Ok(env_path) = std::env::var("POSTERFORGE_FONT") {
        return load_font_cached(Path::new(&env_path));
    }

    for candidate in FALLBACK_FONTS {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        // Some system faces are collections rusttype cannot parse; keep probing.
        if let Ok(font) = load_font_cached(path) {
            return Ok(font);
        }
    }

    Err(Error::FontError(
        "no usable font found; set RuntimeSettings.font_path or POSTERFORGE_FONT".to_string(),
    ))
}

/// Whether any font can be resolved on this host. Used by tests to skip
/// glyph-drawing assertions on fontless machines.
pub fn font_available(explicit: Option<&Path>) -> bool {
    resolve_font(explicit).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_is_a_font_error() {
        let err = load_font_cached(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, Error::FontError(_)));
    }
}
