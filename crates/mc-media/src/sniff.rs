//! Content type detection from leading magic bytes.
//!
//! The read path trusts this over anything the client claimed at upload
//! time: a blob with no recognizable file behind it is "not found".

use std::io::ErrorKind;
use std::path::Path;

use mc_core::Result;
use tokio::io::AsyncReadExt;

/// Bytes inspected by [`sniff_bytes`].
pub const SNIFF_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Avif,
    Gif,
    Mp4,
    Webm,
    Ogg,
    /// Exists but matched no signature.
    OctetStream,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Ogg => "video/ogg",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

/// Classify a file header. First match wins.
pub fn sniff_bytes(header: &[u8]) -> MediaType {
    let at = |offset: usize, sig: &[u8]| header.get(offset..offset + sig.len()) == Some(sig);

    if at(0, &[0xFF, 0xD8, 0xFF]) {
        MediaType::Jpeg
    } else if at(0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        MediaType::Png
    } else if at(0, b"RIFF") && at(8, b"WEBP") {
        MediaType::Webp
    } else if at(4, b"ftypavif") || at(4, b"ftypavis") {
        MediaType::Avif
    } else if at(0, b"GIF87") || at(0, b"GIF89") {
        MediaType::Gif
    } else if at(4, b"ftypisom") || at(4, b"ftypmp42") {
        MediaType::Mp4
    } else if at(0, &[0x1A, 0x45, 0xDF, 0xA3]) {
        MediaType::Webm
    } else if at(0, b"OggS") {
        MediaType::Ogg
    } else {
        MediaType::OctetStream
    }
}

/// Sniff the file at `path`.
///
/// Returns `Ok(None)` when there is nothing servable there: the path is
/// missing, is not a regular file, or is empty.
pub async fn sniff_path(path: &Path) -> Result<Option<MediaType>> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() || meta.len() == 0 {
        return Ok(None);
    }

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut header = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }

    Ok(Some(sniff_bytes(&header[..filled])))
}
