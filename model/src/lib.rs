use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result};

mod item;
mod osm;

pub use item::{load_items, InvalidItem, Items, RefItem};
pub use osm::{load_elements, OsmElement, OsmId};

/// Reads a whole input file, transparently decompressing `.zst` files.
pub fn read(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut contents = String::new();
    if path.extension().is_some_and(|x| x == "zst") {
        zstd::Decoder::new(file)?
            .read_to_string(&mut contents)
            .with_context(|| format!("failed to decompress {}", path.display()))?;
    } else {
        BufReader::new(file).read_to_string(&mut contents)?;
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn read_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl.zst");
        let compressed = zstd::encode_all(&b"hello\n"[..], 3).unwrap();
        File::create(&path).unwrap().write_all(&compressed).unwrap();

        assert_eq!(read(&path).unwrap(), "hello\n");
    }

    #[test]
    fn read_missing() {
        let err = read(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
