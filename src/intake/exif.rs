use std::io::Cursor;

/// EXIFのOrientation値（1〜8）を読む
///
/// EXIFがない・壊れている場合は None。
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;

    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    match field.value.get_uint(0) {
        Some(v @ 1..=8) => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_exif() {
        assert_eq!(read_orientation(b"not an image"), None);
    }
}
