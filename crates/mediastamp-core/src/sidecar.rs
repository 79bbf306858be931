use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Get the path to the XMP sidecar for a given media file (`photo.png` -> `photo.png.xmp`)
pub fn sidecar_path(file_path: &Path) -> PathBuf {
    let mut name: OsString = file_path.as_os_str().to_owned();
    name.push(".xmp");
    PathBuf::from(name)
}

/// Render an XMP packet carrying a single `xmp:CreateDate`.
pub fn render_xmp(create_date: &str) -> String {
    format!(
        "<?xpacket begin='' id='W5M0MpCehiHzreSzNTczkc9d'?>
<x:xmpmeta xmlns:x='adobe:ns:meta/' x:xmptk='mediastamp'>
 <rdf:RDF xmlns:rdf='http://www.w3.org/1999/02/22-rdf-syntax-ns#'>
  <rdf:Description rdf:about=''
    xmlns:xmp='http://ns.adobe.com/xap/1.0/'>
   <xmp:CreateDate>{create_date}</xmp:CreateDate>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end='w'?>"
    )
}

/// Write (or overwrite) the sidecar for `file_path`. Returns the sidecar path.
pub fn write_sidecar(file_path: &Path, create_date: &str) -> io::Result<PathBuf> {
    let path = sidecar_path(file_path);
    fs::write(&path, render_xmp(create_date))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_appends_extension() {
        assert_eq!(sidecar_path(Path::new("/a/b/pic.webp")), PathBuf::from("/a/b/pic.webp.xmp"));
    }

    #[test]
    fn test_render_has_single_date() {
        let xmp = render_xmp("2021-07-04T00:00:00");
        assert_eq!(xmp.matches("<xmp:CreateDate>").count(), 1);
        assert!(xmp.contains("<xmp:CreateDate>2021-07-04T00:00:00</xmp:CreateDate>"));
        assert!(xmp.starts_with("<?xpacket begin="));
    }

    #[test]
    fn test_write_overwrites_previous_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pic.png");
        fs::write(&image, b"png").unwrap();
        fs::write(sidecar_path(&image), "stale content that is much longer than the new one").unwrap();

        let written = write_sidecar(&image, "2020-01-02T03:04:05").unwrap();
        let content = fs::read_to_string(&written).unwrap();
        assert!(content.contains("2020-01-02T03:04:05"));
        assert!(!content.contains("stale"));
        assert_eq!(fs::read(&image).unwrap(), b"png");
    }
}
