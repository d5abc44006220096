use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::objects::{ObjId, PdfObject};

/// Serializes indirect objects to a `Write` target and records each
/// object's byte offset for the cross-reference table.
pub struct PdfWriter<W: Write> {
    writer: W,
    offset: usize,
    /// Byte offset per object number; index 0 is the free-list head.
    offsets: Vec<Option<usize>>,
    compress: bool,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(writer: W) -> Self {
        PdfWriter {
            writer,
            offset: 0,
            offsets: vec![None],
            compress: false,
        }
    }

    /// Deflate stream data written from now on.
    pub fn set_compression(&mut self, enabled: bool) {
        self.compress = enabled;
    }

    fn put(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.offset += data.len();
        Ok(())
    }

    /// `%PDF-1.7` followed by a comment of high bytes so transfer tools
    /// treat the file as binary.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.put(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n")
    }

    pub fn write_object(&mut self, id: ObjId, obj: &PdfObject) -> io::Result<()> {
        let slot = id.0 as usize;
        if self.offsets.len() <= slot {
            self.offsets.resize(slot + 1, None);
        }
        self.offsets[slot] = Some(self.offset);

        let mut body = format!("{} 0 obj\n", id.0).into_bytes();
        self.serialize(obj, &mut body)?;
        body.extend_from_slice(b"\nendobj\n");
        self.put(&body)
    }

    fn serialize(&self, obj: &PdfObject, out: &mut Vec<u8>) -> io::Result<()> {
        match obj {
            PdfObject::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
            PdfObject::Real(f) => out.extend_from_slice(format_number(*f).as_bytes()),
            PdfObject::Name(name) => {
                out.push(b'/');
                out.extend_from_slice(name.as_bytes());
            }
            PdfObject::Text(s) => {
                out.push(b'(');
                out.extend_from_slice(&escape_text(s));
                out.push(b')');
            }
            PdfObject::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.serialize(item, out)?;
                }
                out.push(b']');
            }
            PdfObject::Dictionary(entries) => {
                out.extend_from_slice(b"<<");
                self.serialize_entries(entries, out)?;
                out.extend_from_slice(b" >>");
            }
            PdfObject::Stream { dict, data } => {
                let already_filtered = dict.iter().any(|(k, _)| k == "Filter");
                let deflated;
                let payload = if self.compress && !already_filtered {
                    deflated = deflate(data)?;
                    &deflated
                } else {
                    data
                };
                out.extend_from_slice(b"<<");
                self.serialize_entries(dict, out)?;
                if self.compress && !already_filtered {
                    out.extend_from_slice(b" /Filter /FlateDecode");
                }
                out.extend_from_slice(format!(" /Length {} >>\nstream\n", payload.len()).as_bytes());
                out.extend_from_slice(payload);
                out.extend_from_slice(b"\nendstream");
            }
            PdfObject::Reference(id) => out.extend_from_slice(format!("{} 0 R", id.0).as_bytes()),
        }
        Ok(())
    }

    fn serialize_entries(&self, entries: &[(String, PdfObject)], out: &mut Vec<u8>) -> io::Result<()> {
        for (key, value) in entries {
            out.extend_from_slice(b" /");
            out.extend_from_slice(key.as_bytes());
            out.push(b' ');
            self.serialize(value, out)?;
        }
        Ok(())
    }

    /// Cross-reference table, trailer and `%%EOF`. Object numbers that
    /// were never written become free entries.
    pub fn write_xref_and_trailer(&mut self, root: ObjId, info: Option<ObjId>) -> io::Result<()> {
        let xref_offset = self.offset;
        let size = self.offsets.len();

        let mut table = format!("xref\n0 {}\n", size).into_bytes();
        table.extend_from_slice(b"0000000000 65535 f\r\n");
        for entry in &self.offsets[1..] {
            match entry {
                Some(off) => table.extend_from_slice(format!("{:010} 00000 n\r\n", off).as_bytes()),
                None => table.extend_from_slice(b"0000000000 00000 f\r\n"),
            }
        }
        self.put(&table)?;

        let mut trailer = format!("trailer\n<< /Size {} /Root {} 0 R", size, root.0);
        if let Some(info) = info {
            trailer.push_str(&format!(" /Info {} 0 R", info.0));
        }
        trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF\n", xref_offset));
        self.put(trailer.as_bytes())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Map a character to its byte in WinAnsiEncoding, the encoding declared
/// for every builtin font the document uses.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}

/// True when every character of `text` can be drawn with a builtin font.
pub fn is_win_ansi(text: &str) -> bool {
    text.chars().all(|c| win_ansi_byte(c).is_some())
}

/// Encode text for a literal string: WinAnsi bytes with `\`, `(` and `)`
/// escaped. Unmappable characters become `?`.
pub fn escape_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.extend_from_slice(b"\\\\"),
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\t' => out.push(b' '),
            _ => out.push(win_ansi_byte(c).unwrap_or(b'?')),
        }
    }
    out
}

/// Format a number for content streams and object bodies: integers
/// without a fractional part, everything else to at most 4 places.
pub fn format_number(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(obj: &PdfObject, compress: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut w = PdfWriter::new(&mut buf);
        w.set_compression(compress);
        w.write_object(ObjId(1), obj).unwrap();
        buf
    }

    #[test]
    fn header_has_binary_comment() {
        let mut buf = Vec::new();
        PdfWriter::new(&mut buf).write_header().unwrap();
        assert!(buf.starts_with(b"%PDF-1.7\n%"));
        assert!(buf[10..14].iter().all(|b| *b >= 128));
    }

    #[test]
    fn dictionary_output() {
        let obj = PdfObject::dict(vec![
            ("Type", PdfObject::name("Catalog")),
            ("Pages", ObjId(2).reference()),
        ]);
        let out = String::from_utf8(written(&obj, false)).unwrap();
        assert!(out.contains("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj"));
    }

    #[test]
    fn plain_stream_reports_length() {
        let obj = PdfObject::stream(vec![], b"BT ET".to_vec());
        let out = String::from_utf8(written(&obj, false)).unwrap();
        assert!(out.contains("<< /Length 5 >>\nstream\nBT ET\nendstream"));
    }

    #[test]
    fn compressed_stream_gets_flate_filter() {
        let obj = PdfObject::stream(vec![], vec![b'x'; 400]);
        let out = written(&obj, true);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("/Filter /FlateDecode"));
        assert!(out.len() < 400);
    }

    #[test]
    fn prefiltered_stream_is_left_alone() {
        let obj = PdfObject::stream(vec![("Filter", PdfObject::name("DCTDecode"))], vec![0xFF, 0xD8]);
        let text = String::from_utf8_lossy(&written(&obj, true)).to_string();
        assert!(!text.contains("FlateDecode"));
        assert!(text.contains("/Length 2"));
    }

    #[test]
    fn xref_marks_gaps_free() {
        let mut buf = Vec::new();
        let mut w = PdfWriter::new(&mut buf);
        w.write_header().unwrap();
        w.write_object(ObjId(1), &PdfObject::name("A")).unwrap();
        w.write_object(ObjId(3), &PdfObject::name("B")).unwrap();
        w.write_xref_and_trailer(ObjId(1), None).unwrap();
        let out = String::from_utf8_lossy(&buf).to_string();
        assert!(out.contains("xref\n0 4\n"));
        assert!(out.contains("0000000000 00000 f\r\n"));
        assert!(out.contains("/Size 4 /Root 1 0 R >>"));
        assert!(out.ends_with("%%EOF\n"));
    }

    #[test]
    fn text_is_escaped_and_win_ansi_encoded() {
        assert_eq!(escape_text("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(escape_text("€5 £3"), vec![0x80, b'5', b' ', 0xA3, b'3']);
        assert_eq!(escape_text("₹"), b"?".to_vec());
    }

    #[test]
    fn win_ansi_detection() {
        assert!(is_win_ansi("$ € £ ¥"));
        assert!(!is_win_ansi("₹"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(612.0), "612");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.12345), "0.1235");
        assert_eq!(format_number(-0.00001), "0");
    }
}
