//! Native text-layer extraction using lopdf.

use crate::error::NativeError;
use crate::schema::{NativePage, NativeResult};
use crate::source::ByteSource;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Extract the embedded text layer of every page, in document order.
///
/// Never fails: unreadable or unopenable input yields a result whose `error`
/// is set, a page whose text cannot be decoded yields an empty `text`, and
/// unreadable metadata yields an empty map.
pub fn extract_text_from_pdf(source: ByteSource<'_>) -> NativeResult {
    match try_extract(source) {
        Ok(result) => result,
        Err(e) => {
            warn!("Native extraction failed: {}", e);
            NativeResult::failed(e.to_string())
        }
    }
}

fn try_extract(source: ByteSource<'_>) -> Result<NativeResult, NativeError> {
    let data = source.read_all()?;
    let doc = open_document(&data)?;

    let metadata = read_metadata(&doc).unwrap_or_else(|e| {
        debug!("Ignoring unreadable metadata: {}", e);
        BTreeMap::new()
    });

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    info!("Native extraction: {} pages", page_numbers.len());

    let pages = page_numbers
        .iter()
        .enumerate()
        .map(|(i, &page_number)| {
            let page = i as u32 + 1;
            match page_text(&doc, page_number) {
                Ok(text) => NativePage { page, text, error: None },
                Err(e) => {
                    warn!("Page {}: {}", page, e);
                    NativePage {
                        page,
                        text: String::new(),
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    Ok(NativeResult::from_pages(pages, metadata))
}

fn open_document(data: &[u8]) -> Result<Document, NativeError> {
    let doc = Document::load_mem(data).map_err(|e| NativeError::Open(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(NativeError::Open("document is encrypted".to_string()));
    }
    Ok(doc)
}

fn page_text(doc: &Document, page_number: u32) -> Result<String, NativeError> {
    doc.extract_text(&[page_number])
        .map_err(|e| NativeError::PageText(e.to_string()))
}

/// Read the trailer's `/Info` dictionary as string key/value pairs.
fn read_metadata(doc: &Document) -> Result<BTreeMap<String, String>, NativeError> {
    let info = match doc.trailer.get(b"Info") {
        Ok(info) => info,
        Err(_) => return Ok(BTreeMap::new()),
    };

    let dict = match info {
        Object::Reference(id) => doc
            .get_dictionary(*id)
            .map_err(|e| NativeError::Metadata(e.to_string()))?,
        Object::Dictionary(dict) => dict,
        _ => return Err(NativeError::Metadata("/Info is not a dictionary".to_string())),
    };

    Ok(dict
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Object::Reference(id) => doc.get_object(*id).ok().and_then(metadata_value),
                other => metadata_value(other),
            }?;
            Some((String::from_utf8_lossy(key).into_owned(), value))
        })
        .collect())
}

fn metadata_value(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when BOM-marked, else byte-per-char.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// Build a PDF with one page per entry; empty entries produce pages with no text.
    pub(crate) fn build_pdf(pages: &[&str], title: Option<&str>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
            };
            if !text.is_empty() {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 24.into()]),
                        Operation::new("Td", vec![72.into(), 700.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id =
                    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                page.set("Contents", content_id);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
                "Producer" => Object::string_literal("test-suite"),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_pages_are_ordered_and_counted() {
        let pdf = build_pdf(&["First page", "Second page", "Third page"], None);
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert!(result.error.is_none());
        assert_eq!(result.page_count, 3);
        assert_eq!(result.pages.len(), 3);
        let numbers: Vec<u32> = result.pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(result.pages[1].text.contains("Second page"));
        assert!(result.content.starts_with("--- Page 1 ---\n"));
        assert!(result.content.contains("--- Page 3 ---"));
    }

    #[test]
    fn test_textless_pdf_is_not_an_error() {
        let pdf = build_pdf(&["", ""], None);
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert!(result.error.is_none());
        assert_eq!(result.page_count, 2);
        assert!(result.pages.iter().all(|p| p.text.trim().is_empty()));
    }

    #[test]
    fn test_mixed_document() {
        let pdf = build_pdf(&["Native words", "", ""], None);
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert!(result.pages[0].text.contains("Native words"));
        assert!(result.pages[1].text.trim().is_empty());
        assert!(result.pages[2].text.trim().is_empty());
    }

    #[test]
    fn test_metadata_is_read() {
        let pdf = build_pdf(&["x"], Some("Quarterly Report"));
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert_eq!(result.metadata.get("Title").map(String::as_str), Some("Quarterly Report"));
        assert_eq!(result.metadata.get("Producer").map(String::as_str), Some("test-suite"));
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let pdf = build_pdf(&["x"], None);
        let result = extract_text_from_pdf(ByteSource::from(&pdf));
        assert!(result.metadata.is_empty());
    }

    /// Reload a built PDF, apply `change`, and save it again.
    fn rewrite_pdf(pdf: &[u8], change: impl FnOnce(&mut Document)) -> Vec<u8> {
        let mut doc = Document::load_mem(pdf).unwrap();
        change(&mut doc);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_malformed_metadata_is_empty() {
        let pdf = rewrite_pdf(&build_pdf(&["Alpha", "Beta"], None), |doc| {
            doc.trailer.set("Info", Object::Integer(7));
        });
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert!(result.error.is_none());
        assert!(result.metadata.is_empty());
        assert_eq!(result.page_count, 2);
        assert!(result.pages[1].text.contains("Beta"));
    }

    #[test]
    fn test_unreadable_page_does_not_stop_extraction() {
        let pdf = rewrite_pdf(&build_pdf(&["Alpha", "Beta", "Gamma"], None), |doc| {
            let page_id = doc.get_pages()[&2];
            doc.get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .unwrap()
                .set("Contents", Object::Reference((9999, 0)));
        });
        let result = extract_text_from_pdf(ByteSource::from(&pdf));

        assert!(result.error.is_none());
        assert_eq!(result.page_count, 3);
        assert!(result.pages[0].text.contains("Alpha"));
        assert!(result.pages[1].text.trim().is_empty());
        assert!(result.pages[2].text.contains("Gamma"));
        assert!(result.content.contains("--- Page 2 ---"));
    }

    #[test]
    fn test_empty_input() {
        let result = extract_text_from_pdf(ByteSource::Bytes(&[]));
        assert_eq!(result.error.as_deref(), Some("empty_input_stream"));
        assert_eq!(result.page_count, 0);
        assert!(result.pages.is_empty());
        assert!(result.content.is_empty());
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_garbage_input_is_open_error() {
        let result = extract_text_from_pdf(ByteSource::Bytes(b"this is not a pdf"));
        let error = result.error.unwrap();
        assert!(error.starts_with("pdfplumber_open_error: "), "got {}", error);
        assert!(result.pages.is_empty());
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9]), "Aé");
        assert_eq!(decode_text_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
