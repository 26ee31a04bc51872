use crate::xml::errors::XmlError;
use crate::xml::tree::{Declaration, Document, Element};
use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::fmt;
use std::fs;
use std::path::Path;

/// Read and parse a markup file.
///
/// The raw bytes are decoded according to the byte order mark or the
/// `encoding` named in the XML declaration. Errors carry the file path so the
/// caller can report which file aborted the run.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Document, XmlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| XmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(&bytes).map_err(|error| error.in_file(path))
}

/// Parse undecoded markup, honoring its declared encoding.
pub fn parse_bytes(input: &[u8]) -> Result<Document, XmlError> {
    parse_events(Reader::from_reader(input))
}

/// Parse markup text into an owned [`Document`].
///
/// Whitespace-only text is dropped. Comments, processing instructions and
/// doctypes are discarded; they are not part of the element tree.
pub fn parse_str(input: &str) -> Result<Document, XmlError> {
    parse_events(Reader::from_str(input))
}

fn parse_events(mut reader: Reader<&[u8]>) -> Result<Document, XmlError> {
    reader.config_mut().trim_text(true);

    let mut declaration = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| syntax(reader.error_position() as u64, e))?;
        // the declaration can switch the decoder, so fetch it per event
        let decoder = reader.decoder();

        match event {
            Event::Decl(decl) => {
                declaration = Some(read_declaration(&decl, position)?);
            }
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent { position });
                }
                stack.push(read_element(&start, decoder, position)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent { position });
                }
                let element = read_element(&start, decoder, position)?;
                close_element(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let name = decoder
                    .decode(end.name().as_ref())
                    .map_err(|e| syntax(position, e))?
                    .into_owned();
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::UnexpectedEndTag {
                        position,
                        name: name.clone(),
                    })?;
                if element.name != name {
                    return Err(XmlError::MismatchedEndTag {
                        position,
                        expected: element.name,
                        found: name,
                    });
                }
                close_element(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| syntax(position, e))?;
                append_text(&mut stack, &text, position)?;
            }
            Event::CData(cdata) => {
                let text = decoder.decode(&cdata).map_err(|e| syntax(position, e))?;
                append_text(&mut stack, &text, position)?;
            }
            Event::Eof => break,
            // comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::UnclosedElement { name: open.name });
    }

    let root = root.ok_or(XmlError::MissingRoot)?;
    Ok(Document { declaration, root })
}

fn syntax(position: u64, error: impl fmt::Display) -> XmlError {
    XmlError::Syntax {
        position,
        message: error.to_string(),
    }
}

fn read_element(
    start: &BytesStart<'_>,
    decoder: Decoder,
    position: u64,
) -> Result<Element, XmlError> {
    let qname = start.name();
    let name = decoder
        .decode(qname.as_ref())
        .map_err(|e| syntax(position, e))?;
    let mut element = Element::new(name.into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| syntax(position, e))?;
        let key = decoder
            .decode(attribute.key.as_ref())
            .map_err(|e| syntax(position, e))?
            .into_owned();
        let raw = decoder
            .decode(&attribute.value)
            .map_err(|e| syntax(position, e))?;
        let value = unescape(&raw).map_err(|e| syntax(position, e))?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn read_declaration(decl: &BytesDecl<'_>, position: u64) -> Result<Declaration, XmlError> {
    let version = String::from_utf8_lossy(&decl.version().map_err(|e| syntax(position, e))?)
        .into_owned();
    let encoding = match decl.encoding() {
        Some(encoding) => Some(
            String::from_utf8_lossy(&encoding.map_err(|e| syntax(position, e))?).into_owned(),
        ),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(standalone) => Some(
            String::from_utf8_lossy(&standalone.map_err(|e| syntax(position, e))?).into_owned(),
        ),
        None => None,
    };
    Ok(Declaration {
        version,
        encoding,
        standalone,
    })
}

fn close_element(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Text before the first child belongs to the parent; text after a child is
/// that child's tail.
fn append_text(stack: &mut [Element], text: &str, position: u64) -> Result<(), XmlError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let Some(parent) = stack.last_mut() else {
        return Err(syntax(position, "text outside of the root element"));
    };
    let slot = match parent.children.last_mut() {
        Some(previous) => &mut previous.tail,
        None => &mut parent.text,
    };
    slot.get_or_insert_with(String::new).push_str(trimmed);
    Ok(())
}
