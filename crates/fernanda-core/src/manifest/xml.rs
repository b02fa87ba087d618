//! Manifest serialization: quick-xml events in and out of the arena DOM.
//!
//! Output is UTF-8 with a 2-space indent. Attributes are written in stored
//! order so attributes the engine doesn't know about survive a round-trip.

use std::fs;
use std::path::Path;

use log::error;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::EngineError;
use crate::fnx;
use crate::manifest::dom::{Dom, NodeId};

const INDENT: usize = 2;

pub fn parse(content: &str) -> Result<Dom, String> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut dom: Option<Dom> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(format!("{e} at byte {}", reader.buffer_position())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let id = open_element(&mut dom, &stack, &start)?;
                stack.push(id);
            }
            Ok(Event::Empty(start)) => {
                open_element(&mut dom, &stack, &start)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(_) => {}
        }
    }

    dom.ok_or_else(|| "document has no root element".to_string())
}

fn open_element(dom: &mut Option<Dom>, stack: &[NodeId], start: &BytesStart) -> Result<NodeId, String> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let (dom, id) = match dom {
        None => {
            let dom = dom.insert(Dom::with_root(&tag));
            let root = dom.root();
            (dom, root)
        }
        Some(dom) => {
            let Some(&parent) = stack.last() else {
                return Err(format!("unexpected second root element <{tag}>"));
            };

            let id = dom.create_element(&tag);
            dom.append_child(parent, id);
            (dom, id)
        }
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        dom.set_attr(id, &key, &value);
    }

    Ok(id)
}

pub fn serialize(dom: &Dom) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);

    // Serialization into memory is infallible.
    let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
    write_node(&mut writer, dom, dom.root());

    let mut text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    text.push('\n');
    text
}

fn write_node(writer: &mut Writer<Vec<u8>>, dom: &Dom, id: NodeId) {
    let mut start = BytesStart::new(dom.tag(id));
    for (key, value) in dom.attrs(id) {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if dom.children(id).is_empty() {
        let _ = writer.write_event(Event::Empty(start));
        return;
    }

    let _ = writer.write_event(Event::Start(start));
    for &child in dom.children(id) {
        write_node(writer, dom, child);
    }
    let _ = writer.write_event(Event::End(BytesEnd::new(dom.tag(id))));
}

pub fn load_manifest(working_dir: &Path) -> Result<Dom, EngineError> {
    if !working_dir.exists() {
        return Err(EngineError::WorkingDirMissing(working_dir.to_path_buf()));
    }

    let path = working_dir.join(fnx::MANIFEST_FILE_NAME);
    let content = fs::read_to_string(&path)?;

    parse(&content).map_err(|detail| {
        error!("failed to parse {}: {detail}", path.display());
        EngineError::ManifestParse { path, detail }
    })
}

pub fn write_manifest(working_dir: &Path, dom: &Dom) -> Result<(), EngineError> {
    if !working_dir.exists() {
        return Err(EngineError::WorkingDirMissing(working_dir.to_path_buf()));
    }

    let path = working_dir.join(fnx::MANIFEST_FILE_NAME);
    fs::write(&path, serialize(dom))?;
    Ok(())
}
