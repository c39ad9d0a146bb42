//! Event-based XML helpers shared by the signature builder and verifier.
//!
//! Everything here works on document strings through quick-xml reader/writer
//! passes; no DOM is ever materialized.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

fn reader_for(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;
    reader
}

/// Namespace bindings in scope at some position of a document, keyed by
/// prefix; the default namespace uses the empty prefix.
///
/// Cutting an element out of a document severs it from declarations made on
/// its ancestors. The scoped extraction functions collect those bindings so
/// canonicalization can still resolve and render them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NsContext {
    bindings: BTreeMap<String, String>,
}

impl NsContext {
    /// Add a binding; an empty URI undeclares the prefix.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if uri.is_empty() {
            self.bindings.remove(prefix);
        } else {
            self.bindings.insert(prefix.to_string(), uri.to_string());
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The bindings of `self` with those of `inner` layered on top.
    pub fn overlay(&self, inner: &NsContext) -> NsContext {
        let mut merged = self.clone();
        for (prefix, uri) in inner.bindings() {
            merged.bind(prefix, uri);
        }
        merged
    }

    /// Fold the xmlns declarations of a start tag into the context.
    fn observe(&mut self, e: &BytesStart) -> Result<()> {
        for attr in e.attributes().with_checks(false) {
            let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" {
                let uri = attr.unescape_value()?;
                self.bind("", &uri);
            } else if let Some(prefix) = key.strip_prefix(b"xmlns:".as_slice()) {
                let uri = attr.unescape_value()?;
                self.bind(std::str::from_utf8(prefix)?, &uri);
            }
        }
        Ok(())
    }
}

/// Serialize/re-parse pass: rewrites the whole document through the event
/// stream, expanding empty elements. Running this before digesting pins the
/// byte form both sides of the signature see.
pub fn normalize(xml: &str) -> Result<String> {
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Local name of the document root element.
pub fn root_local_name(xml: &str) -> Result<String> {
    let mut reader = reader_for(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                return Ok(String::from_utf8(e.name().local_name().as_ref().to_vec())?);
            }
            Ok(Event::Eof) => return Err(Error::Xml("Document has no root element".into())),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
}

/// Prefix of the document root element, with the namespace URI the prefix
/// (or the default namespace) binds to on the root's own declarations.
pub fn root_namespace(xml: &str) -> Result<(Option<String>, Option<String>)> {
    let mut reader = reader_for(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let prefix = e
                    .name()
                    .prefix()
                    .map(|p| String::from_utf8(p.as_ref().to_vec()))
                    .transpose()?;
                let decl = match &prefix {
                    Some(p) => format!("xmlns:{p}"),
                    None => "xmlns".to_string(),
                };
                let uri = e
                    .attributes()
                    .filter_map(|a| a.ok())
                    .find(|attr| attr.key.as_ref() == decl.as_bytes())
                    .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
                    .transpose()?;
                return Ok((prefix, uri));
            }
            Ok(Event::Eof) => return Err(Error::Xml("Document has no root element".into())),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
}

/// Add attributes to the root element of a fragment.
pub fn add_root_attributes(xml: &str, attributes: &[(&str, &str)]) -> Result<String> {
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut first = true;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if first => {
                first = false;
                let mut elem = e.to_owned();
                for (name, value) in attributes {
                    elem.push_attribute((*name, *value));
                }
                writer.write_event(Event::Start(elem.borrow()))?;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if first {
        return Err(Error::Xml("Fragment has no root element".into()));
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Extract the first element with the given local name, as a fragment.
pub fn extract_element(xml: &str, name: &str) -> Result<String> {
    extract_scoped(xml, name).map(|(fragment, _)| fragment)
}

/// Extract the first element carrying an `Id` attribute with the given value.
pub fn extract_element_by_id(xml: &str, id: &str) -> Result<String> {
    extract_scoped_by_id(xml, id).map(|(fragment, _)| fragment)
}

/// Like [`extract_element`], but also return the namespace bindings in scope
/// at the element's original position (its own declarations excluded).
pub fn extract_scoped(xml: &str, name: &str) -> Result<(String, NsContext)> {
    let target = name.as_bytes();
    extract_with_predicate(xml, |e| e.name().local_name().as_ref() == target).map_err(|error| {
        if matches!(error, Error::Xml(ref msg) if msg == "Element not found") {
            Error::Xml(format!("Element '{name}' not found in document"))
        } else {
            error
        }
    })
}

/// Like [`extract_element_by_id`], but also return the namespace bindings in
/// scope at the element's original position (its own declarations excluded).
pub fn extract_scoped_by_id(xml: &str, id: &str) -> Result<(String, NsContext)> {
    extract_with_predicate(xml, |e| {
        e.attributes().filter_map(|a| a.ok()).any(|attr| {
            attr.key.local_name().as_ref() == b"Id"
                && attr.unescape_value().ok().as_deref() == Some(id)
        })
    })
    .map_err(|error| {
        if matches!(error, Error::Xml(ref msg) if msg == "Element not found") {
            Error::Xml(format!("Element with Id='{id}' not found in document"))
        } else {
            error
        }
    })
}

fn extract_with_predicate<F>(xml: &str, mut predicate: F) -> Result<(String, NsContext)>
where
    F: FnMut(&BytesStart) -> bool,
{
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0;
    let mut capturing = false;
    // One context frame per open ancestor element
    let mut scopes = vec![NsContext::default()];
    let mut scope = NsContext::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if capturing {
                    depth += 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else if predicate(&e) {
                    capturing = true;
                    depth = 1;
                    scope = scopes.last().cloned().unwrap_or_default();
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else {
                    let mut next = scopes.last().cloned().unwrap_or_default();
                    next.observe(&e)?;
                    scopes.push(next);
                }
            }
            Ok(Event::End(e)) => {
                if capturing {
                    writer.write_event(Event::End(e.to_owned()))?;
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else if scopes.len() > 1 {
                    scopes.pop();
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => {
                if capturing {
                    writer.write_event(e)?;
                }
            }
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if !capturing {
        return Err(Error::Xml("Element not found".into()));
    }
    Ok((
        String::from_utf8(writer.into_inner().into_inner())?,
        scope,
    ))
}

/// Text content of the first element with the given local name.
pub fn element_text(xml: &str, name: &str) -> Result<String> {
    let target = name.as_bytes();
    let mut reader = reader_for(xml);
    let mut buf = Vec::new();
    let mut depth = 0;
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if inside {
                    depth += 1;
                } else if e.name().local_name().as_ref() == target {
                    inside = true;
                    depth = 1;
                }
            }
            Ok(Event::End(_)) if inside => {
                depth -= 1;
                if depth == 0 {
                    return Ok(text);
                }
            }
            Ok(Event::Text(e)) if inside => {
                text.push_str(&e.unescape().map_err(|e| Error::Xml(e.to_string()))?);
            }
            Ok(Event::CData(e)) if inside => {
                text.push_str(std::str::from_utf8(&e.into_inner())?);
            }
            Ok(Event::Eof) => {
                return Err(Error::Xml(format!("Element '{name}' not found in document")));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
}

/// Attribute value on the first element with the given local name.
pub fn element_attribute(xml: &str, name: &str, attribute: &str) -> Result<String> {
    attribute_values(xml, name, attribute)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Xml(format!("Attribute '{attribute}' not found on '{name}'")))
}

/// Attribute values across every element with the given local name, in
/// document order. Elements missing the attribute are skipped.
pub fn attribute_values(xml: &str, name: &str, attribute: &str) -> Result<Vec<String>> {
    let target = name.as_bytes();
    let attr_target = attribute.as_bytes();
    let mut reader = reader_for(xml);
    let mut buf = Vec::new();
    let mut values = Vec::new();
    let mut seen = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().local_name().as_ref() == target => {
                seen = true;
                for attr in e.attributes().filter_map(|a| a.ok()) {
                    if attr.key.local_name().as_ref() == attr_target {
                        values.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if !seen {
        return Err(Error::Xml(format!("Element '{name}' not found in document")));
    }
    Ok(values)
}

/// Replace the content of the first element with the given local name by a
/// single text node.
pub fn set_element_text(xml: &str, name: &str, text: &str) -> Result<String> {
    let target = name.as_bytes();
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0;
    let mut skipping = false;
    let mut replaced = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if skipping {
                    depth += 1;
                } else if !replaced && e.name().local_name().as_ref() == target {
                    replaced = true;
                    skipping = true;
                    depth = 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Ok(Event::End(e)) => {
                if skipping {
                    depth -= 1;
                    if depth == 0 {
                        skipping = false;
                        writer.write_event(Event::End(e.to_owned()))?;
                    }
                } else {
                    writer.write_event(Event::End(e.to_owned()))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => {
                if !skipping {
                    writer.write_event(e)?;
                }
            }
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if !replaced {
        return Err(Error::Xml(format!("Element '{name}' not found in document")));
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Insert a raw XML fragment immediately before the close tag of the first
/// element with the given local name.
pub fn insert_before_close(xml: &str, name: &str, fragment: &str) -> Result<String> {
    let target = name.as_bytes();
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0;
    let mut inside = false;
    let mut inserted = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if inside {
                    depth += 1;
                } else if !inserted && e.name().local_name().as_ref() == target {
                    inside = true;
                    depth = 1;
                }
                writer.write_event(Event::Start(e.to_owned()))?;
            }
            Ok(Event::End(e)) => {
                if inside {
                    depth -= 1;
                    if depth == 0 {
                        inside = false;
                        inserted = true;
                        writer.get_mut().write_all(fragment.as_bytes())?;
                    }
                }
                writer.write_event(Event::End(e.to_owned()))?;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if !inserted {
        return Err(Error::Xml(format!("Element '{name}' not found in document")));
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Remove every element with the given local name (with its whole subtree).
pub fn remove_elements(xml: &str, name: &str) -> Result<String> {
    let target = name.as_bytes();
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut depth = 0;
    let mut skipping = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if skipping {
                    depth += 1;
                } else if e.name().local_name().as_ref() == target {
                    skipping = true;
                    depth = 1;
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Ok(Event::End(e)) => {
                if skipping {
                    depth -= 1;
                    if depth == 0 {
                        skipping = false;
                    }
                } else {
                    writer.write_event(Event::End(e.to_owned()))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => {
                if !skipping {
                    writer.write_event(e)?;
                }
            }
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Make sure the first element with the given local name carries an Id
/// attribute. Returns the rewritten document and the effective id; an
/// existing Id wins over the supplied one.
pub fn ensure_id_attribute(
    xml: &str,
    name: &str,
    attribute: &str,
    namespace: Option<(&str, &str)>,
    id: &str,
) -> Result<(String, String)> {
    let target = name.as_bytes();
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut found = false;
    let mut effective_id = id.to_string();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if !found && e.name().local_name().as_ref() == target => {
                found = true;
                let existing = e.attributes().filter_map(|a| a.ok()).find_map(|attr| {
                    if attr.key.local_name().as_ref() == b"Id" {
                        attr.unescape_value().ok().map(|v| v.into_owned())
                    } else {
                        None
                    }
                });
                match existing {
                    Some(value) => {
                        effective_id = value;
                        writer.write_event(Event::Start(e.to_owned()))?;
                    }
                    None => {
                        let mut elem = e.to_owned();
                        if let Some((decl, uri)) = namespace {
                            let already = elem
                                .attributes()
                                .filter_map(|a| a.ok())
                                .any(|attr| attr.key.as_ref() == decl.as_bytes());
                            if !already {
                                elem.push_attribute((decl, uri));
                            }
                        }
                        elem.push_attribute((attribute, id));
                        writer.write_event(Event::Start(elem.borrow()))?;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    if !found {
        return Err(Error::Xml(format!("Element '{name}' not found in document")));
    }
    Ok((String::from_utf8(writer.into_inner().into_inner())?, effective_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<?xml version="1.0"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Header></soapenv:Header>
  <soapenv:Body><op>payload</op></soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_extract_element() {
        let body = extract_element(ENVELOPE, "Body").unwrap();
        assert!(body.starts_with("<soapenv:Body"));
        assert!(body.ends_with("</soapenv:Body>"));
        assert!(body.contains("payload"));
    }

    #[test]
    fn test_extract_missing_element() {
        assert!(extract_element(ENVELOPE, "Security").is_err());
    }

    #[test]
    fn test_extract_element_by_id() {
        let xml = r#"<root><Body wsu:Id="body-1">content</Body></root>"#;
        let element = extract_element_by_id(xml, "body-1").unwrap();
        assert_eq!(element, r#"<Body wsu:Id="body-1">content</Body>"#);
    }

    #[test]
    fn test_extract_scoped_collects_ancestor_bindings() {
        let xml = r#"<s:Envelope xmlns:s="urn:env" xmlns:x="urn:x"><s:Body xmlns:own="urn:own" Id="b"><op>1</op></s:Body></s:Envelope>"#;
        let (fragment, scope) = extract_scoped_by_id(xml, "b").unwrap();
        assert!(fragment.starts_with("<s:Body"));
        assert_eq!(scope.get("s"), Some("urn:env"));
        assert_eq!(scope.get("x"), Some("urn:x"));
        // The element's own declarations stay in the fragment, not the scope
        assert_eq!(scope.get("own"), None);
    }

    #[test]
    fn test_extract_scoped_default_namespace() {
        let xml = r#"<Envelope xmlns="urn:env"><Body Id="b">x</Body></Envelope>"#;
        let (_, scope) = extract_scoped_by_id(xml, "b").unwrap();
        assert_eq!(scope.get(""), Some("urn:env"));
    }

    #[test]
    fn test_extract_scoped_sibling_bindings_are_out_of_scope() {
        let xml = r#"<r><a xmlns:p="urn:p">y</a><b Id="t">x</b></r>"#;
        let (_, scope) = extract_scoped_by_id(xml, "t").unwrap();
        assert_eq!(scope.get("p"), None);
    }

    #[test]
    fn test_ns_context_overlay_inner_wins() {
        let mut outer = NsContext::default();
        outer.bind("p", "urn:outer");
        outer.bind("q", "urn:q");
        let mut inner = NsContext::default();
        inner.bind("p", "urn:inner");
        let merged = outer.overlay(&inner);
        assert_eq!(merged.get("p"), Some("urn:inner"));
        assert_eq!(merged.get("q"), Some("urn:q"));
    }

    #[test]
    fn test_element_text() {
        let xml = "<root><Value> abc </Value><Value>def</Value></root>";
        assert_eq!(element_text(xml, "Value").unwrap(), " abc ");
    }

    #[test]
    fn test_element_attribute() {
        let xml = r#"<root><m:Method Algorithm="urn:x"/></root>"#;
        assert_eq!(element_attribute(xml, "Method", "Algorithm").unwrap(), "urn:x");
    }

    #[test]
    fn test_attribute_values_in_order() {
        let xml = r#"<r><T Algorithm="a"/><T Algorithm="b"/></r>"#;
        assert_eq!(attribute_values(xml, "T", "Algorithm").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_set_element_text_replaces_content() {
        let xml = "<root><DigestValue></DigestValue><other/></root>";
        let out = set_element_text(xml, "DigestValue", "QUJD").unwrap();
        assert!(out.contains("<DigestValue>QUJD</DigestValue>"));
    }

    #[test]
    fn test_insert_before_close() {
        let out = insert_before_close(ENVELOPE, "Header", "<x:Sec>s</x:Sec>").unwrap();
        assert!(out.contains("<x:Sec>s</x:Sec></soapenv:Header>"));
    }

    #[test]
    fn test_remove_elements() {
        let xml = "<r><Signature><a/></Signature><keep/><Signature>x</Signature></r>";
        let out = remove_elements(xml, "Signature").unwrap();
        assert!(!out.contains("Signature"));
        assert!(out.contains("<keep"));
    }

    #[test]
    fn test_ensure_id_attribute_adds_id_and_namespace() {
        let (out, id) = ensure_id_attribute(
            ENVELOPE,
            "Body",
            "wsu:Id",
            Some(("xmlns:wsu", "urn:wsu")),
            "body",
        )
        .unwrap();
        assert_eq!(id, "body");
        assert!(out.contains(r#"wsu:Id="body""#));
        assert!(out.contains(r#"xmlns:wsu="urn:wsu""#));
    }

    #[test]
    fn test_ensure_id_attribute_keeps_existing() {
        let xml = r#"<root><Body wsu:Id="given">x</Body></root>"#;
        let (out, id) =
            ensure_id_attribute(xml, "Body", "wsu:Id", None, "fallback").unwrap();
        assert_eq!(id, "given");
        assert_eq!(out.matches("wsu:Id").count(), 1);
    }

    #[test]
    fn test_normalize_expands_empty_elements() {
        let out = normalize("<root><leaf/></root>").unwrap();
        assert_eq!(out, "<root><leaf></leaf></root>");
    }

    #[test]
    fn test_root_local_name() {
        assert_eq!(root_local_name(ENVELOPE).unwrap(), "Envelope");
    }

    #[test]
    fn test_root_namespace_prefixed() {
        let (prefix, uri) = root_namespace(ENVELOPE).unwrap();
        assert_eq!(prefix.as_deref(), Some("soapenv"));
        assert_eq!(uri.as_deref(), Some("http://schemas.xmlsoap.org/soap/envelope/"));
    }

    #[test]
    fn test_root_namespace_default() {
        let xml = r#"<Envelope xmlns="urn:env"><x>1</x></Envelope>"#;
        let (prefix, uri) = root_namespace(xml).unwrap();
        assert_eq!(prefix, None);
        assert_eq!(uri.as_deref(), Some("urn:env"));
    }

    #[test]
    fn test_add_root_attributes() {
        let out =
            add_root_attributes(r#"<a:r xmlns:a="urn:a"><c>1</c></a:r>"#, &[("k", "v")]).unwrap();
        assert!(out.starts_with(r#"<a:r xmlns:a="urn:a" k="v">"#));
        assert!(out.ends_with("</a:r>"));
    }
}
