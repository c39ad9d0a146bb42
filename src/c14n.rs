//! Exclusive XML Canonicalization (omit comments).
//!
//! Both digest references and SignedInfo are canonicalized with this
//! transform, so the exact byte output here is what gets signed. A fragment
//! cut out of a larger document has lost the declarations its ancestors
//! carried; [`canonicalize_within`] takes that inherited scope so a prefix
//! declared above the fragment still renders where it is visibly utilized.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::str;

use crate::error::{Error, Result};
use crate::xml::NsContext;

type NsMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Canonicalize a standalone document, optionally forcing the given prefixes
/// into the output (the InclusiveNamespaces PrefixList).
pub fn canonicalize(xml: impl AsRef<str>, inclusive_prefixes: Option<&[&str]>) -> Result<String> {
    canonicalize_within(xml, &NsContext::default(), inclusive_prefixes)
}

/// Canonicalize a fragment under the namespace bindings that were in scope
/// at its original position. Inherited bindings render only where visibly
/// utilized, per the exclusive profile.
pub fn canonicalize_within(
    xml: impl AsRef<str>,
    scope: &NsContext,
    inclusive_prefixes: Option<&[&str]>,
) -> Result<String> {
    let mut reader = Reader::from_str(xml.as_ref());
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut canon = Canonicalizer::new(scope, inclusive_prefixes);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => canon.element_start(&e)?,
            Ok(Event::End(e)) => canon.element_end(e.name().as_ref())?,
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| Error::Xml(err.to_string()))?;
                canon.text(text.as_bytes())?;
            }
            Ok(Event::CData(e)) => {
                // CDATA collapses to an ordinary text node
                let raw = e.into_inner();
                canon.text(&normalize_line_endings(&raw))?;
            }
            Ok(Event::Eof) => break,
            // Comments, PIs and the XML declaration are dropped
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }
    Ok(canon.finish())
}

/// Streaming canonical serializer. One frame of namespace state per open
/// element: what is in scope, and what an ancestor has already rendered.
struct Canonicalizer {
    out: String,
    declared: Vec<NsMap>,
    rendered: Vec<NsMap>,
    inclusive: Vec<Vec<u8>>,
}

impl Canonicalizer {
    fn new(scope: &NsContext, inclusive_prefixes: Option<&[&str]>) -> Self {
        let mut inherited = NsMap::new();
        for (prefix, uri) in scope.bindings() {
            inherited.insert(prefix.as_bytes().to_vec(), uri.as_bytes().to_vec());
        }
        Self {
            out: String::new(),
            declared: vec![inherited],
            rendered: vec![NsMap::new()],
            inclusive: inclusive_prefixes
                .unwrap_or_default()
                .iter()
                .map(|p| p.as_bytes().to_vec())
                .collect(),
        }
    }

    fn element_start(&mut self, e: &BytesStart) -> Result<()> {
        let mut declared = self.declared.last().cloned().unwrap_or_default();
        let rendered = self.rendered.last().cloned().unwrap_or_default();

        // Split namespace declarations from regular attributes
        let mut attrs = Vec::new();
        for attr in e.attributes().with_checks(false) {
            let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" {
                bind(&mut declared, b"", &attr.unescape_value()?);
            } else if let Some(prefix) = key.strip_prefix(b"xmlns:".as_slice()) {
                let prefix = prefix.to_vec();
                bind(&mut declared, &prefix, &attr.unescape_value()?);
            } else {
                let value = attr.unescape_value()?;
                attrs.push((key.to_vec(), value.into_owned().into_bytes()));
            }
        }

        let name = e.name().as_ref().to_vec();

        // Render each visibly utilized binding unless an ancestor already
        // emitted the exact same one; BTreeSet order gives the prefix sort
        let mut fresh = Vec::new();
        for prefix in self.utilized_prefixes(&name, &attrs, &declared) {
            if let Some(uri) = declared.get(&prefix) {
                if rendered.get(&prefix) != Some(uri) {
                    fresh.push((prefix, uri.clone()));
                }
            }
        }

        self.out.push('<');
        self.out.push_str(str::from_utf8(&name)?);
        for (prefix, uri) in &fresh {
            if prefix.is_empty() {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(str::from_utf8(prefix)?);
                self.out.push_str("=\"");
            }
            self.attr_value(uri)?;
            self.out.push('"');
        }
        for (key, value) in sort_attributes(attrs, &declared) {
            self.out.push(' ');
            self.out.push_str(str::from_utf8(&key)?);
            self.out.push_str("=\"");
            self.attr_value(&value)?;
            self.out.push('"');
        }
        self.out.push('>');

        let mut rendered = rendered;
        rendered.extend(fresh);
        self.declared.push(declared);
        self.rendered.push(rendered);
        Ok(())
    }

    fn element_end(&mut self, name: &[u8]) -> Result<()> {
        self.out.push_str("</");
        self.out.push_str(str::from_utf8(name)?);
        self.out.push('>');
        self.declared.pop();
        self.rendered.pop();
        Ok(())
    }

    fn utilized_prefixes(
        &self,
        name: &[u8],
        attrs: &[(Vec<u8>, Vec<u8>)],
        declared: &NsMap,
    ) -> BTreeSet<Vec<u8>> {
        let mut utilized = BTreeSet::new();
        utilized.insert(prefix_of(name).unwrap_or_default());
        for (key, _) in attrs {
            if let Some(prefix) = prefix_of(key) {
                utilized.insert(prefix);
            }
        }
        for p in &self.inclusive {
            if declared.contains_key(p) {
                utilized.insert(p.clone());
            }
        }
        // xml: is implicitly bound and never rendered
        utilized.remove(b"xml".as_slice());
        utilized
    }

    fn text(&mut self, raw: &[u8]) -> Result<()> {
        for ch in str::from_utf8(raw)?.chars() {
            match ch {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '\r' => self.out.push_str("&#xD;"),
                _ => self.out.push(ch),
            }
        }
        Ok(())
    }

    fn attr_value(&mut self, raw: &[u8]) -> Result<()> {
        for ch in str::from_utf8(raw)?.chars() {
            match ch {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '"' => self.out.push_str("&quot;"),
                '\t' => self.out.push_str("&#x9;"),
                '\n' => self.out.push_str("&#xA;"),
                '\r' => self.out.push_str("&#xD;"),
                _ => self.out.push(ch),
            }
        }
        Ok(())
    }

    fn finish(self) -> String {
        self.out
    }
}

fn bind(declared: &mut NsMap, prefix: &[u8], uri: &str) {
    if uri.is_empty() {
        declared.remove(prefix);
    } else {
        declared.insert(prefix.to_vec(), uri.as_bytes().to_vec());
    }
}

fn prefix_of(qname: &[u8]) -> Option<Vec<u8>> {
    qname
        .iter()
        .position(|&b| b == b':')
        .map(|pos| qname[..pos].to_vec())
}

/// Attributes sort by (namespace URI, local name); the xml: prefix binds to
/// its fixed URI.
fn sort_attributes(attrs: Vec<(Vec<u8>, Vec<u8>)>, declared: &NsMap) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut keyed: Vec<(Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>)> = attrs
        .into_iter()
        .map(|(key, value)| {
            let (ns_uri, local) = match prefix_of(&key) {
                Some(prefix) => {
                    let local = key[prefix.len() + 1..].to_vec();
                    let uri = if prefix == b"xml" {
                        b"http://www.w3.org/XML/1998/namespace".to_vec()
                    } else {
                        declared.get(&prefix).cloned().unwrap_or_default()
                    };
                    (uri, local)
                }
                None => (Vec::new(), key.clone()),
            };
            (ns_uri, local, key, value)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    keyed
        .into_iter()
        .map(|(_, _, key, value)| (key, value))
        .collect()
}

/// Line endings inside text content become LF.
fn normalize_line_endings(text: &[u8]) -> Cow<'_, [u8]> {
    if !text.contains(&b'\r') {
        return Cow::Borrowed(text);
    }

    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i] == b'\r' {
            out.push(b'\n');
            if i + 1 < text.len() && text[i + 1] == b'\n' {
                i += 2;
            } else {
                i += 1;
            }
        } else {
            out.push(text[i]);
            i += 1;
        }
    }
    Cow::Owned(out)
}
