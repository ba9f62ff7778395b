//! Combined tuning XML: a denormalized document aggregating many tunable
//! instances, with an internal `x`/`r` reference-sharing mechanism expanded
//! into a plain tree by [`parse`].

mod expand;
mod parse;
mod types;

pub use types::{Combined, Entry, Instance, Tunable};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed combined document: {0}")]
    Malformed(String),
    #[error("unresolved <r> reference to key {0}")]
    UnresolvedReference(i64),
    #[error("xml error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Parses and fully reference-expands a Combined tuning document.
pub fn parse(bytes: &[u8]) -> Result<Combined, Error> {
    let combined = parse::parse(bytes)?;
    expand::expand(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_instances_and_tunables() {
        let xml = br#"<combined>
            <R n="Trait">
                <I c="Trait" i="trait" m="traits.trait" n="brave" s="123">
                    <T n="display_name" t="LocalizedString">0xDEADBEEF</T>
                </I>
            </R>
        </combined>"#;

        let combined = parse(xml).unwrap();
        let entry = combined.entry("Trait").unwrap();
        assert_eq!(entry.instances.len(), 1);
        let instance = &entry.instances[0];
        assert_eq!(instance.name.as_deref(), Some("brave"));
        assert_eq!(instance.id.as_deref(), Some("123"));
        let tunable = instance.tunable("display_name").unwrap();
        assert_eq!(tunable.chardata, "0xDEADBEEF");
    }

    #[test]
    fn expands_a_reference_and_keeps_the_referencing_name() {
        let xml = br#"<combined>
            <R n="Trait">
                <I n="brave">
                    <T n="shared" x="7"><inner n="value">1</inner></T>
                    <r n="linked" x="7"/>
                </I>
            </R>
        </combined>"#;

        let combined = parse(xml).unwrap();
        let instance = &combined.entry("Trait").unwrap().instances[0];
        let linked = instance.tunable("linked").unwrap();
        assert_eq!(linked.name.as_deref(), Some("linked"));
        assert_eq!(linked.tunable("value").unwrap().chardata, "1");
    }

    #[test]
    fn modules_are_optional() {
        let xml = br#"<combined><R n="Snippet"><I n="x"/></R></combined>"#;
        let combined = parse(xml).unwrap();
        assert!(combined.entry("Snippet").unwrap().modules.is_empty());
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        let xml = br#"<combined>
            <R n="Trait"><I n="brave"><T n="a"><r x="99"/></T></I></R>
        </combined>"#;
        assert!(matches!(parse(xml), Err(Error::UnresolvedReference(99))));
    }
}
