//! Per-layer parse state: the context handed down the chain and each layer's result.

use smallvec::SmallVec;

use super::FieldValue;

/// One extracted field, keyed by a protocol-defined name.
pub type FieldEntry<'data> = (&'static str, FieldValue<'data>);

/// Dispatch hint for the next layer, such as `ethertype` or `ip_protocol`.
pub type HintEntry = (&'static str, u64);

/// State threaded from one layer parser to the next.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Capture link type of the frame.
    pub link_type: u16,

    /// Layer that dispatched to the current one.
    pub parent_protocol: Option<&'static str>,

    /// Hints accumulated from outer layers.
    pub hints: SmallVec<[HintEntry; 4]>,

    /// VLAN and MPLS headers walked so far.
    pub tag_depth: u8,
}

impl ParseContext {
    /// Context for the first layer of a frame.
    pub fn new(link_type: u16) -> Self {
        Self {
            link_type,
            parent_protocol: None,
            hints: SmallVec::new(),
            tag_depth: 0,
        }
    }

    /// Hint set by an earlier layer.
    #[inline]
    pub fn hint(&self, key: &str) -> Option<u64> {
        self.hints.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Set or overwrite a hint.
    #[inline]
    pub fn set_hint(&mut self, key: &'static str, value: u64) {
        if let Some(entry) = self.hints.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.hints.push((key, value));
        }
    }

    /// No outer layer has been parsed yet.
    pub fn is_root(&self) -> bool {
        self.parent_protocol.is_none()
    }
}

/// Output of one layer parser.
#[derive(Debug, Clone)]
pub struct ParseResult<'data> {
    /// Fields in header order.
    pub fields: SmallVec<[FieldEntry<'data>; 16]>,

    /// Bytes left for the next layer.
    pub remaining: &'data [u8],

    /// Hints handed to the next layer.
    pub child_hints: SmallVec<[HintEntry; 4]>,

    /// Set when the header was short or malformed.
    pub error: Option<String>,
}

impl<'data> ParseResult<'data> {
    /// Layer parsed cleanly.
    pub fn success(
        fields: SmallVec<[FieldEntry<'data>; 16]>,
        remaining: &'data [u8],
        child_hints: SmallVec<[HintEntry; 4]>,
    ) -> Self {
        Self {
            fields,
            remaining,
            child_hints,
            error: None,
        }
    }

    /// Layer failed with nothing extracted.
    pub fn error(error: String, remaining: &'data [u8]) -> Self {
        Self {
            fields: SmallVec::new(),
            remaining,
            child_hints: SmallVec::new(),
            error: Some(error),
        }
    }

    /// Fields recovered before the layer failed.
    pub fn partial(
        fields: SmallVec<[FieldEntry<'data>; 16]>,
        remaining: &'data [u8],
        error: String,
    ) -> Self {
        Self {
            fields,
            remaining,
            child_hints: SmallVec::new(),
            error: Some(error),
        }
    }

    /// First field named `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue<'data>> {
        self.fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// Look up a hint this layer set for its child.
    pub fn hint(&self, name: &str) -> Option<u64> {
        self.child_hints
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }

    /// True when the layer parsed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_hint_replaces() {
        let mut ctx = ParseContext::new(1);
        ctx.set_hint("ethertype", 0x8100);
        ctx.set_hint("ethertype", 0x0800);
        assert_eq!(ctx.hints.len(), 1);
        assert_eq!(ctx.hint("ethertype"), Some(0x0800));
        assert!(ctx.is_root());
    }

    #[test]
    fn test_result_accessors() {
        let mut fields = SmallVec::new();
        fields.push(("ttl", FieldValue::UInt8(64)));
        let mut hints = SmallVec::new();
        hints.push(("ip_protocol", 6));
        let result = ParseResult::success(fields, &[], hints);

        assert!(result.is_ok());
        assert_eq!(result.get("ttl"), Some(&FieldValue::UInt8(64)));
        assert_eq!(result.hint("ip_protocol"), Some(6));

        let failed = ParseResult::error("short".into(), &[1, 2]);
        assert!(!failed.is_ok());
        assert_eq!(failed.remaining.len(), 2);
    }
}
