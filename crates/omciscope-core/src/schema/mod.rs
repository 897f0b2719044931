//! Managed-entity schema registry.
//!
//! Read-only reference data describing the G.988 managed entities the
//! toolkit understands: attribute layouts for encoding and decoding message
//! contents, and per-class alarm maps for alarm-bitmap enrichment. The
//! registry is initialised once and shared process-wide; nothing in it is
//! mutable after startup.

mod classes;

use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Wire representation of a managed-entity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Integer,
    String,
    Octets,
    BitField,
    Table,
}

impl AttributeKind {
    /// Attributes that cannot be supplied through the `k=v` text surface.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Octets | Self::BitField | Self::Table)
    }
}

/// Definition of a single attribute within a managed entity.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDef {
    pub name: &'static str,
    /// 1-based position in the entity's attribute list.
    pub index: u16,
    pub kind: AttributeKind,
    /// Encoded width in bytes.
    pub size: usize,
}

impl AttributeDef {
    /// Attribute-mask bit for this attribute (index 1 maps to bit 15).
    pub const fn mask(&self) -> u16 {
        0x8000 >> (self.index - 1)
    }
}

/// Definition of one managed-entity class.
#[derive(Debug)]
pub struct MeDefinition {
    pub class_id: u16,
    pub name: &'static str,
    /// Ordered by attribute index.
    pub attributes: &'static [AttributeDef],
    /// Alarm number to label, sparse.
    pub alarms: &'static [(u8, &'static str)],
}

impl MeDefinition {
    /// Union of the mask bits of every defined attribute.
    pub fn allowed_attribute_mask(&self) -> u16 {
        self.attributes.iter().fold(0, |mask, a| mask | a.mask())
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&'static AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes selected by `mask`, in index order.
    pub fn attributes_in_mask(&self, mask: u16) -> impl Iterator<Item = &'static AttributeDef> {
        self.attributes.iter().filter(move |a| a.mask() & mask != 0)
    }

    fn alarm(&self, number: u8) -> Option<&'static str> {
        self.alarms
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, label)| *label)
    }
}

/// Lookup table over the built-in managed-entity definitions.
pub struct MeRegistry {
    classes: BTreeMap<u16, &'static MeDefinition>,
}

impl MeRegistry {
    fn baseline() -> Self {
        let classes = classes::BASELINE_CLASSES
            .iter()
            .map(|def| (def.class_id, def))
            .collect();
        Self { classes }
    }

    pub fn me(&self, class_id: u16) -> Option<&'static MeDefinition> {
        self.classes.get(&class_id).copied()
    }

    pub fn class_name(&self, class_id: u16) -> Option<&'static str> {
        self.me(class_id).map(|def| def.name)
    }

    /// Human label for one set bit of an alarm bitmap, rendered the way the
    /// record consumers expect it.
    pub fn alarm_label(&self, class_id: u16, number: usize) -> String {
        let Some(def) = self.me(class_id) else {
            return "Unknown Class/Alarm".to_string();
        };
        match u8::try_from(number).ok().and_then(|n| def.alarm(n)) {
            Some(label) => format!("Type {number}: {label}"),
            None => format!("Unknown Alarm No: {number}"),
        }
    }
}

/// Process-wide registry handle.
pub fn registry() -> &'static MeRegistry {
    static REGISTRY: OnceLock<MeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MeRegistry::baseline)
}

#[cfg(test)]
mod tests {
    use super::{registry, AttributeKind};
    use crate::omci::layout;

    #[test]
    fn onu_g_administrative_state_mask() {
        let def = registry().me(layout::ONU_G_CLASS_ID).unwrap();
        let attr = def.attribute_by_name("AdministrativeState").unwrap();
        assert_eq!(attr.mask(), 0x0200);
        assert_eq!(attr.size, 1);
    }

    #[test]
    fn tcont_alloc_id_is_first_attribute() {
        let def = registry().me(layout::T_CONT_CLASS_ID).unwrap();
        let attr = def.attribute_by_name("AllocId").unwrap();
        assert_eq!(attr.mask(), 0x8000);
        assert_eq!(attr.kind, AttributeKind::Integer);
        assert_eq!(attr.size, 2);
    }

    #[test]
    fn onu_data_allowed_mask() {
        let def = registry().me(layout::ONU_DATA_CLASS_ID).unwrap();
        assert_eq!(def.allowed_attribute_mask(), 0x8000);
    }

    #[test]
    fn alarm_labels() {
        assert_eq!(
            registry().alarm_label(layout::ONU_G_CLASS_ID, 7),
            "Type 7: Dying gasp"
        );
        assert_eq!(
            registry().alarm_label(layout::ONU_G_CLASS_ID, 200),
            "Unknown Alarm No: 200"
        );
        assert_eq!(registry().alarm_label(0xBEEF, 0), "Unknown Class/Alarm");
    }

    #[test]
    fn attributes_in_mask_index_order() {
        let def = registry().me(layout::ONU_G_CLASS_ID).unwrap();
        let names: Vec<&str> = def
            .attributes_in_mask(0x2200)
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["SerialNumber", "AdministrativeState"]);
    }
}
