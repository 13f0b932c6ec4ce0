//! Report descriptor parsing and bit-level value codec for HID-speaking
//! UPS devices.
//!
//! [`descriptor::parse`] turns a raw report descriptor into a flat list of
//! [`item::HidItem`]s; [`codec::get_value`]/[`codec::set_value`] move
//! values in and out of report buffers at the bit offsets the parser
//! computed; [`units::logical_to_physical`] rescales a logical value into
//! engineering units. [`buffer::ReportBuffer`] is the optional
//! driver-side cache tying the two together across repeated polls.

pub mod buffer;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod item;
pub mod units;

pub use error::{HidError, Result};
pub use item::{Attribute, Descriptor, HidItem, ItemKind, Path};

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses and decodes a small, hand-built descriptor end to end: a
    /// single 16-bit Feature item with Report ID 1.
    #[test]
    fn parses_and_decodes_minimal_descriptor() {
        let bytes: &[u8] = &[
            0x05, 0x84, // Usage Page (vendor, arbitrary)
            0x85, 0x01, // Report ID (1)
            0x75, 0x10, // Report Size (16)
            0x95, 0x01, // Report Count (1)
            0x15, 0x00, // Logical Minimum (0)
            0x26, 0xFF, 0xFF, // Logical Maximum (65535)
            0x09, 0x30, // Usage (0x30)
            0xB1, 0x02, // Feature (Data,Var,Abs)
        ];
        let desc = descriptor::parse(bytes).unwrap();
        assert_eq!(desc.items.len(), 1);
        let item = &desc.items[0];
        assert_eq!(item.report_id, 1);
        assert_eq!(item.offset, 0);
        assert_eq!(item.size, 16);

        let report = [0x01u8, 0x11, 0x0D];
        assert_eq!(codec::get_value(item, &report), 0x0D11);
    }

    #[test]
    fn rejects_descriptor_with_unbalanced_end_collection() {
        let bytes: &[u8] = &[0xC0];
        assert!(matches!(
            descriptor::parse(bytes),
            Err(HidError::UnbalancedCollection)
        ));
    }

    /// A usage pushed under one Usage Page keeps that page even after a
    /// later Usage Page item changes the global page before the usage is
    /// consumed by a Collection.
    #[test]
    fn collection_usage_keeps_page_from_push_time() {
        let bytes: &[u8] = &[
            0x05, 0x01, // Usage Page (1)
            0x09, 0x10, // Usage (0x10)
            0x05, 0x02, // Usage Page (2)
            0x09, 0x20, // Usage (0x20)
            0xA1, 0x00, // Collection (Physical)
            0x75, 0x08, // Report Size (8)
            0x95, 0x01, // Report Count (1)
            0x15, 0x00, // Logical Minimum (0)
            0x25, 0x0A, // Logical Maximum (10)
            0x81, 0x02, // Input (Data,Var,Abs)
            0xC0, // End Collection
        ];
        let desc = descriptor::parse(bytes).unwrap();
        assert_eq!(desc.items.len(), 1);
        assert_eq!(
            desc.items[0].path.nodes,
            vec![(1u16, 0x10u16), (2u16, 0u16)]
        );
    }

    #[test]
    fn rejects_collection_nesting_past_path_limit() {
        let mut bytes = Vec::new();
        for _ in 0..11 {
            bytes.extend_from_slice(&[0xA1, 0x00]);
        }
        assert!(matches!(
            descriptor::parse(&bytes),
            Err(HidError::PathTooDeep { .. })
        ));
    }
}
