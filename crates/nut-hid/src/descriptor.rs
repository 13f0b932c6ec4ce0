use tracing::warn;

use crate::error::{HidError, Result};
use crate::item::{Attribute, Descriptor, HidItem, ItemKind, Path, PATH_SIZE};

/// Hard ceiling on raw descriptor size a driver would ever hand us; USB
/// HID descriptors for UPS devices run a few hundred bytes, but we mirror
/// the generous bound the original parser reserved.
const MAX_DESCRIPTOR_LEN: usize = 6144;
const USAGE_STACK_SIZE: usize = 50;
const MAX_REPORTS: usize = 300;

const ITEM_MASK: u8 = 0xFC;

const TAG_USAGE_PAGE: u8 = 0x04;
const TAG_LOGICAL_MIN: u8 = 0x14;
const TAG_LOGICAL_MAX: u8 = 0x24;
const TAG_PHYSICAL_MIN: u8 = 0x34;
const TAG_PHYSICAL_MAX: u8 = 0x44;
const TAG_UNIT_EXP: u8 = 0x54;
const TAG_UNIT: u8 = 0x64;
const TAG_REPORT_SIZE: u8 = 0x74;
const TAG_REPORT_ID: u8 = 0x84;
const TAG_REPORT_COUNT: u8 = 0x94;
const TAG_USAGE: u8 = 0x08;
const TAG_COLLECTION: u8 = 0xA0;
const TAG_END_COLLECTION: u8 = 0xC0;
const TAG_INPUT: u8 = 0x80;
const TAG_OUTPUT: u8 = 0x90;
const TAG_FEATURE: u8 = 0xB0;
const TAG_LONG_ITEM: u8 = 0xFC;

/// Global parser state that survives across Main items (USB HID 6.2.2.7).
#[derive(Default, Clone)]
struct GlobalState {
    usage_page: u16,
    report_id: u8,
    report_size: usize,
    report_count: usize,
    logical_minimum: i64,
    logical_maximum: i64,
    physical_minimum: Option<i64>,
    physical_maximum: Option<i64>,
    unit: u32,
    unit_exp: i8,
}

/// Local parser state, reset after every Main item (USB HID 6.2.2.8).
#[derive(Default)]
struct LocalState {
    /// Pending `(page, usage)` pairs, page frozen at push time. A freshly
    /// reset stack behaves as if it holds a single implicit `(page, 0)`
    /// entry, matching firmware that emits a Main item with no preceding
    /// Usage tag.
    usages: Vec<(u16, u16)>,
}

impl LocalState {
    fn pop_usage(&mut self, page: u16) -> (u16, u16) {
        if self.usages.is_empty() {
            (page, 0)
        } else {
            self.usages.remove(0)
        }
    }

    fn push_usage(&mut self, page: u16, usage: u16) -> Result<()> {
        if self.usages.len() >= USAGE_STACK_SIZE {
            return Err(HidError::UsageStackOverflow {
                max: USAGE_STACK_SIZE,
            });
        }
        self.usages.push((page, usage));
        Ok(())
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    global: GlobalState,
    local: LocalState,
    path: Vec<(u16, u16)>,
    report_offset: [usize; 256],
    seen_reports: [bool; 256],
    n_reports: usize,
    items: Vec<HidItem>,
}

fn sign_extend(value: u32, n_bytes: usize) -> i64 {
    match n_bytes {
        1 => (value as u8) as i8 as i64,
        2 => (value as u16) as i16 as i64,
        4 => value as i32 as i64,
        _ => value as i64,
    }
}

impl<'a> Parser<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Parser {
            bytes,
            pos: 0,
            global: GlobalState::default(),
            local: LocalState::default(),
            path: Vec::with_capacity(PATH_SIZE),
            report_offset: [0; 256],
            seen_reports: [false; 256],
            n_reports: 0,
            items: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn reset_local(&mut self) {
        self.local = LocalState::default();
    }

    fn push_path(&mut self, node: (u16, u16)) -> Result<()> {
        if self.path.len() >= PATH_SIZE {
            return Err(HidError::PathTooDeep { max: PATH_SIZE });
        }
        self.path.push(node);
        Ok(())
    }

    fn mark_report(&mut self, id: u8) -> Result<()> {
        if !self.seen_reports[id as usize] {
            self.seen_reports[id as usize] = true;
            self.n_reports += 1;
            if self.n_reports > MAX_REPORTS {
                return Err(HidError::TooManyReports { max: MAX_REPORTS });
            }
        }
        Ok(())
    }

    fn emit_main(&mut self, kind: ItemKind, report_len: &mut [usize; 256]) -> Result<()> {
        self.mark_report(self.global.report_id)?;
        let mut remaining = self.global.report_count;
        while remaining > 0 {
            let (page, usage) = self.local.pop_usage(self.global.usage_page);
            self.push_path((page, usage))?;

            let id = self.global.report_id;
            let offset = self.report_offset[id as usize];
            let size = self.global.report_size;

            self.items.push(HidItem {
                path: Path {
                    nodes: self.path.clone(),
                },
                report_id: id,
                kind,
                attribute: Attribute::default(),
                offset,
                size,
                unit: self.global.unit,
                unit_exp: self.global.unit_exp,
                logical_minimum: self.global.logical_minimum,
                logical_maximum: self.global.logical_maximum,
                physical_minimum: self.global.physical_minimum,
                physical_maximum: self.global.physical_maximum,
            });

            self.report_offset[id as usize] += size;
            let bits_used = self.report_offset[id as usize];
            report_len[id as usize] = report_len[id as usize].max(bits_used.div_ceil(8));

            self.path.pop();
            remaining -= 1;
        }
        self.reset_local();
        Ok(())
    }

    fn run(mut self) -> Result<Descriptor> {
        if self.bytes.len() > MAX_DESCRIPTOR_LEN {
            return Err(HidError::DescriptorTooLarge {
                max: MAX_DESCRIPTOR_LEN,
            });
        }

        let mut report_len = [0usize; 256];

        while self.pos < self.bytes.len() {
            let prefix = self.bytes[self.pos];
            let item_tag = prefix & ITEM_MASK;
            let size_class = prefix & 0x03;
            self.pos += 1;

            if item_tag == TAG_LONG_ITEM {
                if self.remaining() < 2 {
                    return Err(HidError::TruncatedLongItem {
                        declared: 0,
                        remaining: self.remaining(),
                    });
                }
                let data_len = self.bytes[self.pos] as usize;
                self.pos += 2;
                if self.remaining() < data_len {
                    return Err(HidError::TruncatedLongItem {
                        declared: data_len,
                        remaining: self.remaining(),
                    });
                }
                self.pos += data_len;
                continue;
            }

            let payload_len = match size_class {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 4,
            };
            if self.remaining() < payload_len {
                return Err(HidError::TruncatedItem {
                    offset: self.pos - 1,
                    declared: payload_len,
                    remaining: self.remaining(),
                });
            }
            let mut value: u32 = 0;
            for i in 0..payload_len {
                value |= (self.bytes[self.pos + i] as u32) << (8 * i);
            }
            self.pos += payload_len;

            match item_tag {
                TAG_USAGE_PAGE => self.global.usage_page = value as u16,
                TAG_USAGE => {
                    let usage = if payload_len == 4 {
                        self.global.usage_page = (value >> 16) as u16;
                        value as u16
                    } else {
                        value as u16
                    };
                    self.local.push_usage(self.global.usage_page, usage)?;
                }
                TAG_COLLECTION => {
                    let (page, usage) = self.local.pop_usage(self.global.usage_page);
                    self.push_path((page, usage))?;
                    if value >= 0x80 {
                        self.push_path((0xFF, value as u16))?;
                    }
                    self.reset_local();
                }
                TAG_END_COLLECTION => {
                    if self.path.is_empty() {
                        return Err(HidError::UnbalancedCollection);
                    }
                    if self.path.last().map(|(page, _)| *page) == Some(0xFF) {
                        self.path.pop();
                    }
                    self.path.pop();
                    self.reset_local();
                }
                TAG_INPUT => self.emit_main(ItemKind::Input, &mut report_len)?,
                TAG_OUTPUT => self.emit_main(ItemKind::Output, &mut report_len)?,
                TAG_FEATURE => self.emit_main(ItemKind::Feature, &mut report_len)?,
                TAG_REPORT_ID => {
                    self.global.report_id = value as u8;
                }
                TAG_REPORT_SIZE => self.global.report_size = value as usize,
                TAG_REPORT_COUNT => self.global.report_count = value as usize,
                TAG_UNIT_EXP => {
                    let mut exp = (value & 0x0F) as i8;
                    if exp > 7 {
                        exp -= 16;
                    }
                    self.global.unit_exp = exp;
                }
                TAG_UNIT => self.global.unit = value,
                TAG_LOGICAL_MIN => {
                    self.global.logical_minimum = sign_extend(value, payload_len.max(1))
                }
                TAG_LOGICAL_MAX => {
                    self.global.logical_maximum = sign_extend(value, payload_len.max(1))
                }
                TAG_PHYSICAL_MIN => {
                    self.global.physical_minimum = Some(sign_extend(value, payload_len.max(1)))
                }
                TAG_PHYSICAL_MAX => {
                    self.global.physical_maximum = Some(sign_extend(value, payload_len.max(1)))
                }
                other => {
                    warn!("unhandled HID item tag 0x{:02x}, skipping", other);
                }
            }
        }

        Ok(Descriptor {
            items: self.items,
            report_len,
        })
    }
}

/// Parse a raw USB HID report descriptor into a list of addressable items.
///
/// See USB Device Class Definition for HID, v1.11 §6.2.2 for the item
/// stream format this implements.
pub fn parse(bytes: &[u8]) -> Result<Descriptor> {
    Parser::new(bytes).run()
}
