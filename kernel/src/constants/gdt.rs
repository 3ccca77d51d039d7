//! Global Descriptor Table selectors the gate table refers to.

use x86_64::{structures::gdt::SegmentSelector, PrivilegeLevel};

/// Kernel code segment: the first descriptor after the null entry.
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);
