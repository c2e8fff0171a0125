//! Read-only FAT16 filesystem access (spec.md §6). No write support —
//! the spec's Non-goals exclude FS writes, matching the teacher's own
//! scope discipline of building exactly what the design calls for.

pub mod fat16;
