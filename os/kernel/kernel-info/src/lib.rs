//! # Kernel Configuration
//!
//! Compile-time configuration shared by the frame allocators and the network
//! driver. This crate is the single source of truth for the physical memory
//! layout, the number of harts, and the NIC ring geometry.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! KERNBASE  0x8000_0000 ┌─────────────────────────────────┐
//!                       │       Kernel Image              │
//!                       │   (Text, Data, BSS)             │
//!           end symbol  ├─────────────────────────────────┤
//!                       │    Available RAM                │
//!                       │  (Managed by frame allocator)   │
//! PHYSTOP   0x8800_0000 └─────────────────────────────────┘
//! ```
//!
//! The frame allocators index their bookkeeping (reference counts) by
//! `(pa - KERNBASE) / PAGE_SIZE`, so every frame they can ever see lies in
//! `[KERNBASE, PHYSTOP)`.
//!
//! ## Modules
//!
//! * [`memory`]: page size, managed physical range, hart count.
//! * [`net`]: descriptor ring sizes, receive buffer size, station MAC.
//!
//! All values are `const`; invalid combinations are rejected by
//! compile-time assertions next to their definitions.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
pub mod net;
