//! USB device subsystem - presents a vendor-defined HID interface.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  A single HID interface carries the fixed 64-byte
//! report frames built by the router:
//!
//! - Report ID 0x01, vendor usage page 0xFF00
//! - 63 bytes of payload per input report
//!
//! The writer task drains the router's report channel and writes each
//! frame to the interrupt IN endpoint.

pub mod hid_device;
