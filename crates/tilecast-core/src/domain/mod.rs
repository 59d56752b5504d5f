//! Domain value types for Tilecast.
//!
//! This module contains plain data and pure logic with no infrastructure
//! dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application is the **domain**.  Domain code has
//! no imports from graphics APIs, sockets or window systems, so it compiles
//! and tests on any machine.  The display application's `application` and
//! `infrastructure` layers depend on these types; the reverse never happens.

/// Rising/falling edge detection over a once-per-tick boolean sample.
pub mod edge;

/// Eyes, rectangles, sizes, accelerator identities and pixel formats.
pub mod geometry;
